//! Convolve - blurs or sharpens the pixels under the brush
//!
//! Works on the live drawable, so passing over the same area again keeps
//! strengthening the effect. Results go through `replace_canvas`.

use serde::{Deserialize, Serialize};

use crate::brush::BrushHardness;
use crate::core::PaintError;
use crate::drawable::Drawable;
use crate::paint::{ApplicationMode, BlendMode, CanvasApplication, PaintCore, PaintKernel, PaintState};

use super::ToolKind;

const BLUR: [i32; 9] = [1, 1, 1, 1, 1, 1, 1, 1, 1];
const SHARPEN: [i32; 9] = [0, -1, 0, -1, 5, -1, 0, -1, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvolveType {
    #[default]
    Blur,
    Sharpen,
}

impl ConvolveType {
    fn matrix(self) -> (&'static [i32; 9], i32) {
        match self {
            ConvolveType::Blur => (&BLUR, 9),
            ConvolveType::Sharpen => (&SHARPEN, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvolveOptions {
    #[serde(rename = "type")]
    pub kind: ConvolveType,
    /// Strength in percent (0 - 100)
    pub rate: f64,
}

impl Default for ConvolveOptions {
    fn default() -> Self {
        Self {
            kind: ConvolveType::Blur,
            rate: 50.0,
        }
    }
}

/// Apply a 3x3 matrix to `src` (`w * h` pixels of `bytes`), replicating
/// edge pixels. Output has the same layout.
fn convolve(src: &[u8], w: usize, h: usize, bytes: usize, kind: ConvolveType) -> Vec<u8> {
    let (matrix, divisor) = kind.matrix();
    let mut out = vec![0u8; src.len()];
    let clamp_x = |x: isize| x.clamp(0, w as isize - 1) as usize;
    let clamp_y = |y: isize| y.clamp(0, h as isize - 1) as usize;

    for y in 0..h {
        for x in 0..w {
            for c in 0..bytes {
                let mut sum = 0i32;
                for (i, weight) in matrix.iter().enumerate() {
                    if *weight == 0 {
                        continue;
                    }
                    let sx = clamp_x(x as isize + (i % 3) as isize - 1);
                    let sy = clamp_y(y as isize + (i / 3) as isize - 1);
                    sum += weight * src[(sy * w + sx) * bytes + c] as i32;
                }
                let value = (sum + divisor / 2).div_euclid(divisor);
                out[(y * w + x) * bytes + c] = value.clamp(0, 255) as u8;
            }
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct ConvolveTool {
    pub options: ConvolveOptions,
}

impl ConvolveTool {
    pub fn new(options: ConvolveOptions) -> Self {
        Self { options }
    }

    fn dab(&self, core: &mut PaintCore, drawable: &mut Drawable) -> Result<(), PaintError> {
        let (x, y, w, h) = match core.get_paint_area(drawable) {
            Some(area) => (area.x, area.y, area.width(), area.height()),
            None => return Ok(()),
        };

        // one pixel of context where the drawable has it
        let rx1 = (x - 1).max(0);
        let ry1 = (y - 1).max(0);
        let rx2 = (x + w + 1).min(drawable.width());
        let ry2 = (y + h + 1).min(drawable.height());
        let (rw, rh) = ((rx2 - rx1) as usize, (ry2 - ry1) as usize);

        let bytes = drawable.bytes();
        let region = drawable.read_rect(rx1, ry1, rx2 - rx1, ry2 - ry1);
        let result = convolve(&region, rw, rh, bytes, self.options.kind);

        let has_alpha = drawable.has_alpha();
        let Some(area) = core.get_paint_area(drawable) else {
            return Ok(());
        };
        let area_bytes = area.bytes();
        for row in 0..h {
            let sy = (y + row - ry1) as usize;
            let dst_row = area.row_mut(row);
            for col in 0..w {
                let sx = (x + col - rx1) as usize;
                let src = &result[(sy * rw + sx) * bytes..(sy * rw + sx + 1) * bytes];
                let dst = &mut dst_row[col as usize * area_bytes..(col as usize + 1) * area_bytes];
                dst[..bytes].copy_from_slice(src);
                if !has_alpha {
                    dst[bytes] = 255;
                }
            }
        }

        let app = CanvasApplication {
            brush_opacity: CanvasApplication::opacity_to_u8(self.options.rate / 100.0),
            image_opacity: 255,
            paint_mode: BlendMode::Normal,
            hardness: BrushHardness::Soft,
            mode: ApplicationMode::Incremental,
            scale: 1.0,
        };
        core.replace_canvas(drawable, &app)
    }
}

impl PaintKernel for ConvolveTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Convolve
    }

    fn paint(&mut self, core: &mut PaintCore, drawable: &mut Drawable, state: PaintState) -> Result<(), PaintError> {
        if state == PaintState::Motion {
            self.dab(core, drawable)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::brush::{Brush, BrushSelection, MaskBuf, StrokeCoords};
    use crate::core::PaintConfig;
    use crate::display::NullDisplay;
    use crate::drawable::{ImageId, PixelFormat};
    use crate::paint::{Modifiers, Painter};
    use crate::undo::UndoHistory;

    fn painter(options: ConvolveOptions) -> Painter<ConvolveTool> {
        let selection = Arc::new(BrushSelection::new());
        selection.insert(Brush::new("square", MaskBuf::square(5, 255), 1));
        let core = PaintCore::new(selection, Arc::new(NullDisplay), PaintConfig::default());
        Painter::new(core, ConvolveTool::new(options))
    }

    /// Left half black, right half white
    fn edge(format: PixelFormat) -> Drawable {
        let mut d = Drawable::new(Some(ImageId(1)), 16, 8, format, [0, 0, 0, 255]);
        let white = Drawable::new(None, 8, 8, format, [255, 255, 255, 255]);
        let pixels = white.read_rect(0, 0, 8, 8);
        d.tiles_mut().write_rect(8, 0, 8, 8, &pixels);
        d
    }

    #[test]
    fn blur_matrix_averages() {
        let src = [0, 0, 255, 0, 0, 255, 0, 0, 255];
        let out = convolve(&src, 3, 3, 1, ConvolveType::Blur);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 85);
        assert_eq!(out[2], 170);
    }

    #[test]
    fn sharpen_matrix_clamps() {
        let src = [100, 100, 100, 100, 200, 100, 100, 100, 100];
        let out = convolve(&src, 3, 3, 1, ConvolveType::Sharpen);
        assert_eq!(out[4], 255);
        assert_eq!(out[1], 0);
        // uniform corner
        assert_eq!(out[0], 100);
    }

    #[test]
    fn blur_softens_edge() {
        let mut p = painter(ConvolveOptions {
            kind: ConvolveType::Blur,
            rate: 100.0,
        });
        let mut d = edge(PixelFormat::GrayA);
        let mut history = UndoHistory::with_levels(4);

        p.button_press(&mut d, at(8.0, 4.0), Modifiers::default()).unwrap();
        assert!(p.button_release(&mut d, &mut history).unwrap());

        assert!(d.pixel(7, 4).unwrap()[0] > 0);
        assert!(d.pixel(8, 4).unwrap()[0] < 255);
        assert_eq!(d.pixel(7, 4).unwrap()[1], 255);
        assert_eq!(d.pixel(0, 4).unwrap(), &[0, 255]);
        assert_eq!(d.pixel(15, 4).unwrap(), &[255, 255]);

        history.undo(&mut d).unwrap();
        assert_eq!(d.pixel(7, 4).unwrap(), &[0, 255]);
    }

    #[test]
    fn zero_rate_leaves_pixels() {
        let mut p = painter(ConvolveOptions {
            kind: ConvolveType::Sharpen,
            rate: 0.0,
        });
        let mut d = edge(PixelFormat::Rgba);
        p.button_press(&mut d, at(8.0, 4.0), Modifiers::default()).unwrap();
        assert_eq!(d.pixel(7, 4).unwrap(), &[0, 0, 0, 255]);
        assert_eq!(d.pixel(8, 4).unwrap(), &[255, 255, 255, 255]);
    }

    #[test]
    fn drawable_without_alpha_falls_back_to_paste() {
        let mut p = painter(ConvolveOptions {
            kind: ConvolveType::Blur,
            rate: 100.0,
        });
        let mut d = edge(PixelFormat::Gray);
        p.button_press(&mut d, at(8.0, 4.0), Modifiers::default()).unwrap();
        assert!(d.pixel(7, 4).unwrap()[0] > 0);
        assert!(d.pixel(8, 4).unwrap()[0] < 255);
    }

    #[test]
    fn options_use_type_key() {
        let options: ConvolveOptions = serde_json::from_str(r#"{"type":"sharpen"}"#).unwrap();
        assert_eq!(options.kind, ConvolveType::Sharpen);
        assert_eq!(options.rate, 50.0);
    }

    fn at(x: f64, y: f64) -> StrokeCoords {
        StrokeCoords::new(x, y, 0.5)
    }
}
