//! Eraser - removes alpha, or paints the background colour on drawables
//! without an alpha channel

use serde::{Deserialize, Serialize};

use crate::brush::BrushHardness;
use crate::core::PaintError;
use crate::drawable::Drawable;
use crate::paint::{ApplicationMode, BlendMode, CanvasApplication, PaintCore, PaintKernel, PaintState};

use super::ToolKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EraserOptions {
    /// Background colour used where there is no alpha to erase (RGBA)
    pub background: [u8; 4],
    /// Opacity (0.0 - 1.0)
    pub opacity: f64,
    /// Binary brush edge
    pub hard: bool,
    pub incremental: bool,
}

impl Default for EraserOptions {
    fn default() -> Self {
        Self {
            background: [255, 255, 255, 255],
            opacity: 1.0,
            hard: false,
            incremental: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EraserTool {
    pub options: EraserOptions,
}

impl EraserTool {
    pub fn new(options: EraserOptions) -> Self {
        Self { options }
    }

    fn dab(&self, core: &mut PaintCore, drawable: &mut Drawable) -> Result<(), PaintError> {
        let pixel = drawable.format().color_with_alpha(self.options.background);
        let Some(area) = core.get_paint_area(drawable) else {
            return Ok(());
        };
        area.fill(&pixel);

        let app = CanvasApplication {
            brush_opacity: CanvasApplication::opacity_to_u8(self.options.opacity),
            image_opacity: 255,
            paint_mode: BlendMode::Erase,
            hardness: if self.options.hard {
                BrushHardness::Hard
            } else {
                BrushHardness::Soft
            },
            mode: if self.options.incremental {
                ApplicationMode::Incremental
            } else {
                ApplicationMode::Constant
            },
            scale: 1.0,
        };
        core.paste_canvas(drawable, &app)
    }
}

impl PaintKernel for EraserTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Eraser
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

    fn painter(options: EraserOptions) -> Painter<EraserTool> {
        let selection = Arc::new(BrushSelection::new());
        selection.insert(Brush::new("square", MaskBuf::square(3, 255), 1));
        let core = PaintCore::new(selection, Arc::new(NullDisplay), PaintConfig::default());
        Painter::new(core, EraserTool::new(options))
    }

    fn at(x: f64, y: f64) -> StrokeCoords {
        StrokeCoords::new(x, y, 0.5)
    }

    #[test]
    fn erases_alpha() {
        let mut p = painter(EraserOptions {
            hard: true,
            ..EraserOptions::default()
        });
        let mut d = Drawable::new(Some(ImageId(1)), 16, 16, PixelFormat::Rgba, [40, 50, 60, 255]);
        let mut history = UndoHistory::with_levels(4);

        p.button_press(&mut d, at(4.0, 4.0), Modifiers::default()).unwrap();
        p.motion(&mut d, at(8.0, 4.0)).unwrap();
        p.button_release(&mut d, &mut history).unwrap();

        assert_eq!(d.pixel(6, 4).unwrap(), &[40, 50, 60, 0]);
        assert_eq!(d.pixel(6, 8).unwrap(), &[40, 50, 60, 255]);

        history.undo(&mut d).unwrap();
        assert_eq!(d.pixel(6, 4).unwrap(), &[40, 50, 60, 255]);
    }

    #[test]
    fn constant_mode_erases_to_opacity_only() {
        let mut p = painter(EraserOptions {
            hard: true,
            opacity: 0.5,
            ..EraserOptions::default()
        });
        let mut d = Drawable::new(Some(ImageId(1)), 16, 16, PixelFormat::GrayA, [90, 90, 90, 255]);

        p.button_press(&mut d, at(4.0, 4.0), Modifiers::default()).unwrap();
        p.motion(&mut d, at(8.0, 4.0)).unwrap();

        assert_eq!(d.pixel(6, 4).unwrap(), &[90, 127]);
    }

    #[test]
    fn paints_background_without_alpha() {
        let mut p = painter(EraserOptions {
            hard: true,
            background: [250, 240, 230, 255],
            ..EraserOptions::default()
        });
        let mut d = Drawable::new(Some(ImageId(1)), 16, 16, PixelFormat::Rgb, [0, 0, 0, 255]);

        p.button_press(&mut d, at(4.0, 4.0), Modifiers::default()).unwrap();
        assert_eq!(d.pixel(4, 4).unwrap(), &[250, 240, 230]);
        assert_eq!(p.kernel().kind(), ToolKind::Eraser);
    }
}
