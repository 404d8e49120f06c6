//! Paintbrush - solid or gradient colour dabs with optional fade-out

use serde::{Deserialize, Serialize};

use crate::brush::BrushHardness;
use crate::core::PaintError;
use crate::drawable::Drawable;
use crate::paint::{ApplicationMode, BlendMode, CanvasApplication, PaintCore, PaintKernel, PaintState};

use super::ToolKind;

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// How a gradient continues past its length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradientRepeat {
    /// Start to end once, then nothing
    #[default]
    OnceForward,
    /// End to start once, then nothing
    OnceBackward,
    /// Start to end, then keep the end colour
    OnceEndColor,
    /// Start to end, restarting each length
    LoopSawtooth,
    /// Start to end and back again
    LoopTriangle,
}

/// Two-colour gradient laid out along the stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    pub start: [u8; 4],
    pub end: [u8; 4],
    /// Stroke distance covered by one pass, in pixels
    pub length: f64,
    pub repeat: GradientRepeat,
}

impl Gradient {
    /// Colour for a dab `distance` pixels into the stroke
    pub fn color_at(&self, distance: f64) -> [u8; 4] {
        let pos = if self.length > 0.0 { distance / self.length } else { 1.0 };

        let t = match self.repeat {
            GradientRepeat::OnceForward if pos > 1.0 => return TRANSPARENT,
            GradientRepeat::OnceBackward if pos > 1.0 => return TRANSPARENT,
            GradientRepeat::OnceForward => pos,
            GradientRepeat::OnceBackward => 1.0 - pos,
            GradientRepeat::OnceEndColor => pos.min(1.0),
            GradientRepeat::LoopSawtooth => pos.fract(),
            GradientRepeat::LoopTriangle => {
                if (pos.floor() as i64) % 2 == 0 {
                    pos.fract()
                } else {
                    1.0 - pos.fract()
                }
            }
        };

        let mut color = [0u8; 4];
        for (c, (s, e)) in color.iter_mut().zip(self.start.iter().zip(&self.end)) {
            *c = (*s as f64 + (*e as f64 - *s as f64) * t).round().clamp(0.0, 255.0) as u8;
        }
        color
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaintbrushOptions {
    /// Foreground colour (RGBA)
    pub color: [u8; 4],
    /// Opacity (0.0 - 1.0)
    pub opacity: f64,
    pub mode: BlendMode,
    pub hardness: BrushHardness,
    pub incremental: bool,
    /// Stroke length over which dabs fade out
    pub fade_out: Option<f64>,
    /// Colour dabs from a gradient instead of the foreground colour
    pub gradient: Option<Gradient>,
}

impl Default for PaintbrushOptions {
    fn default() -> Self {
        Self {
            color: [0, 0, 0, 255],
            opacity: 1.0,
            mode: BlendMode::Normal,
            hardness: BrushHardness::Soft,
            incremental: false,
            fade_out: None,
            gradient: None,
        }
    }
}

/// Opacity multiplier for a dab `distance` into a stroke fading over `length`
fn fade_factor(distance: f64, length: Option<f64>) -> f64 {
    match length {
        Some(length) if length > 0.0 => {
            let x = distance / length;
            (-x * x * 0.5).exp()
        }
        _ => 1.0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaintbrushTool {
    pub options: PaintbrushOptions,
}

impl PaintbrushTool {
    pub fn new(options: PaintbrushOptions) -> Self {
        Self { options }
    }

    fn dab(&self, core: &mut PaintCore, drawable: &mut Drawable) -> Result<(), PaintError> {
        let fade = fade_factor(core.distance(), self.options.fade_out);
        if fade < 1.0 / 255.0 {
            return Ok(());
        }

        let color = match &self.options.gradient {
            Some(gradient) => gradient.color_at(core.distance()),
            None => self.options.color,
        };
        if color[3] == 0 {
            return Ok(());
        }

        let pixel = drawable.format().color_with_alpha(color);
        let Some(area) = core.get_paint_area(drawable) else {
            return Ok(());
        };
        area.fill(&pixel);

        let app = CanvasApplication {
            brush_opacity: CanvasApplication::opacity_to_u8(self.options.opacity * fade),
            image_opacity: 255,
            paint_mode: self.options.mode,
            hardness: self.options.hardness,
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

impl PaintKernel for PaintbrushTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Paintbrush
    }

    fn paint(&mut self, core: &mut PaintCore, drawable: &mut Drawable, state: PaintState) -> Result<(), PaintError> {
        match state {
            PaintState::Motion => self.dab(core, drawable),
            _ => Ok(()),
        }
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

    fn painter(options: PaintbrushOptions) -> Painter<PaintbrushTool> {
        let selection = Arc::new(BrushSelection::new());
        selection.insert(Brush::new("square", MaskBuf::square(3, 255), 1));
        let core = PaintCore::new(selection, Arc::new(NullDisplay), PaintConfig::default());
        Painter::new(core, PaintbrushTool::new(options))
    }

    fn at(x: f64, y: f64) -> StrokeCoords {
        StrokeCoords::new(x, y, 0.5)
    }

    fn gradient(repeat: GradientRepeat) -> Gradient {
        Gradient {
            start: [0, 0, 0, 255],
            end: [200, 100, 0, 255],
            length: 10.0,
            repeat,
        }
    }

    #[test]
    fn gradient_once_modes() {
        let forward = gradient(GradientRepeat::OnceForward);
        assert_eq!(forward.color_at(0.0), [0, 0, 0, 255]);
        assert_eq!(forward.color_at(5.0), [100, 50, 0, 255]);
        assert_eq!(forward.color_at(15.0), TRANSPARENT);

        let backward = gradient(GradientRepeat::OnceBackward);
        assert_eq!(backward.color_at(0.0), [200, 100, 0, 255]);
        assert_eq!(backward.color_at(12.0), TRANSPARENT);

        let end = gradient(GradientRepeat::OnceEndColor);
        assert_eq!(end.color_at(100.0), [200, 100, 0, 255]);
    }

    #[test]
    fn gradient_loop_modes() {
        let saw = gradient(GradientRepeat::LoopSawtooth);
        assert_eq!(saw.color_at(12.5), [50, 25, 0, 255]);

        let triangle = gradient(GradientRepeat::LoopTriangle);
        assert_eq!(triangle.color_at(2.5), [50, 25, 0, 255]);
        assert_eq!(triangle.color_at(12.5), [150, 75, 0, 255]);
        assert_eq!(triangle.color_at(22.5), [50, 25, 0, 255]);
    }

    #[test]
    fn fade_factor_is_gaussian() {
        assert_eq!(fade_factor(5.0, None), 1.0);
        assert_eq!(fade_factor(0.0, Some(10.0)), 1.0);
        assert!((fade_factor(10.0, Some(10.0)) - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn constant_opacity_stroke() {
        let mut p = painter(PaintbrushOptions {
            color: [10, 20, 30, 255],
            opacity: 0.5,
            hardness: BrushHardness::Hard,
            ..PaintbrushOptions::default()
        });
        let mut d = Drawable::new(Some(ImageId(1)), 16, 16, PixelFormat::Rgba, [0; 4]);
        let mut history = UndoHistory::with_levels(4);

        p.button_press(&mut d, at(2.0, 2.0), Modifiers::default()).unwrap();
        p.motion(&mut d, at(8.0, 2.0)).unwrap();
        assert!(p.button_release(&mut d, &mut history).unwrap());

        assert_eq!(d.pixel(5, 2).unwrap(), &[10, 20, 30, 128]);
        assert_eq!(d.pixel(5, 5).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn fade_out_stops_painting() {
        let mut p = painter(PaintbrushOptions {
            hardness: BrushHardness::Hard,
            incremental: true,
            fade_out: Some(2.0),
            ..PaintbrushOptions::default()
        });
        let mut d = Drawable::new(Some(ImageId(1)), 32, 8, PixelFormat::Rgba, [255, 255, 255, 0]);

        p.button_press(&mut d, at(1.0, 3.0), Modifiers::default()).unwrap();
        p.motion(&mut d, at(25.0, 3.0)).unwrap();

        assert!(d.pixel(1, 3).unwrap()[3] > 0);
        assert_eq!(d.pixel(20, 3).unwrap()[3], 0);
    }

    #[test]
    fn transparent_gradient_section_is_skipped() {
        let mut p = painter(PaintbrushOptions {
            hardness: BrushHardness::Hard,
            gradient: Some(Gradient {
                start: [255, 0, 0, 255],
                end: [0, 0, 255, 255],
                length: 4.0,
                repeat: GradientRepeat::OnceForward,
            }),
            ..PaintbrushOptions::default()
        });
        let mut d = Drawable::new(Some(ImageId(1)), 32, 8, PixelFormat::Rgb, [255, 255, 255, 255]);

        p.button_press(&mut d, at(1.0, 3.0), Modifiers::default()).unwrap();
        p.motion(&mut d, at(20.0, 3.0)).unwrap();

        // later dabs re-colour earlier pixels in constant mode; only presence matters
        assert_ne!(d.pixel(1, 3).unwrap(), &[255, 255, 255]);
        assert_eq!(d.pixel(15, 3).unwrap(), &[255, 255, 255]);
    }

    #[test]
    fn options_deserialize_partially() {
        let options: PaintbrushOptions =
            serde_json::from_str(r#"{"opacity":0.25,"incremental":true,"mode":"multiply"}"#).unwrap();
        assert_eq!(options.opacity, 0.25);
        assert!(options.incremental);
        assert_eq!(options.mode, BlendMode::Multiply);
        assert_eq!(options.color, [0, 0, 0, 255]);
    }
}
