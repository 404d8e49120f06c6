//! Paint core - stroke state machine, per-stroke session and compositing
//!
//! A stroke runs `Init → Motion* → Finish`, optionally interrupted by
//! `Pause`/`Resume` while the host redraws on-canvas feedback. Tool kernels
//! implement [`PaintKernel`] and are called back once per state and once per
//! interpolated dab.

pub mod blend;
mod compositor;
pub mod core;
pub mod painter;
pub mod session;

pub use blend::BlendMode;
pub use self::core::PaintCore;
pub use painter::{Modifiers, Painter, ToolAction};
pub use session::{DirtyRect, PaintSession};

use serde::{Deserialize, Serialize};

use crate::brush::BrushHardness;
use crate::core::PaintError;
use crate::drawable::Drawable;
use crate::tools::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaintState {
    /// Stroke started; session allocated
    Init,
    /// One dab at `PaintCore::cur`
    Motion,
    /// Stroke ending; the undo record is pushed right after
    Finish,
    /// Host is about to draw over the canvas
    Pause,
    Resume,
}

/// How repeated dabs within one stroke combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationMode {
    /// Coverage saturates at the brush opacity for the whole stroke
    #[default]
    Constant,
    /// Every dab composites on top of the previous ones
    Incremental,
}

/// Parameters for compositing the accumulator into the drawable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasApplication {
    pub brush_opacity: u8,
    pub image_opacity: u8,
    pub paint_mode: BlendMode,
    pub hardness: BrushHardness,
    pub mode: ApplicationMode,
    /// Brush area scale factor (1.0 = unscaled)
    pub scale: f64,
}

impl Default for CanvasApplication {
    fn default() -> Self {
        Self {
            brush_opacity: 255,
            image_opacity: 255,
            paint_mode: BlendMode::Normal,
            hardness: BrushHardness::Soft,
            mode: ApplicationMode::Constant,
            scale: 1.0,
        }
    }
}

impl CanvasApplication {
    /// Convert a 0.0 - 1.0 opacity to the 8-bit value used for compositing
    pub fn opacity_to_u8(opacity: f64) -> u8 {
        (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// A brush-based tool plugged into the paint core
pub trait PaintKernel: Send {
    fn kind(&self) -> ToolKind;

    /// Handle one stroke state. `Motion` means "render a dab at `core.cur`".
    fn paint(&mut self, core: &mut PaintCore, drawable: &mut Drawable, state: PaintState) -> Result<(), PaintError>;
}

impl<K: PaintKernel + ?Sized> PaintKernel for Box<K> {
    fn kind(&self) -> ToolKind {
        (**self).kind()
    }

    fn paint(&mut self, core: &mut PaintCore, drawable: &mut Drawable, state: PaintState) -> Result<(), PaintError> {
        (**self).paint(core, drawable, state)
    }
}
