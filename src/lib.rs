//! Paintcore - brush stroke engine for tiled raster drawables
//!
//! Turns pointer samples into evenly spaced brush dabs, derives
//! sub-pixel brush masks, composites dabs through a per-stroke canvas and
//! records an undo patch for every stroke.

pub mod brush;
pub mod core;
pub mod display;
pub mod drawable;
pub mod paint;
pub mod tiles;
pub mod tools;
pub mod undo;

pub use brush::{Brush, BrushHardness, BrushProvider, BrushSelection, MaskBuf, StrokeCoords};
pub use self::core::{PaintConfig, PaintError};
pub use display::{DamageLog, DisplaySink, NullDisplay};
pub use drawable::{Drawable, ImageId, PixelFormat};
pub use paint::{
    ApplicationMode, BlendMode, CanvasApplication, Modifiers, PaintCore, PaintKernel, PaintState, Painter, ToolAction,
};
pub use tools::ToolKind;
pub use undo::{UndoHistory, UndoStack};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `filter`. Calling this twice is harmless;
/// the second call keeps the first subscriber.
pub fn init_logging(filter: &str) {
    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if installed.is_ok() {
        tracing::info!("Paintcore logging initialized");
    }
}
