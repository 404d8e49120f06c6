//! Brush tool kernels
//!
//! Each tool renders colour into the dab accumulator and hands it to the
//! paint core's paste or replace. Pixel math specific to a tool lives here;
//! everything stroke related lives in `paint`.

pub mod clone;
pub mod convolve;
pub mod eraser;
pub mod paintbrush;

pub use clone::{CloneOptions, CloneSource, CloneTool};
pub use convolve::{ConvolveOptions, ConvolveTool, ConvolveType};
pub use eraser::{EraserOptions, EraserTool};
pub use paintbrush::{Gradient, GradientRepeat, PaintbrushOptions, PaintbrushTool};

use serde::{Deserialize, Serialize};

/// Identifies the tool that painted a stroke (recorded in undo)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Paintbrush,
    Eraser,
    Clone,
    Convolve,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Paintbrush => "Paintbrush",
            ToolKind::Eraser => "Eraser",
            ToolKind::Clone => "Clone",
            ToolKind::Convolve => "Convolve",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_kind_serde_and_display() {
        assert_eq!(ToolKind::Convolve.to_string(), "Convolve");
        let json = serde_json::to_string(&ToolKind::Paintbrush).unwrap_or_default();
        assert_eq!(json, "\"paintbrush\"");
    }
}
