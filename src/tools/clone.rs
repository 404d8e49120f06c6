//! Clone - copies pixels from a source point onto the stroke
//!
//! The source is either the target drawable itself (read through the
//! pre-stroke image so the stroke never clones its own output) or a
//! snapshot of another drawable.

use serde::{Deserialize, Serialize};

use crate::brush::BrushHardness;
use crate::core::PaintError;
use crate::drawable::Drawable;
use crate::paint::{ApplicationMode, BlendMode, CanvasApplication, PaintCore, PaintKernel, PaintState};

use super::ToolKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloneOptions {
    /// Keep the source offset fixed across strokes
    pub aligned: bool,
    /// Opacity (0.0 - 1.0)
    pub opacity: f64,
    pub mode: BlendMode,
    pub hardness: BrushHardness,
    pub incremental: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            aligned: true,
            opacity: 1.0,
            mode: BlendMode::Normal,
            hardness: BrushHardness::Soft,
            incremental: false,
        }
    }
}

/// Where cloned pixels come from
#[derive(Debug, Clone, Default)]
pub enum CloneSource {
    /// The drawable being painted
    #[default]
    Target,
    /// Another drawable; tiles are shared so this is a cheap snapshot
    Drawable(Box<Drawable>),
}

#[derive(Debug, Clone, Default)]
pub struct CloneTool {
    pub options: CloneOptions,
    source: CloneSource,
    source_point: Option<(f64, f64)>,
    offset: Option<(i32, i32)>,
    new_source: bool,
    marker_visible: bool,
}

impl CloneTool {
    pub fn new(options: CloneOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Set the point the next stroke clones from
    pub fn set_source_point(&mut self, x: f64, y: f64) {
        self.source_point = Some((x, y));
        self.new_source = true;
    }

    pub fn set_source(&mut self, source: CloneSource) {
        self.source = source;
        self.new_source = true;
    }

    /// Source minus target, fixed at the start of a stroke
    pub fn offset(&self) -> Option<(i32, i32)> {
        self.offset
    }

    /// Whether the host should draw the source marker
    pub fn marker_visible(&self) -> bool {
        self.marker_visible
    }

    /// Source position matching the current dab
    pub fn marker_position(&self, core: &PaintCore) -> Option<(i32, i32)> {
        let (ox, oy) = self.offset?;
        Some((core.cur.x as i32 + ox, core.cur.y as i32 + oy))
    }

    fn start_stroke(&mut self, core: &PaintCore) -> Result<(), PaintError> {
        let Some((sx, sy)) = self.source_point else {
            tracing::warn!("Clone stroke without a source point");
            return Err(PaintError::InvalidInput("Set a clone source point first".to_string()));
        };

        if !self.options.aligned || self.offset.is_none() || self.new_source {
            self.offset = Some(((sx - core.cur.x) as i32, (sy - core.cur.y) as i32));
            self.new_source = false;
        }
        self.marker_visible = true;
        Ok(())
    }

    /// Source pixels for `(x, y, w, h)` plus whether each lies inside the source
    fn read_source(&self, core: &mut PaintCore, drawable: &Drawable, x: i32, y: i32, w: i32, h: i32) -> Option<(Vec<u8>, i32, i32)> {
        match &self.source {
            CloneSource::Target => {
                let orig = core.get_orig_image(drawable, x, y, x + w, y + h)?;
                Some((orig.data().to_vec(), drawable.width(), drawable.height()))
            }
            CloneSource::Drawable(source) => Some((source.read_rect(x, y, w, h), source.width(), source.height())),
        }
    }

    fn dab(&mut self, core: &mut PaintCore, drawable: &mut Drawable) -> Result<(), PaintError> {
        let Some((ox, oy)) = self.offset else {
            return Ok(());
        };
        if let CloneSource::Drawable(source) = &self.source {
            if source.format() != drawable.format() {
                return Err(PaintError::InvalidInput(format!(
                    "Clone source is {:?}, target is {:?}",
                    source.format(),
                    drawable.format()
                )));
            }
        }

        let (x, y, w, h) = match core.get_paint_area(drawable) {
            Some(area) => (area.x, area.y, area.width(), area.height()),
            None => return Ok(()),
        };
        let (sx, sy) = (x + ox, y + oy);
        let Some((pixels, src_w, src_h)) = self.read_source(core, drawable, sx, sy, w, h) else {
            return Ok(());
        };

        let src_bytes = drawable.bytes();
        let channels = drawable.format().color_channels();
        let has_alpha = drawable.has_alpha();

        let Some(area) = core.get_paint_area(drawable) else {
            return Ok(());
        };
        let bytes = area.bytes();
        for row in 0..h {
            let py = sy + row;
            let dst_row = area.row_mut(row);
            for col in 0..w {
                let px = sx + col;
                let dst = &mut dst_row[col as usize * bytes..(col as usize + 1) * bytes];
                if px < 0 || py < 0 || px >= src_w || py >= src_h {
                    dst.fill(0);
                    continue;
                }
                let start = (row as usize * w as usize + col as usize) * src_bytes;
                let src = &pixels[start..start + src_bytes];
                dst[..channels].copy_from_slice(&src[..channels]);
                dst[channels] = if has_alpha { src[channels] } else { 255 };
            }
        }

        let app = CanvasApplication {
            brush_opacity: CanvasApplication::opacity_to_u8(self.options.opacity),
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

impl PaintKernel for CloneTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Clone
    }

    fn paint(&mut self, core: &mut PaintCore, drawable: &mut Drawable, state: PaintState) -> Result<(), PaintError> {
        match state {
            PaintState::Init => self.start_stroke(core),
            PaintState::Motion => self.dab(core, drawable),
            PaintState::Pause | PaintState::Finish => {
                self.marker_visible = false;
                Ok(())
            }
            PaintState::Resume => {
                self.marker_visible = true;
                Ok(())
            }
        }
    }
}
