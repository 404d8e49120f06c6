//! Stroke state shared by every brush tool
//!
//! `PaintCore` owns the stroke coordinates, the active brush reference, the
//! derived mask cache and the per-stroke [`PaintSession`]. Kernels call back
//! into it for the accumulator (`get_paint_area`), the pre-stroke pixels
//! (`get_orig_image`) and compositing (`paste_canvas`, `replace_canvas`).

use std::sync::Arc;

use crate::brush::{
    ActiveBrush, BrushHardness, BrushMaskCache, BrushProvider, MaskBuf, MaskKey, StrokeCoords,
    StrokeInterpolator,
};
use crate::core::contracts::{validate_position, validate_scale};
use crate::core::{PaintConfig, PaintError};
use crate::display::DisplaySink;
use crate::drawable::Drawable;
use crate::tiles::TempBuf;
use crate::tools::ToolKind;
use crate::undo::{ImagePatch, PaintUndo, UndoKind, UndoStack};

use super::compositor;
use super::session::{DirtyRect, PaintSession};
use super::{ApplicationMode, BlendMode, CanvasApplication, PaintKernel, PaintState};

pub struct PaintCore {
    provider: Arc<dyn BrushProvider>,
    display: Arc<dyn DisplaySink>,
    config: PaintConfig,

    /// Where the stroke (or the shift-line) started
    pub start: StrokeCoords,
    /// End of the previously interpolated segment
    pub last: StrokeCoords,
    /// Current dab position
    pub cur: StrokeCoords,

    distance: f64,
    spacing: f64,
    dirty: DirtyRect,

    brush: Option<ActiveBrush>,
    cache: BrushMaskCache,
    session: Option<PaintSession>,
}

impl std::fmt::Debug for PaintCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaintCore")
            .field("start", &self.start)
            .field("last", &self.last)
            .field("cur", &self.cur)
            .field("distance", &self.distance)
            .field("spacing", &self.spacing)
            .field("dirty", &self.dirty)
            .field("brush", &self.brush.as_ref().map(|b| b.brush.name.as_str()))
            .field("session", &self.session.is_some())
            .finish()
    }
}

impl PaintCore {
    pub fn new(provider: Arc<dyn BrushProvider>, display: Arc<dyn DisplaySink>, config: PaintConfig) -> Self {
        Self {
            provider,
            display,
            config,
            start: StrokeCoords::default(),
            last: StrokeCoords::default(),
            cur: StrokeCoords::default(),
            distance: 0.0,
            spacing: 1.0,
            dirty: DirtyRect::default(),
            brush: None,
            cache: BrushMaskCache::new(),
            session: None,
        }
    }

    pub fn config(&self) -> &PaintConfig {
        &self.config
    }

    /// Arc length of the stroke so far
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Dab spacing chosen at init
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn dirty(&self) -> DirtyRect {
        self.dirty
    }

    pub fn session(&self) -> Option<&PaintSession> {
        self.session.as_ref()
    }

    /// Brush captured for the current stroke
    pub fn brush(&self) -> Option<&ActiveBrush> {
        self.brush.as_ref()
    }

    pub fn mask_cache(&self) -> &BrushMaskCache {
        &self.cache
    }

    /// Begin a stroke at `(x, y)`.
    ///
    /// Fails with [`PaintError::NoBrush`] before allocating anything when no
    /// brush is active.
    pub fn init(&mut self, drawable: &Drawable, x: f64, y: f64) -> Result<(), PaintError> {
        validate_position(x, y)?;

        let brush = self.provider.active_brush().ok_or_else(|| {
            tracing::warn!("No brushes available for use with this tool");
            PaintError::NoBrush
        })?;

        let coords = StrokeCoords::new(x, y, self.config.default_pressure);
        self.start = coords;
        self.last = coords;
        self.cur = coords;

        self.spacing = StrokeInterpolator::new(brush.brush.dab_spacing()).spacing();

        if self.session.is_some() {
            tracing::debug!("Replacing unfinished paint session");
        }
        self.session = Some(PaintSession::new(drawable));
        tracing::debug!(
            "Paint session started on {}x{} drawable with brush {} (spacing {:.2})",
            drawable.width(),
            drawable.height(),
            brush.brush.name,
            self.spacing
        );

        self.brush = Some(brush);
        self.dirty = DirtyRect::at(x as i32, y as i32);
        self.distance = 0.0;
        Ok(())
    }

    /// Emit evenly spaced dabs from `last` to `cur`, calling the kernel's
    /// `Motion` handler once per dab. Returns the dab count.
    pub fn interpolate(&mut self, drawable: &mut Drawable, kernel: &mut dyn PaintKernel) -> Result<usize, PaintError> {
        validate_position(self.cur.x, self.cur.y)?;

        let target = self.cur;
        let mut walk = StrokeInterpolator::new(self.spacing).walk(self.distance, &self.last, &target);

        let mut count = 0;
        for dab in walk.by_ref() {
            self.cur = dab.coords;
            self.distance = dab.distance;
            kernel.paint(self, drawable, PaintState::Motion)?;
            count += 1;
        }

        self.cur = target;
        self.distance = walk.distance();
        Ok(count)
    }

    /// The accumulator sized for a dab of the unscaled brush at `cur`
    pub fn get_paint_area(&mut self, drawable: &Drawable) -> Option<&mut TempBuf> {
        self.get_paint_area_with_scale(drawable, 1.0)
    }

    /// The accumulator sized for a dab of the brush scaled by `scale` at `cur`.
    ///
    /// It carries the drawable's channels plus alpha. `None` when the dab
    /// lies entirely outside the drawable or no stroke is active.
    pub fn get_paint_area_with_scale(&mut self, drawable: &Drawable, scale: f64) -> Option<&mut TempBuf> {
        if let Err(e) = validate_scale(scale) {
            tracing::warn!("get_paint_area: {}", e);
            return None;
        }

        let brush = self.brush.as_ref()?;
        let source = brush.brush.mask.clone();
        let key = MaskKey::new(brush.generation, &source);
        let (_, mask) = self.cache.scaled_mask(key, &source, scale)?;
        let (bw, bh) = (mask.width(), mask.height());

        let bytes = drawable.bytes() + usize::from(!drawable.has_alpha());
        let x = self.cur.x as i32 - (bw >> 1);
        let y = self.cur.y as i32 - (bh >> 1);
        let (dw, dh) = (drawable.width(), drawable.height());

        let x1 = (x - 1).clamp(0, dw);
        let y1 = (y - 1).clamp(0, dh);
        let x2 = (x + bw + 1).clamp(0, dw);
        let y2 = (y + bh + 1).clamp(0, dh);

        if x2 - x1 == 0 || y2 - y1 == 0 {
            return None;
        }

        let session = self.session.as_mut()?;
        session.canvas_buf.resize(bytes, x1, y1, x2 - x1, y2 - y1);
        Some(&mut session.canvas_buf)
    }

    /// Pre-stroke pixels of `(x1, y1)..(x2, y2)`.
    ///
    /// Tiles already written by this stroke come from the undo shadow,
    /// everything else from the drawable. Outside the drawable reads as zero.
    pub fn get_orig_image(&mut self, drawable: &Drawable, x1: i32, y1: i32, x2: i32, y2: i32) -> Option<&TempBuf> {
        let session = self.session.as_mut()?;
        Some(session.read_orig(drawable.tiles(), x1, y1, x2 - x1, y2 - y1))
    }

    /// Derived brush mask for a dab at `cur`
    pub fn brush_mask(&mut self, hardness: BrushHardness, scale: f64) -> Option<Arc<MaskBuf>> {
        let brush = self.brush.as_ref()?;
        let source = brush.brush.mask.clone();
        let key = MaskKey::new(brush.generation, &source);
        let (key, mask) = self.cache.scaled_mask(key, &source, scale)?;

        let derived = match hardness {
            BrushHardness::Soft => self.cache.soft_mask(key, &mask, self.cur.x, self.cur.y),
            BrushHardness::Hard => self.cache.hard_mask(key, &mask),
            BrushHardness::Pressure => {
                self.cache
                    .pressure_mask(key, &mask, self.cur.x, self.cur.y, self.cur.pressure)
            }
        };
        Some(derived)
    }

    /// Composite the accumulator into the drawable through the brush mask
    pub fn paste_canvas(&mut self, drawable: &mut Drawable, app: &CanvasApplication) -> Result<(), PaintError> {
        self.apply_canvas(drawable, app, false)
    }

    /// Interpolate drawable pixels toward the accumulator through the brush
    /// mask. Only valid in incremental mode; drawables without alpha fall
    /// back to a normal paste.
    pub fn replace_canvas(&mut self, drawable: &mut Drawable, app: &CanvasApplication) -> Result<(), PaintError> {
        if !drawable.has_alpha() {
            let fallback = CanvasApplication {
                paint_mode: BlendMode::Normal,
                ..*app
            };
            return self.apply_canvas(drawable, &fallback, false);
        }
        if app.mode == ApplicationMode::Constant {
            tracing::warn!("{}", PaintError::InvalidApplicationMode);
            return Err(PaintError::InvalidApplicationMode);
        }
        self.apply_canvas(drawable, app, true)
    }

    fn apply_canvas(&mut self, drawable: &mut Drawable, app: &CanvasApplication, replace: bool) -> Result<(), PaintError> {
        let Some(image) = drawable.image() else {
            return Ok(());
        };
        match self.session.as_ref() {
            None => return Ok(()),
            Some(session) if session.drawable() != drawable.id() => {
                return Err(PaintError::InvalidInput(
                    "Stroke was started on a different drawable".to_string(),
                ));
            }
            Some(session) if session.canvas_buf().is_empty() => return Ok(()),
            Some(_) => {}
        }

        let Some(mask) = self.brush_mask(app.hardness, app.scale) else {
            return Ok(());
        };
        let mask_x = self.cur.x as i32 - (mask.width() >> 1);
        let mask_y = self.cur.y as i32 - (mask.height() >> 1);
        let threshold = self.config.parallel_threshold;

        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if replace {
            compositor::replace(session, drawable, &mask, mask_x, mask_y, app, threshold);
        } else {
            compositor::paste(session, drawable, &mask, mask_x, mask_y, app, threshold);
        }

        let buf = session.canvas_buf();
        let (x, y, w, h) = (buf.x, buf.y, buf.width(), buf.height());
        self.dirty.extend(x, y, w, h);

        let (offset_x, offset_y) = drawable.offsets();
        self.display.update_area(image, x + offset_x, y + offset_y, w, h);
        Ok(())
    }

    /// End the stroke: push its undo group and release the session.
    ///
    /// Returns whether an undo group was pushed. Nothing is pushed when the
    /// drawable has no image or the stroke touched no pixels.
    pub fn finish(&mut self, drawable: &mut Drawable, tool: ToolKind, undo: &mut dyn UndoStack) -> Result<bool, PaintError> {
        let result = self.push_undo(drawable, tool, undo);
        self.cleanup();
        result
    }

    fn push_undo(&mut self, drawable: &mut Drawable, tool: ToolKind, undo: &mut dyn UndoStack) -> Result<bool, PaintError> {
        if drawable.image().is_none() || self.dirty.is_empty() {
            return Ok(false);
        }
        let Some(session) = self.session.as_ref() else {
            return Ok(false);
        };

        let rect = self.dirty.clipped(drawable.width(), drawable.height());
        if rect.is_empty() {
            return Ok(false);
        }

        let (w, h) = (rect.width(), rect.height());
        let pixels = session.read_pre_stroke(drawable.tiles(), rect.x1, rect.y1, w, h);
        let patch = ImagePatch::new(
            drawable.id(),
            rect.x1,
            rect.y1,
            w,
            h,
            drawable.bytes(),
            pixels,
            self.config.compress_undo,
        )?;

        undo.push_group_start(UndoKind::PaintCore)?;
        let recorded = undo
            .push_paint(PaintUndo {
                tool,
                start: self.start,
            })
            .and_then(|()| undo.push_image(patch));
        if let Err(e) = recorded {
            tracing::warn!("Stroke undo not recorded: {}", e);
            undo.discard_group();
            return Err(e);
        }
        undo.push_group_end()?;

        drawable.invalidate_preview();
        tracing::info!(
            "Pushed {:?} stroke undo ({}x{} at {},{}; {} tiles captured)",
            tool,
            w,
            h,
            rect.x1,
            rect.y1,
            session.captured_tiles()
        );
        Ok(true)
    }

    /// Drop the session and the brush reference
    pub fn cleanup(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("Paint session released");
        }
        self.brush = None;
    }

    /// Whether a stroke is in progress
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }
}
