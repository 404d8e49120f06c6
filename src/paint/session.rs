//! Per-stroke scratch state: the undo shadow, the coverage canvas and the
//! accumulator buffers handed to tool kernels.

use crate::drawable::{Drawable, DrawableId};
use crate::tiles::{read_rect_prefer, TempBuf, TileManager};

/// Bounding box of everything a stroke has composited, in drawable space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl DirtyRect {
    /// Empty rectangle anchored at a point
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x,
            y2: y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x1 == self.x2 || self.y1 == self.y2
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Grow to include the rectangle `(x, y, w, h)`
    pub fn extend(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.x1 = self.x1.min(x);
        self.y1 = self.y1.min(y);
        self.x2 = self.x2.max(x + w);
        self.y2 = self.y2.max(y + h);
    }

    /// Intersection with `0..width × 0..height`
    pub fn clipped(&self, width: i32, height: i32) -> DirtyRect {
        let x1 = self.x1.clamp(0, width);
        let y1 = self.y1.clamp(0, height);
        DirtyRect {
            x1,
            y1,
            x2: self.x2.clamp(x1, width),
            y2: self.y2.clamp(y1, height),
        }
    }
}

/// Scratch state owned by one stroke.
///
/// `undo_tiles` receives each live tile the first time the stroke writes
/// under it, so it always holds pre-stroke content. `canvas_tiles` holds the
/// per-pixel coverage that constant-mode strokes accumulate.
#[derive(Debug)]
pub struct PaintSession {
    drawable: DrawableId,
    undo_tiles: TileManager,
    canvas_tiles: TileManager,
    pub(crate) canvas_buf: TempBuf,
    orig_buf: TempBuf,
    captured: usize,
}

impl PaintSession {
    pub fn new(drawable: &Drawable) -> Self {
        let (w, h) = (drawable.width(), drawable.height());
        Self {
            drawable: drawable.id(),
            undo_tiles: TileManager::new(w, h, drawable.bytes()),
            canvas_tiles: TileManager::new(w, h, 1),
            canvas_buf: TempBuf::default(),
            orig_buf: TempBuf::default(),
            captured: 0,
        }
    }

    /// The drawable this stroke was started on
    pub fn drawable(&self) -> DrawableId {
        self.drawable
    }

    pub fn undo_tiles(&self) -> &TileManager {
        &self.undo_tiles
    }

    pub fn canvas_tiles(&self) -> &TileManager {
        &self.canvas_tiles
    }

    pub(crate) fn canvas_tiles_mut(&mut self) -> &mut TileManager {
        &mut self.canvas_tiles
    }

    pub fn canvas_buf(&self) -> &TempBuf {
        &self.canvas_buf
    }

    /// Tiles captured into the undo shadow so far
    pub fn captured_tiles(&self) -> usize {
        self.captured
    }

    /// Capture every live tile under `(x, y, w, h)` not captured yet.
    ///
    /// Returns the number of tiles newly captured.
    pub fn capture_undo(&mut self, live: &TileManager, x: i32, y: i32, w: i32, h: i32) -> usize {
        let mut newly = 0;
        for chunk in live.chunks(x, y, w, h) {
            if self.undo_tiles.is_valid(chunk.x, chunk.y) {
                continue;
            }
            if let Some(tile) = live.tile(chunk.x, chunk.y) {
                if self.undo_tiles.map_tile(chunk.x, chunk.y, tile.clone()) {
                    newly += 1;
                }
            }
        }
        self.captured += newly;
        newly
    }

    /// Allocate zeroed coverage tiles under `(x, y, w, h)` where missing
    pub fn init_canvas(&mut self, x: i32, y: i32, w: i32, h: i32) {
        for chunk in self.canvas_tiles.chunks(x, y, w, h) {
            if !self.canvas_tiles.is_valid(chunk.x, chunk.y) {
                self.canvas_tiles.tile_mut(chunk.x, chunk.y);
            }
        }
    }

    /// Pre-stroke pixels of `(x, y, w, h)`; outside the drawable reads as zero
    pub fn read_orig(&mut self, live: &TileManager, x: i32, y: i32, w: i32, h: i32) -> &TempBuf {
        self.orig_buf.resize(live.bytes(), x, y, w, h);
        self.orig_buf.data_mut().fill(0);
        read_rect_prefer(Some(&self.undo_tiles), live, x, y, w, h, self.orig_buf.data_mut());
        &self.orig_buf
    }

    /// Pre-stroke pixels as packed rows, for building undo records
    pub fn read_pre_stroke(&self, live: &TileManager, x: i32, y: i32, w: i32, h: i32) -> Vec<u8> {
        let mut out = vec![0; w.max(0) as usize * h.max(0) as usize * live.bytes()];
        read_rect_prefer(Some(&self.undo_tiles), live, x, y, w, h, &mut out);
        out
    }
}
