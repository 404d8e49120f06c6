//! Undo stack contract and an in-memory history
//!
//! A finished stroke pushes one group: a paint record (which tool, where the
//! stroke started) followed by an image patch holding the pre-stroke pixels
//! of the dirty rectangle. Undo and redo swap the patch with the drawable.

use std::collections::VecDeque;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};

use crate::brush::StrokeCoords;
use crate::core::{PaintConfig, PaintError};
use crate::drawable::{Drawable, DrawableId};
use crate::tools::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UndoKind {
    /// A complete brush stroke
    PaintCore,
    /// A lone image patch pushed outside any group
    Image,
}

/// Tool-level record of a stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaintUndo {
    pub tool: ToolKind,
    pub start: StrokeCoords,
}

#[derive(Debug, Clone)]
enum PatchData {
    Raw(Vec<u8>),
    Lz4(Vec<u8>),
}

/// Saved pixels of a drawable rectangle
#[derive(Debug, Clone)]
pub struct ImagePatch {
    drawable: DrawableId,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    bytes: usize,
    data: PatchData,
}

impl ImagePatch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        drawable: DrawableId,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        bytes: usize,
        pixels: Vec<u8>,
        compress: bool,
    ) -> Result<Self, PaintError> {
        let expected = width.max(0) as usize * height.max(0) as usize * bytes;
        if pixels.len() != expected {
            return Err(PaintError::Undo(format!(
                "Patch of {} bytes does not match {}x{}x{}",
                pixels.len(),
                width,
                height,
                bytes
            )));
        }

        Ok(Self {
            drawable,
            x,
            y,
            width,
            height,
            bytes,
            data: Self::pack(pixels, compress),
        })
    }

    fn pack(pixels: Vec<u8>, compress: bool) -> PatchData {
        if !compress {
            return PatchData::Raw(pixels);
        }
        let compressed = compress_prepend_size(&pixels);
        tracing::debug!(
            "Undo patch: {} -> {} bytes ({:.1}% of original)",
            pixels.len(),
            compressed.len(),
            compressed.len() as f64 / pixels.len().max(1) as f64 * 100.0
        );
        PatchData::Lz4(compressed)
    }

    pub fn drawable(&self) -> DrawableId {
        self.drawable
    }

    /// `(x, y, width, height)` in drawable space
    pub fn rect(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.width, self.height)
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.data, PatchData::Lz4(_))
    }

    /// Bytes held in memory
    pub fn stored_size(&self) -> usize {
        match &self.data {
            PatchData::Raw(d) | PatchData::Lz4(d) => d.len(),
        }
    }

    /// Decoded pixels as packed rows
    pub fn pixels(&self) -> Result<Vec<u8>, PaintError> {
        match &self.data {
            PatchData::Raw(d) => Ok(d.clone()),
            PatchData::Lz4(d) => decompress_size_prepended(d)
                .map_err(|e| PaintError::Undo(format!("Failed to decompress patch: {}", e))),
        }
    }

    /// Exchange the stored pixels with the drawable's current content
    pub fn swap(&mut self, drawable: &mut Drawable) -> Result<(), PaintError> {
        if drawable.id() != self.drawable {
            return Err(PaintError::Undo(format!(
                "Patch belongs to drawable {:?}, not {:?}",
                self.drawable,
                drawable.id()
            )));
        }
        if drawable.bytes() != self.bytes {
            return Err(PaintError::Undo("Drawable depth changed since the patch was taken".to_string()));
        }

        let stored = self.pixels()?;
        let current = drawable.read_rect(self.x, self.y, self.width, self.height);
        drawable
            .tiles_mut()
            .write_rect(self.x, self.y, self.width, self.height, &stored);
        drawable.invalidate_preview();

        let compress = self.is_compressed();
        self.data = Self::pack(current, compress);
        Ok(())
    }
}

/// Where the paint core records finished strokes
pub trait UndoStack {
    fn push_group_start(&mut self, kind: UndoKind) -> Result<(), PaintError>;
    fn push_group_end(&mut self) -> Result<(), PaintError>;
    fn push_paint(&mut self, paint: PaintUndo) -> Result<(), PaintError>;
    fn push_image(&mut self, patch: ImagePatch) -> Result<(), PaintError>;

    /// Drop an open group without recording it. Stacks that cannot abandon a
    /// group close it instead.
    fn discard_group(&mut self) {
        if let Err(e) = self.push_group_end() {
            tracing::warn!("Failed to close undo group: {}", e);
        }
    }
}

#[derive(Debug, Clone)]
pub struct UndoGroup {
    pub kind: UndoKind,
    pub paint: Option<PaintUndo>,
    pub patches: Vec<ImagePatch>,
}

impl UndoGroup {
    fn new(kind: UndoKind) -> Self {
        Self {
            kind,
            paint: None,
            patches: Vec::new(),
        }
    }
}

/// Bounded undo/redo history
#[derive(Debug)]
pub struct UndoHistory {
    levels: usize,
    undo: VecDeque<UndoGroup>,
    redo: Vec<UndoGroup>,
    open: Option<UndoGroup>,
}

impl UndoHistory {
    pub fn new(config: &PaintConfig) -> Self {
        Self::with_levels(config.undo_levels)
    }

    pub fn with_levels(levels: usize) -> Self {
        Self {
            levels: levels.max(1),
            undo: VecDeque::new(),
            redo: Vec::new(),
            open: None,
        }
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Most recent undoable group
    pub fn last(&self) -> Option<&UndoGroup> {
        self.undo.back()
    }

    fn commit(&mut self, group: UndoGroup) {
        self.undo.push_back(group);
        self.redo.clear();
        while self.undo.len() > self.levels {
            self.undo.pop_front();
            tracing::debug!("Undo history full, dropped oldest group");
        }
    }

    /// Revert the most recent group. Returns false when there is nothing to undo.
    pub fn undo(&mut self, drawable: &mut Drawable) -> Result<bool, PaintError> {
        let Some(mut group) = self.undo.pop_back() else {
            return Ok(false);
        };
        let swapped = group.patches.iter_mut().rev().try_for_each(|p| p.swap(drawable));
        if let Err(e) = swapped {
            self.undo.push_back(group);
            return Err(e);
        }
        self.redo.push(group);
        Ok(true)
    }

    /// Re-apply the most recently undone group
    pub fn redo(&mut self, drawable: &mut Drawable) -> Result<bool, PaintError> {
        let Some(mut group) = self.redo.pop() else {
            return Ok(false);
        };
        let swapped = group.patches.iter_mut().try_for_each(|p| p.swap(drawable));
        if let Err(e) = swapped {
            self.redo.push(group);
            return Err(e);
        }
        self.undo.push_back(group);
        Ok(true)
    }
}

impl UndoStack for UndoHistory {
    fn push_group_start(&mut self, kind: UndoKind) -> Result<(), PaintError> {
        if self.open.is_some() {
            return Err(PaintError::Undo("Undo group already open".to_string()));
        }
        self.open = Some(UndoGroup::new(kind));
        Ok(())
    }

    fn push_group_end(&mut self) -> Result<(), PaintError> {
        let group = self
            .open
            .take()
            .ok_or_else(|| PaintError::Undo("No undo group open".to_string()))?;
        self.commit(group);
        Ok(())
    }

    fn push_paint(&mut self, paint: PaintUndo) -> Result<(), PaintError> {
        let group = self
            .open
            .as_mut()
            .ok_or_else(|| PaintError::Undo("Paint record outside an undo group".to_string()))?;
        group.paint = Some(paint);
        Ok(())
    }

    fn push_image(&mut self, patch: ImagePatch) -> Result<(), PaintError> {
        match self.open.as_mut() {
            Some(group) => group.patches.push(patch),
            None => {
                let mut group = UndoGroup::new(UndoKind::Image);
                group.patches.push(patch);
                self.commit(group);
            }
        }
        Ok(())
    }

    fn discard_group(&mut self) {
        if self.open.take().is_some() {
            tracing::debug!("Discarded incomplete undo group");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::drawable::{ImageId, PixelFormat};

    fn gray(value: u8) -> Drawable {
        Drawable::new(Some(ImageId(1)), 4, 4, PixelFormat::Gray, [value, value, value, 255])
    }

    #[test]
    fn patch_rejects_wrong_length() {
        let d = gray(0);
        assert!(ImagePatch::new(d.id(), 0, 0, 2, 2, 1, vec![0; 3], false).is_err());
    }

    #[test]
    fn compressed_patch_round_trips() {
        let d = gray(0);
        let patch = ImagePatch::new(d.id(), 0, 0, 4, 4, 1, vec![7; 16], true).unwrap();
        assert!(patch.is_compressed());
        assert_eq!(patch.pixels().unwrap(), vec![7; 16]);
    }

    #[test]
    fn undo_and_redo_swap_pixels() {
        let mut d = gray(0);
        let mut history = UndoHistory::with_levels(8);

        let before = d.read_rect(1, 1, 2, 2);
        d.tiles_mut().write_rect(1, 1, 2, 2, &[9; 4]);

        history.push_group_start(UndoKind::PaintCore).unwrap();
        history
            .push_paint(PaintUndo {
                tool: ToolKind::Paintbrush,
                start: StrokeCoords::new(1.0, 1.0, 0.5),
            })
            .unwrap();
        history
            .push_image(ImagePatch::new(d.id(), 1, 1, 2, 2, 1, before, true).unwrap())
            .unwrap();
        history.push_group_end().unwrap();
        assert_eq!(history.len(), 1);

        assert!(history.undo(&mut d).unwrap());
        assert_eq!(d.read_rect(1, 1, 2, 2), vec![0; 4]);
        assert!(history.can_redo());

        assert!(history.redo(&mut d).unwrap());
        assert_eq!(d.read_rect(1, 1, 2, 2), vec![9; 4]);
        assert!(!history.redo(&mut d).unwrap());
    }

    #[test]
    fn patch_for_other_drawable_is_rejected() {
        let a = gray(0);
        let mut b = gray(0);
        let mut history = UndoHistory::with_levels(8);
        history
            .push_image(ImagePatch::new(a.id(), 0, 0, 1, 1, 1, vec![1], false).unwrap())
            .unwrap();

        assert!(history.undo(&mut b).is_err());
        // the group stays available for the right drawable
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let d = gray(0);
        let mut history = UndoHistory::with_levels(2);
        for _ in 0..3 {
            history
                .push_image(ImagePatch::new(d.id(), 0, 0, 1, 1, 1, vec![0], false).unwrap())
                .unwrap();
        }
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn group_protocol_errors() {
        let mut history = UndoHistory::with_levels(2);
        assert!(history.push_group_end().is_err());
        assert!(history
            .push_paint(PaintUndo {
                tool: ToolKind::Eraser,
                start: StrokeCoords::default(),
            })
            .is_err());
        history.push_group_start(UndoKind::PaintCore).unwrap();
        assert!(history.push_group_start(UndoKind::PaintCore).is_err());

        // a discarded group records nothing and frees the slot
        history.discard_group();
        assert!(history.is_empty());
        history.push_group_start(UndoKind::PaintCore).unwrap();
        history.push_group_end().unwrap();
        assert_eq!(history.len(), 1);
    }
}
