//! Brush module - brush masks, the active-brush provider and derived mask caches

pub mod cache;
pub mod interpolation;
mod scale;

pub use cache::{BrushMaskCache, MaskKey};
pub use interpolation::{Dab, StrokeCoords, StrokeInterpolator, Walk};

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::PaintError;

/// A single-channel coverage mask (0 = transparent, 255 = full coverage)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskBuf {
    width: i32,
    height: i32,
    data: Vec<u8>,
}

impl MaskBuf {
    /// Zero-filled mask
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn from_data(width: i32, height: i32, data: Vec<u8>) -> Result<Self, PaintError> {
        if width <= 0 || height <= 0 || data.len() != width as usize * height as usize {
            return Err(PaintError::InvalidInput(format!(
                "Mask data of {} bytes does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Square mask with every pixel set to `value`
    pub fn square(size: i32, value: u8) -> Self {
        let mut mask = Self::new(size, size);
        mask.data.fill(value);
        mask
    }

    /// Anti-aliased disc of the given diameter
    pub fn disc(diameter: i32) -> Self {
        let mut mask = Self::new(diameter, diameter);
        let r = diameter as f64 / 2.0;
        for y in 0..mask.height {
            for x in 0..mask.width {
                let dx = x as f64 + 0.5 - r;
                let dy = y as f64 + 0.5 - r;
                let d = (dx * dx + dy * dy).sqrt();
                let coverage = (r - d + 0.5).clamp(0.0, 1.0);
                mask.data[(y * mask.width + x) as usize] = (coverage * 255.0).round() as u8;
            }
        }
        mask
    }

    /// Convert a grayscale image to a mask. Dark pixels paint.
    pub fn from_gray_image(img: &image::GrayImage) -> Result<Self, PaintError> {
        let data = img.pixels().map(|p| 255 - p.0[0]).collect();
        Self::from_data(img.width() as i32, img.height() as i32, data)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return 0;
        }
        self.data[(y * self.width + x) as usize]
    }
}

/// A named brush: shape mask plus dab spacing in percent of its size
#[derive(Debug, Clone)]
pub struct Brush {
    pub name: String,
    pub mask: Arc<MaskBuf>,
    pub spacing: u32,
}

impl Brush {
    pub fn new(name: impl Into<String>, mask: MaskBuf, spacing: u32) -> Self {
        Self {
            name: name.into(),
            mask: Arc::new(mask),
            spacing,
        }
    }

    /// Load a brush tip from a grayscale-convertible image file
    pub fn open(path: &Path, spacing: u32) -> Result<Self, PaintError> {
        let img = image::open(path)?.to_luma8();
        let mask = MaskBuf::from_gray_image(&img)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string());
        tracing::debug!("Loaded brush {} ({}x{})", name, mask.width(), mask.height());
        Ok(Self::new(name, mask, spacing))
    }

    /// Dab interval for this brush: `max(1, diagonal * spacing%)`
    pub fn dab_spacing(&self) -> f64 {
        let diagonal = (self.mask.width() as f64).hypot(self.mask.height() as f64);
        (diagonal * self.spacing as f64 / 100.0).max(1.0)
    }
}

/// How the brush mask is derived for a dab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrushHardness {
    /// Sub-pixel positioned, anti-aliased
    #[default]
    Soft,
    /// Binary, position independent
    Hard,
    /// Soft mask rescaled by pen pressure
    Pressure,
}

/// The active brush together with the generation it was read at
#[derive(Debug, Clone)]
pub struct ActiveBrush {
    pub brush: Arc<Brush>,
    pub generation: u64,
}

/// Source of the brush a stroke paints with
pub trait BrushProvider: Send + Sync {
    fn active_brush(&self) -> Option<ActiveBrush>;
}

#[derive(Debug, Default)]
struct SelectionState {
    brushes: IndexMap<String, Arc<Brush>>,
    active: Option<String>,
    generation: u64,
}

/// Brush registry shared between the brush chooser and paint tools.
///
/// The generation counter moves whenever what `active_brush` would return
/// changes, so derived-mask caches can be keyed by it.
#[derive(Debug, Default)]
pub struct BrushSelection {
    state: RwLock<SelectionState>,
}

impl BrushSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a brush. The first brush added becomes active.
    pub fn insert(&self, brush: Brush) {
        let mut state = self.state.write();
        let name = brush.name.clone();
        let replaced = state.brushes.insert(name.clone(), Arc::new(brush)).is_some();
        if state.active.is_none() {
            state.active = Some(name);
            state.generation += 1;
        } else if replaced && state.active.as_deref() == Some(name.as_str()) {
            state.generation += 1;
        }
    }

    /// Make a brush active; returns false if no brush has that name
    pub fn select(&self, name: &str) -> bool {
        let mut state = self.state.write();
        if !state.brushes.contains_key(name) {
            tracing::warn!("Brush {} not found", name);
            return false;
        }
        if state.active.as_deref() != Some(name) {
            state.active = Some(name.to_string());
            state.generation += 1;
        }
        true
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Brush>> {
        let mut state = self.state.write();
        let removed = state.brushes.shift_remove(name)?;
        if state.active.as_deref() == Some(name) {
            state.active = state.brushes.keys().next().cloned();
            state.generation += 1;
        }
        Some(removed)
    }

    /// Signal that a brush was edited in place
    pub fn mark_dirty(&self, name: &str) {
        let mut state = self.state.write();
        if state.active.as_deref() == Some(name) {
            state.generation += 1;
            tracing::debug!("Active brush {} dirty, generation {}", name, state.generation);
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.state.read().brushes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().brushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().brushes.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }
}

impl BrushProvider for BrushSelection {
    fn active_brush(&self) -> Option<ActiveBrush> {
        let state = self.state.read();
        let name = state.active.as_ref()?;
        let brush = state.brushes.get(name)?.clone();
        Some(ActiveBrush {
            brush,
            generation: state.generation,
        })
    }
}
