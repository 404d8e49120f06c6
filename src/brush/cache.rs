//! Derived brush mask cache
//!
//! The active brush mask is never modified. Every dab asks this cache for a
//! variant of it:
//!
//! - **soft**: the mask convolved with one of 25 sub-pixel phase kernels so
//!   the dab tracks the fractional stroke position. All 25 phases are kept.
//! - **hard**: binary version, position independent, one entry.
//! - **pressure**: soft mask with a pressure-dependent intensity curve.
//! - **scaled**: resampled mask for pressure-scaled dabs.
//!
//! Soft and hard variants are `(w + 2) × (h + 2)`: a one pixel halo so the
//! compositor can treat them uniformly. Entries are keyed by [`MaskKey`];
//! a different key drops every soft phase at once.

use std::sync::Arc;

use super::scale::{scale_mask, scaled_size};
use super::MaskBuf;

const KERNEL_WIDTH: usize = 3;
const KERNEL_HEIGHT: usize = 3;
const PHASES: usize = 5;

const OPAQUE: u8 = 255;
const TRANSPARENT: u8 = 0;

/// Sub-pixel subsampling kernels, indexed `[y phase][x phase]`; weights sum to 256
static SUBSAMPLE: [[[u32; 9]; PHASES]; PHASES] = [
    [
        [64, 64, 0, 64, 64, 0, 0, 0, 0],
        [32, 96, 0, 32, 96, 0, 0, 0, 0],
        [0, 128, 0, 0, 128, 0, 0, 0, 0],
        [0, 96, 32, 0, 96, 32, 0, 0, 0],
        [0, 64, 64, 0, 64, 64, 0, 0, 0],
    ],
    [
        [32, 32, 0, 96, 96, 0, 0, 0, 0],
        [16, 48, 0, 48, 144, 0, 0, 0, 0],
        [0, 64, 0, 0, 192, 0, 0, 0, 0],
        [0, 48, 16, 0, 144, 48, 0, 0, 0],
        [0, 32, 32, 0, 96, 96, 0, 0, 0],
    ],
    [
        [0, 0, 0, 128, 128, 0, 0, 0, 0],
        [0, 0, 0, 64, 192, 0, 0, 0, 0],
        [0, 0, 0, 0, 256, 0, 0, 0, 0],
        [0, 0, 0, 0, 192, 64, 0, 0, 0],
        [0, 0, 0, 0, 128, 128, 0, 0, 0],
    ],
    [
        [0, 0, 0, 96, 96, 0, 32, 32, 0],
        [0, 0, 0, 48, 144, 0, 16, 48, 0],
        [0, 0, 0, 0, 192, 0, 0, 64, 0],
        [0, 0, 0, 0, 144, 48, 0, 48, 16],
        [0, 0, 0, 0, 96, 96, 0, 32, 32],
    ],
    [
        [0, 0, 0, 64, 64, 0, 64, 64, 0],
        [0, 0, 0, 32, 96, 0, 32, 96, 0],
        [0, 0, 0, 0, 128, 0, 0, 128, 0],
        [0, 0, 0, 0, 96, 32, 0, 96, 32],
        [0, 0, 0, 0, 64, 64, 0, 64, 64],
    ],
];

/// Identity of a mask as far as derived variants are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskKey {
    /// Brush generation the mask was read at
    pub generation: u64,
    pub width: i32,
    pub height: i32,
}

impl MaskKey {
    pub fn new(generation: u64, mask: &MaskBuf) -> Self {
        Self {
            generation,
            width: mask.width(),
            height: mask.height(),
        }
    }
}

/// Phase bucket for one axis of a dab centre
pub fn phase_index(pos: f64, extent: i32) -> usize {
    let pos = if pos < 0.0 { pos + extent as f64 } else { pos };
    let left = pos - pos.floor() + 0.125;
    ((left * 4.0) as usize).min(PHASES - 1)
}

#[derive(Debug, Default)]
pub struct BrushMaskCache {
    soft_key: Option<MaskKey>,
    kernel_masks: [[Option<Arc<MaskBuf>>; PHASES]; PHASES],
    solid: Option<(MaskKey, Arc<MaskBuf>)>,
    pressure: Option<Arc<MaskBuf>>,
    scaled: Option<(MaskKey, Arc<MaskBuf>)>,
    soft_builds: usize,
}

impl BrushMaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sub-pixel positioned mask for a dab centred at `(x, y)`
    pub fn soft_mask(&mut self, key: MaskKey, mask: &MaskBuf, x: f64, y: f64) -> Arc<MaskBuf> {
        let index1 = phase_index(x, mask.width());
        let index2 = phase_index(y, mask.height());

        if self.soft_key != Some(key) {
            if self.soft_key.is_some() {
                tracing::debug!(
                    "Brush mask changed ({:?} -> {:?}), dropping soft mask phases",
                    self.soft_key,
                    key
                );
            }
            self.kernel_masks = Default::default();
            self.soft_key = Some(key);
        }

        if let Some(cached) = &self.kernel_masks[index2][index1] {
            return cached.clone();
        }

        let built = Arc::new(subsample(mask, &SUBSAMPLE[index2][index1]));
        self.soft_builds += 1;
        self.kernel_masks[index2][index1] = Some(built.clone());
        built
    }

    /// Binary mask: any coverage becomes opaque
    pub fn hard_mask(&mut self, key: MaskKey, mask: &MaskBuf) -> Arc<MaskBuf> {
        if let Some((cached_key, cached)) = &self.solid {
            if *cached_key == key {
                return cached.clone();
            }
        }

        let built = Arc::new(solidify(mask));
        self.solid = Some((key, built.clone()));
        built
    }

    /// Soft mask with intensities remapped by pen pressure (0.5 is neutral)
    pub fn pressure_mask(
        &mut self,
        key: MaskKey,
        mask: &MaskBuf,
        x: f64,
        y: f64,
        pressure: f64,
    ) -> Arc<MaskBuf> {
        let soft = self.soft_mask(key, mask, x, y);

        if (pressure * 100.0 + 0.5) as i32 == 50 {
            return soft;
        }

        let mut map = [0u8; 256];
        for (i, v) in map.iter_mut().enumerate() {
            *v = ((pressure / 0.5) * i as f64).min(255.0) as u8;
        }

        // reuse the previous buffer unless a caller still holds it
        let mut buffer = self
            .pressure
            .take()
            .filter(|b| b.width() == soft.width() && b.height() == soft.height())
            .unwrap_or_else(|| Arc::new(MaskBuf::new(soft.width(), soft.height())));

        let dest = Arc::make_mut(&mut buffer);
        for (d, s) in dest.data_mut().iter_mut().zip(soft.data()) {
            *d = map[*s as usize];
        }

        self.pressure = Some(buffer.clone());
        buffer
    }

    /// The brush resampled for `scale` (area factor).
    ///
    /// Returns the key describing the result so soft/hard lookups can chain
    /// from it. A zero scale yields nothing; a scale of one is the source.
    pub fn scaled_mask(
        &mut self,
        key: MaskKey,
        mask: &Arc<MaskBuf>,
        scale: f64,
    ) -> Option<(MaskKey, Arc<MaskBuf>)> {
        if scale == 0.0 {
            return None;
        }
        if scale == 1.0 {
            return Some((key, mask.clone()));
        }

        let (width, height) = scaled_size(mask.width(), mask.height(), scale);
        let scaled_key = MaskKey {
            generation: key.generation,
            width,
            height,
        };

        if let Some((cached_key, cached)) = &self.scaled {
            if *cached_key == scaled_key {
                return Some((scaled_key, cached.clone()));
            }
        }

        let built = Arc::new(scale_mask(mask, width, height));
        self.scaled = Some((scaled_key, built.clone()));
        Some((scaled_key, built))
    }

    /// Number of soft phases currently held
    pub fn cached_phases(&self) -> usize {
        self.kernel_masks
            .iter()
            .flatten()
            .filter(|m| m.is_some())
            .count()
    }

    /// Total soft masks rendered since creation
    pub fn soft_builds(&self) -> usize {
        self.soft_builds
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn subsample(mask: &MaskBuf, kernel: &[u32; 9]) -> MaskBuf {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let dest_width = w + 2;
    let mut dest = MaskBuf::new(dest_width as i32, (h + 2) as i32);
    let data = dest.data_mut();
    let src = mask.data();

    for i in 0..h {
        for j in 0..w {
            let m = src[i * w + j] as u32;
            if m == 0 {
                continue;
            }
            for r in 0..KERNEL_HEIGHT {
                let row = (i + r) * dest_width + j;
                for s in 0..KERNEL_WIDTH {
                    let d = &mut data[row + s];
                    let new_val = *d as u32 + ((m * kernel[r * KERNEL_WIDTH + s]) >> 8);
                    *d = new_val.min(255) as u8;
                }
            }
        }
    }

    dest
}

fn solidify(mask: &MaskBuf) -> MaskBuf {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let dest_width = w + 2;
    let mut dest = MaskBuf::new(dest_width as i32, (h + 2) as i32);
    let data = dest.data_mut();
    let src = mask.data();

    for i in 0..h {
        for j in 0..w {
            data[(i + 1) * dest_width + j + 1] = if src[i * w + j] != 0 {
                OPAQUE
            } else {
                TRANSPARENT
            };
        }
    }

    dest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(generation: u64, mask: &MaskBuf) -> MaskKey {
        MaskKey::new(generation, mask)
    }

    #[test]
    fn kernels_sum_to_256() {
        for row in SUBSAMPLE.iter() {
            for kernel in row.iter() {
                assert_eq!(kernel.iter().sum::<u32>(), 256);
            }
        }
    }

    #[test]
    fn phase_index_buckets() {
        assert_eq!(phase_index(10.0, 5), 0);
        assert_eq!(phase_index(10.2, 5), 1);
        assert_eq!(phase_index(10.5, 5), 2);
        assert_eq!(phase_index(10.7, 5), 3);
        assert_eq!(phase_index(10.95, 5), 4);
        // negative positions are wrapped before taking the fraction
        assert_eq!(phase_index(-0.5, 5), phase_index(4.5, 5));
    }

    #[test]
    fn soft_mask_has_halo_and_centered_phase_is_identity() {
        let mask = MaskBuf::square(3, 200);
        let mut cache = BrushMaskCache::new();
        let soft = cache.soft_mask(key(1, &mask), &mask, 0.5, 0.5);

        assert_eq!((soft.width(), soft.height()), (5, 5));
        // phase (2, 2) is the 256 centre tap: source copied one pixel in
        assert_eq!(soft.get(0, 0), 0);
        assert_eq!(soft.get(1, 1), 200);
        assert_eq!(soft.get(3, 3), 200);
        assert_eq!(soft.get(4, 4), 0);
    }

    #[test]
    fn soft_mask_phase_zero_spreads_over_2x2() {
        let mask = MaskBuf::square(3, 255);
        let mut cache = BrushMaskCache::new();
        let soft = cache.soft_mask(key(1, &mask), &mask, 0.0, 0.0);
        let tap = ((255u32 * 64) >> 8) as u8;
        // corner gets one tap, interior four (each floored separately)
        assert_eq!(soft.get(0, 0), tap);
        assert_eq!(soft.get(2, 2), tap * 4);
        assert_eq!(soft.get(4, 4), 0);
    }

    #[test]
    fn same_phase_returns_same_instance() {
        let mask = MaskBuf::disc(7);
        let k = key(3, &mask);
        let mut cache = BrushMaskCache::new();

        let a = cache.soft_mask(k, &mask, 10.3, 5.3);
        let b = cache.soft_mask(k, &mask, 11.3, 6.3);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.soft_builds(), 1);

        let c = cache.soft_mask(k, &mask, 10.6, 5.3);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.cached_phases(), 2);

        // the first phase survived building the second
        let d = cache.soft_mask(k, &mask, 12.3, 7.3);
        assert!(Arc::ptr_eq(&a, &d));
        assert_eq!(cache.soft_builds(), 2);
    }

    #[test]
    fn new_generation_drops_all_phases() {
        let mask = MaskBuf::disc(7);
        let mut cache = BrushMaskCache::new();
        let a = cache.soft_mask(key(1, &mask), &mask, 0.3, 0.3);
        cache.soft_mask(key(1, &mask), &mask, 0.6, 0.6);
        assert_eq!(cache.cached_phases(), 2);

        let b = cache.soft_mask(key(2, &mask), &mask, 0.3, 0.3);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.cached_phases(), 1);
    }

    #[test]
    fn hard_mask_is_binary_and_cached() {
        let mut mask = MaskBuf::new(3, 1);
        mask.data_mut().copy_from_slice(&[0, 1, 128]);
        let mut cache = BrushMaskCache::new();

        let hard = cache.hard_mask(key(1, &mask), &mask);
        assert_eq!((hard.width(), hard.height()), (5, 3));
        assert_eq!(&hard.data()[5..10], &[0, 0, 255, 255, 0]);

        let again = cache.hard_mask(key(1, &mask), &mask);
        assert!(Arc::ptr_eq(&hard, &again));

        let rebuilt = cache.hard_mask(key(2, &mask), &mask);
        assert!(!Arc::ptr_eq(&hard, &rebuilt));
    }

    #[test]
    fn pressure_scales_intensity() {
        let mask = MaskBuf::square(3, 100);
        let k = key(1, &mask);
        let mut cache = BrushMaskCache::new();

        let neutral = cache.pressure_mask(k, &mask, 0.5, 0.5, 0.5);
        let soft = cache.soft_mask(k, &mask, 0.5, 0.5);
        assert!(Arc::ptr_eq(&neutral, &soft));

        let light = cache.pressure_mask(k, &mask, 0.5, 0.5, 0.25);
        assert_eq!(light.get(2, 2), 50);

        let heavy = cache.pressure_mask(k, &mask, 0.5, 0.5, 1.0);
        assert_eq!(heavy.get(2, 2), 200);
    }

    #[test]
    fn scaled_mask_is_cached_by_size() {
        let mask = Arc::new(MaskBuf::square(10, 255));
        let k = key(1, &mask);
        let mut cache = BrushMaskCache::new();

        assert!(cache.scaled_mask(k, &mask, 0.0).is_none());

        let (same_key, same) = cache.scaled_mask(k, &mask, 1.0).unwrap_or((k, mask.clone()));
        assert_eq!(same_key, k);
        assert!(Arc::ptr_eq(&same, &mask));

        let (small_key, small) = cache.scaled_mask(k, &mask, 0.25).unwrap_or((k, mask.clone()));
        assert_eq!((small_key.width, small_key.height), (5, 5));
        assert_eq!((small.width(), small.height()), (5, 5));

        let (_, again) = cache.scaled_mask(k, &mask, 0.25).unwrap_or((k, mask.clone()));
        assert!(Arc::ptr_eq(&small, &again));
    }
}
