//! Per-pixel blend modes
//!
//! Pixels are straight (non-premultiplied) 8-bit with alpha, when present,
//! as the last byte. The source pixel always carries alpha; the destination
//! carries it only if the drawable does.

use serde::{Deserialize, Serialize};

/// Blend modes for compositing a dab onto a drawable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    /// Paint only where the destination is transparent
    Behind,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Difference,
    Addition,
    Subtract,
    /// Remove destination alpha
    Erase,
}

impl BlendMode {
    /// Modes that mix colour per channel before compositing
    fn mixes_color(self) -> bool {
        !matches!(self, BlendMode::Normal | BlendMode::Behind | BlendMode::Erase)
    }

    fn mix(self, d: u8, s: u8) -> u8 {
        match self {
            BlendMode::Multiply => int_mult(d, s),
            BlendMode::Screen => 255 - int_mult(255 - d, 255 - s),
            BlendMode::Overlay => {
                if d < 128 {
                    int_mult(d, s).saturating_mul(2)
                } else {
                    255 - int_mult(255 - d, 255 - s).saturating_mul(2)
                }
            }
            BlendMode::Darken => d.min(s),
            BlendMode::Lighten => d.max(s),
            BlendMode::Difference => d.abs_diff(s),
            BlendMode::Addition => d.saturating_add(s),
            BlendMode::Subtract => d.saturating_sub(s),
            BlendMode::Normal | BlendMode::Behind | BlendMode::Erase => s,
        }
    }
}

/// Rounded `a * b / 255`
#[inline]
pub fn int_mult(a: u8, b: u8) -> u8 {
    let t = a as u32 * b as u32 + 0x80;
    (((t >> 8) + t) >> 8) as u8
}

/// `d + (s - d) * t / 255`, rounded
#[inline]
pub fn int_lerp(d: u8, s: u8, t: u8) -> u8 {
    ((d as u32 * (255 - t as u32) + s as u32 * t as u32 + 127) / 255) as u8
}

/// Composite `src` (colour channels + alpha) over `dest` in place.
///
/// `opacity` scales the source alpha. `dest` has one byte fewer than `src`
/// when the drawable has no alpha channel.
pub fn blend_pixel(mode: BlendMode, src: &[u8], dest: &mut [u8], opacity: u8) {
    let channels = src.len() - 1;
    let has_alpha = dest.len() == src.len();
    let sa = int_mult(src[channels], opacity);
    if sa == 0 {
        return;
    }

    if !has_alpha {
        // opaque destination: erase and behind fall back to their visible effect
        let effective = match mode {
            BlendMode::Behind => return,
            BlendMode::Erase => BlendMode::Normal,
            other => other,
        };
        for c in 0..channels {
            let mixed = effective.mix(dest[c], src[c]);
            dest[c] = int_lerp(dest[c], mixed, sa);
        }
        return;
    }

    let da = dest[channels];
    match mode {
        BlendMode::Normal => {
            let remaining = int_mult(da, 255 - sa);
            let out_a = sa as u32 + remaining as u32;
            for c in 0..channels {
                let v = src[c] as u32 * sa as u32 + dest[c] as u32 * remaining as u32;
                dest[c] = ((v + out_a / 2) / out_a) as u8;
            }
            dest[channels] = out_a.min(255) as u8;
        }
        BlendMode::Behind => {
            let added = int_mult(sa, 255 - da);
            let out_a = da as u32 + added as u32;
            if out_a == 0 {
                return;
            }
            for c in 0..channels {
                let v = dest[c] as u32 * da as u32 + src[c] as u32 * added as u32;
                dest[c] = ((v + out_a / 2) / out_a) as u8;
            }
            dest[channels] = out_a.min(255) as u8;
        }
        BlendMode::Erase => {
            dest[channels] = int_mult(da, 255 - sa);
        }
        _ => {
            debug_assert!(mode.mixes_color());
            // colour modes never add coverage
            let t = sa.min(da);
            for c in 0..channels {
                let mixed = mode.mix(dest[c], src[c]);
                dest[c] = int_lerp(dest[c], mixed, t);
            }
        }
    }
}

/// Blend one row of `src` pixels over `dest` pixels
pub fn blend_row(mode: BlendMode, src: &[u8], dest: &mut [u8], src_bytes: usize, dest_bytes: usize, opacity: u8) {
    for (s, d) in src.chunks_exact(src_bytes).zip(dest.chunks_exact_mut(dest_bytes)) {
        blend_pixel(mode, s, d, opacity);
    }
}
