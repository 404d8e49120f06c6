//! Brush mask resampling for pressure-scaled dabs

use super::MaskBuf;

/// Dimensions of a brush mask drawn at `scale` (an area factor).
pub fn scaled_size(width: i32, height: i32, scale: f64) -> (i32, i32) {
    if scale == 1.0 {
        return (width, height);
    }
    let ratio = if scale < 1.0 / 256.0 { 1.0 / 16.0 } else { scale.sqrt() };
    let w = ((width as f64 * ratio + 0.5) as i32).max(1);
    let h = ((height as f64 * ratio + 0.5) as i32).max(1);
    (w, h)
}

/// Box-filter resample of `src` to `width × height`.
///
/// Every destination pixel averages the source area it covers, weighting
/// partially covered source pixels by overlap.
pub fn scale_mask(src: &MaskBuf, width: i32, height: i32) -> MaskBuf {
    let mut dest = MaskBuf::new(width, height);
    if src.width() == 0 || src.height() == 0 || width == 0 || height == 0 {
        return dest;
    }

    let sx = src.width() as f64 / width as f64;
    let sy = src.height() as f64 / height as f64;

    for dy in 0..height {
        let y0 = dy as f64 * sy;
        let y1 = y0 + sy;
        for dx in 0..width {
            let x0 = dx as f64 * sx;
            let x1 = x0 + sx;

            let mut sum = 0.0;
            let mut area = 0.0;
            let mut yy = y0.floor() as i32;
            while (yy as f64) < y1 && yy < src.height() {
                let wy = (y1.min(yy as f64 + 1.0) - y0.max(yy as f64)).max(0.0);
                let mut xx = x0.floor() as i32;
                while (xx as f64) < x1 && xx < src.width() {
                    let wx = (x1.min(xx as f64 + 1.0) - x0.max(xx as f64)).max(0.0);
                    sum += src.get(xx, yy) as f64 * wx * wy;
                    area += wx * wy;
                    xx += 1;
                }
                yy += 1;
            }

            let value = if area > 0.0 { sum / area } else { 0.0 };
            dest.data_mut()[(dy * width + dx) as usize] = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    dest
}
