//! Compositing of the dab accumulator into the drawable
//!
//! Both entry points work on the accumulator rectangle of the current
//! session. Pixels under that rectangle are captured into the undo shadow
//! before anything is written.

use rayon::prelude::*;

use super::blend::{blend_row, int_lerp, int_mult, BlendMode};
use super::session::PaintSession;
use super::{ApplicationMode, CanvasApplication};
use crate::brush::MaskBuf;
use crate::drawable::Drawable;

/// Mask values covering a `w × h` buffer whose origin is `(off_x, off_y)`
/// pixels right/down of the mask origin.
fn align_mask(mask: &MaskBuf, off_x: i32, off_y: i32, w: i32, h: i32) -> Vec<u8> {
    let mut out = Vec::with_capacity(w as usize * h as usize);
    for row in 0..h {
        for col in 0..w {
            out.push(mask.get(col + off_x, row + off_y));
        }
    }
    out
}

/// Scale the accumulator's alpha channel by per-pixel coverage
fn apply_coverage(buf: &mut [u8], coverage: &[u8], bytes: usize) {
    for (px, m) in buf.chunks_exact_mut(bytes).zip(coverage) {
        px[bytes - 1] = int_mult(px[bytes - 1], *m);
    }
}

#[allow(clippy::too_many_arguments)]
fn composite_rows(
    dest: &mut [u8],
    src: &[u8],
    width: usize,
    dest_bytes: usize,
    src_bytes: usize,
    mode: BlendMode,
    opacity: u8,
    parallel: bool,
) {
    let dest_stride = width * dest_bytes;
    let src_stride = width * src_bytes;
    if parallel {
        dest.par_chunks_mut(dest_stride)
            .zip(src.par_chunks(src_stride))
            .for_each(|(d, s)| blend_row(mode, s, d, src_bytes, dest_bytes, opacity));
    } else {
        dest.chunks_mut(dest_stride)
            .zip(src.chunks(src_stride))
            .for_each(|(d, s)| blend_row(mode, s, d, src_bytes, dest_bytes, opacity));
    }
}

/// Blend the accumulator through `mask` (placed at `mask_x, mask_y`).
pub(crate) fn paste(
    session: &mut PaintSession,
    drawable: &mut Drawable,
    mask: &MaskBuf,
    mask_x: i32,
    mask_y: i32,
    app: &CanvasApplication,
    parallel_threshold: usize,
) {
    let (x, y, w, h) = {
        let buf = &session.canvas_buf;
        (buf.x, buf.y, buf.width(), buf.height())
    };
    if w == 0 || h == 0 {
        return;
    }

    let mut coverage = align_mask(mask, x - mask_x, y - mask_y, w, h);
    session.capture_undo(drawable.tiles(), x, y, w, h);

    let src_bytes = session.canvas_buf.bytes();
    let dest_bytes = drawable.bytes();
    let parallel = w as usize * h as usize >= parallel_threshold;

    let mut dest = match app.mode {
        ApplicationMode::Constant => {
            session.init_canvas(x, y, w, h);
            let mut canvas = vec![0u8; coverage.len()];
            session.canvas_tiles().read_rect(x, y, w, h, &mut canvas);

            let ceiling = app.brush_opacity;
            for (c, m) in canvas.iter_mut().zip(&coverage) {
                if *c < ceiling {
                    *c += int_mult(ceiling - *c, *m);
                }
            }
            session.canvas_tiles_mut().write_rect(x, y, w, h, &canvas);
            coverage = canvas;

            session.read_pre_stroke(drawable.tiles(), x, y, w, h)
        }
        ApplicationMode::Incremental => {
            for m in coverage.iter_mut() {
                *m = int_mult(*m, app.brush_opacity);
            }
            drawable.read_rect(x, y, w, h)
        }
    };

    apply_coverage(session.canvas_buf.data_mut(), &coverage, src_bytes);
    composite_rows(
        &mut dest,
        session.canvas_buf.data(),
        w as usize,
        dest_bytes,
        src_bytes,
        app.paint_mode,
        app.image_opacity,
        parallel,
    );
    drawable.tiles_mut().write_rect(x, y, w, h, &dest);
}

/// Interpolate every channel, alpha included, from the live pixels toward
/// the accumulator by mask × brush opacity × image opacity.
///
/// The drawable must have alpha so the accumulator and drawable layouts match.
pub(crate) fn replace(
    session: &mut PaintSession,
    drawable: &mut Drawable,
    mask: &MaskBuf,
    mask_x: i32,
    mask_y: i32,
    app: &CanvasApplication,
    parallel_threshold: usize,
) {
    let (x, y, w, h) = {
        let buf = &session.canvas_buf;
        (buf.x, buf.y, buf.width(), buf.height())
    };
    if w == 0 || h == 0 {
        return;
    }

    let coverage: Vec<u8> = align_mask(mask, x - mask_x, y - mask_y, w, h)
        .into_iter()
        .map(|m| int_mult(int_mult(m, app.brush_opacity), app.image_opacity))
        .collect();
    session.capture_undo(drawable.tiles(), x, y, w, h);

    let bytes = drawable.bytes();
    let mut dest = drawable.read_rect(x, y, w, h);
    let src = session.canvas_buf.data();
    let stride = w as usize * bytes;

    let replace_row = |((d, s), m): ((&mut [u8], &[u8]), &[u8])| {
        for ((dp, sp), t) in d.chunks_exact_mut(bytes).zip(s.chunks_exact(bytes)).zip(m) {
            for (dc, sc) in dp.iter_mut().zip(sp) {
                *dc = int_lerp(*dc, *sc, *t);
            }
        }
    };

    if w as usize * h as usize >= parallel_threshold {
        dest.par_chunks_mut(stride)
            .zip(src.par_chunks(stride))
            .zip(coverage.par_chunks(w as usize))
            .for_each(replace_row);
    } else {
        dest.chunks_mut(stride)
            .zip(src.chunks(stride))
            .zip(coverage.chunks(w as usize))
            .for_each(replace_row);
    }

    drawable.tiles_mut().write_rect(x, y, w, h, &dest);
}
