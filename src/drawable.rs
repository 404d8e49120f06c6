//! Drawables - the tiled pixel targets a stroke paints into

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::tiles::TileManager;

/// Identifies the image a drawable belongs to (undo and display scope)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawableId(pub u64);

static NEXT_DRAWABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Pixel layout of a drawable. Alpha, when present, is the last byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelFormat {
    Gray,
    GrayA,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn bytes(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::GrayA => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, PixelFormat::GrayA | PixelFormat::Rgba)
    }

    /// Number of colour channels (alpha excluded)
    pub fn color_channels(self) -> usize {
        match self {
            PixelFormat::Gray | PixelFormat::GrayA => 1,
            PixelFormat::Rgb | PixelFormat::Rgba => 3,
        }
    }

    /// Encode an RGBA colour as a pixel with colour channels plus alpha,
    /// the layout of the canvas accumulator for this format.
    pub fn color_with_alpha(self, rgba: [u8; 4]) -> Vec<u8> {
        match self.color_channels() {
            1 => vec![luminance(rgba), rgba[3]],
            _ => rgba.to_vec(),
        }
    }
}

fn luminance(rgba: [u8; 4]) -> u8 {
    let [r, g, b, _] = rgba;
    (0.30 * r as f64 + 0.59 * g as f64 + 0.11 * b as f64).round() as u8
}

#[derive(Debug, Clone)]
pub struct Drawable {
    id: DrawableId,
    image: Option<ImageId>,
    format: PixelFormat,
    tiles: TileManager,
    offset_x: i32,
    offset_y: i32,
    preview_valid: bool,
}

impl Drawable {
    /// Create a drawable filled with `fill` (given as RGBA, converted to the format)
    pub fn new(image: Option<ImageId>, width: i32, height: i32, format: PixelFormat, fill: [u8; 4]) -> Self {
        let mut pixel = format.color_with_alpha(fill);
        if !format.has_alpha() {
            pixel.pop();
        }
        Self {
            id: DrawableId(NEXT_DRAWABLE_ID.fetch_add(1, Ordering::Relaxed)),
            image,
            format,
            tiles: TileManager::filled(width, height, &pixel),
            offset_x: 0,
            offset_y: 0,
            preview_valid: true,
        }
    }

    pub fn id(&self) -> DrawableId {
        self.id
    }

    /// The owning image; detached drawables cannot be painted
    pub fn image(&self) -> Option<ImageId> {
        self.image
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> i32 {
        self.tiles.width()
    }

    pub fn height(&self) -> i32 {
        self.tiles.height()
    }

    pub fn bytes(&self) -> usize {
        self.format.bytes()
    }

    pub fn has_alpha(&self) -> bool {
        self.format.has_alpha()
    }

    pub fn offsets(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    pub fn set_offsets(&mut self, x: i32, y: i32) {
        self.offset_x = x;
        self.offset_y = y;
    }

    pub fn tiles(&self) -> &TileManager {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileManager {
        &mut self.tiles
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<&[u8]> {
        self.tiles.pixel(x, y)
    }

    pub fn preview_valid(&self) -> bool {
        self.preview_valid
    }

    pub fn invalidate_preview(&mut self) {
        self.preview_valid = false;
    }

    /// Mark the cached preview as rebuilt
    pub fn validate_preview(&mut self) {
        self.preview_valid = true;
    }

    /// Copy out a rectangle as packed rows
    pub fn read_rect(&self, x: i32, y: i32, w: i32, h: i32) -> Vec<u8> {
        let mut out = vec![0; w.max(0) as usize * h.max(0) as usize * self.bytes()];
        self.tiles.read_rect(x, y, w, h, &mut out);
        out
    }

    /// Snapshot the drawable as an RGBA image
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let (w, h) = (self.width(), self.height());
        let raw = self.read_rect(0, 0, w, h);
        let bytes = self.bytes();
        let mut img = image::RgbaImage::new(w as u32, h as u32);
        for (px, out) in raw.chunks_exact(bytes).zip(img.pixels_mut()) {
            out.0 = match self.format {
                PixelFormat::Gray => [px[0], px[0], px[0], 255],
                PixelFormat::GrayA => [px[0], px[0], px[0], px[1]],
                PixelFormat::Rgb => [px[0], px[1], px[2], 255],
                PixelFormat::Rgba => [px[0], px[1], px[2], px[3]],
            };
        }
        img
    }
}
