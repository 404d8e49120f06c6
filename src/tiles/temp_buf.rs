//! Contiguous scratch buffer with an image-space origin

/// A tightly packed `width × height × bytes` buffer positioned at `(x, y)`
/// in image space.
///
/// Used for the per-dab canvas accumulator and the pre-stroke image copy.
/// [`TempBuf::resize`] keeps the allocation when it is large enough, so
/// content after a resize is unspecified until written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TempBuf {
    pub x: i32,
    pub y: i32,
    width: i32,
    height: i32,
    bytes: usize,
    data: Vec<u8>,
}

impl TempBuf {
    pub fn new(bytes: usize, x: i32, y: i32, width: i32, height: i32) -> Self {
        let mut buf = Self::default();
        buf.resize(bytes, x, y, width, height);
        buf
    }

    /// Reconfigure geometry, reusing the existing allocation
    pub fn resize(&mut self, bytes: usize, x: i32, y: i32, width: i32, height: i32) {
        let width = width.max(0);
        let height = height.max(0);
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self.bytes = bytes;
        self.data.resize(width as usize * height as usize * bytes, 0);
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn rowstride(&self) -> usize {
        self.width as usize * self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn row(&self, y: i32) -> &[u8] {
        let stride = self.rowstride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    pub fn row_mut(&mut self, y: i32) -> &mut [u8] {
        let stride = self.rowstride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Pixel at buffer-local `(x, y)`
    pub fn pixel(&self, x: i32, y: i32) -> Option<&[u8]> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * self.bytes;
        Some(&self.data[start..start + self.bytes])
    }

    pub fn pixel_mut(&mut self, x: i32, y: i32) -> Option<&mut [u8]> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * self.bytes;
        Some(&mut self.data[start..start + self.bytes])
    }

    /// Pixel at image-space `(x, y)`
    pub fn pixel_at(&self, x: i32, y: i32) -> Option<&[u8]> {
        self.pixel(x - self.x, y - self.y)
    }

    /// Fill every pixel with `color` (`color.len()` must equal `bytes`)
    pub fn fill(&mut self, color: &[u8]) {
        if color.len() != self.bytes {
            tracing::warn!(
                "TempBuf::fill: color has {} bytes, buffer has {}",
                color.len(),
                self.bytes
            );
            return;
        }
        for px in self.data.chunks_exact_mut(self.bytes) {
            px.copy_from_slice(color);
        }
    }
}
