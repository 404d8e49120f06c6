//! Tiled pixel storage
//!
//! A [`TileManager`] splits a `width × height × bytes` image into 64×64 tiles.
//! Tiles are shared through `Arc`: mapping a tile into a second manager is a
//! reference, and writing through [`TileManager::tile_mut`] copies the tile
//! first if anyone else still holds it. The undo shadow relies on this to
//! capture a tile in O(1) and keep it pristine while the stroke keeps
//! writing to the live copy.

mod temp_buf;

pub use temp_buf::TempBuf;

use std::sync::Arc;

pub const TILE_WIDTH: i32 = 64;
pub const TILE_HEIGHT: i32 = 64;

/// One tile of pixel data. Edge tiles are smaller than 64×64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    width: i32,
    height: i32,
    bytes: usize,
    data: Vec<u8>,
}

impl Tile {
    fn zeroed(width: i32, height: i32, bytes: usize) -> Self {
        Self {
            width,
            height,
            bytes,
            data: vec![0; width as usize * height as usize * bytes],
        }
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

    /// Size of the pixel data in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Row `ly` starting at local column `lx`, `len` pixels wide
    fn span(&self, lx: i32, ly: i32, len: i32) -> &[u8] {
        let start = (ly as usize * self.width as usize + lx as usize) * self.bytes;
        &self.data[start..start + len as usize * self.bytes]
    }

    fn span_mut(&mut self, lx: i32, ly: i32, len: i32) -> &mut [u8] {
        let start = (ly as usize * self.width as usize + lx as usize) * self.bytes;
        &mut self.data[start..start + len as usize * self.bytes]
    }
}

/// The part of a rectangle that falls inside a single tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileChunk {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    index: usize,
}

#[derive(Debug, Clone)]
pub struct TileManager {
    width: i32,
    height: i32,
    bytes: usize,
    cols: i32,
    tiles: Vec<Option<Arc<Tile>>>,
}

impl TileManager {
    /// Create a manager with every tile unallocated (invalid)
    pub fn new(width: i32, height: i32, bytes: usize) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let cols = (width + TILE_WIDTH - 1) / TILE_WIDTH;
        let rows = (height + TILE_HEIGHT - 1) / TILE_HEIGHT;
        Self {
            width,
            height,
            bytes,
            cols,
            tiles: vec![None; (cols * rows) as usize],
        }
    }

    /// Create a manager with every tile allocated and filled with `pixel`
    pub fn filled(width: i32, height: i32, pixel: &[u8]) -> Self {
        let mut manager = Self::new(width, height, pixel.len());
        for index in 0..manager.tiles.len() {
            let (tw, th) = manager.tile_extent(index);
            let mut tile = Tile::zeroed(tw, th, pixel.len());
            for dst in tile.data.chunks_exact_mut(pixel.len()) {
                dst.copy_from_slice(pixel);
            }
            manager.tiles[index] = Some(Arc::new(tile));
        }
        manager
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

    fn tile_extent(&self, index: usize) -> (i32, i32) {
        let col = index as i32 % self.cols;
        let row = index as i32 / self.cols;
        let tw = (self.width - col * TILE_WIDTH).min(TILE_WIDTH);
        let th = (self.height - row * TILE_HEIGHT).min(TILE_HEIGHT);
        (tw, th)
    }

    fn tile_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(((y / TILE_HEIGHT) * self.cols + x / TILE_WIDTH) as usize)
    }

    /// Whether the tile containing pixel `(x, y)` holds data
    pub fn is_valid(&self, x: i32, y: i32) -> bool {
        self.tile(x, y).is_some()
    }

    /// The tile containing pixel `(x, y)`, if allocated
    pub fn tile(&self, x: i32, y: i32) -> Option<&Arc<Tile>> {
        self.tile_index(x, y)
            .and_then(|index| self.tiles[index].as_ref())
    }

    /// Map a shared tile into the slot containing pixel `(x, y)`.
    ///
    /// Returns false if the position is out of bounds or the tile's
    /// geometry does not match the slot.
    pub fn map_tile(&mut self, x: i32, y: i32, tile: Arc<Tile>) -> bool {
        let Some(index) = self.tile_index(x, y) else {
            return false;
        };
        let (tw, th) = self.tile_extent(index);
        if tile.width != tw || tile.height != th || tile.bytes != self.bytes {
            tracing::warn!(
                "map_tile: geometry mismatch at ({}, {}): {}x{}x{} into {}x{}x{}",
                x,
                y,
                tile.width,
                tile.height,
                tile.bytes,
                tw,
                th,
                self.bytes
            );
            return false;
        }
        self.tiles[index] = Some(tile);
        true
    }

    /// Writable access to the tile containing `(x, y)`.
    ///
    /// Unallocated tiles are created zero-filled; shared tiles are copied
    /// before the caller can write to them.
    pub fn tile_mut(&mut self, x: i32, y: i32) -> Option<&mut Tile> {
        let index = self.tile_index(x, y)?;
        let (tw, th) = self.tile_extent(index);
        let bytes = self.bytes;
        let slot = &mut self.tiles[index];
        let tile = slot.get_or_insert_with(|| Arc::new(Tile::zeroed(tw, th, bytes)));
        Some(Arc::make_mut(tile))
    }

    /// Number of allocated tiles
    pub fn valid_tile_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }

    /// One pixel, if its tile is allocated
    pub fn pixel(&self, x: i32, y: i32) -> Option<&[u8]> {
        let tile = self.tile(x, y)?;
        Some(tile.span(x % TILE_WIDTH, y % TILE_HEIGHT, 1))
    }

    /// Split a rectangle into per-tile chunks, clipped to the manager bounds
    pub fn chunks(&self, x: i32, y: i32, w: i32, h: i32) -> Vec<TileChunk> {
        let x1 = x.max(0);
        let y1 = y.max(0);
        let x2 = (x + w).min(self.width);
        let y2 = (y + h).min(self.height);

        let mut chunks = Vec::new();
        let mut i = y1;
        while i < y2 {
            let ch = (TILE_HEIGHT - i % TILE_HEIGHT).min(y2 - i);
            let mut j = x1;
            while j < x2 {
                let cw = (TILE_WIDTH - j % TILE_WIDTH).min(x2 - j);
                chunks.push(TileChunk {
                    x: j,
                    y: i,
                    width: cw,
                    height: ch,
                    index: ((i / TILE_HEIGHT) * self.cols + j / TILE_WIDTH) as usize,
                });
                j += cw;
            }
            i += ch;
        }
        chunks
    }

    /// Copy a rectangle into `out` (`w * h * bytes`, tightly packed rows).
    ///
    /// Parts outside the manager are left untouched; unallocated tiles read
    /// as zero.
    pub fn read_rect(&self, x: i32, y: i32, w: i32, h: i32, out: &mut [u8]) {
        read_rect_prefer(None, self, x, y, w, h, out);
    }

    /// Copy tightly packed rows from `src` into a rectangle of the manager
    pub fn write_rect(&mut self, x: i32, y: i32, w: i32, h: i32, src: &[u8]) {
        let bytes = self.bytes;
        for chunk in self.chunks(x, y, w, h) {
            let Some(tile) = self.tile_mut(chunk.x, chunk.y) else {
                continue;
            };
            for r in 0..chunk.height {
                let sy = chunk.y + r - y;
                let start = (sy as usize * w as usize + (chunk.x - x) as usize) * bytes;
                let row = &src[start..start + chunk.width as usize * bytes];
                tile.span_mut(chunk.x % TILE_WIDTH, (chunk.y + r) % TILE_HEIGHT, chunk.width)
                    .copy_from_slice(row);
            }
        }
    }

    /// Fill a rectangle with a zero byte pattern, allocating tiles as needed
    pub fn clear_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        for chunk in self.chunks(x, y, w, h) {
            if let Some(tile) = self.tile_mut(chunk.x, chunk.y) {
                for r in 0..chunk.height {
                    tile.span_mut(chunk.x % TILE_WIDTH, (chunk.y + r) % TILE_HEIGHT, chunk.width)
                        .fill(0);
                }
            }
        }
    }

    fn chunk_tile(&self, chunk: &TileChunk) -> Option<&Arc<Tile>> {
        self.tiles.get(chunk.index).and_then(|t| t.as_ref())
    }
}

/// Read a rectangle, taking each tile from `front` when it is allocated
/// there and from `back` otherwise.
///
/// Both managers must share geometry and depth.
pub fn read_rect_prefer(
    front: Option<&TileManager>,
    back: &TileManager,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    out: &mut [u8],
) {
    let bytes = back.bytes;
    for chunk in back.chunks(x, y, w, h) {
        let source = front
            .and_then(|f| f.chunk_tile(&chunk))
            .or_else(|| back.chunk_tile(&chunk));

        for r in 0..chunk.height {
            let dy = chunk.y + r - y;
            let start = (dy as usize * w as usize + (chunk.x - x) as usize) * bytes;
            let dst = &mut out[start..start + chunk.width as usize * bytes];
            match source {
                Some(tile) => dst.copy_from_slice(tile.span(
                    chunk.x % TILE_WIDTH,
                    (chunk.y + r) % TILE_HEIGHT,
                    chunk.width,
                )),
                None => dst.fill(0),
            }
        }
    }
}
