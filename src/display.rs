//! Display notifications for composited areas

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::drawable::ImageId;

/// An image-space rectangle that needs redrawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageArea {
    pub image: ImageId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Receives damage notifications from the paint core
pub trait DisplaySink: Send + Sync {
    fn update_area(&self, image: ImageId, x: i32, y: i32, width: i32, height: i32);
}

/// Discards every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn update_area(&self, _image: ImageId, _x: i32, _y: i32, _width: i32, _height: i32) {}
}

/// Records notifications until the host drains them
#[derive(Debug, Default)]
pub struct DamageLog {
    areas: Mutex<Vec<DamageArea>>,
}

impl DamageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every recorded area, leaving the log empty
    pub fn drain(&self) -> Vec<DamageArea> {
        std::mem::take(&mut *self.areas.lock())
    }

    pub fn len(&self) -> usize {
        self.areas.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.lock().is_empty()
    }

    /// Bounding box of all recorded areas for one image
    pub fn bounds(&self, image: ImageId) -> Option<(i32, i32, i32, i32)> {
        let areas = self.areas.lock();
        let mut it = areas.iter().filter(|a| a.image == image);
        let first = it.next()?;
        let (mut x1, mut y1) = (first.x, first.y);
        let (mut x2, mut y2) = (first.x + first.width, first.y + first.height);
        for a in it {
            x1 = x1.min(a.x);
            y1 = y1.min(a.y);
            x2 = x2.max(a.x + a.width);
            y2 = y2.max(a.y + a.height);
        }
        Some((x1, y1, x2 - x1, y2 - y1))
    }
}

impl DisplaySink for DamageLog {
    fn update_area(&self, image: ImageId, x: i32, y: i32, width: i32, height: i32) {
        self.areas.lock().push(DamageArea {
            image,
            x,
            y,
            width,
            height,
        });
    }
}
