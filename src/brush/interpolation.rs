//! Stroke interpolation - evenly spaced dabs between two pointer samples

use serde::{Deserialize, Serialize};

/// Tolerance applied when rounding distance up to the next spacing multiple
const EPSILON: f64 = 0.00001;

/// A pointer sample in image space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StrokeCoords {
    pub x: f64,
    pub y: f64,
    /// Pressure value (0.0 - 1.0)
    pub pressure: f64,
    pub xtilt: f64,
    pub ytilt: f64,
}

impl StrokeCoords {
    pub fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self {
            x,
            y,
            pressure,
            xtilt: 0.0,
            ytilt: 0.0,
        }
    }

    /// Linear blend toward `other`
    pub fn lerp(&self, other: &StrokeCoords, t: f64) -> StrokeCoords {
        StrokeCoords {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            pressure: self.pressure + (other.pressure - self.pressure) * t,
            xtilt: self.xtilt + (other.xtilt - self.xtilt) * t,
            ytilt: self.ytilt + (other.ytilt - self.ytilt) * t,
        }
    }

    pub fn distance_to(&self, other: &StrokeCoords) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// One brush application along a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dab {
    pub coords: StrokeCoords,
    /// Stroke arc length at this dab
    pub distance: f64,
}

/// Emits a dab each time the stroke's cumulative length crosses a multiple
/// of `spacing`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeInterpolator {
    spacing: f64,
}

impl StrokeInterpolator {
    /// Spacing below one pixel is raised to one
    pub fn new(spacing: f64) -> Self {
        let spacing = if spacing.is_finite() { spacing.max(1.0) } else { 1.0 };
        Self { spacing }
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Walk from `last` to `current` starting at arc length `distance`.
    ///
    /// Dabs are produced lazily, so a long jump costs no allocation.
    pub fn walk(&self, distance: f64, last: &StrokeCoords, current: &StrokeCoords) -> Walk {
        Walk {
            spacing: self.spacing,
            last: *last,
            current: *current,
            dist: last.distance_to(current),
            initial: distance,
            traveled: distance,
        }
    }
}

/// Dabs along one segment, in stroke order
#[derive(Debug, Clone)]
#[must_use = "a walk emits nothing unless iterated"]
pub struct Walk {
    spacing: f64,
    last: StrokeCoords,
    current: StrokeCoords,
    dist: f64,
    initial: f64,
    traveled: f64,
}

impl Walk {
    /// Arc length after the segment (`before + |current - last|`)
    pub fn distance(&self) -> f64 {
        self.initial + self.dist
    }
}

impl Iterator for Walk {
    type Item = Dab;

    fn next(&mut self) -> Option<Dab> {
        let total = self.distance();
        while self.dist > 0.0 && self.traveled < total {
            let n = (self.traveled / self.spacing + 1.0 + EPSILON).floor();
            self.traveled = n * self.spacing;

            if self.traveled <= total {
                let t = (self.traveled - self.initial) / self.dist;
                return Some(Dab {
                    coords: self.last.lerp(&self.current, t),
                    distance: self.traveled,
                });
            }
        }
        None
    }
}
