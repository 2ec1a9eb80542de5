//! Axis-aligned geographic query rectangles.
//!
//! A `Region` is the unit of work for the crawler: one feed request covers
//! exactly one region. Regions are immutable; subdivision produces new ones.

use std::fmt;
use thiserror::Error;

/// Why a set of bounds cannot form a region.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegionError {
    #[error("north bound {top} must be greater than south bound {bottom}")]
    Latitude { top: f64, bottom: f64 },
    #[error("east bound {right} must be greater than west bound {left}")]
    Longitude { left: f64, right: f64 },
    #[error("bounds must be finite numbers")]
    NotFinite,
}

/// Bounding box in degrees. `top > bottom` and `right > left` always hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    top: f64,
    bottom: f64,
    left: f64,
    right: f64,
}

impl Region {
    /// Build a region, rejecting inverted or zero-area bounds.
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Result<Self, RegionError> {
        if ![top, bottom, left, right].iter().all(|v| v.is_finite()) {
            return Err(RegionError::NotFinite);
        }
        if top <= bottom {
            return Err(RegionError::Latitude { top, bottom });
        }
        if right <= left {
            return Err(RegionError::Longitude { left, right });
        }
        Ok(Self {
            top,
            bottom,
            left,
            right,
        })
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    /// North-south extent in degrees.
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// East-west extent in degrees.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Area in square degrees.
    pub fn area(&self) -> f64 {
        self.height() * self.width()
    }

    /// Whether a point lies inside the region (edges inclusive).
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.bottom..=self.top).contains(&latitude) && (self.left..=self.right).contains(&longitude)
    }

    /// Split the region at its horizontal and vertical midpoints.
    ///
    /// Children come back as top-left, top-right, bottom-left, bottom-right.
    /// Adjacent children share their midpoint edge exactly, so the four tile
    /// the parent with no gap and no overlap. Returns `None` once the midpoint
    /// collapses onto an edge (the region is too small to split in `f64`).
    pub fn quadrants(&self) -> Option<[Region; 4]> {
        let mid_lng = self.left + self.width() / 2.0;
        let mid_lat = self.bottom + self.height() / 2.0;

        let children = [
            Region::new(self.top, mid_lat, self.left, mid_lng),
            Region::new(self.top, mid_lat, mid_lng, self.right),
            Region::new(mid_lat, self.bottom, self.left, mid_lng),
            Region::new(mid_lat, self.bottom, mid_lng, self.right),
        ];

        match children {
            [Ok(tl), Ok(tr), Ok(bl), Ok(br)] => Some([tl, tr, bl, br]),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lat {} .. {}, lng {} .. {}",
            self.top, self.bottom, self.left, self.right
        )
    }
}
