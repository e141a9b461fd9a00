//! Geographic bounding boxes for processed layers.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in decimal degrees (EPSG:4326).
///
/// Serializes with named edges, which is the shape written into per-layer
/// metadata descriptors. Catalog entries use the corner-pair form returned by
/// [`LayerBounds::to_corners`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LayerBounds {
    /// Create a new bounding box from its four edges.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Corner pairs `[[south, west], [north, east]]`, the order web map
    /// clients expect for `LatLngBounds`.
    pub fn to_corners(&self) -> [[f64; 2]; 2] {
        [[self.south, self.west], [self.north, self.east]]
    }

    /// Inverse of [`LayerBounds::to_corners`].
    pub fn from_corners(corners: [[f64; 2]; 2]) -> Self {
        let [[south, west], [north, east]] = corners;
        Self::new(west, south, east, north)
    }

    /// True when the edges describe a non-empty box inside the valid
    /// latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.west < self.east
            && self.south < self.north
            && (-180.0..=180.0).contains(&self.west)
            && (-180.0..=180.0).contains(&self.east)
            && (-90.0..=90.0).contains(&self.south)
            && (-90.0..=90.0).contains(&self.north)
    }
}
