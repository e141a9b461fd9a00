//! Common types shared across the SAR tiling crates.

pub mod bbox;
pub mod layer;
pub mod zoom;

pub use bbox::LayerBounds;
pub use layer::LayerId;
pub use zoom::{ZoomRange, ZoomRangeError};
