//! Hit testing over node positions.
//!
//! An R-tree keyed by simulation slot; see [`SpatialIndex`].

mod rtree;

pub use rtree::{NodePoint, SpatialIndex};
