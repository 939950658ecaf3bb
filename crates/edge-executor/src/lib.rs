//! Suspense boundary execution support.
//!
//! This crate provides:
//! - `SuspenseBoundaryTracker` - Pending/resolved state of every boundary
//! - `apply_fallback` - Boundary failure handling
//! - Splice markup - Out-of-order placement of resolved content

mod fallback;
mod splice;
mod tracker;

pub use fallback::*;
pub use splice::*;
pub use tracker::*;
