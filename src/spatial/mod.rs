//! C4 — Spatial Query Engine and C6 — Feature Picking (spec.md §4.4, §4.6).

mod engine;
mod picking;
mod row;

pub use engine::{SpatialEngine, SpatialRequest};
pub use picking::{FeaturePicker, PickedLayer};
pub use row::row_to_map;
