//! C3 — Tile Engine: compose, execute and emit MVT tiles.

pub mod bbox;
mod engine;

pub use engine::{check_permission, AreaFilters, TileEngine};
