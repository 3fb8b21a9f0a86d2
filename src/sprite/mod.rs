//! C7 — Sprite Assembler (spec.md §4.7).

mod assembler;
mod svg;

pub use assembler::{pack, SpriteMeta};
pub use svg::svg_to_png;
