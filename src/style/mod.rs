//! C5 — Style Composer (spec.md §4.5).

mod composer;
mod types;

pub use composer::{build_style, StyleContext};
pub use types::{
    CategoryDocument, FillPaint, FilterDescriptor, FilterOption, LayerDocument, LinePaint, StyleDocument,
    StyleLayer, SymbolLayout, VectorSource,
};
