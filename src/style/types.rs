//! Style document data model (spec.md §3, §4.5, §6).
//!
//! Grounded on `examples/original_source/models/map.go` (`Map`,
//! `ViewMapLayerCategories`) and
//! `examples/original_source/models/vectoryTileStyle.go`
//! (`VectorTileStyle`, `FillLayer`/`LineLayer`/`SymbolLayer`), turned into a
//! single `#[serde(tag = "type")]` enum per spec.md §9's explicit guidance
//! to avoid an open-world inheritance tree for the polymorphic style-layer
//! list.

use serde::Serialize;

/// `sources[layer_id]` entry of a style document.
#[derive(Debug, Clone, Serialize)]
pub struct VectorSource {
    #[serde(rename = "type")]
    pub source_type: &'static str,
    pub tiles: Vec<String>,
}

impl VectorSource {
    pub fn new(tile_url: String) -> Self {
        Self { source_type: "vector", tiles: vec![tile_url] }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct FillPaint {
    #[serde(rename = "fill-color")]
    pub fill_color: String,
    #[serde(rename = "fill-opacity")]
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct LinePaint {
    #[serde(rename = "line-color")]
    pub line_color: String,
    #[serde(rename = "line-width")]
    pub line_width: f64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SymbolLayout {
    #[serde(rename = "icon-image")]
    pub icon_image: String,
    #[serde(rename = "icon-size")]
    pub icon_size: f64,
    #[serde(rename = "icon-allow-overlap")]
    pub icon_allow_overlap: bool,
    #[serde(rename = "icon-ignore-placement")]
    pub icon_ignore_placement: bool,
}

/// A single style layer — `fill | line | symbol | circle`, discriminated by
/// the serialized `type` tag (MapLibre GL style v8 vocabulary).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StyleLayer {
    Fill {
        id: String,
        source: String,
        #[serde(rename = "source-layer")]
        source_layer: String,
        paint: FillPaint,
    },
    Line {
        id: String,
        source: String,
        #[serde(rename = "source-layer")]
        source_layer: String,
        paint: LinePaint,
    },
    Symbol {
        id: String,
        source: String,
        #[serde(rename = "source-layer")]
        source_layer: String,
        layout: SymbolLayout,
    },
    Circle {
        id: String,
        source: String,
        #[serde(rename = "source-layer")]
        source_layer: String,
        paint: FillPaint,
    },
}

/// Cascading UI filter sourced from a DB table (spec.md §3 Filter descriptor).
#[derive(Debug, Clone, Serialize)]
pub struct FilterDescriptor {
    pub label: String,
    pub value_field: String,
    pub label_field: String,
    pub schema_table: String,
    pub parent_filter_id: Option<String>,
    pub parent_column: Option<String>,
    pub order: i32,
}

/// A resolved `(label, value)` pair returned by `/mapserver/api/filter-options`.
#[derive(Debug, Clone, Serialize)]
pub struct FilterOption {
    pub label: String,
    pub value: serde_json::Value,
}

/// The full style response for `GET /mapserver/api/map/:id` (spec.md §4.5, §6).
#[derive(Debug, Clone, Serialize)]
pub struct StyleDocument {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub categories: Vec<CategoryDocument>,
    pub filters: Vec<FilterDescriptor>,

    pub version: u32,
    pub sources: std::collections::BTreeMap<String, VectorSource>,
    pub sprite: String,
    pub layers: Vec<StyleLayer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryDocument {
    pub id: String,
    pub icon: String,
    pub is_visible: bool,
    pub layer_category: String,
    pub layers: Vec<LayerDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerDocument {
    pub id: String,
    pub layer_title: String,
    pub geometry_type: &'static str,
    pub is_public: bool,
    pub is_visible: bool,
    pub description: Option<String>,
}
