//! Layer descriptor data model (spec.md §3) and the C1 metadata cache.

mod cache;

pub use cache::LayerCache;

use std::collections::HashMap;

/// Geometry kind of a layer's backing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Point" => Some(Self::Point),
            "LineString" => Some(Self::LineString),
            "Polygon" => Some(Self::Polygon),
            _ => None,
        }
    }
}

/// A user-attribute-column to table-column pairing that restricts rows to
/// the caller's own identity (spec.md §3 `user_column_filters`).
#[derive(Debug, Clone)]
pub struct UserColumnFilter {
    /// Key looked up on the authenticated user object (e.g. "org_id").
    pub user_column: String,
    /// Column on the layer's table to equate against that value.
    pub table_column: String,
}

/// Rendering rule attached to a layer (spec.md §3 Legend).
#[derive(Debug, Clone)]
pub struct Legend {
    pub geometry_type: GeometryType,
    pub fill_color: Option<String>,
    pub stroke_color: Option<String>,
    pub marker_path: Option<String>,
    pub polygon_type: Option<String>,
    pub line_type: Option<String>,
    pub unique_value: Option<String>,
    pub legend_order: i32,
}

/// Source of truth is the database; this is the value the C1 cache stores.
#[derive(Debug, Clone)]
pub struct LayerDescriptor {
    pub layer_id: String,
    pub layer_title: String,
    pub db_schema: String,
    pub db_table: String,
    pub geometry_column: String,
    pub id_column: String,
    pub geometry_type: GeometryType,

    pub column_selects: String,
    pub unique_value_field: Option<String>,

    pub is_active: bool,
    pub is_public: bool,
    pub is_permission: bool,
    pub is_role_exception: bool,

    pub role_permissions: Vec<i64>,
    pub user_permissions: Vec<i64>,
    pub user_column_filters: Vec<UserColumnFilter>,

    pub district_id_column: Option<String>,
    pub region_id_column: Option<String>,

    pub legends: Vec<Legend>,
}

impl LayerDescriptor {
    /// `schema.table`, used verbatim as the MVT layer name (spec.md §9 open question).
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.db_schema, self.db_table)
    }

    /// First legend's marker path, if any — used by the style composer to
    /// decide whether a point layer gets a `symbol` style layer.
    pub fn primary_legend(&self) -> Option<&Legend> {
        self.legends.first()
    }
}

/// A value drawn from the authenticated-user object (spec.md §6: `id`, `role`,
/// plus arbitrary attribute columns referenced by `user_column_filters`).
#[derive(Debug, Clone, Default)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub role: i64,
    pub attributes: HashMap<String, serde_json::Value>,
}

impl AuthenticatedUser {
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}
