//! C4 — Spatial Query Engine (spec.md §4.4).
//!
//! Grounded on `examples/original_source/spatial/spatial.go`
//! (`GetRelationshipFunction`, `BuildSpatialQuery`, `ExecuteSpatialQuery`)
//! and `examples/original_source/controllers/SpatialController.go` for the
//! `out_fields`/`return_geometry` column-selection override.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio_postgres::types::ToSql;

use crate::db::PostgresPool;
use crate::error::Result;
use crate::layers::{LayerCache, LayerDescriptor};
use crate::sql::{bind_positional, quote_identifier, relationship_function};

use super::row::row_to_map;

/// Request shape for `POST /mapserver/api/spatial/:layer/:relationship`.
#[derive(Debug, Clone, Default)]
pub struct SpatialRequest {
    pub geometry: String,
    pub return_geometry: bool,
    pub out_fields: Option<String>,
}

#[derive(Clone)]
pub struct SpatialEngine {
    pool: Arc<PostgresPool>,
    layers: Arc<LayerCache>,
}

impl SpatialEngine {
    pub fn new(pool: Arc<PostgresPool>, layers: Arc<LayerCache>) -> Self {
        Self { pool, layers }
    }

    /// `spatial(layer_id, relationship, wkt, return_geometry?, out_fields?) -> rows`.
    pub async fn spatial(
        &self,
        layer_id: &str,
        relationship: &str,
        request: &SpatialRequest,
    ) -> Result<Vec<Map<String, Value>>> {
        let sql_function = relationship_function(relationship)?;
        let layer = self.layers.lookup(layer_id).await?;

        let columns = selected_columns(&layer, request);
        let (sql, mut params) = build_query(&layer, &columns, sql_function);
        params.push(Box::new(request.geometry.clone()));

        let conn = self.pool.get().await?;
        let sql = bind_positional(&sql);
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        let rows = tokio::time::timeout(self.pool.query_timeout(), conn.query(&sql, &refs))
            .await
            .map_err(|_| crate::error::TileServerError::Internal(anyhow::anyhow!("spatial query timed out")))?
            .map_err(|e| crate::error::TileServerError::Internal(anyhow::anyhow!("spatial query failed: {e}")))?;

        Ok(rows.iter().map(row_to_map).collect())
    }
}

/// Applies the `out_fields`/`return_geometry` override described in spec.md
/// §4.4: `*` keeps the layer's configured columns, empty means "id only",
/// otherwise `id_column, out_fields`.
fn selected_columns(layer: &LayerDescriptor, request: &SpatialRequest) -> Vec<String> {
    let mut cols: Vec<String> = match request.out_fields.as_deref() {
        Some("*") => layer
            .column_selects
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        Some(fields) if !fields.trim().is_empty() => {
            let mut v = vec![layer.id_column.clone()];
            v.extend(fields.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()));
            v
        }
        _ => vec![layer.id_column.clone()],
    };

    if request.return_geometry && !cols.contains(&layer.geometry_column) {
        cols.push(layer.geometry_column.clone());
    }

    cols.into_iter().map(|c| quote_identifier(&c)).collect()
}

type Params = Vec<Box<dyn ToSql + Sync + Send>>;

fn build_query(layer: &LayerDescriptor, columns: &[String], sql_function: &str) -> (String, Params) {
    let select_cols = columns.join(", ");
    let schema = quote_identifier(&layer.db_schema);
    let table = quote_identifier(&layer.db_table);
    let geom = quote_identifier(&layer.geometry_column);

    let sql = format!(
        "SELECT {select_cols} FROM {schema}.{table} WHERE {sql_function}({geom}, ST_GeomFromText(?, 4326))"
    );

    (sql, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::GeometryType;

    fn layer() -> LayerDescriptor {
        LayerDescriptor {
            layer_id: "L3".into(),
            layer_title: "Parcels".into(),
            db_schema: "public".into(),
            db_table: "parcels".into(),
            geometry_column: "geom".into(),
            id_column: "id".into(),
            geometry_type: GeometryType::Polygon,
            column_selects: "name,area".into(),
            unique_value_field: None,
            is_active: true,
            is_public: true,
            is_permission: false,
            is_role_exception: false,
            role_permissions: vec![],
            user_permissions: vec![],
            user_column_filters: vec![],
            district_id_column: None,
            region_id_column: None,
            legends: vec![],
        }
    }

    #[test]
    fn out_fields_star_keeps_configured_columns() {
        let req = SpatialRequest {
            geometry: String::new(),
            return_geometry: false,
            out_fields: Some("*".into()),
        };
        let cols = selected_columns(&layer(), &req);
        assert_eq!(cols, vec!["\"name\"", "\"area\""]);
    }

    #[test]
    fn empty_out_fields_selects_only_id() {
        let req = SpatialRequest { geometry: String::new(), return_geometry: false, out_fields: None };
        let cols = selected_columns(&layer(), &req);
        assert_eq!(cols, vec!["\"id\""]);
    }

    #[test]
    fn named_out_fields_prepend_id() {
        let req = SpatialRequest {
            geometry: String::new(),
            return_geometry: false,
            out_fields: Some("name".into()),
        };
        let cols = selected_columns(&layer(), &req);
        assert_eq!(cols, vec!["\"id\"", "\"name\""]);
    }

    #[test]
    fn return_geometry_appends_geometry_column() {
        let req = SpatialRequest { geometry: String::new(), return_geometry: true, out_fields: None };
        let cols = selected_columns(&layer(), &req);
        assert_eq!(cols, vec!["\"id\"", "\"geom\""]);
    }

    #[test]
    fn query_uses_relationship_function_and_geom_from_text() {
        let (sql, _params) = build_query(&layer(), &["\"id\"".to_string()], "ST_Within");
        assert!(sql.contains("ST_Within(\"geom\", ST_GeomFromText(?, 4326))"));
        assert!(sql.contains("FROM \"public\".\"parcels\""));
    }
}
