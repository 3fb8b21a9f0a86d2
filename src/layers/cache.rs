//! C1 — Layer Metadata Cache.
//!
//! Concurrent, approximate-LRU, cost-bounded mapping from `layer_id` to
//! `LayerDescriptor`, backed by `moka`. `try_get_with` gives single-flight
//! population for free: concurrent misses on the same key share one DB
//! load instead of stampeding the pool. DB errors are never cached — a
//! failed load simply leaves the key absent, so the next call retries.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::db::PostgresPool;
use crate::error::{Result, TileServerError};

use super::{GeometryType, Legend, LayerDescriptor, UserColumnFilter};

const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_COST_BUDGET: u64 = 1 << 30; // ~1 GB

#[derive(Clone)]
pub struct LayerCache {
    cache: Cache<String, Arc<LayerDescriptor>>,
    pool: Arc<PostgresPool>,
}

impl LayerCache {
    pub fn new(pool: Arc<PostgresPool>) -> Self {
        Self::with_settings(pool, DEFAULT_TTL, DEFAULT_COST_BUDGET)
    }

    pub fn with_settings(pool: Arc<PostgresPool>, ttl: Duration, cost_budget: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(cost_budget)
            .weigher(|_key: &String, value: &Arc<LayerDescriptor>| -> u32 {
                // Rough per-entry cost: base struct plus variable-length fields.
                let variable = value.column_selects.len()
                    + value.layer_title.len()
                    + value.db_schema.len()
                    + value.db_table.len()
                    + value.legends.len() * 96
                    + value.role_permissions.len() * 8
                    + value.user_permissions.len() * 8;
                (256 + variable).try_into().unwrap_or(u32::MAX)
            })
            .time_to_live(ttl)
            .build();

        Self { cache, pool }
    }

    /// `lookup(layer_id) -> descriptor | NotFound`.
    pub async fn lookup(&self, layer_id: &str) -> Result<Arc<LayerDescriptor>> {
        let key = layer_id.trim().to_string();
        let pool = self.pool.clone();

        self.cache
            .try_get_with(key.clone(), async move { load_descriptor(&pool, &key).await })
            .await
            .map_err(|e: Arc<TileServerError>| {
                // try_get_with wraps the Arc; unwrap back to an owned error for callers.
                match &*e {
                    TileServerError::NotFound(msg) => TileServerError::NotFound(msg.clone()),
                    other => TileServerError::Internal(anyhow::anyhow!(other.to_string())),
                }
            })
    }

    #[cfg(test)]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

async fn load_descriptor(pool: &PostgresPool, layer_id: &str) -> Result<Arc<LayerDescriptor>> {
    let conn = pool.get().await?;

    let row = conn
        .query_opt(
            r#"
            SELECT
                id, layer_title, db_schema, db_table, geometry_column, id_column, geometry_type,
                column_selects, unique_value_field,
                is_active, is_public, is_permission, is_role_exception,
                district_id_column, region_id_column
            FROM map_server.map_layers
            WHERE id = $1
            "#,
            &[&layer_id],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("layer lookup failed: {e}")))?
        .ok_or_else(|| TileServerError::NotFound(format!("layer {layer_id}")))?;

    let geometry_type_raw: String = row.get("geometry_type");
    let geometry_type = GeometryType::parse(&geometry_type_raw).ok_or_else(|| {
        TileServerError::Internal(anyhow::anyhow!(
            "layer {layer_id} has unknown geometry_type '{geometry_type_raw}'"
        ))
    })?;

    let role_rows = conn
        .query(
            "SELECT role_id FROM map_server.sub_map_layer_permissions WHERE layer_id = $1",
            &[&layer_id],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("role permission lookup failed: {e}")))?;
    let role_permissions: Vec<i64> = role_rows.iter().map(|r| r.get::<_, i64>(0)).collect();

    let user_rows = conn
        .query(
            "SELECT user_id FROM map_server.sub_map_layer_user_permissions WHERE layer_id = $1",
            &[&layer_id],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("user permission lookup failed: {e}")))?;
    let user_permissions: Vec<i64> = user_rows.iter().map(|r| r.get::<_, i64>(0)).collect();

    let filter_rows = conn
        .query(
            "SELECT user_column, table_column FROM map_server.sub_map_layer_user_column_filters WHERE layer_id = $1",
            &[&layer_id],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("user column filter lookup failed: {e}")))?;
    let user_column_filters = filter_rows
        .iter()
        .map(|r| UserColumnFilter {
            user_column: r.get("user_column"),
            table_column: r.get("table_column"),
        })
        .collect();

    let legend_rows = conn
        .query(
            r#"
            SELECT geometry_type, fill_color, stroke_color, marker, polygon_type,
                   line_type, unique_value, legend_order
            FROM map_server.map_layer_legends
            WHERE layer_id = $1
            ORDER BY legend_order ASC
            "#,
            &[&layer_id],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("legend lookup failed: {e}")))?;
    let legends = legend_rows
        .iter()
        .map(|r| {
            let legend_geom: String = r.get("geometry_type");
            Legend {
                geometry_type: GeometryType::parse(&legend_geom).unwrap_or(geometry_type),
                fill_color: r.get("fill_color"),
                stroke_color: r.get("stroke_color"),
                marker_path: r.get("marker"),
                polygon_type: r.get("polygon_type"),
                line_type: r.get("line_type"),
                unique_value: r.get("unique_value"),
                legend_order: r.get("legend_order"),
            }
        })
        .collect();

    Ok(Arc::new(LayerDescriptor {
        layer_id: row.get("id"),
        layer_title: row.get("layer_title"),
        db_schema: row.get("db_schema"),
        db_table: row.get("db_table"),
        geometry_column: row.get("geometry_column"),
        id_column: row.get("id_column"),
        geometry_type,
        column_selects: row.get("column_selects"),
        unique_value_field: row.get("unique_value_field"),
        is_active: row.get("is_active"),
        is_public: row.get("is_public"),
        is_permission: row.get("is_permission"),
        is_role_exception: row.get::<_, Option<i32>>("is_role_exception").unwrap_or(0) != 0,
        role_permissions,
        user_permissions,
        user_column_filters,
        district_id_column: row.get("district_id_column"),
        region_id_column: row.get("region_id_column"),
        legends,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_descriptor() -> LayerDescriptor {
        LayerDescriptor {
            layer_id: "L1".into(),
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
    fn qualified_table_is_schema_dot_table() {
        let d = sample_descriptor();
        assert_eq!(d.qualified_table(), "public.parcels");
    }
}
