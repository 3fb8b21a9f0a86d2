//! C6 — Feature Picking (spec.md §4.6).
//!
//! Grounded on `examples/original_source/controllers/PopupController.go`
//! (`GetMapData`: per-layer loop, group-by-layer, drop-empty-groups). The
//! 60 m buffer on Point/LineString layers is supplemented from spec.md
//! §4.6 — `PopupController.go` calls plain `ST_Intersects` with no buffer.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio_postgres::types::ToSql;

use crate::db::PostgresPool;
use crate::error::{Result, TileServerError};
use crate::layers::{GeometryType, LayerCache, LayerDescriptor};
use crate::sql::{bind_positional, quote_identifier};

use super::row::row_to_map;

const BUFFER_METERS: f64 = 60.0;

/// One layer's results in a `map-data` response.
#[derive(Debug, Serialize)]
pub struct PickedLayer {
    pub layer_id: String,
    pub layer_name: String,
    pub features: Vec<Map<String, Value>>,
}

#[derive(Clone)]
pub struct FeaturePicker {
    pool: Arc<PostgresPool>,
    layers: Arc<LayerCache>,
}

impl FeaturePicker {
    pub fn new(pool: Arc<PostgresPool>, layers: Arc<LayerCache>) -> Self {
        Self { pool, layers }
    }

    /// `pick(wkt, layer_ids[]) -> [{layer_id, layer_name, features[]}]`.
    pub async fn pick(&self, wkt: &str, layer_ids: &[String]) -> Result<Vec<PickedLayer>> {
        validate_wkt_prefix(wkt)?;

        let mut out = Vec::new();
        for layer_id in layer_ids {
            let layer = self.layers.lookup(layer_id).await?;
            let features = self.query_layer(&layer, wkt).await?;
            if !features.is_empty() {
                out.push(PickedLayer {
                    layer_id: layer_id.clone(),
                    layer_name: layer.layer_title.clone(),
                    features,
                });
            }
        }
        Ok(out)
    }

    async fn query_layer(&self, layer: &LayerDescriptor, wkt: &str) -> Result<Vec<Map<String, Value>>> {
        let columns = crate::sql::construct_columns(layer, true);
        let select_cols = columns.join(", ");
        let schema = quote_identifier(&layer.db_schema);
        let table = quote_identifier(&layer.db_table);
        let geom = quote_identifier(&layer.geometry_column);

        // Point/LineString layers get a 60m buffer inlined into the query
        // body (not bound) — the WKT embedded there has already passed the
        // prefix check above, per spec.md §9's noted residual-risk tradeoff.
        let buffered = matches!(layer.geometry_type, GeometryType::Point | GeometryType::LineString);

        let (sql, params): (String, Vec<Box<dyn ToSql + Sync + Send>>) = if buffered {
            let escaped = wkt.replace('\'', "''");
            let sql = format!(
                "SELECT {select_cols} FROM {schema}.{table} WHERE ST_Intersects({geom}, ST_Buffer(ST_GeomFromText('{escaped}', 4326)::geography, {BUFFER_METERS})::geometry)"
            );
            (sql, Vec::new())
        } else {
            let sql = format!(
                "SELECT {select_cols} FROM {schema}.{table} WHERE ST_Intersects({geom}, ST_GeomFromText(?, 4326))"
            );
            (sql, vec![Box::new(wkt.to_string())])
        };

        let conn = self.pool.get().await?;
        let sql = bind_positional(&sql);
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        let rows = tokio::time::timeout(self.pool.query_timeout(), conn.query(&sql, &refs))
            .await
            .map_err(|_| TileServerError::Internal(anyhow::anyhow!("feature pick query timed out")))?
            .map_err(|e| TileServerError::Internal(anyhow::anyhow!("feature pick query failed: {e}")))?;

        Ok(rows.iter().map(row_to_map).collect())
    }
}

fn validate_wkt_prefix(wkt: &str) -> Result<()> {
    let trimmed = wkt.trim_start();
    if trimmed.starts_with("POINT(")
        || trimmed.starts_with("LINESTRING(")
        || trimmed.starts_with("POLYGON(")
    {
        Ok(())
    } else {
        Err(TileServerError::BadRequest(format!("unsupported geometry WKT: {wkt}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_wkt_prefixes() {
        assert!(validate_wkt_prefix("POINT(106.9 47.9)").is_ok());
        assert!(validate_wkt_prefix("LINESTRING(0 0,1 1)").is_ok());
        assert!(validate_wkt_prefix("POLYGON((0 0,1 0,1 1,0 0))").is_ok());
    }

    #[test]
    fn rejects_unknown_wkt_prefix() {
        assert!(validate_wkt_prefix("MULTIPOINT((0 0))").is_err());
        assert!(validate_wkt_prefix("garbage").is_err());
    }
}
