//! C3 — Tile Engine: compose, execute and emit MVT tiles (spec.md §4.3).

use std::sync::Arc;

use bytes::Bytes;
use tokio_postgres::types::ToSql;

use crate::db::PostgresPool;
use crate::error::{Result, TileServerError};
use crate::layers::{AuthenticatedUser, GeometryType, LayerCache, LayerDescriptor};
use crate::sql::{build_where, bind_positional, construct_columns, quote_identifier, ColumnTypeCache, WhereClause};

use super::bbox::{buffered_bbox, cluster_radius_degrees, tile_to_bbox, BBox};

/// MVT tile extent, in tile-local units (spec.md §4.3 step 2).
const EXTENT: i32 = 4096;
/// Row-selection buffer, in the same units as `EXTENT`.
const BUFFER: i32 = 256;
/// Point layers below this zoom are clustered rather than rendered raw (spec.md §4.3 step 6).
const CLUSTER_MAX_ZOOM: u8 = 16;
const MAX_ZOOM: u8 = 22;

/// District/region scoping carried separately from free-form query filters,
/// since they're resolved against layer-specific columns rather than C2's
/// generic filter rules (spec.md §4.3 step 5).
#[derive(Debug, Clone, Default)]
pub struct AreaFilters {
    pub district_id: Option<String>,
    pub region_id: Option<String>,
}

/// Composes, executes and returns MVT tiles for a single layer/z/x/y.
#[derive(Clone)]
pub struct TileEngine {
    pool: Arc<PostgresPool>,
    layers: Arc<LayerCache>,
    columns: Arc<ColumnTypeCache>,
}

impl TileEngine {
    pub fn new(pool: Arc<PostgresPool>, layers: Arc<LayerCache>, columns: Arc<ColumnTypeCache>) -> Self {
        Self { pool, layers, columns }
    }

    pub async fn tile(
        &self,
        layer_id: &str,
        z: u8,
        x: u32,
        y: u32,
        user: Option<&AuthenticatedUser>,
        admin_filters: &[(String, String)],
        area: AreaFilters,
    ) -> Result<Bytes> {
        validate_coordinates(z, x, y)?;

        let layer = self.layers.lookup(layer_id).await?;
        if !layer.is_active {
            return Err(TileServerError::NotFound(format!("layer {layer_id}")));
        }

        check_permission(&layer, user)?;

        let bbox = tile_to_bbox(z, x, y);
        let buffered = buffered_bbox(&bbox, BUFFER as f64, EXTENT as f64);

        let mut where_clause = build_where(
            admin_filters,
            &layer.db_schema,
            &layer.db_table,
            &self.columns,
            &self.pool,
        )
        .await?;
        apply_user_column_filters(&mut where_clause, &layer, user);
        apply_area_filters(&mut where_clause, &layer, &area);

        let columns = construct_columns(&layer, true);
        let clustered = layer.geometry_type == GeometryType::Point && z < CLUSTER_MAX_ZOOM;

        let vector_layer_name = layer.qualified_table();
        let (sql, params) = if clustered {
            clustered_query(&layer, &columns, where_clause, &bbox, &buffered, &vector_layer_name)
        } else {
            standard_query(&layer, &columns, where_clause, &bbox, &buffered, &vector_layer_name)
        };

        let sql = bind_positional(&sql);
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        let conn = self.pool.get().await?;
        let row = tokio::time::timeout(self.pool.query_timeout(), conn.query_opt(&sql, &refs))
            .await
            .map_err(|_| TileServerError::Internal(anyhow::anyhow!("tile query timed out")))?
            .map_err(|e| TileServerError::Internal(anyhow::anyhow!("tile query failed: {e}")))?;

        let bytes: Vec<u8> = row.map(|r| r.get::<_, Vec<u8>>(0)).unwrap_or_default();
        Ok(Bytes::from(bytes))
    }
}

fn validate_coordinates(z: u8, x: u32, y: u32) -> Result<()> {
    if z > MAX_ZOOM {
        return Err(TileServerError::InvalidCoordinates { z, x, y });
    }
    let n = 1u32 << z;
    if x >= n || y >= n {
        return Err(TileServerError::InvalidCoordinates { z, x, y });
    }
    Ok(())
}

/// Role/user permission check. `is_role_exception` inverts `role_permissions`
/// from an allowlist into a denylist — spec.md §3 open question, resolved in
/// DESIGN.md — while an explicit `user_permissions` entry always grants
/// access regardless of role.
pub fn check_permission(layer: &LayerDescriptor, user: Option<&AuthenticatedUser>) -> Result<()> {
    if layer.is_public {
        return Ok(());
    }

    if !layer.is_permission {
        return Ok(());
    }

    let user = user.ok_or(TileServerError::Unauthorized)?;

    if layer.user_permissions.contains(&user.id) {
        return Ok(());
    }

    let role_listed = layer.role_permissions.contains(&user.role);
    let role_allowed = if layer.is_role_exception { !role_listed } else { role_listed };

    if role_allowed {
        Ok(())
    } else {
        Err(TileServerError::PermissionDenied)
    }
}

/// Restricts rows to the caller's own identity, per layer-configured
/// `user_column_filters` (spec.md §3).
fn apply_user_column_filters(where_clause: &mut WhereClause, layer: &LayerDescriptor, user: Option<&AuthenticatedUser>) {
    let Some(user) = user else { return };
    for filter in &layer.user_column_filters {
        if let Some(value) = user.attribute(&filter.user_column) {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            where_clause.push_eq(&filter.table_column, value);
        }
    }
}

fn apply_area_filters(where_clause: &mut WhereClause, layer: &LayerDescriptor, area: &AreaFilters) {
    if let (Some(col), Some(value)) = (&layer.district_id_column, &area.district_id) {
        where_clause.push_eq(col, value.clone());
    }
    if let (Some(col), Some(value)) = (&layer.region_id_column, &area.region_id) {
        where_clause.push_eq(col, value.clone());
    }
}

fn quoted_table(layer: &LayerDescriptor) -> String {
    format!("{}.{}", quote_identifier(&layer.db_schema), quote_identifier(&layer.db_table))
}

type Params = Vec<Box<dyn ToSql + Sync + Send>>;

fn standard_query(
    layer: &LayerDescriptor,
    columns: &[String],
    where_clause: WhereClause,
    bbox: &BBox,
    buffered: &BBox,
    vector_layer_name: &str,
) -> (String, Params) {
    let select_cols = columns.join(", ");
    let geom = quote_identifier(&layer.geometry_column);
    let table = quoted_table(layer);
    let where_sql = where_clause.sql();

    // Mirrors examples/original_source/tiles/tile.go::tileHandler: envelope
    // stays in EPSG:4326 (source SRS), no projection to 3857 — ST_AsMVTGeom
    // clips and quantizes directly from geographic coordinates.
    let sql = format!(
        r#"
        SELECT ST_AsMVT(q, ?, ?, ?) FROM (
            SELECT {select_cols},
                ST_AsMVTGeom({geom}, ST_MakeEnvelope(?, ?, ?, ?, 4326), ?, ?, true) AS {geom}
            FROM {table}
            WHERE {geom} && ST_MakeEnvelope(?, ?, ?, ?, 4326)
            {where_sql}
        ) AS q
        "#
    );

    let mut params: Params = vec![
        Box::new(vector_layer_name.to_string()),
        Box::new(EXTENT),
        Box::new(layer.geometry_column.clone()),
        Box::new(bbox.min_x),
        Box::new(bbox.min_y),
        Box::new(bbox.max_x),
        Box::new(bbox.max_y),
        Box::new(EXTENT),
        Box::new(BUFFER),
        Box::new(buffered.min_x),
        Box::new(buffered.min_y),
        Box::new(buffered.max_x),
        Box::new(buffered.max_y),
    ];
    params.extend(where_clause.args);
    (sql, params)
}

/// Clusters point features via `ST_ClusterDBSCAN` and emits one aggregated
/// feature per cluster, carrying `point_count`/`item_ids` the way a
/// MapLibre supercluster-style source would (spec.md §4.3 step 6).
fn clustered_query(
    layer: &LayerDescriptor,
    columns: &[String],
    where_clause: WhereClause,
    bbox: &BBox,
    buffered: &BBox,
    vector_layer_name: &str,
) -> (String, Params) {
    let select_cols = columns.join(", ");
    let null_cols = columns
        .iter()
        .map(|c| format!("NULL AS {c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let geom = quote_identifier(&layer.geometry_column);
    let id_col = quote_identifier(&layer.id_column);
    let table = quoted_table(layer);
    let where_sql = where_clause.sql();

    let center_lat = (bbox.min_y + bbox.max_y) / 2.0;
    let eps = cluster_radius_degrees(tile_zoom_from_bbox(bbox), center_lat);

    // Row selection uses the buffered bbox (spec.md §4.3 step 3) so clusters
    // aren't truncated at the tile edge; clipping stays on the un-buffered
    // envelope in EPSG:4326, same as the standard (non-clustered) query.
    // minpoints := 2 means ST_ClusterDBSCAN assigns NULL cluster_id to any
    // point with no near neighbour, so "cluster_id IS NULL" already means
    // "singleton" without a separate count check (spec.md §4.3 step 6).
    let sql = format!(
        r#"
        SELECT ST_AsMVT(q, ?, ?, 'mvtgeom') FROM (
            WITH clustered AS (
                SELECT {select_cols}, {geom} AS feature_geom,
                    ST_ClusterDBSCAN({geom}, ?, 2) OVER () AS cluster_id
                FROM {table}
                WHERE {geom} && ST_MakeEnvelope(?, ?, ?, ?, 4326)
                {where_sql}
            ),
            clusters AS (
                SELECT
                    count(*) AS point_count,
                    ST_Centroid(ST_Collect(feature_geom)) AS cluster_geom,
                    (array_agg({id_col} ORDER BY {id_col}))[1:50] AS item_ids_arr
                FROM clustered
                WHERE cluster_id IS NOT NULL
                GROUP BY cluster_id
            ),
            cluster_rows AS (
                SELECT
                    true AS cluster,
                    point_count,
                    (SELECT jsonb_agg(v) FROM unnest(item_ids_arr) AS v)::text AS item_ids,
                    CASE
                        WHEN point_count < 1000 THEN point_count::text
                        ELSE round(point_count / 1000.0, 1)::text || 'k'
                    END AS point_count_abbreviated,
                    ST_AsMVTGeom(cluster_geom, ST_MakeEnvelope(?, ?, ?, ?, 4326), ?, ?, true) AS mvtgeom,
                    {null_cols}
                FROM clusters
            ),
            singleton_rows AS (
                SELECT
                    NULL::boolean AS cluster,
                    NULL::bigint AS point_count,
                    NULL::text AS item_ids,
                    NULL::text AS point_count_abbreviated,
                    ST_AsMVTGeom(feature_geom, ST_MakeEnvelope(?, ?, ?, ?, 4326), ?, ?, true) AS mvtgeom,
                    {select_cols}
                FROM clustered
                WHERE cluster_id IS NULL
            )
            SELECT * FROM cluster_rows
            UNION ALL
            SELECT * FROM singleton_rows
        ) AS q
        "#
    );

    let mut params: Params = vec![
        Box::new(vector_layer_name.to_string()),
        Box::new(EXTENT),
        Box::new(eps),
        Box::new(buffered.min_x),
        Box::new(buffered.min_y),
        Box::new(buffered.max_x),
        Box::new(buffered.max_y),
    ];
    params.extend(where_clause.args);
    params.push(Box::new(bbox.min_x));
    params.push(Box::new(bbox.min_y));
    params.push(Box::new(bbox.max_x));
    params.push(Box::new(bbox.max_y));
    params.push(Box::new(EXTENT));
    params.push(Box::new(BUFFER));
    params.push(Box::new(bbox.min_x));
    params.push(Box::new(bbox.min_y));
    params.push(Box::new(bbox.max_x));
    params.push(Box::new(bbox.max_y));
    params.push(Box::new(EXTENT));
    params.push(Box::new(BUFFER));
    (sql, params)
}

/// Recovers the zoom level implied by a tile bbox's span, for the cluster
/// radius formula which is defined in terms of `z` rather than span.
fn tile_zoom_from_bbox(bbox: &BBox) -> u8 {
    let span = bbox.max_x - bbox.min_x;
    let n = 360.0 / span;
    n.log2().round().clamp(0.0, MAX_ZOOM as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn layer(is_public: bool, is_permission: bool, is_role_exception: bool) -> LayerDescriptor {
        LayerDescriptor {
            layer_id: "L1".into(),
            layer_title: "Parcels".into(),
            db_schema: "public".into(),
            db_table: "parcels".into(),
            geometry_column: "geom".into(),
            id_column: "id".into(),
            geometry_type: GeometryType::Polygon,
            column_selects: "name".into(),
            unique_value_field: None,
            is_active: true,
            is_public,
            is_permission,
            is_role_exception,
            role_permissions: vec![1, 2],
            user_permissions: vec![99],
            user_column_filters: vec![],
            district_id_column: None,
            region_id_column: None,
            legends: vec![],
        }
    }

    fn user(id: i64, role: i64) -> AuthenticatedUser {
        AuthenticatedUser { id, role, attributes: HashMap::new() }
    }

    #[test]
    fn public_layer_allows_anonymous() {
        assert!(check_permission(&layer(true, false, false), None).is_ok());
    }

    #[test]
    fn private_unrestricted_layer_is_served_unconditionally() {
        assert!(check_permission(&layer(false, false, false), None).is_ok());
        assert!(check_permission(&layer(false, false, false), Some(&user(5, 5))).is_ok());
    }

    #[test]
    fn permissioned_layer_allows_listed_role() {
        assert!(check_permission(&layer(false, true, false), Some(&user(5, 1))).is_ok());
    }

    #[test]
    fn permissioned_layer_denies_unlisted_role() {
        assert!(check_permission(&layer(false, true, false), Some(&user(5, 7))).is_err());
    }

    #[test]
    fn explicit_user_permission_overrides_role() {
        assert!(check_permission(&layer(false, true, false), Some(&user(99, 7))).is_ok());
    }

    #[test]
    fn role_exception_inverts_the_role_list() {
        // role 1 is in role_permissions, so under is_role_exception it's denied.
        assert!(check_permission(&layer(false, true, true), Some(&user(5, 1))).is_err());
        // role 7 is not in the list, so it's allowed.
        assert!(check_permission(&layer(false, true, true), Some(&user(5, 7))).is_ok());
    }

    #[test]
    fn coordinates_out_of_range_are_rejected() {
        assert!(validate_coordinates(5, 32, 0).is_err());
        assert!(validate_coordinates(5, 31, 31).is_ok());
        assert!(validate_coordinates(23, 0, 0).is_err());
    }

    #[test]
    fn tile_zoom_recovered_from_bbox_span() {
        let bbox = tile_to_bbox(8, 10, 10);
        assert_eq!(tile_zoom_from_bbox(&bbox), 8);
    }
}
