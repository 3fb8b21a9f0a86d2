//! Ad-hoc schema introspection backing `/mapserver/api/geometry-tables` and
//! `/mapserver/api/table-columns/:schema/:table` (spec.md §6). These two
//! routes are thin passthroughs over PostGIS/information_schema catalog
//! views rather than components of their own; grounded on the same
//! `geometry_columns`/`information_schema.columns` queries the teacher's
//! (now-removed) `sources/postgres/table.rs::find_geometry_column`/
//! `discover_properties` used for static source discovery, generalized here
//! to list rather than validate a single configured table.

use serde::Serialize;

use crate::db::PostgresPool;
use crate::error::{Result, TileServerError};

#[derive(Debug, Clone, Serialize)]
pub struct GeometryTable {
    pub schema: String,
    pub table: String,
    pub geometry_column: String,
    pub srid: i32,
    pub geometry_type: String,
}

/// `GET /mapserver/api/geometry-tables` — every row of the `geometry_columns`
/// catalog view.
pub async fn list_geometry_tables(pool: &PostgresPool) -> Result<Vec<GeometryTable>> {
    let conn = pool.get().await?;
    let rows = conn
        .query(
            r#"
            SELECT f_table_schema, f_table_name, f_geometry_column, srid, type
            FROM geometry_columns
            ORDER BY f_table_schema, f_table_name, f_geometry_column
            "#,
            &[],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("geometry_columns query failed: {e}")))?;

    Ok(rows
        .iter()
        .map(|r| GeometryTable {
            schema: r.get("f_table_schema"),
            table: r.get("f_table_name"),
            geometry_column: r.get("f_geometry_column"),
            srid: r.get("srid"),
            geometry_type: r.get("type"),
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct TableColumn {
    pub name: String,
    pub data_type: String,
}

/// `GET /mapserver/api/table-columns/:schema/:table`.
pub async fn list_table_columns(pool: &PostgresPool, schema: &str, table: &str) -> Result<Vec<TableColumn>> {
    let conn = pool.get().await?;
    let rows = conn
        .query(
            r#"
            SELECT column_name, data_type
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#,
            &[&schema, &table],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("information_schema.columns query failed: {e}")))?;

    if rows.is_empty() {
        return Err(TileServerError::NotFound(format!("table {schema}.{table}")));
    }

    Ok(rows
        .iter()
        .map(|r| TableColumn { name: r.get("column_name"), data_type: r.get("data_type") })
        .collect())
}

/// `GET /mapserver/api/filter-options?ids=a,b,c` — resolves each
/// `FilterDescriptor` named by `ids` to its `(label, value)` option list by
/// querying its backing `schema.table` (spec.md §3 Filter descriptor, §6
/// route table). `ids` are `map_server.map_filters` primary keys, not map
/// ids — a single filter-options request may span multiple maps' filters.
pub async fn filter_options(
    pool: &PostgresPool,
    filter_ids: &[String],
) -> Result<std::collections::BTreeMap<String, Vec<crate::style::FilterOption>>> {
    use crate::style::FilterOption;

    let conn = pool.get().await?;
    let mut out = std::collections::BTreeMap::new();

    for filter_id in filter_ids {
        let row = conn
            .query_opt(
                r#"
                SELECT label, value_field, label_field, schema_table
                FROM map_server.map_filters
                WHERE id = $1
                "#,
                &[&filter_id],
            )
            .await
            .map_err(|e| TileServerError::Internal(anyhow::anyhow!("filter lookup failed: {e}")))?;

        let Some(row) = row else { continue };
        let value_field: String = row.get("value_field");
        let label_field: String = row.get("label_field");
        let schema_table: String = row.get("schema_table");

        let sql = format!(
            "SELECT \"{value_field}\" AS value, \"{label_field}\" AS label FROM {schema_table} ORDER BY \"{label_field}\""
        );
        let option_rows = conn
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| TileServerError::Internal(anyhow::anyhow!("filter option query failed: {e}")))?;

        let options = option_rows
            .iter()
            .map(|r| {
                let map = crate::spatial::row_to_map(r);
                FilterOption {
                    label: map.get("label").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    value: map.get("value").cloned().unwrap_or(serde_json::Value::Null),
                }
            })
            .collect();

        out.insert(filter_id.clone(), options);
    }

    Ok(out)
}
