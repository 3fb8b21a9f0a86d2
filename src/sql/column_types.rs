//! Per-table column-type probe, used to detect array columns for the `&&`/
//! `= ANY` predicate branch (spec.md §4.2 rule 3).
//!
//! Unbounded, no-TTL cache — spec.md §5: "concurrent map, no TTL, silently
//! tolerates missing entries". Neither invalidated on DB schema change;
//! staleness is an accepted tradeoff for a column's *type*, which almost
//! never changes for a live table.

use std::sync::Arc;

use moka::sync::Cache;

use crate::db::PostgresPool;
use crate::error::{Result, TileServerError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ColumnKey {
    schema: String,
    table: String,
    column: String,
}

/// The scalar element type of an array column, used to pick the correct
/// SQL cast (`?::<elem>` / `ARRAY[...]::<elem>[]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayElementType {
    SmallInt,
    Int,
    BigInt,
    Text,
    Other,
}

impl ArrayElementType {
    pub fn cast(&self) -> &'static str {
        match self {
            ArrayElementType::SmallInt => "smallint",
            ArrayElementType::Int => "int",
            ArrayElementType::BigInt => "bigint",
            ArrayElementType::Text => "text",
            ArrayElementType::Other => "text",
        }
    }

    fn from_pg_typname(name: &str) -> Self {
        match name.trim_start_matches('_') {
            "int2" => Self::SmallInt,
            "int4" => Self::Int,
            "int8" => Self::BigInt,
            "text" | "varchar" | "bpchar" => Self::Text,
            _ => Self::Other,
        }
    }
}

#[derive(Clone)]
pub struct ColumnTypeCache {
    cache: Cache<ColumnKey, Option<ArrayElementType>>,
}

impl ColumnTypeCache {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    /// Returns `Some(elem)` if `column` on `schema.table` is an array type,
    /// `None` if it is scalar. A DB error also yields `None` rather than
    /// poisoning the cache — callers fall back to the scalar predicate path.
    pub async fn array_element_type(
        &self,
        pool: &PostgresPool,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Option<ArrayElementType> {
        let key = ColumnKey {
            schema: schema.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        };

        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let result = Self::probe(pool, schema, table, column).await.ok().flatten();
        self.cache.insert(key, result);
        result
    }

    async fn probe(
        pool: &PostgresPool,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<ArrayElementType>> {
        let conn = pool.get().await?;
        let row = conn
            .query_opt(
                r#"
                SELECT t.typname, a.attndims
                FROM pg_attribute a
                JOIN pg_class c ON c.oid = a.attrelid
                JOIN pg_namespace n ON n.oid = c.relnamespace
                JOIN pg_type t ON t.oid = a.atttypid
                WHERE n.nspname = $1 AND c.relname = $2 AND a.attname = $3
                "#,
                &[&schema, &table, &column],
            )
            .await
            .map_err(|e| TileServerError::Internal(anyhow::anyhow!("column type probe failed: {e}")))?;

        let Some(row) = row else { return Ok(None) };
        let typname: String = row.get("typname");
        let attndims: i32 = row.get("attndims");

        let is_array = typname.starts_with('_') || attndims > 0;
        if !is_array {
            return Ok(None);
        }

        Ok(Some(ArrayElementType::from_pg_typname(&typname)))
    }
}

impl Default for ColumnTypeCache {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedColumnTypeCache = Arc<ColumnTypeCache>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_element_type_casts() {
        assert_eq!(ArrayElementType::SmallInt.cast(), "smallint");
        assert_eq!(ArrayElementType::Int.cast(), "int");
        assert_eq!(ArrayElementType::BigInt.cast(), "bigint");
        assert_eq!(ArrayElementType::Text.cast(), "text");
    }

    #[test]
    fn from_pg_typname_strips_array_prefix() {
        assert_eq!(ArrayElementType::from_pg_typname("_int4"), ArrayElementType::Int);
        assert_eq!(ArrayElementType::from_pg_typname("int4"), ArrayElementType::Int);
        assert_eq!(ArrayElementType::from_pg_typname("_text"), ArrayElementType::Text);
    }
}
