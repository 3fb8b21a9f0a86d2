//! Filter predicate synthesis (spec.md §4.2 `build_where`).
//!
//! Grounded on `examples/original_source/maplayer/filter.go::BuildFilterConditions`,
//! extended with the array-column branch (not present in the Go original —
//! supplemented per spec.md, using `ColumnTypeCache` for the type probe).

use tokio_postgres::types::ToSql;

use crate::db::PostgresPool;
use crate::error::Result;

use super::column_types::ColumnTypeCache;
use super::quote_identifier;

const DEFAULT_SEARCH_COLUMNS: &[&str] = &["name", "org_name", "title", "description"];

/// A composed `WHERE` extension: SQL fragments (each already prefixed with
/// `AND`) plus the positionally-bound argument values for them.
#[derive(Default)]
pub struct WhereClause {
    pub fragments: Vec<String>,
    pub args: Vec<Box<dyn ToSql + Sync + Send>>,
}

impl WhereClause {
    pub fn sql(&self) -> String {
        self.fragments.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn push(&mut self, fragment: String, mut args: Vec<Box<dyn ToSql + Sync + Send>>) {
        self.fragments.push(fragment);
        self.args.append(&mut args);
    }

    /// Appends a simple `AND "col" = ?` predicate — used for admin/area
    /// filters and permission-derived user-column filters, which are
    /// trusted equality predicates rather than raw query-string input.
    pub fn push_eq(&mut self, column: &str, value: impl Into<String>) {
        self.push(
            format!("AND {} = ?", quote_identifier(column)),
            vec![Box::new(value.into())],
        );
    }
}

/// Builds the dynamic portion of a tile/spatial query's `WHERE` clause from
/// query-string-style key/value pairs. Rules applied in order, first match
/// wins, exactly as spec.md §4.2 enumerates them.
pub async fn build_where(
    filters: &[(String, String)],
    schema: &str,
    table: &str,
    column_cache: &ColumnTypeCache,
    pool: &PostgresPool,
) -> Result<WhereClause> {
    let mut clause = WhereClause::default();

    let search_columns_value = filters
        .iter()
        .find(|(k, _)| k == "search_columns")
        .map(|(_, v)| v.as_str());

    for (key, value) in filters {
        // Rule 1: metadata key / empty value -> skip.
        if key == "search_columns" || value.is_empty() {
            continue;
        }

        // Rule 2: global search -> disjunction of ILIKE over search columns.
        if key == "search" {
            let cols: Vec<String> = search_columns_value
                .filter(|s| !s.is_empty())
                .map(|s| s.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect())
                .unwrap_or_else(|| DEFAULT_SEARCH_COLUMNS.iter().map(|s| s.to_string()).collect());

            if cols.is_empty() {
                continue;
            }

            let parts: Vec<String> = cols
                .iter()
                .map(|c| format!("{} ILIKE ?", quote_identifier(c)))
                .collect();
            let args: Vec<Box<dyn ToSql + Sync + Send>> = cols
                .iter()
                .map(|_| Box::new(format!("%{value}%")) as Box<dyn ToSql + Sync + Send>)
                .collect();

            clause.push(format!("AND ( {} )", parts.join(" OR ")), args);
            continue;
        }

        // Rule 3: array column -> `= ANY` or `&&` depending on value shape.
        let safe_key = key.replace('"', "");
        if let Some(elem) = column_cache.array_element_type(pool, schema, table, &safe_key).await {
            let quoted = quote_identifier(&safe_key);
            let cast = elem.cast();
            let cleaned = value.trim_start_matches('[').trim_end_matches(']');

            if cleaned.contains(',') {
                let parts: Vec<&str> = cleaned.split(',').map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
                let placeholders: Vec<String> = parts.iter().map(|_| "?".to_string()).collect();
                let args: Vec<Box<dyn ToSql + Sync + Send>> = parts
                    .iter()
                    .map(|p| Box::new(p.to_string()) as Box<dyn ToSql + Sync + Send>)
                    .collect();
                clause.push(
                    format!("AND {quoted} && ARRAY[{}]::{cast}[]", placeholders.join(", ")),
                    args,
                );
            } else {
                clause.push(
                    format!("AND ?::{cast} = ANY({quoted})"),
                    vec![Box::new(cleaned.to_string())],
                );
            }
            continue;
        }

        // Rule 4: comma-separated scalar value -> IN (...).
        if value.contains(',') {
            let cleaned = value.trim_start_matches('[').trim_end_matches(']');
            let parts: Vec<&str> = cleaned.split(',').map(|p| p.trim()).collect();
            let placeholders: Vec<String> = parts.iter().map(|_| "?".to_string()).collect();
            let args: Vec<Box<dyn ToSql + Sync + Send>> = parts
                .iter()
                .map(|p| Box::new(p.to_string()) as Box<dyn ToSql + Sync + Send>)
                .collect();
            clause.push(
                format!("AND {} IN ({})", quote_identifier(&safe_key), placeholders.join(",")),
                args,
            );
            continue;
        }

        // Rule 5: `__like` suffix -> ILIKE.
        if let Some(stripped) = key.strip_suffix("__like") {
            let safe = stripped.replace('"', "");
            clause.push(
                format!("AND {} ILIKE ?", quote_identifier(&safe)),
                vec![Box::new(format!("%{value}%"))],
            );
            continue;
        }

        // Rule 6: fallback equality.
        clause.push(
            format!("AND {} = ?", quote_identifier(&safe_key)),
            vec![Box::new(value.clone())],
        );
    }

    Ok(clause)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn sql_joins_fragments_with_spaces() {
        let mut clause = WhereClause::default();
        clause.push("AND a = ?".into(), vec![Box::new(1i32)]);
        clause.push("AND b = ?".into(), vec![Box::new(2i32)]);
        assert_eq!(clause.sql(), "AND a = ? AND b = ?");
        assert_eq!(clause.args.len(), 2);
    }

    #[test]
    fn empty_filters_yield_no_fragments() {
        assert!(filters(&[]).is_empty());
    }
}
