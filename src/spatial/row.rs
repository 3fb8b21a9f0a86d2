//! Generic `tokio_postgres::Row` -> JSON map conversion, shared by C4 and C6.
//!
//! Grounded on the column-type dispatch pattern in
//! `examples/other_examples/a12b1108_t-rex-tileserver-t-rex__src-datasource-postgis.rs.rs`
//! (`FeatureAttrValType` match over `Type::Varchar|Text|Float4|Float8|Int2|Int4|Int8|Bool`),
//! generalized here to `serde_json::Value` since the spec's rows are
//! transport-agnostic key/value maps rather than a fixed attribute enum.

use serde_json::{Map, Value};
use tokio_postgres::types::Type;
use tokio_postgres::Row;

/// Converts one row into an ordered key/value map, preserving column order.
pub fn row_to_map(row: &Row) -> Map<String, Value> {
    let mut map = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_());
        map.insert(column.name().to_string(), value);
    }
    map
}

fn column_value(row: &Row, idx: usize, ty: &Type) -> Value {
    match *ty {
        Type::BOOL => opt_to_value(row.get::<_, Option<bool>>(idx)),
        Type::INT2 => opt_to_value(row.get::<_, Option<i16>>(idx)),
        Type::INT4 => opt_to_value(row.get::<_, Option<i32>>(idx)),
        Type::INT8 => opt_to_value(row.get::<_, Option<i64>>(idx)),
        Type::FLOAT4 => row
            .get::<_, Option<f32>>(idx)
            .map(|v| Value::from(v as f64))
            .unwrap_or(Value::Null),
        Type::FLOAT8 => opt_to_value(row.get::<_, Option<f64>>(idx)),
        Type::JSON | Type::JSONB => row
            .get::<_, Option<Value>>(idx)
            .unwrap_or(Value::Null),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            opt_to_value(row.get::<_, Option<String>>(idx))
        }
        // Geometry (bytea from e.g. ST_AsGeoJSON/ST_AsText) and anything
        // without a dedicated branch above falls back to text rendering —
        // spatial/tile queries always cast geometry columns to text/JSON
        // before selecting them (see `spatial/engine.rs`), so this is only
        // ever hit for genuinely unmodeled scalar types.
        _ => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

fn opt_to_value<T: Into<Value>>(opt: Option<T>) -> Value {
    opt.map(Into::into).unwrap_or(Value::Null)
}
