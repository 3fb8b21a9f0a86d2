//! Column canonicalisation (spec.md §4.2 `construct_columns`).

use crate::layers::LayerDescriptor;

use super::quote_identifier;

/// Splits `column_selects` on `,`, trims, dedupes, guarantees `id_column`
/// (and `unique_value_field`, if set) are present, optionally drops the
/// geometry column, and quotes every identifier.
///
/// Grounded on `examples/original_source/maplayer/layer.go::ConstructSQLColumns`.
pub fn construct_columns(layer: &LayerDescriptor, drop_geometry: bool) -> Vec<String> {
    if layer.column_selects.trim().is_empty() {
        return vec![quote_identifier(&layer.id_column)];
    }

    let mut seen = Vec::new();
    let mut push_unique = |col: &str| {
        let col = col.trim();
        if !col.is_empty() && !seen.iter().any(|c: &String| c == col) {
            seen.push(col.to_string());
        }
    };

    for col in layer.column_selects.split(',') {
        push_unique(col);
    }
    push_unique(&layer.id_column);
    if let Some(unique_value_field) = &layer.unique_value_field {
        push_unique(unique_value_field);
    }

    if drop_geometry {
        seen.retain(|c| c != &layer.geometry_column);
    }

    seen.into_iter().map(|c| quote_identifier(&c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::GeometryType;

    fn layer(column_selects: &str) -> LayerDescriptor {
        LayerDescriptor {
            layer_id: "L1".into(),
            layer_title: "Parcels".into(),
            db_schema: "public".into(),
            db_table: "parcels".into(),
            geometry_column: "geom".into(),
            id_column: "id".into(),
            geometry_type: GeometryType::Polygon,
            column_selects: column_selects.into(),
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
    fn empty_selects_returns_only_id() {
        let cols = construct_columns(&layer(""), true);
        assert_eq!(cols, vec!["\"id\""]);
    }

    #[test]
    fn dedupes_and_ensures_id_present() {
        let cols = construct_columns(&layer("name, area, id"), true);
        assert_eq!(cols, vec!["\"name\"", "\"area\"", "\"id\""]);
    }

    #[test]
    fn adds_id_when_missing() {
        let cols = construct_columns(&layer("name,area"), true);
        assert_eq!(cols, vec!["\"name\"", "\"area\"", "\"id\""]);
    }

    #[test]
    fn drops_geometry_column_when_requested() {
        let cols = construct_columns(&layer("name,geom"), true);
        assert!(!cols.contains(&"\"geom\"".to_string()));
    }

    #[test]
    fn keeps_geometry_column_when_not_dropped() {
        let cols = construct_columns(&layer("name,geom"), false);
        assert!(cols.contains(&"\"geom\"".to_string()));
    }

    #[test]
    fn includes_unique_value_field() {
        let mut l = layer("name");
        l.unique_value_field = Some("category".into());
        let cols = construct_columns(&l, true);
        assert!(cols.contains(&"\"category\"".to_string()));
    }

    #[test]
    fn strips_quotes_from_identifiers() {
        let cols = construct_columns(&layer("na\"me"), true);
        assert_eq!(cols[0], "\"name\"");
    }
}
