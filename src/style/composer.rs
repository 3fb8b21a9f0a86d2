//! C5 — Style Composer (spec.md §4.5).
//!
//! Grounded on `examples/original_source/controllers/MapController.go`
//! (`GetMapLayers`, `generateVectorTileStyle`) and
//! `examples/original_source/models/map.go` (`Map`/`ViewMapLayerCategories`
//! preload/order shape).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::db::PostgresPool;
use crate::error::{Result, TileServerError};
use crate::layers::{AuthenticatedUser, GeometryType, LayerCache};
use crate::sprite;

use super::types::{
    CategoryDocument, FillPaint, FilterDescriptor, LayerDocument, LinePaint, StyleDocument, StyleLayer,
    SymbolLayout, VectorSource,
};

/// Collaborator inputs the composer needs from outside the DB (spec.md §6
/// Config collaborator: `base_domain`; filesystem root for sprite/style
/// side-effects).
#[derive(Debug, Clone)]
pub struct StyleContext {
    pub base_domain: String,
    pub public_dir: PathBuf,
}

impl StyleContext {
    fn base_url(&self) -> String {
        if self.base_domain.contains("://") {
            self.base_domain.clone()
        } else {
            format!("https://{}", self.base_domain)
        }
    }
}

struct RawCategory {
    id: String,
    icon: String,
    is_visible: bool,
    layer_category: String,
    layer_ids: Vec<(String, String, Option<String>, bool, bool)>, // (id, title, description, is_visible, is_public)
}

/// `build_style(map, secure?) -> map_with_style_fields | Error` (spec.md §4.5).
pub async fn build_style(
    pool: &PostgresPool,
    layers: &LayerCache,
    map_id: &str,
    ctx: &StyleContext,
    secure: bool,
    user: Option<&AuthenticatedUser>,
    generate: bool,
) -> Result<StyleDocument> {
    let conn = pool.get().await?;

    let map_row = conn
        .query_opt(
            "SELECT id, map, description FROM map_server.map WHERE id = $1",
            &[&map_id],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("map lookup failed: {e}")))?
        .ok_or_else(|| TileServerError::NotFound(format!("map {map_id}")))?;

    let title: String = map_row.get("map");
    let description: Option<String> = map_row.get("description");

    let category_rows = conn
        .query(
            r#"
            SELECT id, icon, is_visible, layer_category
            FROM map_server.view_map_layer_categories
            WHERE map_id = $1 AND is_active = true
            ORDER BY category_order ASC
            "#,
            &[&map_id],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("category lookup failed: {e}")))?;

    let mut raw_categories = Vec::with_capacity(category_rows.len());
    for row in &category_rows {
        let category_id: String = row.get("id");

        let mut layer_query = String::from(
            r#"
            SELECT id, layer_title, description, is_visible, is_public
            FROM map_server.map_layers
            WHERE map_layer_category_id = $1 AND is_active = true
            "#,
        );
        if !secure {
            layer_query.push_str(" AND is_public = true");
        }
        layer_query.push_str(" ORDER BY layer_order ASC");

        let layer_rows = conn
            .query(layer_query.as_str(), &[&category_id])
            .await
            .map_err(|e| TileServerError::Internal(anyhow::anyhow!("layer lookup failed: {e}")))?;

        let layer_ids = layer_rows
            .iter()
            .map(|r| {
                (
                    r.get::<_, String>("id"),
                    r.get::<_, String>("layer_title"),
                    r.get::<_, Option<String>>("description"),
                    r.get::<_, bool>("is_visible"),
                    r.get::<_, bool>("is_public"),
                )
            })
            .collect();

        raw_categories.push(RawCategory {
            id: category_id,
            icon: row.get("icon"),
            is_visible: row.get("is_visible"),
            layer_category: row.get("layer_category"),
            layer_ids,
        });
    }

    let mut sources = BTreeMap::new();
    let mut style_layers = Vec::new();
    let mut categories = Vec::new();

    let tile_path = if secure { "/tiles-with-permission/" } else { "/tiles/" };
    let base_url = ctx.base_url();

    for raw in raw_categories {
        let mut layer_docs = Vec::new();

        for (layer_id, layer_title, layer_description, is_visible, _is_public) in raw.layer_ids {
            let descriptor = match layers.lookup(&layer_id).await {
                Ok(d) => d,
                Err(TileServerError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            if secure && descriptor.is_permission {
                if crate::tiles::check_permission(&descriptor, user).is_err() {
                    continue;
                }
            }

            sources.insert(
                layer_id.clone(),
                VectorSource::new(format!("{base_url}{tile_path}{layer_id}/{{z}}/{{x}}/{{y}}.pbf")),
            );

            let source_layer = descriptor.qualified_table();

            match descriptor.geometry_type {
                GeometryType::Point => {
                    if let Some(legend) = descriptor.primary_legend() {
                        if legend.marker_path.is_some() {
                            materialize_marker(ctx, map_id, &layer_id, legend.marker_path.as_deref().unwrap())?;
                            style_layers.push(StyleLayer::Symbol {
                                id: layer_id.clone(),
                                source: layer_id.clone(),
                                source_layer: source_layer.clone(),
                                layout: SymbolLayout {
                                    icon_image: layer_id.clone(),
                                    icon_size: 1.0,
                                    icon_allow_overlap: true,
                                    icon_ignore_placement: true,
                                },
                            });
                        }
                    }
                }
                GeometryType::LineString => {
                    if let Some(legend) = descriptor.primary_legend() {
                        if let Some(fill_color) = &legend.fill_color {
                            style_layers.push(StyleLayer::Line {
                                id: layer_id.clone(),
                                source: layer_id.clone(),
                                source_layer: source_layer.clone(),
                                paint: LinePaint { line_color: fill_color.clone(), line_width: 2.0 },
                            });
                        }
                    }
                }
                GeometryType::Polygon => {
                    if let Some(legend) = descriptor.primary_legend() {
                        if let (Some(fill_color), Some(stroke_color)) = (&legend.fill_color, &legend.stroke_color) {
                            style_layers.push(StyleLayer::Fill {
                                id: layer_id.clone(),
                                source: layer_id.clone(),
                                source_layer: source_layer.clone(),
                                paint: FillPaint { fill_color: fill_color.clone(), fill_opacity: 0.6 },
                            });
                            style_layers.push(StyleLayer::Line {
                                id: format!("{layer_id}-outline"),
                                source: layer_id.clone(),
                                source_layer: source_layer.clone(),
                                paint: LinePaint { line_color: stroke_color.clone(), line_width: 2.0 },
                            });
                        }
                    }
                }
            }

            layer_docs.push(LayerDocument {
                id: layer_id,
                layer_title,
                geometry_type: geometry_type_name(descriptor.geometry_type),
                is_public: descriptor.is_public,
                is_visible,
                description: layer_description,
            });
        }

        if layer_docs.is_empty() {
            continue;
        }

        categories.push(CategoryDocument {
            id: raw.id,
            icon: raw.icon,
            is_visible: raw.is_visible,
            layer_category: raw.layer_category,
            layers: layer_docs,
        });
    }

    let filters = load_filters(pool, map_id).await?;

    let doc = StyleDocument {
        id: map_id.to_string(),
        title,
        description,
        categories,
        filters,
        version: 8,
        sources,
        sprite: format!("{base_url}/map/{map_id}/sprite/{map_id}"),
        layers: style_layers,
    };

    if generate {
        write_generated(ctx, map_id, &doc)?;
    }

    Ok(doc)
}

fn geometry_type_name(gt: GeometryType) -> &'static str {
    match gt {
        GeometryType::Point => "Point",
        GeometryType::LineString => "LineString",
        GeometryType::Polygon => "Polygon",
    }
}

/// Converts an SVG/PNG marker path into `./public/map/<id>/sprite/images/<layer_id>.png`
/// (spec.md §4.5 step 5).
fn materialize_marker(ctx: &StyleContext, map_id: &str, layer_id: &str, marker_path: &str) -> Result<()> {
    let images_dir = ctx.public_dir.join("map").join(map_id).join("sprite").join("images");
    std::fs::create_dir_all(&images_dir)?;
    let dest = images_dir.join(format!("{layer_id}.png"));

    let ext = Path::new(marker_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "svg" => sprite::svg_to_png(Path::new(marker_path), &dest),
        "png" => {
            std::fs::copy(marker_path, &dest)?;
            Ok(())
        }
        other => Err(TileServerError::BadRequest(format!(
            "unsupported marker file format: {other}"
        ))),
    }
}

async fn load_filters(pool: &PostgresPool, map_id: &str) -> Result<Vec<FilterDescriptor>> {
    let conn = pool.get().await?;
    let rows = conn
        .query(
            r#"
            SELECT label, value_field, label_field, schema_table, parent_filter_id, parent_column, filter_order
            FROM map_server.map_filters
            WHERE map_id = $1
            ORDER BY filter_order ASC
            "#,
            &[&map_id],
        )
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("filter lookup failed: {e}")))?;

    Ok(rows
        .iter()
        .map(|r| FilterDescriptor {
            label: r.get("label"),
            value_field: r.get("value_field"),
            label_field: r.get("label_field"),
            schema_table: r.get("schema_table"),
            parent_filter_id: r.get("parent_filter_id"),
            parent_column: r.get("parent_column"),
            order: r.get("filter_order"),
        })
        .collect())
}

fn write_generated(ctx: &StyleContext, map_id: &str, doc: &StyleDocument) -> Result<()> {
    let map_dir = ctx.public_dir.join("map");
    std::fs::create_dir_all(&map_dir)?;
    let json_path = map_dir.join(format!("{map_id}.json"));
    let json = serde_json::to_vec_pretty(doc)
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("style serialization failed: {e}")))?;
    std::fs::write(json_path, json)?;

    let images_dir = ctx.public_dir.join("map").join(map_id).join("sprite").join("images");
    if images_dir.is_dir() {
        let sprite_base = ctx.public_dir.join("map").join(map_id).join("sprite").join(map_id);
        sprite::pack(&images_dir, &sprite_base)?;
    }

    Ok(())
}

pub type SharedLayerCache = Arc<LayerCache>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_prepends_https_when_scheme_missing() {
        let ctx = StyleContext { base_domain: "maps.example.com".into(), public_dir: PathBuf::from(".") };
        assert_eq!(ctx.base_url(), "https://maps.example.com");
    }

    #[test]
    fn base_url_keeps_existing_scheme() {
        let ctx = StyleContext { base_domain: "http://localhost:8080".into(), public_dir: PathBuf::from(".") };
        assert_eq!(ctx.base_url(), "http://localhost:8080");
    }

    #[test]
    fn geometry_type_name_matches_spec_strings() {
        assert_eq!(geometry_type_name(GeometryType::Point), "Point");
        assert_eq!(geometry_type_name(GeometryType::LineString), "LineString");
        assert_eq!(geometry_type_name(GeometryType::Polygon), "Polygon");
    }
}
