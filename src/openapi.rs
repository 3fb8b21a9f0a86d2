//! OpenAPI 3.1 specification for the vector-tile map server API.
//!
//! This module provides the OpenAPI specification as a static JSON document,
//! mounted behind Swagger UI the way the teacher wires `utoipa`/
//! `utoipa-swagger-ui` in its own `main.rs`.

use serde_json::{json, Value};

/// Generate the OpenAPI specification (spec.md §6 HTTP surface).
pub fn generate_openapi_spec(base_url: &str, version: &str) -> Value {
    json!({
        "openapi": "3.1.0",
        "info": {
            "title": "tileserver-rs API",
            "description": "Vector-tile map server: PostGIS-backed MVT tiles, a MapLibre style composer, spatial queries and feature picking",
            "version": version,
            "license": {
                "name": "MIT",
                "url": "https://github.com/vinayakkulkarni/tileserver-rs/blob/main/LICENSE"
            }
        },
        "servers": [
            { "url": base_url, "description": "Current server" }
        ],
        "tags": [
            { "name": "Tiles", "description": "MVT tile generation" },
            { "name": "Style", "description": "Map style composition" },
            { "name": "Spatial", "description": "Ad-hoc spatial queries and feature picking" },
            { "name": "Metadata", "description": "Layer/table/filter metadata" },
            { "name": "Fonts", "description": "Font glyphs for map labels" }
        ],
        "paths": {
            "/tiles/{layer}/{z}/{x}/{y}.pbf": {
                "get": {
                    "tags": ["Tiles"],
                    "summary": "Public vector tile",
                    "operationId": "getPublicTile",
                    "parameters": tile_path_params(),
                    "responses": tile_responses()
                }
            },
            "/tiles-with-permission/{layer}/{z}/{x}/{y}.pbf": {
                "get": {
                    "tags": ["Tiles"],
                    "summary": "Permission-enforced vector tile",
                    "description": "As /tiles/, but requires an authenticated user and enforces role/user permission sets",
                    "operationId": "getPermissionedTile",
                    "parameters": tile_path_params(),
                    "responses": tile_responses()
                }
            },
            "/saved-tiles/{layer}/{z}/{x}/{y}.pbf": {
                "get": {
                    "tags": ["Tiles"],
                    "summary": "Pre-baked tile, falling back to live generation",
                    "operationId": "getSavedTile",
                    "parameters": tile_path_params(),
                    "responses": tile_responses()
                }
            },
            "/save-tile/{layer}": {
                "get": {
                    "tags": ["Tiles"],
                    "summary": "Walk a bbox across zooms and write tiles under ./public/saved-tiles",
                    "operationId": "saveTiles",
                    "parameters": [
                        { "name": "layer", "in": "path", "required": true, "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "200": { "description": "Tiles written" }
                    }
                }
            },
            "/mapserver/api/map/{id}": {
                "get": {
                    "tags": ["Style"],
                    "summary": "Compose the style document for a map",
                    "operationId": "getMapStyle",
                    "parameters": [
                        { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "generate", "in": "query", "schema": { "type": "boolean" }, "description": "Side-write style JSON + sprites to disk" },
                        { "name": "secure", "in": "query", "schema": { "type": "boolean" }, "description": "Use /tiles-with-permission/ source URLs" }
                    ],
                    "responses": {
                        "200": {
                            "description": "Style document",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/StyleDocument" } } }
                        },
                        "404": { "description": "Map not found" }
                    }
                }
            },
            "/mapserver/api/spatial/{layer}/{relationship}": {
                "post": {
                    "tags": ["Spatial"],
                    "summary": "Evaluate a spatial relationship against a layer",
                    "operationId": "spatialQuery",
                    "parameters": [
                        { "name": "layer", "in": "path", "required": true, "schema": { "type": "string" } },
                        {
                            "name": "relationship", "in": "path", "required": true,
                            "schema": { "type": "string", "enum": ["contains", "crosses", "disjoint", "equals", "intersects", "overlaps", "within", "touches"] }
                        }
                    ],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/SpatialRequest" } } }
                    },
                    "responses": {
                        "200": {
                            "description": "Matching rows",
                            "content": { "application/json": { "schema": { "type": "array", "items": { "type": "object" } } } }
                        },
                        "400": { "description": "Invalid relationship name" },
                        "404": { "description": "Layer not found" }
                    }
                }
            },
            "/mapserver/api/map-data": {
                "post": {
                    "tags": ["Spatial"],
                    "summary": "Feature picking across a set of layers",
                    "operationId": "pickFeatures",
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/MapDataRequest" } } }
                    },
                    "responses": {
                        "200": {
                            "description": "Feature groups, one per non-empty layer",
                            "content": { "application/json": { "schema": { "type": "array", "items": { "$ref": "#/components/schemas/PickedLayer" } } } }
                        },
                        "400": { "description": "Invalid or missing WKT geometry" }
                    }
                }
            },
            "/mapserver/api/filter-options": {
                "get": {
                    "tags": ["Metadata"],
                    "summary": "Cascaded filter option lists",
                    "operationId": "getFilterOptions",
                    "parameters": [
                        { "name": "ids", "in": "query", "required": true, "schema": { "type": "string" }, "description": "Comma-separated filter descriptor ids" }
                    ],
                    "responses": { "200": { "description": "Filter options keyed by filter id" } }
                }
            },
            "/mapserver/api/geometry-tables": {
                "get": {
                    "tags": ["Metadata"],
                    "summary": "List geometry-bearing tables",
                    "operationId": "listGeometryTables",
                    "responses": { "200": { "description": "Rows from geometry_columns" } }
                }
            },
            "/mapserver/api/table-columns/{schema}/{table}": {
                "get": {
                    "tags": ["Metadata"],
                    "summary": "List a table's columns with PostgreSQL types",
                    "operationId": "listTableColumns",
                    "parameters": [
                        { "name": "schema", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "table", "in": "path", "required": true, "schema": { "type": "string" } }
                    ],
                    "responses": { "200": { "description": "Column name/type pairs" } }
                }
            },
            "/fonts/{fontstack}/{range}.pbf": {
                "get": {
                    "tags": ["Fonts"],
                    "summary": "Font glyph range, served locally or fetched from fonts.openmaptiles.org",
                    "operationId": "getFontGlyphs",
                    "parameters": [
                        { "name": "fontstack", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "range", "in": "path", "required": true, "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "200": { "description": "PBF glyph data", "content": { "application/x-protobuf": { "schema": { "type": "string", "format": "binary" } } } }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "VectorSource": {
                    "type": "object",
                    "properties": {
                        "type": { "type": "string", "enum": ["vector"] },
                        "tiles": { "type": "array", "items": { "type": "string" } }
                    }
                },
                "StyleDocument": {
                    "type": "object",
                    "required": ["id", "version", "sources", "sprite", "layers"],
                    "properties": {
                        "id": { "type": "string" },
                        "title": { "type": "string" },
                        "version": { "type": "integer" },
                        "sources": { "type": "object", "additionalProperties": { "$ref": "#/components/schemas/VectorSource" } },
                        "sprite": { "type": "string" },
                        "layers": { "type": "array", "items": { "type": "object" } },
                        "categories": { "type": "array", "items": { "type": "object" } },
                        "filters": { "type": "array", "items": { "type": "object" } }
                    }
                },
                "SpatialRequest": {
                    "type": "object",
                    "required": ["geometry"],
                    "properties": {
                        "geometry": { "type": "string", "description": "WKT geometry" },
                        "returnGeometry": { "type": "boolean", "default": false },
                        "outFields": { "type": "string", "description": "`*`, empty, or comma-separated column list" }
                    }
                },
                "MapDataRequest": {
                    "type": "object",
                    "required": ["geometry", "layers"],
                    "properties": {
                        "geometry": { "type": "string", "description": "WKT geometry; POINT/LINESTRING/POLYGON only" },
                        "layers": { "type": "array", "items": { "type": "string" } }
                    }
                },
                "PickedLayer": {
                    "type": "object",
                    "properties": {
                        "layer_id": { "type": "string" },
                        "layer_name": { "type": "string" },
                        "features": { "type": "array", "items": { "type": "object" } }
                    }
                },
                "Error": {
                    "type": "object",
                    "required": ["status", "message"],
                    "properties": {
                        "status": { "type": "string", "enum": ["error"] },
                        "message": { "type": "string" }
                    }
                }
            }
        }
    })
}

fn tile_path_params() -> Value {
    json!([
        { "name": "layer", "in": "path", "required": true, "schema": { "type": "string" } },
        { "name": "z", "in": "path", "required": true, "schema": { "type": "integer", "minimum": 0, "maximum": 22 } },
        { "name": "x", "in": "path", "required": true, "schema": { "type": "integer", "minimum": 0 } },
        { "name": "y", "in": "path", "required": true, "schema": { "type": "integer", "minimum": 0 } }
    ])
}

fn tile_responses() -> Value {
    json!({
        "200": {
            "description": "Mapbox Vector Tile",
            "content": {
                "application/vnd.mapbox-vector-tile": { "schema": { "type": "string", "format": "binary" } }
            }
        },
        "400": { "description": "Invalid tile coordinates" },
        "403": { "description": "Permission denied" },
        "404": { "description": "Layer not found" }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_expected_structure() {
        let spec = generate_openapi_spec("http://localhost:8080", "1.0.0");
        assert_eq!(spec["openapi"], "3.1.0");
        assert_eq!(spec["info"]["version"], "1.0.0");
        assert_eq!(spec["servers"][0]["url"], "http://localhost:8080");
    }

    #[test]
    fn covers_every_http_surface_path() {
        let spec = generate_openapi_spec("http://localhost:8080", "1.0.0");
        let paths = spec["paths"].as_object().unwrap();
        let expected = [
            "/tiles/{layer}/{z}/{x}/{y}.pbf",
            "/tiles-with-permission/{layer}/{z}/{x}/{y}.pbf",
            "/saved-tiles/{layer}/{z}/{x}/{y}.pbf",
            "/save-tile/{layer}",
            "/mapserver/api/map/{id}",
            "/mapserver/api/spatial/{layer}/{relationship}",
            "/mapserver/api/map-data",
            "/mapserver/api/filter-options",
            "/mapserver/api/geometry-tables",
            "/mapserver/api/table-columns/{schema}/{table}",
            "/fonts/{fontstack}/{range}.pbf",
        ];
        for path in expected {
            assert!(paths.contains_key(path), "missing path: {path}");
        }
    }
}
