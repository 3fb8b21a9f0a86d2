//! `GET /tiles/...`, `/tiles-with-permission/...`, `/saved-tiles/...`,
//! `/save-tile/...` (spec.md §6). Thin HTTP adapters over C3's
//! [`TileEngine`]; all tile-composition logic lives there.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::{Result, TileServerError};
use crate::tiles::AreaFilters;

use super::state::AppState;

const TILE_CONTENT_TYPE: &str = "application/vnd.mapbox-vector-tile";
/// Query keys consumed as area scoping rather than passed through as
/// generic admin filters (spec.md §4.3 step 5).
const AREA_KEYS: [&str; 2] = ["districtID", "regionID"];

fn split_tile_coordinate(raw: &str) -> Result<u32> {
    let trimmed = raw.strip_suffix(".pbf").unwrap_or(raw);
    trimmed
        .parse::<u32>()
        .map_err(|_| TileServerError::BadRequest(format!("invalid tile coordinate: {raw}")))
}

fn split_params(mut params: HashMap<String, String>) -> (Vec<(String, String)>, AreaFilters) {
    let area = AreaFilters {
        district_id: params.remove("districtID"),
        region_id: params.remove("regionID"),
    };
    let admin_filters = params.into_iter().filter(|(k, _)| !AREA_KEYS.contains(&k.as_str())).collect();
    (admin_filters, area)
}

fn tile_response(bytes: bytes::Bytes) -> Response {
    (
        [(header::CONTENT_TYPE, TILE_CONTENT_TYPE)],
        [(header::CACHE_CONTROL, crate::cache_control::tile_cache_headers())],
        bytes,
    )
        .into_response()
}

async fn compose_tile(
    state: &AppState,
    layer: &str,
    z: &str,
    x: &str,
    y_pbf: &str,
    user: Option<&crate::layers::AuthenticatedUser>,
    params: HashMap<String, String>,
) -> Result<Response> {
    let z: u8 = z.parse().map_err(|_| TileServerError::BadRequest(format!("invalid zoom: {z}")))?;
    let x: u32 = x.parse().map_err(|_| TileServerError::BadRequest(format!("invalid x: {x}")))?;
    let y = split_tile_coordinate(y_pbf)?;

    let (admin_filters, area) = split_params(params);
    let bytes = state.tile_engine.tile(layer, z, x, y, user, &admin_filters, area).await?;
    Ok(tile_response(bytes))
}

/// `GET /tiles/:layer/:z/:x/:y.pbf` — public, unauthenticated.
pub async fn public_tile(
    State(state): State<AppState>,
    Path((layer, z, x, y_pbf)): Path<(String, String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    compose_tile(&state, &layer, &z, &x, &y_pbf, None, params).await
}

/// `GET /tiles-with-permission/:layer/:z/:x/:y.pbf` — enforces role/user
/// permission sets against the authenticated caller.
pub async fn permissioned_tile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((layer, z, x, y_pbf)): Path<(String, String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    compose_tile(&state, &layer, &z, &x, &y_pbf, Some(&user), params).await
}

/// `GET /saved-tiles/:layer/:z/:x/:y.pbf` — serves a pre-baked file if
/// present, else falls through to live generation (spec.md §6).
pub async fn saved_tile(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path((layer, z, x, y_pbf)): Path<(String, String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    let y_num = split_tile_coordinate(&y_pbf)?;
    let path = state
        .config
        .paths
        .public_dir
        .join("saved-tiles")
        .join(&layer)
        .join(&z)
        .join(&x)
        .join(format!("{y_num}.pbf"));

    if let Ok(bytes) = tokio::fs::read(&path).await {
        return Ok(tile_response(bytes.into()));
    }

    compose_tile(&state, &layer, &z, &x, &y_pbf, user.as_ref(), params).await
}

/// `GET /save-tile/:layer` — walks a bbox across zooms 0..=18 and writes
/// each generated tile under `./public/saved-tiles/<layer>/<z>/<x>/<y>.pbf`
/// (spec.md §6).
pub async fn save_tile(State(state): State<AppState>, Path(layer): Path<String>) -> Result<Response> {
    const MAX_ZOOM: u8 = 18;

    let mut written = 0usize;
    for z in 0..=MAX_ZOOM {
        let n = 1u32 << z;
        for x in 0..n {
            for y in 0..n {
                let bytes = state
                    .tile_engine
                    .tile(&layer, z, x, y, None, &[], AreaFilters::default())
                    .await?;
                if bytes.is_empty() {
                    continue;
                }

                let dir = state.config.paths.public_dir.join("saved-tiles").join(&layer).join(z.to_string()).join(x.to_string());
                tokio::fs::create_dir_all(&dir).await?;
                tokio::fs::write(dir.join(format!("{y}.pbf")), &bytes).await?;
                written += 1;
            }
        }
    }

    Ok(axum::Json(serde_json::json!({ "layer": layer, "tiles_written": written })).into_response())
}
