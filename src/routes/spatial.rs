//! `POST /mapserver/api/spatial/:layer/:relationship` and
//! `POST /mapserver/api/map-data` (spec.md §6). Thin adapters over C4's
//! [`SpatialEngine`] and C6's [`FeaturePicker`].

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, TileServerError};
use crate::spatial::{PickedLayer, SpatialRequest as EngineSpatialRequest};

use super::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialRequestBody {
    pub geometry: String,
    #[serde(default)]
    pub return_geometry: bool,
    #[serde(default)]
    pub out_fields: Option<String>,
}

pub async fn spatial_query(
    State(state): State<AppState>,
    Path((layer, relationship)): Path<(String, String)>,
    Json(body): Json<SpatialRequestBody>,
) -> Result<Json<Vec<Map<String, Value>>>> {
    if body.geometry.trim().is_empty() {
        return Err(TileServerError::BadRequest("geometry is required".into()));
    }

    let request = EngineSpatialRequest {
        geometry: body.geometry,
        return_geometry: body.return_geometry,
        out_fields: body.out_fields,
    };

    let rows = state.spatial_engine.spatial(&layer, &relationship, &request).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct MapDataRequestBody {
    pub geometry: String,
    pub layers: Vec<String>,
}

pub async fn map_data(
    State(state): State<AppState>,
    Json(body): Json<MapDataRequestBody>,
) -> Result<Json<Vec<PickedLayer>>> {
    if body.geometry.trim().is_empty() {
        return Err(TileServerError::BadRequest("geometry is required".into()));
    }
    if body.layers.is_empty() {
        return Err(TileServerError::BadRequest("layers must not be empty".into()));
    }

    let picked = state.feature_picker.pick(&body.geometry, &body.layers).await?;
    Ok(Json(picked))
}
