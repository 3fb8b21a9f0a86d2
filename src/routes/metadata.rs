//! `GET /mapserver/api/filter-options`, `/geometry-tables`,
//! `/table-columns/:schema/:table` (spec.md §6). Thin adapters over
//! [`crate::metadata`].

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::metadata::{self, GeometryTable, TableColumn};
use crate::style::FilterOption;

use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FilterOptionsParams {
    pub ids: String,
}

pub async fn filter_options(
    State(state): State<AppState>,
    Query(params): Query<FilterOptionsParams>,
) -> Result<Json<BTreeMap<String, Vec<FilterOption>>>> {
    let ids: Vec<String> = params.ids.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    let options = metadata::filter_options(&state.pool, &ids).await?;
    Ok(Json(options))
}

pub async fn geometry_tables(State(state): State<AppState>, AuthUser(_user): AuthUser) -> Result<Json<Vec<GeometryTable>>> {
    let tables = metadata::list_geometry_tables(&state.pool).await?;
    Ok(Json(tables))
}

pub async fn table_columns(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path((schema, table)): Path<(String, String)>,
) -> Result<Json<Vec<TableColumn>>> {
    let columns = metadata::list_table_columns(&state.pool, &schema, &table).await?;
    Ok(Json(columns))
}
