//! `GET /mapserver/api/map/:id` (spec.md §6). Thin adapter over C5's
//! [`build_style`].

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::MaybeAuthUser;
use crate::error::Result;
use crate::style::{build_style, StyleContext, StyleDocument};

use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StyleParams {
    #[serde(default)]
    pub generate: bool,
    #[serde(default)]
    pub secure: bool,
}

pub async fn map_style(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(map_id): Path<String>,
    Query(params): Query<StyleParams>,
) -> Result<Json<StyleDocument>> {
    let ctx = StyleContext {
        base_domain: state.config.paths.base_domain.clone(),
        public_dir: state.config.paths.public_dir.clone(),
    };

    let doc = build_style(&state.pool, &state.layers, &map_id, &ctx, params.secure, user.as_ref(), params.generate)
        .await?;

    Ok(Json(doc))
}
