//! `GET /fonts/:fontstack/:range.pbf` (spec.md §6). Serves from the local
//! fonts directory first, falling back to fonts.openmaptiles.org and
//! caching the result, the way the teacher's `server/src/main.rs` serves
//! `./public` via `ServeDir` with a filesystem-first policy.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::{Result, TileServerError};

use super::state::AppState;

const UPSTREAM_BASE: &str = "https://fonts.openmaptiles.org";

pub async fn font_glyphs(State(state): State<AppState>, Path((fontstack, range)): Path<(String, String)>) -> Result<Response> {
    let range = range.strip_suffix(".pbf").unwrap_or(&range);
    let filename = format!("{range}.pbf");
    let local_path = state.config.paths.fonts_dir.join(&fontstack).join(&filename);

    if let Ok(bytes) = tokio::fs::read(&local_path).await {
        return Ok(glyph_response(bytes.into()));
    }

    let url = format!("{UPSTREAM_BASE}/{fontstack}/{filename}");
    let resp = reqwest::get(&url)
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("font fetch failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(TileServerError::NotFound(format!("font glyphs {fontstack}/{filename}")));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| TileServerError::Internal(anyhow::anyhow!("font fetch body failed: {e}")))?;

    let dir = state.config.paths.fonts_dir.join(&fontstack);
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(&filename), &bytes).await?;

    Ok(glyph_response(bytes))
}

fn glyph_response(bytes: bytes::Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/x-protobuf")], bytes).into_response()
}
