//! Shared application state threaded through every handler (spec.md §6
//! Collaborator interfaces). Grounded on the teacher's `server/src/main.rs`
//! prototype, which builds its router from plain constructor arguments
//! rather than a framework-managed DI container.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::UserProvider;
use crate::config::Config;
use crate::db::PostgresPool;
use crate::layers::LayerCache;
use crate::spatial::{FeaturePicker, SpatialEngine};
use crate::sql::ColumnTypeCache;
use crate::tiles::TileEngine;

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<PostgresPool>,
    pub layers: Arc<LayerCache>,
    pub columns: Arc<ColumnTypeCache>,
    pub tile_engine: TileEngine,
    pub spatial_engine: SpatialEngine,
    pub feature_picker: FeaturePicker,
    pub config: Arc<Config>,
    pub user_provider: Arc<dyn UserProvider>,
}

impl AppState {
    pub fn new(pool: Arc<PostgresPool>, config: Arc<Config>, user_provider: Arc<dyn UserProvider>) -> Self {
        let layers = Arc::new(LayerCache::with_settings(
            pool.clone(),
            std::time::Duration::from_secs(config.cache.layer_ttl_seconds),
            config.cache.layer_cost_budget,
        ));
        let columns = Arc::new(ColumnTypeCache::new());
        let tile_engine = TileEngine::new(pool.clone(), layers.clone(), columns.clone());
        let spatial_engine = SpatialEngine::new(pool.clone(), layers.clone());
        let feature_picker = FeaturePicker::new(pool.clone(), layers.clone());

        Self { pool, layers, columns, tile_engine, spatial_engine, feature_picker, config, user_provider }
    }
}

impl FromRef<AppState> for Arc<dyn UserProvider> {
    fn from_ref(state: &AppState) -> Self {
        state.user_provider.clone()
    }
}
