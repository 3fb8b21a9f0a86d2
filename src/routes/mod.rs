//! HTTP surface (spec.md §6). Grounded on the teacher's
//! `server/src/main.rs`: same CORS/CSP/compression/trace middleware stack,
//! generalized from its two static JSON endpoints to the full tile/style/
//! spatial/metadata/fonts route set.

pub mod fonts;
pub mod health;
pub mod metadata;
pub mod spatial;
pub mod state;
pub mod style;
pub mod tiles;

use std::time::Duration;

use axum::http::header::{ACCEPT, CONTENT_SECURITY_POLICY, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

pub use state::AppState;

const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'self'; object-src 'none'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; font-src 'self'; connect-src 'self'; form-action 'self'; frame-ancestors 'none'; worker-src 'self' blob:;";

/// Builds the full application router: every handler from spec.md §6 plus
/// the ambient `/healthz` and OpenAPI/Swagger UI surface, wrapped in the
/// CORS/CSP/compression/trace/logging middleware stack.
pub fn router(state: AppState) -> Router {
    let cors_origin = state
        .config
        .server
        .cors_origins
        .first()
        .cloned()
        .unwrap_or_else(|| "*".to_string());
    let cors_origin: HeaderValue = cors_origin.parse().unwrap_or_else(|_| HeaderValue::from_static("*"));

    let openapi_spec = crate::openapi::generate_openapi_spec(
        &format!("https://{}", state.config.paths.base_domain),
        env!("CARGO_PKG_VERSION"),
    );
    let openapi: utoipa::openapi::OpenApi =
        serde_json::from_value(openapi_spec).expect("generated OpenAPI document is well-formed");

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/tiles/{layer}/{z}/{x}/{y}", get(tiles::public_tile))
        .route("/tiles-with-permission/{layer}/{z}/{x}/{y}", get(tiles::permissioned_tile))
        .route("/saved-tiles/{layer}/{z}/{x}/{y}", get(tiles::saved_tile))
        .route("/save-tile/{layer}", get(tiles::save_tile))
        .route("/mapserver/api/map/{id}", get(style::map_style))
        .route(
            "/mapserver/api/spatial/{layer}/{relationship}",
            axum::routing::post(spatial::spatial_query),
        )
        .route("/mapserver/api/map-data", axum::routing::post(spatial::map_data))
        .route("/mapserver/api/filter-options", get(metadata::filter_options))
        .route("/mapserver/api/geometry-tables", get(metadata::geometry_tables))
        .route("/mapserver/api/table-columns/{schema}/{table}", get(metadata::table_columns))
        .route("/fonts/{fontstack}/{range}", get(fonts::font_glyphs))
        .merge(SwaggerUi::new("/api-docs/swagger-ui").url("/api-docs/openapi.json", openapi))
        .with_state(state)
        .layer(axum::middleware::from_fn(crate::logging::request_logger))
        .layer(
            CorsLayer::new()
                .allow_headers([ACCEPT, CONTENT_TYPE])
                .max_age(Duration::from_secs(86_400))
                .allow_origin(cors_origin)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS, Method::HEAD]),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
