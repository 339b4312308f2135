//! holocron-api library - read API over the catalog database
//!
//! Species and starship listings, single-record lookups and the
//! family-grouped starship view.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let catalog = Router::new()
        .route("/species", get(api::list_species))
        .route("/species/:slug", get(api::get_species))
        .route("/starships", get(api::list_starships))
        .route("/starships/families", get(api::list_families))
        .route("/starships/:slug", get(api::get_starship));

    Router::new()
        .merge(catalog)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
