//! Species endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use holocron_common::db::{species, LIST_LIMIT};
use holocron_common::Species;

use super::{ApiError, ApiResult};
use crate::AppState;

/// GET /species
///
/// Ordered by name, at most `LIST_LIMIT` rows.
pub async fn list_species(State(state): State<AppState>) -> ApiResult<Json<Vec<Species>>> {
    let rows = species::list_species(&state.db, LIST_LIMIT).await?;
    Ok(Json(rows))
}

/// GET /species/:slug
pub async fn get_species(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<Species>> {
    species::get_species(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("species '{}'", slug)))
}
