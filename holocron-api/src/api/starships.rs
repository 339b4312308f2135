//! Starship endpoints
//!
//! `/starships/families` serves the family-first view: the full category is
//! loaded uncapped so that no variant loses its family to the listing limit.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use holocron_common::db::{starships, LIST_LIMIT};
use holocron_common::family::{group_families, group_families_by_category, FamilyEntry};
use holocron_common::{Category, Starship};
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

impl CategoryQuery {
    /// Parsed category filter; an empty value means no filter
    fn category(&self) -> ApiResult<Option<Category>> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(ApiError::from),
        }
    }
}

/// GET /starships?category=
pub async fn list_starships(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<Vec<Starship>>> {
    let category = query.category()?;
    let rows = starships::list_starships(&state.db, category, LIST_LIMIT).await?;
    Ok(Json(rows))
}

/// GET /starships/families?category=
pub async fn list_families(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<Vec<FamilyEntry>>> {
    let category = query.category()?;
    let rows = starships::load_all_starships(&state.db, category).await?;
    // Variants never attach across categories
    let entries = match category {
        Some(_) => group_families(&rows),
        None => group_families_by_category(&rows),
    };
    Ok(Json(entries))
}

/// GET /starships/:slug
pub async fn get_starship(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<Starship>> {
    starships::get_starship(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("starship '{}'", slug)))
}
