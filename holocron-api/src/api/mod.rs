//! HTTP API handlers for holocron-api

pub mod error;
pub mod health;
pub mod species;
pub mod starships;

pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use species::{get_species, list_species};
pub use starships::{get_starship, list_families, list_starships};
