//! # Holocron Common Library
//!
//! Shared code for the Holocron catalog service and batch tooling:
//! - Catalog record models (species, starships)
//! - Database initialization, schema sync and queries
//! - Slug derivation
//! - Starship family resolution and display grouping
//! - Store abstraction (SQLite and in-memory)
//! - Configuration loading

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod family;
pub mod slug;
pub mod store;

pub use catalog::{Category, Lineage, ShipField, Species, Starship};
pub use error::{Error, Result};
pub use store::StarshipStore;
