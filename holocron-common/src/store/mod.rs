//! Starship store abstraction
//!
//! Batch passes (resolver, patch job, parent migration) take an explicitly
//! constructed store handle so they run unchanged against the SQLite store
//! or the in-memory store used in tests.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::catalog::{Category, Lineage, Starship};
use crate::db::FieldPatch;
use crate::Result;

/// Read/write access to starship records
#[allow(async_fn_in_trait)]
pub trait StarshipStore {
    /// Every record, optionally restricted to one category, ordered by name
    async fn load_starships(&self, category: Option<Category>) -> Result<Vec<Starship>>;

    /// Write `parent`/`isVariant`; `Ok(false)` when the slug is unknown
    async fn set_lineage(&self, slug: &str, lineage: &Lineage) -> Result<bool>;

    /// Overwrite text fields; `Ok(false)` when the slug is unknown
    async fn apply_patch(&self, slug: &str, patch: &FieldPatch) -> Result<bool>;
}
