use sqlx::SqlitePool;

use super::StarshipStore;
use crate::catalog::{Category, Lineage, Starship};
use crate::db::{starships, FieldPatch};
use crate::Result;

/// Store backed by the relational database
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StarshipStore for SqliteStore {
    async fn load_starships(&self, category: Option<Category>) -> Result<Vec<Starship>> {
        starships::load_all_starships(&self.pool, category).await
    }

    async fn set_lineage(&self, slug: &str, lineage: &Lineage) -> Result<bool> {
        starships::set_lineage(&self.pool, slug, lineage).await
    }

    async fn apply_patch(&self, slug: &str, patch: &FieldPatch) -> Result<bool> {
        starships::apply_patch(&self.pool, slug, patch).await
    }
}
