use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use super::StarshipStore;
use crate::catalog::{Category, Lineage, Starship};
use crate::db::FieldPatch;
use crate::{Error, Result};

/// In-memory store keyed by slug
///
/// Writes to slugs registered with [`MemoryStore::fail_writes_for`] are
/// rejected, standing in for a store that refuses individual records.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Starship>>,
    failing: Mutex<HashSet<String>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new(records: impl IntoIterator<Item = Starship>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.slug.clone(), r)).collect()),
            ..Self::default()
        }
    }

    pub fn fail_writes_for(&self, slug: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(slug.to_string());
        }
    }

    pub fn get(&self, slug: &str) -> Option<Starship> {
        self.records.lock().ok()?.get(slug).cloned()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }

    fn write<F>(&self, slug: &str, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut Starship),
    {
        let rejected = self
            .failing
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))?
            .contains(slug);
        if rejected {
            return Err(Error::Internal(format!("write rejected for '{}'", slug)));
        }

        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))?;

        match records.get_mut(slug) {
            Some(record) => {
                apply(record);
                if let Ok(mut writes) = self.writes.lock() {
                    *writes += 1;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl StarshipStore for MemoryStore {
    async fn load_starships(&self, category: Option<Category>) -> Result<Vec<Starship>> {
        let records = self
            .records
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))?;

        let mut ships: Vec<Starship> = records
            .values()
            .filter(|r| category.map_or(true, |c| r.category == c))
            .cloned()
            .collect();
        ships.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
        Ok(ships)
    }

    async fn set_lineage(&self, slug: &str, lineage: &Lineage) -> Result<bool> {
        self.write(slug, |record| record.set_lineage(lineage))
    }

    async fn apply_patch(&self, slug: &str, patch: &FieldPatch) -> Result<bool> {
        if patch.is_empty() {
            return Err(Error::InvalidInput(format!("Empty patch for '{}'", slug)));
        }

        self.write(slug, |record| {
            for (field, value) in patch {
                *record.field_mut(*field) = value.clone();
            }
        })
    }
}
