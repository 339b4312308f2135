//! Field patch job
//!
//! ```json
//! {
//!   "records": [
//!     { "slug": "yt-1300", "fields": { "imageUrl": "/starships/yt-1300.webp", "hull": null } }
//!   ]
//! }
//! ```
//!
//! Field names are the starship JSON names; `null` clears a field.

use std::collections::HashSet;

use holocron_common::db::FieldPatch;
use holocron_common::{Error, Result, StarshipStore};
use serde::Deserialize;
use tracing::info;

use crate::runner::{BatchOptions, BatchSummary, Pacer};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatchFile {
    records: Vec<PatchRecord>,
}

/// Field updates for one record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchRecord {
    pub slug: String,
    pub fields: FieldPatch,
}

/// Parse and validate a patch file
pub fn parse_patch_file(text: &str) -> Result<Vec<PatchRecord>> {
    let file: PatchFile =
        serde_json::from_str(text).map_err(|e| Error::InvalidInput(format!("invalid patch file: {}", e)))?;

    for (position, record) in file.records.iter().enumerate() {
        if record.slug.trim().is_empty() {
            return Err(Error::InvalidInput(format!("record #{}: empty slug", position + 1)));
        }
        if record.fields.is_empty() {
            return Err(Error::InvalidInput(format!(
                "record #{} ({}): no fields to patch",
                position + 1,
                record.slug
            )));
        }
    }

    Ok(file.records)
}

/// Apply each patch in order
///
/// Only a dry run reads the store first, to tell unknown slugs apart.
pub async fn run_patch<S: StarshipStore>(
    store: &S,
    records: &[PatchRecord],
    options: &BatchOptions,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    if options.dry_run {
        let known: HashSet<String> = store.load_starships(None).await?.into_iter().map(|s| s.slug).collect();
        for record in records {
            if known.contains(&record.slug) {
                summary.record_planned(&record.slug, format!("{} field(s)", record.fields.len()));
            } else {
                summary.record(&record.slug, Ok(false));
            }
        }
        info!("Patch job (dry run): {}", summary);
        return Ok(summary);
    }

    let mut pacer = Pacer::new(options);
    for record in records {
        pacer.wait().await;
        let outcome = store.apply_patch(&record.slug, &record.fields).await;
        summary.record(&record.slug, outcome);
    }

    info!("Patch job: {}", summary);
    Ok(summary)
}
