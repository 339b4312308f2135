//! Parent reference normalization
//!
//! Stored `parent` values always name the base record by display name.
//! Older data also holds wiki markup (`[[Running the B-wing]]`, `'''TIE'''`)
//! and slugs (`tie-starfighter`); this module maps those onto names once.

use std::collections::{HashMap, HashSet};

use crate::catalog::{Lineage, Starship};

/// Strip wiki markup and page-title decoration from a raw parent value
///
/// Returns `None` when nothing meaningful remains.
pub fn clean_parent_reference(raw: &str) -> Option<String> {
    let mut text = raw.replace("'''", "").replace("[[", "").replace("]]", "");
    text = text.trim().to_string();

    const PREFIX: &str = "running the ";
    if text.len() >= PREFIX.len() && text.is_char_boundary(PREFIX.len()) && text[..PREFIX.len()].eq_ignore_ascii_case(PREFIX) {
        text = text[PREFIX.len()..].trim_start().to_string();
    }

    const SUFFIX: &str = " description";
    if text.len() >= SUFFIX.len() {
        let split = text.len() - SUFFIX.len();
        if text.is_char_boundary(split) && text[split..].eq_ignore_ascii_case(SUFFIX) {
            text.truncate(split);
        }
    }

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Lineage corrections that bring every stored `parent` to name form
///
/// A cleaned parent that matches no record name but equals some record's
/// slug is replaced by that record's name. A parent that cleans to nothing
/// demotes the record to a standalone base. Records already in canonical
/// form produce no entry, so the plan is empty on a second run.
pub fn plan_parent_migration(records: &[Starship]) -> Vec<(String, Lineage)> {
    let names: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let by_slug: HashMap<&str, &str> = records.iter().map(|r| (r.slug.as_str(), r.name.as_str())).collect();

    records
        .iter()
        .filter_map(|record| {
            let raw = record.parent.as_deref()?;

            let target = match clean_parent_reference(raw) {
                None => Lineage::base(),
                Some(cleaned) => {
                    let name = if names.contains(cleaned.as_str()) {
                        cleaned
                    } else {
                        by_slug.get(cleaned.as_str()).map(|n| n.to_string()).unwrap_or(cleaned)
                    };
                    Lineage {
                        parent: Some(name),
                        is_variant: record.is_variant,
                    }
                }
            };

            (target != record.lineage()).then(|| (record.slug.clone(), target))
        })
        .collect()
}
