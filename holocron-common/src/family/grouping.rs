//! Family-first display grouping
//!
//! Reshapes a flat record list into one entry per family without touching
//! storage. Variants attach to the real base named by their `parent`; when no
//! such base exists a synthetic placeholder entry stands in for it.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::{Category, Starship};
use crate::slug::{slugify, SlugAllocator};

/// One top-level entry of the grouped view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyEntry {
    /// Real slug, or a `family-...` key for synthetic entries
    pub key: String,
    /// Representative record
    pub record: Starship,
    pub synthetic: bool,
    pub variants: Vec<Starship>,
}

impl FamilyEntry {
    fn real(record: Starship) -> Self {
        Self {
            key: record.slug.clone(),
            record,
            synthetic: false,
            variants: Vec::new(),
        }
    }

    /// Records reachable through this entry (the synthetic placeholder itself excluded)
    pub fn member_count(&self) -> usize {
        self.variants.len() + usize::from(!self.synthetic)
    }
}

/// Group a flat record list by family
///
/// Output order: real top-level records in input order, then synthetic
/// entries in the order their parent name was first seen. Every input
/// record is reachable exactly once. A variant without a `parent` cannot be
/// bucketed and is kept top-level.
pub fn group_families(records: &[Starship]) -> Vec<FamilyEntry> {
    let mut keys = SlugAllocator::with_taken(records.iter().map(|r| r.slug.clone()));
    let all: Vec<&Starship> = records.iter().collect();
    group_into(&all, &mut keys)
}

/// Group each category on its own, then concatenate in `Category::ALL` order
///
/// A variant only attaches to a base of its own category. Synthetic keys
/// stay unique across the whole output.
pub fn group_families_by_category(records: &[Starship]) -> Vec<FamilyEntry> {
    let mut keys = SlugAllocator::with_taken(records.iter().map(|r| r.slug.clone()));

    Category::ALL
        .iter()
        .flat_map(|category| {
            let subset: Vec<&Starship> = records.iter().filter(|r| r.category == *category).collect();
            group_into(&subset, &mut keys)
        })
        .collect()
}

fn group_into(records: &[&Starship], keys: &mut SlugAllocator) -> Vec<FamilyEntry> {
    let mut entries: Vec<FamilyEntry> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    let mut bucket_order: Vec<&str> = Vec::new();
    let mut buckets: HashMap<&str, Vec<&Starship>> = HashMap::new();

    for &record in records {
        match (record.is_variant, record.parent.as_deref()) {
            (true, Some(parent)) => {
                buckets
                    .entry(parent)
                    .or_insert_with(|| {
                        bucket_order.push(parent);
                        Vec::new()
                    })
                    .push(record);
            }
            _ => {
                by_name.entry(record.name.as_str()).or_insert(entries.len());
                entries.push(FamilyEntry::real(record.clone()));
            }
        }
    }

    for parent in bucket_order {
        let variants: Vec<Starship> = buckets
            .remove(parent)
            .unwrap_or_default()
            .into_iter()
            .cloned()
            .collect();

        if let Some(&index) = by_name.get(parent) {
            entries[index].variants.extend(variants);
            continue;
        }

        let Some(first) = variants.first() else {
            continue;
        };

        let mut placeholder = first.clone();
        placeholder.name = parent.to_string();
        placeholder.parent = None;
        placeholder.is_variant = false;

        let key = keys.allocate(&synthetic_key(parent), None);
        placeholder.slug = key.clone();

        entries.push(FamilyEntry {
            key,
            record: placeholder,
            synthetic: true,
            variants,
        });
    }

    entries
}

/// Stable key for a synthetic entry: `family-<slug of parent name>`
pub fn synthetic_key(parent: &str) -> String {
    let slug = slugify(parent);
    if slug.is_empty() {
        "family".to_string()
    } else {
        format!("family-{}", slug)
    }
}
