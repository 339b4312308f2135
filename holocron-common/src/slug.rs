//! Slug derivation
//!
//! Slugs are the primary key of every catalog table, so derivation must be
//! deterministic: re-importing a record must hit the same row.

use std::collections::HashSet;

/// Derive a URL-safe slug from a display name
///
/// Lowercases the name, collapses every run of characters outside `[a-z0-9]`
/// into a single `-`, and strips leading/trailing `-`.
///
/// # Examples
/// ```
/// use holocron_common::slug::slugify;
///
/// assert_eq!(slugify("TIE/sa Bomber"), "tie-sa-bomber");
/// assert_eq!(slugify("Human (Corellian)"), "human-corellian");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Slug for a source record: the explicit slug wins verbatim, otherwise
/// derived from the name. A blank explicit slug counts as absent.
pub fn record_slug(explicit: Option<&str>, name: &str) -> String {
    match explicit {
        Some(slug) if !slug.trim().is_empty() => slug.to_string(),
        _ => slugify(name),
    }
}

/// Hands out slugs that are unique within one batch
///
/// Collisions fall back to `<slug>-<id>` when the record has a source id,
/// then to `<slug>-1`, `<slug>-2`, ... Allocation depends only on the order
/// of calls, so replaying the same batch yields the same slugs.
#[derive(Debug, Default)]
pub struct SlugAllocator {
    taken: HashSet<String>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that also avoids a set of pre-existing keys
    pub fn with_taken<I, S>(taken: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: taken.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_taken(&self, slug: &str) -> bool {
        self.taken.contains(slug)
    }

    /// Reserve an exact slug; `false` when it was already taken
    pub fn reserve(&mut self, slug: &str) -> bool {
        self.taken.insert(slug.to_string())
    }

    /// Reserve `base`, or the first free fallback derived from it
    pub fn allocate(&mut self, base: &str, id: Option<&str>) -> String {
        let slug = self.first_free(base, id);
        self.taken.insert(slug.clone());
        slug
    }

    fn first_free(&self, base: &str, id: Option<&str>) -> String {
        if !self.taken.contains(base) {
            return base.to_string();
        }

        if let Some(id) = id.map(slugify).filter(|id| !id.is_empty()) {
            let with_id = format!("{}-{}", base, id);
            if !self.taken.contains(&with_id) {
                return with_id;
            }
        }

        let mut counter = 1;
        loop {
            let candidate = format!("{}-{}", base, counter);
            if !self.taken.contains(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_lowercase_kebab() {
        assert_eq!(slugify("Bothan"), "bothan");
        assert_eq!(slugify("Mon Calamari"), "mon-calamari");
        assert_eq!(slugify("TIE Fighter"), "tie-fighter");
    }

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("Mon   Calamari"), "mon-calamari");
        assert_eq!(slugify("Twi'lek"), "twi-lek");
        assert_eq!(slugify("TIE/sa  --  Bomber"), "tie-sa-bomber");
        assert_eq!(slugify("R2-D2"), "r2-d2");
    }

    #[test]
    fn test_slugify_strips_edges() {
        assert_eq!(slugify("-Bothan-"), "bothan");
        assert_eq!(slugify("  Extra  Spaces  "), "extra-spaces");
        assert_eq!(slugify("[[Y-Wing]]"), "y-wing");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("'''"), "");
    }

    #[test]
    fn test_slugify_non_ascii_is_separator() {
        assert_eq!(slugify("Ewok Über Walker"), "ewok-ber-walker");
    }

    #[test]
    fn test_slugify_deterministic() {
        for name in ["TIE/ln Starfighter", "Y-Wing Starfighters", "Imperial I Star Destroyer"] {
            assert_eq!(slugify(name), slugify(name));
        }
    }

    #[test]
    fn test_record_slug_explicit_wins() {
        assert_eq!(record_slug(Some("tie-ln"), "TIE Fighter"), "tie-ln");
        assert_eq!(record_slug(Some("Weird_Slug"), "Anything"), "Weird_Slug");
        assert_eq!(record_slug(Some(" tie-ln "), "TIE Fighter"), " tie-ln ");
        assert_eq!(record_slug(Some("  "), "TIE Fighter"), "tie-fighter");
        assert_eq!(record_slug(None, "TIE Fighter"), "tie-fighter");
    }

    #[test]
    fn test_allocator_no_collision() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.allocate("human", Some("5")), "human");
    }

    #[test]
    fn test_allocator_id_fallback() {
        let mut slugs = SlugAllocator::with_taken(["human"]);
        assert_eq!(slugs.allocate("human", Some("5")), "human-5");
    }

    #[test]
    fn test_allocator_counter_fallback() {
        let mut slugs = SlugAllocator::with_taken(["human", "human-1", "human-2"]);
        assert_eq!(slugs.allocate("human", None), "human-3");
    }

    #[test]
    fn test_allocator_id_taken_uses_counter() {
        let mut slugs = SlugAllocator::with_taken(["human", "human-5"]);
        assert_eq!(slugs.allocate("human", Some("5")), "human-1");
    }

    #[test]
    fn test_reserve_blocks_later_allocation() {
        let mut slugs = SlugAllocator::new();
        assert!(slugs.reserve("x-wing"));
        assert!(!slugs.reserve("x-wing"));
        assert_eq!(slugs.allocate("x-wing", None), "x-wing-1");
    }

    #[test]
    fn test_allocator_replay_is_stable() {
        let batch = ["bothan", "bothan", "bothan"];

        let first: Vec<String> = {
            let mut slugs = SlugAllocator::new();
            batch.iter().map(|s| slugs.allocate(s, None)).collect()
        };
        let second: Vec<String> = {
            let mut slugs = SlugAllocator::new();
            batch.iter().map(|s| slugs.allocate(s, None)).collect()
        };

        assert_eq!(first, vec!["bothan", "bothan-1", "bothan-2"]);
        assert_eq!(first, second);
    }
}
