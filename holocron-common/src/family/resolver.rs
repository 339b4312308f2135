//! Family resolver
//!
//! Computes, for one family rule, the lineage every member record should
//! have: exactly one base (`parent = null, isVariant = false`) and every other
//! member a variant whose `parent` is the base record's name.
//!
//! Resolution is pure. Writing the result to a store is the batch runner's
//! job; assignments whose record already has the target lineage are marked
//! `unchanged` so a second pass writes nothing.

use std::collections::HashSet;

use crate::catalog::{Category, Lineage, Starship};
use crate::{Error, Result};

/// How a rule selects its member records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Members are records whose name contains the family name
    Substring { case_sensitive: bool },
    /// Explicit allow-list: `base` slug absorbs `members` slugs, names ignored
    Override { base: String, members: Vec<String> },
}

/// One family to resolve within one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRule {
    pub family: String,
    pub category: Category,
    pub strategy: MatchStrategy,
}

impl FamilyRule {
    /// Case-insensitive substring rule
    pub fn substring(family: impl Into<String>, category: Category) -> Self {
        Self {
            family: family.into(),
            category,
            strategy: MatchStrategy::Substring { case_sensitive: false },
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        if let MatchStrategy::Substring { case_sensitive } = &mut self.strategy {
            *case_sensitive = true;
        }
        self
    }

    pub fn override_members<I, S>(family: impl Into<String>, category: Category, base: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            family: family.into(),
            category,
            strategy: MatchStrategy::Override {
                base: base.into(),
                members: members.into_iter().map(Into::into).collect(),
            },
        }
    }
}

/// Target lineage for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub slug: String,
    pub name: String,
    pub lineage: Lineage,
    /// Record already has this lineage
    pub unchanged: bool,
}

/// Outcome of resolving one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub family: String,
    pub category: Category,
    /// Slug of the selected base, `None` when nothing matched
    pub base: Option<String>,
    /// Base first, then variants
    pub assignments: Vec<Assignment>,
    /// Override member slugs not present in the category
    pub missing: Vec<String>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assignments that require a write
    pub fn changes(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| !a.unchanged)
    }

    /// Apply the assignments to an in-memory record set
    pub fn apply_to(&self, records: &mut [Starship]) {
        for assignment in &self.assignments {
            if let Some(record) = records.iter_mut().find(|r| r.slug == assignment.slug) {
                record.set_lineage(&assignment.lineage);
            }
        }
    }
}

/// Resolve one family rule against the records of its category
///
/// Records outside `rule.category` are ignored. An empty match is not an
/// error; an override whose base slug is absent is.
pub fn resolve(rule: &FamilyRule, records: &[Starship]) -> Result<Resolution> {
    let in_category: Vec<&Starship> = records.iter().filter(|r| r.category == rule.category).collect();

    let (base, members, missing) = match &rule.strategy {
        MatchStrategy::Substring { case_sensitive } => {
            let (base, members) = substring_members(&rule.family, *case_sensitive, &in_category);
            (base, members, Vec::new())
        }
        MatchStrategy::Override { base, members } => override_members(rule, base, members, &in_category)?,
    };

    let Some(base) = base else {
        return Ok(Resolution {
            family: rule.family.clone(),
            category: rule.category,
            base: None,
            assignments: Vec::new(),
            missing,
        });
    };

    let mut assignments = Vec::with_capacity(members.len() + 1);
    assignments.push(assignment(base, Lineage::base()));
    for member in members {
        assignments.push(assignment(member, Lineage::variant_of(base.name.clone())));
    }

    Ok(Resolution {
        family: rule.family.clone(),
        category: rule.category,
        base: Some(base.slug.clone()),
        assignments,
        missing,
    })
}

fn assignment(record: &Starship, lineage: Lineage) -> Assignment {
    Assignment {
        slug: record.slug.clone(),
        name: record.name.clone(),
        unchanged: record.lineage() == lineage,
        lineage,
    }
}

/// Base plus remaining members for a substring rule
///
/// Matches are ordered by name (then slug). The base is the record named
/// exactly like the family, else (case-insensitive rules only) the record
/// whose name equals it ignoring case, else the first match in that order.
fn substring_members<'a>(
    family: &str,
    case_sensitive: bool,
    records: &[&'a Starship],
) -> (Option<&'a Starship>, Vec<&'a Starship>) {
    let needle = if case_sensitive { family.to_string() } else { family.to_lowercase() };

    let mut matched: Vec<&Starship> = records
        .iter()
        .copied()
        .filter(|r| {
            if case_sensitive {
                r.name.contains(&needle)
            } else {
                r.name.to_lowercase().contains(&needle)
            }
        })
        .collect();
    matched.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));

    if matched.is_empty() {
        return (None, matched);
    }

    let base_index = matched
        .iter()
        .position(|r| r.name == family)
        .or_else(|| {
            (!case_sensitive)
                .then(|| matched.iter().position(|r| r.name.to_lowercase() == needle))
                .flatten()
        })
        .unwrap_or(0);
    let base = matched.remove(base_index);
    (Some(base), matched)
}

type OverrideSelection<'a> = (Option<&'a Starship>, Vec<&'a Starship>, Vec<String>);

fn override_members<'a>(
    rule: &FamilyRule,
    base_slug: &str,
    member_slugs: &[String],
    records: &[&'a Starship],
) -> Result<OverrideSelection<'a>> {
    let find = |slug: &str| records.iter().copied().find(|r| r.slug == slug);

    let base = find(base_slug).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Family '{}': base '{}' not found in category {}",
            rule.family, base_slug, rule.category
        ))
    })?;

    let mut seen: HashSet<&str> = HashSet::from([base_slug]);
    let mut members = Vec::new();
    let mut missing = Vec::new();

    for slug in member_slugs {
        if !seen.insert(slug.as_str()) {
            continue;
        }
        match find(slug) {
            Some(record) => members.push(record),
            None => missing.push(slug.clone()),
        }
    }

    Ok((Some(base), members, missing))
}
