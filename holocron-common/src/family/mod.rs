//! Starship families
//!
//! A family is one base record plus the variants that name it as `parent`.
//! - `resolver`: decides base/variant lineage for one family rule
//! - `rules`: family rules and override tables loaded from TOML
//! - `grouping`: read-time regrouping of a flat record list for display
//! - `parent_ref`: one-off normalization of legacy `parent` values

pub mod grouping;
pub mod parent_ref;
pub mod resolver;
pub mod rules;

pub use grouping::{group_families, group_families_by_category, FamilyEntry};
pub use parent_ref::{clean_parent_reference, plan_parent_migration};
pub use resolver::{resolve, Assignment, FamilyRule, MatchStrategy, Resolution};
pub use rules::{load_rules, parse_rules};
