//! Family rule files
//!
//! A rule file lists families to resolve in one run:
//!
//! ```toml
//! [[family]]
//! name = "Y-Wing"
//! category = "starfighter"
//!
//! [[family]]
//! name = "TIE Fighter"
//! category = "starfighter"
//! base = "tie-fighter"
//! members = ["tie-interceptor", "tie-sa-bomber"]
//! ```
//!
//! Entries with `members` are override tables; all others match by name.

use std::path::Path;

use serde::Deserialize;

use super::resolver::{FamilyRule, MatchStrategy};
use crate::catalog::Category;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    #[serde(default)]
    family: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    name: String,
    category: Category,
    base: Option<String>,
    members: Option<Vec<String>>,
    #[serde(default)]
    case_sensitive: bool,
}

impl RuleEntry {
    fn into_rule(self, index: usize) -> Result<FamilyRule> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Config(format!("family #{}: name must not be empty", index + 1)));
        }

        let strategy = match (self.base, self.members) {
            (Some(base), Some(members)) => {
                if base.trim().is_empty() {
                    return Err(Error::Config(format!("family '{}': base must not be empty", name)));
                }
                if self.case_sensitive {
                    return Err(Error::Config(format!(
                        "family '{}': case_sensitive has no effect on an override table",
                        name
                    )));
                }
                MatchStrategy::Override {
                    base: base.trim().to_string(),
                    members: members
                        .into_iter()
                        .map(|m| m.trim().to_string())
                        .filter(|m| !m.is_empty())
                        .collect(),
                }
            }
            (None, Some(_)) => {
                return Err(Error::Config(format!("family '{}': members require a base slug", name)));
            }
            (Some(_), None) => {
                return Err(Error::Config(format!("family '{}': base requires a members list", name)));
            }
            (None, None) => MatchStrategy::Substring {
                case_sensitive: self.case_sensitive,
            },
        };

        Ok(FamilyRule {
            family: name,
            category: self.category,
            strategy,
        })
    }
}

/// Parse rule file text
pub fn parse_rules(text: &str) -> Result<Vec<FamilyRule>> {
    let file: RuleFile = toml::from_str(text).map_err(|e| Error::Config(format!("Invalid rule file: {}", e)))?;

    file.family
        .into_iter()
        .enumerate()
        .map(|(index, entry)| entry.into_rule(index))
        .collect()
}

/// Load and parse a rule file from disk
pub fn load_rules(path: &Path) -> Result<Vec<FamilyRule>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read rule file {}: {}", path.display(), e)))?;
    parse_rules(&text)
}
