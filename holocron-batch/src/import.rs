//! Species and starship importers
//!
//! A source file is parsed and validated in full before the first write, so
//! a bad record aborts the import with nothing written. Slugs are allocated
//! per file in file order: an explicit `slug` is kept verbatim, a derived one
//! is disambiguated by the source `id` and then a counter.

use holocron_common::db::{species, starships};
use holocron_common::slug::{record_slug, SlugAllocator};
use holocron_common::{Category, Error, Result, ShipField, Species, Starship};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::runner::{BatchOptions, BatchSummary, Pacer};

/// Collection keys that may hold species records
const SPECIES_KEYS: [&str; 3] = ["races", "aliens", "items"];

const STARSHIP_KEYS: [&str; 1] = ["starships"];

/// Game-data keys folded into species `properties` when present
const SPECIES_STAT_KEYS: [&str; 4] = ["stats", "specialAbilities", "storyFactors", "notes"];

/// One parsed starship plus whether the upsert must leave lineage alone
#[derive(Debug, Clone, PartialEq)]
pub struct StarshipImport {
    pub ship: Starship,
    /// Source carried neither `parent` nor `isVariant`
    pub keep_lineage: bool,
}

/// One source object, addressed by its position in the file
struct SourceRecord {
    position: usize,
    fields: Map<String, Value>,
}

impl SourceRecord {
    fn new(position: usize, value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { position, fields }),
            other => Err(Error::InvalidInput(format!(
                "record #{}: expected an object, found {}",
                position + 1,
                json_kind(&other)
            ))),
        }
    }

    fn invalid(&self, message: impl std::fmt::Display) -> Error {
        Error::InvalidInput(format!("record #{}: {}", self.position + 1, message))
    }

    fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Scalar field as trimmed text; empty strings and non-scalars are absent
    fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Explicit `slug` exactly as written; blank counts as absent
    fn raw_slug(&self) -> Option<&str> {
        match self.fields.get("slug")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.text(key))
    }

    fn name(&self) -> Result<String> {
        self.text("name").ok_or_else(|| self.invalid("missing name"))
    }

    /// First present object among `keys`; `null` counts as absent
    fn object(&self, keys: &[&str]) -> Result<Option<Value>> {
        for key in keys {
            match self.fields.get(*key) {
                None | Some(Value::Null) => continue,
                Some(value @ Value::Object(_)) => return Ok(Some(value.clone())),
                Some(other) => {
                    return Err(self.invalid(format!("{} must be an object, found {}", key, json_kind(other))))
                }
            }
        }
        Ok(None)
    }

    fn array(&self, key: &str) -> Result<Vec<Value>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(other) => Err(self.invalid(format!("{} must be an array, found {}", key, json_kind(other)))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Record list from a top-level array or the first matching collection key
fn source_records(text: &str, keys: &[&str]) -> Result<Vec<SourceRecord>> {
    let document: Value =
        serde_json::from_str(text).map_err(|e| Error::InvalidInput(format!("malformed JSON: {}", e)))?;

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => keys
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| Error::InvalidInput(format!("no record array under any of: {}", keys.join(", "))))?,
        other => {
            return Err(Error::InvalidInput(format!(
                "expected an array or object at top level, found {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, value)| SourceRecord::new(position, value))
        .collect()
}

/// Batch-unique slug for one source record
fn assign_slug(slugs: &mut SlugAllocator, record: &SourceRecord, name: &str) -> Result<String> {
    let slug = match record.raw_slug() {
        Some(slug) => {
            if !slugs.reserve(slug) {
                warn!("record #{}: slug '{}' repeats within the file; later record wins", record.position + 1, slug);
            }
            slug.to_string()
        }
        None => {
            let base = record_slug(None, name);
            slugs.allocate(&base, record.text("id").as_deref())
        }
    };

    if slug.is_empty() {
        return Err(record.invalid(format!("name '{}' yields an empty slug", name)));
    }
    Ok(slug)
}

/// Parse and validate a species source file
pub fn parse_species(text: &str) -> Result<Vec<Species>> {
    let records = source_records(text, &SPECIES_KEYS)?;
    let mut slugs = SlugAllocator::new();

    records
        .iter()
        .map(|record| -> Result<Species> {
            let name = record.name()?;
            let slug = assign_slug(&mut slugs, record, &name)?;
            Ok(Species {
                slug,
                name,
                classification: record.text("classification"),
                homeworld: record.text("homeworld"),
                description: record.text("description"),
                properties: species_properties(record)?,
                image_url: record.first_text(&["imageUrl", "image"]),
                created_at: None,
            })
        })
        .collect()
}

/// `properties`/`extra` plus the game-data keys, with dice codes upper-cased
fn species_properties(record: &SourceRecord) -> Result<Value> {
    let mut properties = match record.object(&["properties", "extra"])? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    for key in SPECIES_STAT_KEYS {
        match record.fields.get(key) {
            None | Some(Value::Null) => {}
            Some(value) => {
                properties.insert(key.to_string(), value.clone());
            }
        }
    }

    if let Some(stats) = properties.get_mut("stats") {
        normalize_stat_dice(stats);
    }
    Ok(Value::Object(properties))
}

/// Upper-case `attributeDice` and each attribute's `min`/`max` ("2d+1" -> "2D+1")
fn normalize_stat_dice(stats: &mut Value) {
    let Value::Object(stats) = stats else {
        return;
    };

    if let Some(Value::String(dice)) = stats.get_mut("attributeDice") {
        *dice = dice.to_uppercase();
    }

    if let Some(Value::Object(attributes)) = stats.get_mut("attributes") {
        for range in attributes.values_mut() {
            let Value::Object(range) = range else {
                continue;
            };
            for bound in ["min", "max"] {
                if let Some(Value::String(dice)) = range.get_mut(bound) {
                    *dice = dice.to_uppercase();
                }
            }
        }
    }
}

/// Parse and validate a starship source file
///
/// Records without a `category` fall into `default_category`.
pub fn parse_starships(text: &str, default_category: Category) -> Result<Vec<StarshipImport>> {
    let records = source_records(text, &STARSHIP_KEYS)?;
    let mut slugs = SlugAllocator::new();

    records
        .iter()
        .map(|record| -> Result<StarshipImport> {
            let name = record.name()?;
            let slug = assign_slug(&mut slugs, record, &name)?;

            let category = match record.text("category") {
                Some(raw) => raw.parse::<Category>().map_err(|e| record.invalid(e))?,
                None => default_category,
            };

            let mut ship = Starship::new(slug, name, category);
            for field in ShipField::ALL {
                *ship.field_mut(field) = record.text(field.column());
            }
            ship.weapons = record.array("weapons")?;
            ship.sources = record.array("sources")?;
            ship.sensors = record.fields.get("sensors").filter(|v| !v.is_null()).cloned();

            ship.parent = record.text("parent");
            ship.is_variant = match record.fields.get("isVariant") {
                None | Some(Value::Null) => false,
                Some(Value::Bool(b)) => *b,
                Some(other) => return Err(record.invalid(format!("isVariant must be a boolean, found {}", json_kind(other)))),
            };

            Ok(StarshipImport {
                ship,
                keep_lineage: !record.has("parent") && !record.has("isVariant"),
            })
        })
        .collect()
}

/// Upsert parsed species one at a time
pub async fn import_species(pool: &SqlitePool, records: &[Species], options: &BatchOptions) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let mut pacer = Pacer::new(options);

    for record in records {
        if options.dry_run {
            match species::get_species(pool, &record.slug).await {
                Ok(existing) => summary.record_planned(&record.slug, upsert_kind(existing.is_some())),
                Err(e) => summary.record(&record.slug, Err(e)),
            }
            continue;
        }

        pacer.wait().await;
        let outcome = species::upsert_species(pool, record).await.map(|_| true);
        summary.record(&record.slug, outcome);
    }

    info!("Species import: {}", summary);
    summary
}

/// Upsert parsed starships one at a time
pub async fn import_starships(pool: &SqlitePool, records: &[StarshipImport], options: &BatchOptions) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let mut pacer = Pacer::new(options);

    for record in records {
        if options.dry_run {
            match starships::get_starship(pool, &record.ship.slug).await {
                Ok(existing) => summary.record_planned(&record.ship.slug, upsert_kind(existing.is_some())),
                Err(e) => summary.record(&record.ship.slug, Err(e)),
            }
            continue;
        }

        pacer.wait().await;
        let outcome = starships::upsert_starship(pool, &record.ship, record.keep_lineage)
            .await
            .map(|_| true);
        summary.record(&record.ship.slug, outcome);
    }

    info!("Starship import: {}", summary);
    summary
}

fn upsert_kind(exists: bool) -> &'static str {
    if exists {
        "overwrite existing record"
    } else {
        "insert"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holocron_common::db::init_database;
    use holocron_common::Lineage;
    use serde_json::json;

    #[test]
    fn test_species_collection_keys() {
        for key in SPECIES_KEYS {
            let text = format!(r#"{{"{}": [{{"name": "Bothan"}}]}}"#, key);
            let parsed = parse_species(&text).unwrap();
            assert_eq!(parsed.len(), 1, "key {}", key);
            assert_eq!(parsed[0].slug, "bothan");
        }

        let parsed = parse_species(r#"[{"name": "Wookiee"}]"#).unwrap();
        assert_eq!(parsed[0].slug, "wookiee");
    }

    #[test]
    fn test_species_field_fallbacks() {
        let text = json!({
            "aliens": [{
                "name": "Twi'lek",
                "classification": "Mammal",
                "extra": { "languages": "Ryl" },
                "image": "/aliens/twi-lek.webp"
            }]
        })
        .to_string();

        let parsed = parse_species(&text).unwrap();
        assert_eq!(parsed[0].slug, "twi-lek");
        assert_eq!(parsed[0].properties["languages"], "Ryl");
        assert_eq!(parsed[0].image_url.as_deref(), Some("/aliens/twi-lek.webp"));
        assert_eq!(parsed[0].homeworld, None);
    }

    #[test]
    fn test_explicit_slug_used_verbatim() {
        let parsed = parse_species(r#"[{"slug": "human-corellian", "name": "Human"}]"#).unwrap();
        assert_eq!(parsed[0].slug, "human-corellian");

        let parsed = parse_starships(r#"[{"slug": " TIE/ln ", "name": "TIE Fighter"}]"#, Category::Transport).unwrap();
        assert_eq!(parsed[0].ship.slug, " TIE/ln ");

        let parsed = parse_species(r#"[{"slug": "  ", "name": "Human"}]"#).unwrap();
        assert_eq!(parsed[0].slug, "human");
    }

    #[test]
    fn test_species_game_data_kept_in_properties() {
        let text = json!([{
            "name": "Wookiee",
            "properties": { "languages": "Shyriiwook" },
            "stats": {
                "attributeDice": "12d",
                "attributes": {
                    "strength": { "min": "2d", "max": "6d" },
                    "dexterity": { "min": "1d", "max": "3d+2" }
                },
                "move": 11
            },
            "specialAbilities": [{ "name": "Berserker Rage" }],
            "storyFactors": ["Reputation"],
            "notes": null
        }])
        .to_string();

        let parsed = parse_species(&text).unwrap();
        let properties = &parsed[0].properties;
        assert_eq!(properties["languages"], "Shyriiwook");
        assert_eq!(properties["stats"]["attributeDice"], "12D");
        assert_eq!(properties["stats"]["attributes"]["strength"]["max"], "6D");
        assert_eq!(properties["stats"]["attributes"]["dexterity"]["max"], "3D+2");
        assert_eq!(properties["stats"]["move"], 11);
        assert_eq!(properties["specialAbilities"][0]["name"], "Berserker Rage");
        assert_eq!(properties["storyFactors"][0], "Reputation");
        assert!(properties.get("notes").is_none());
    }

    #[test]
    fn test_duplicate_names_disambiguated_by_id_then_counter() {
        let text = r#"[
            {"name": "Human", "id": 7},
            {"name": "Human", "id": 9},
            {"name": "Human"}
        ]"#;

        let slugs: Vec<String> = parse_species(text).unwrap().into_iter().map(|s| s.slug).collect();
        assert_eq!(slugs, vec!["human", "human-9", "human-1"]);
        assert_eq!(
            parse_species(text).unwrap().into_iter().map(|s| s.slug).collect::<Vec<_>>(),
            slugs
        );
    }

    #[test]
    fn test_input_errors_fail_whole_file() {
        assert!(matches!(parse_species("{not json"), Err(Error::InvalidInput(_))));
        assert!(matches!(
            parse_species(r#"[{"name": "Bothan"}, {"classification": "Mammal"}]"#),
            Err(Error::InvalidInput(_))
        ));
        assert!(parse_species(r#"[{"name": "   "}]"#).is_err());
        assert!(parse_species(r#"[{"name": "'''"}]"#).is_err());
        assert!(parse_species(r#"{"planets": []}"#).is_err());
        assert!(parse_species(r#"[{"name": "Bothan", "properties": [1, 2]}]"#).is_err());
        assert!(parse_species(r#"["Bothan"]"#).is_err());
    }

    #[test]
    fn test_starship_fields_and_category_default() {
        let text = json!({
            "starships": [{
                "name": "YT-1300 Transport",
                "type": "Light freighter",
                "cargoCapacity": "100 metric tons",
                "length": 26.7,
                "weapons": [{ "name": "Laser Cannon" }],
                "sensors": { "passive": "10/0D" },
                "sources": ["Galaxy Guide 6"]
            }, {
                "name": "Lambda-class Shuttle",
                "category": "Transport",
                "parent": "Lambda",
                "isVariant": true
            }]
        })
        .to_string();

        let parsed = parse_starships(&text, Category::Transport).unwrap();
        let yt = &parsed[0];
        assert_eq!(yt.ship.slug, "yt-1300-transport");
        assert_eq!(yt.ship.category, Category::Transport);
        assert_eq!(yt.ship.ship_type.as_deref(), Some("Light freighter"));
        assert_eq!(yt.ship.cargo_capacity.as_deref(), Some("100 metric tons"));
        assert_eq!(yt.ship.length.as_deref(), Some("26.7"));
        assert_eq!(yt.ship.weapons.len(), 1);
        assert!(yt.ship.sensors.is_some());
        assert!(yt.keep_lineage);

        let lambda = &parsed[1];
        assert!(!lambda.keep_lineage);
        assert_eq!(lambda.ship.lineage(), Lineage::variant_of("Lambda"));
    }

    #[test]
    fn test_starship_input_errors() {
        assert!(parse_starships(r#"[{"name": "AT-AT", "category": "walker"}]"#, Category::Transport).is_err());
        assert!(parse_starships(r#"[{"name": "A", "weapons": "lasers"}]"#, Category::Transport).is_err());
        assert!(parse_starships(r#"[{"name": "A", "isVariant": "yes"}]"#, Category::Transport).is_err());
    }

    #[tokio::test]
    async fn test_reimport_keeps_resolved_lineage() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let options = BatchOptions::default();

        let text = r#"{"starships": [{"name": "TIE Interceptor", "category": "starfighter", "hull": "3D"}]}"#;
        let parsed = parse_starships(text, Category::Transport).unwrap();
        let summary = import_starships(&pool, &parsed, &options).await;
        assert_eq!(summary.updated, 1);

        starships::set_lineage(&pool, "tie-interceptor", &Lineage::variant_of("TIE Fighter"))
            .await
            .unwrap();

        let text = r#"{"starships": [{"name": "TIE Interceptor", "category": "starfighter", "hull": "4D"}]}"#;
        let parsed = parse_starships(text, Category::Transport).unwrap();
        import_starships(&pool, &parsed, &options).await;

        let stored = starships::get_starship(&pool, "tie-interceptor").await.unwrap().unwrap();
        assert_eq!(stored.hull.as_deref(), Some("4D"));
        assert_eq!(stored.parent.as_deref(), Some("TIE Fighter"));
        assert!(stored.is_variant);
    }

    #[tokio::test]
    async fn test_dry_run_import_writes_nothing() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let options = BatchOptions::default().dry_run(true);

        let parsed = parse_species(r#"[{"name": "Bothan"}, {"name": "Rodian"}]"#).unwrap();
        let summary = import_species(&pool, &parsed, &options).await;
        assert_eq!(summary, BatchSummary { updated: 2, failed: 0, skipped: 0 });
        assert_eq!(species::count_species(&pool).await.unwrap(), 0);

        let parsed = parse_starships(r#"[{"name": "YT-1300"}]"#, Category::Transport).unwrap();
        assert_eq!(import_starships(&pool, &parsed, &options).await.updated, 1);
        assert_eq!(starships::count_starships(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_species_upserts() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let options = BatchOptions::default();

        let parsed = parse_species(r#"{"races": [{"name": "Bothan", "homeworld": "Bothawui"}]}"#).unwrap();
        assert_eq!(import_species(&pool, &parsed, &options).await.updated, 1);

        let parsed = parse_species(r#"{"races": [{"name": "Bothan", "homeworld": "Kothlis"}]}"#).unwrap();
        import_species(&pool, &parsed, &options).await;

        assert_eq!(species::count_species(&pool).await.unwrap(), 1);
        let stored = species::get_species(&pool, "bothan").await.unwrap().unwrap();
        assert_eq!(stored.homeworld.as_deref(), Some("Kothlis"));
    }
}
