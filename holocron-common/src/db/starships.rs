//! Starships table queries

use crate::catalog::{Category, Lineage, ShipField, Starship};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::warn;

pub use crate::db::species::LIST_LIMIT;

const SELECT_COLUMNS: &str = r#"
    slug, name, category, parent, isVariant,
    craft, affiliation, type, scale, length, crew, passengers, cargoCapacity,
    consumables, cost, hyperdrive, maneuverability, space, atmosphere, hull, shields,
    weapons_json, sensors_json, sources_json, description, imageUrl, imageFilename
"#;

/// Field updates for one record: `None` clears the column
pub type FieldPatch = BTreeMap<ShipField, Option<String>>;

/// List starships ordered by name, optionally restricted to one category
pub async fn list_starships(
    pool: &SqlitePool,
    category: Option<Category>,
    limit: i64,
) -> Result<Vec<Starship>> {
    let rows = match category {
        Some(category) => {
            sqlx::query(&format!(
                "SELECT {} FROM starships WHERE category = ? ORDER BY name ASC, slug ASC LIMIT ?",
                SELECT_COLUMNS
            ))
            .bind(category.as_str())
            .bind(limit.clamp(0, LIST_LIMIT))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM starships ORDER BY name ASC, slug ASC LIMIT ?",
                SELECT_COLUMNS
            ))
            .bind(limit.clamp(0, LIST_LIMIT))
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(starship_from_row).collect()
}

/// Every starship, uncapped (batch passes work on the full record set)
pub async fn load_all_starships(pool: &SqlitePool, category: Option<Category>) -> Result<Vec<Starship>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM starships WHERE (?1 IS NULL OR category = ?1) ORDER BY name ASC, slug ASC",
        SELECT_COLUMNS
    ))
    .bind(category.map(Category::as_str))
    .fetch_all(pool)
    .await?;

    rows.iter().map(starship_from_row).collect()
}

pub async fn get_starship(pool: &SqlitePool, slug: &str) -> Result<Option<Starship>> {
    let row = sqlx::query(&format!("SELECT {} FROM starships WHERE slug = ? LIMIT 1", SELECT_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(starship_from_row).transpose()
}

/// Insert or update a starship keyed by slug
///
/// With `keep_lineage`, an existing row keeps its `parent`/`isVariant`:
/// re-importing source data must not undo a resolver pass.
pub async fn upsert_starship(pool: &SqlitePool, ship: &Starship, keep_lineage: bool) -> Result<()> {
    let lineage_update = if keep_lineage {
        ""
    } else {
        ",\n            parent = excluded.parent,\n            isVariant = excluded.isVariant"
    };

    let sql = format!(
        r#"
        INSERT INTO starships (
            slug, name, category, parent, isVariant,
            craft, affiliation, type, scale, length, crew, passengers, cargoCapacity,
            consumables, cost, hyperdrive, maneuverability, space, atmosphere, hull, shields,
            weapons_json, sensors_json, sources_json, description, imageUrl, imageFilename
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(slug) DO UPDATE SET
            name = excluded.name,
            category = excluded.category,
            craft = excluded.craft,
            affiliation = excluded.affiliation,
            type = excluded.type,
            scale = excluded.scale,
            length = excluded.length,
            crew = excluded.crew,
            passengers = excluded.passengers,
            cargoCapacity = excluded.cargoCapacity,
            consumables = excluded.consumables,
            cost = excluded.cost,
            hyperdrive = excluded.hyperdrive,
            maneuverability = excluded.maneuverability,
            space = excluded.space,
            atmosphere = excluded.atmosphere,
            hull = excluded.hull,
            shields = excluded.shields,
            weapons_json = excluded.weapons_json,
            sensors_json = excluded.sensors_json,
            sources_json = excluded.sources_json,
            description = excluded.description,
            imageUrl = excluded.imageUrl,
            imageFilename = excluded.imageFilename{}
        "#,
        lineage_update
    );

    sqlx::query(&sql)
        .bind(&ship.slug)
        .bind(&ship.name)
        .bind(ship.category.as_str())
        .bind(&ship.parent)
        .bind(ship.is_variant)
        .bind(&ship.craft)
        .bind(&ship.affiliation)
        .bind(&ship.ship_type)
        .bind(&ship.scale)
        .bind(&ship.length)
        .bind(&ship.crew)
        .bind(&ship.passengers)
        .bind(&ship.cargo_capacity)
        .bind(&ship.consumables)
        .bind(&ship.cost)
        .bind(&ship.hyperdrive)
        .bind(&ship.maneuverability)
        .bind(&ship.space)
        .bind(&ship.atmosphere)
        .bind(&ship.hull)
        .bind(&ship.shields)
        .bind(json_array_column(&ship.weapons)?)
        .bind(ship.sensors.as_ref().map(serde_json::to_string).transpose()?)
        .bind(json_array_column(&ship.sources)?)
        .bind(&ship.description)
        .bind(&ship.image_url)
        .bind(&ship.image_filename)
        .execute(pool)
        .await?;

    Ok(())
}

/// Write `parent`/`isVariant`; returns false when no row has this slug
pub async fn set_lineage(pool: &SqlitePool, slug: &str, lineage: &Lineage) -> Result<bool> {
    let result = sqlx::query("UPDATE starships SET parent = ?, isVariant = ? WHERE slug = ?")
        .bind(&lineage.parent)
        .bind(lineage.is_variant)
        .bind(slug)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Apply a field patch; returns false when no row has this slug
pub async fn apply_patch(pool: &SqlitePool, slug: &str, patch: &FieldPatch) -> Result<bool> {
    if patch.is_empty() {
        return Err(Error::InvalidInput(format!("Empty patch for '{}'", slug)));
    }

    // Column names come from ShipField, never from input text
    let assignments: Vec<String> = patch
        .keys()
        .map(|field| format!("\"{}\" = ?", field.column()))
        .collect();
    let sql = format!("UPDATE starships SET {} WHERE slug = ?", assignments.join(", "));

    let mut query = sqlx::query(&sql);
    for value in patch.values() {
        query = query.bind(value.clone());
    }

    let result = query.bind(slug).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_starships(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM starships")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn json_array_column(values: &[serde_json::Value]) -> Result<Option<String>> {
    if values.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(values)?))
    }
}

fn starship_from_row(row: &SqliteRow) -> Result<Starship> {
    let slug: String = row.try_get("slug")?;
    let category_tag: String = row.try_get("category")?;
    let category = category_tag.parse::<Category>().map_err(|_| {
        Error::Internal(format!("Starship '{}' has unknown category '{}'", slug, category_tag))
    })?;

    let weapons: Option<String> = row.try_get("weapons_json")?;
    let sensors: Option<String> = row.try_get("sensors_json")?;
    let sources: Option<String> = row.try_get("sources_json")?;

    Ok(Starship {
        weapons: parse_json_column(&slug, "weapons_json", weapons.as_deref()).unwrap_or_default(),
        sensors: parse_json_column(&slug, "sensors_json", sensors.as_deref()),
        sources: parse_json_column(&slug, "sources_json", sources.as_deref()).unwrap_or_default(),
        name: row.try_get("name")?,
        category,
        craft: row.try_get("craft")?,
        affiliation: row.try_get("affiliation")?,
        ship_type: row.try_get("type")?,
        scale: row.try_get("scale")?,
        length: row.try_get("length")?,
        crew: row.try_get("crew")?,
        passengers: row.try_get("passengers")?,
        cargo_capacity: row.try_get("cargoCapacity")?,
        consumables: row.try_get("consumables")?,
        cost: row.try_get("cost")?,
        hyperdrive: row.try_get("hyperdrive")?,
        maneuverability: row.try_get("maneuverability")?,
        space: row.try_get("space")?,
        atmosphere: row.try_get("atmosphere")?,
        hull: row.try_get("hull")?,
        shields: row.try_get("shields")?,
        description: row.try_get("description")?,
        image_url: row.try_get("imageUrl")?,
        image_filename: row.try_get("imageFilename")?,
        parent: row.try_get("parent")?,
        is_variant: row.try_get("isVariant")?,
        slug,
    })
}

/// Stored JSON text → value; unparseable text is logged and treated as absent
fn parse_json_column<T: serde::de::DeserializeOwned>(slug: &str, column: &str, text: Option<&str>) -> Option<T> {
    let text = text.map(str::trim).filter(|t| !t.is_empty())?;
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Starship '{}' has invalid {}: {}", slug, column, e);
            None
        }
    }
}
