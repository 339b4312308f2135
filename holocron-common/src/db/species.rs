//! Species table queries

use crate::catalog::Species;
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

/// Maximum rows returned by a listing query
pub const LIST_LIMIT: i64 = 1000;

/// List species ordered by name, at most `limit` rows (capped at `LIST_LIMIT`)
pub async fn list_species(pool: &SqlitePool, limit: i64) -> Result<Vec<Species>> {
    let rows = sqlx::query(
        r#"
        SELECT slug, name, classification, homeworld, description, properties, imageUrl, createdAt
        FROM species
        ORDER BY name ASC, slug ASC
        LIMIT ?
        "#,
    )
    .bind(limit.clamp(0, LIST_LIMIT))
    .fetch_all(pool)
    .await?;

    rows.iter().map(species_from_row).collect()
}

/// Load a single species by slug
pub async fn get_species(pool: &SqlitePool, slug: &str) -> Result<Option<Species>> {
    let row = sqlx::query(
        r#"
        SELECT slug, name, classification, homeworld, description, properties, imageUrl, createdAt
        FROM species
        WHERE slug = ?
        LIMIT 1
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(species_from_row).transpose()
}

/// Insert or replace a species keyed by slug
///
/// `createdAt` survives a replace.
pub async fn upsert_species(pool: &SqlitePool, species: &Species) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO species (slug, name, classification, homeworld, description, properties, imageUrl)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(slug) DO UPDATE SET
            name = excluded.name,
            classification = excluded.classification,
            homeworld = excluded.homeworld,
            description = excluded.description,
            properties = excluded.properties,
            imageUrl = excluded.imageUrl
        "#,
    )
    .bind(&species.slug)
    .bind(&species.name)
    .bind(&species.classification)
    .bind(&species.homeworld)
    .bind(&species.description)
    .bind(serde_json::to_string(&species.properties)?)
    .bind(&species.image_url)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn count_species(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM species")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn species_from_row(row: &SqliteRow) -> Result<Species> {
    let slug: String = row.try_get("slug")?;
    let properties: Option<String> = row.try_get("properties")?;

    Ok(Species {
        properties: parse_properties(&slug, properties.as_deref()),
        slug,
        name: row.try_get("name")?,
        classification: row.try_get("classification")?,
        homeworld: row.try_get("homeworld")?,
        description: row.try_get("description")?,
        image_url: row.try_get("imageUrl")?,
        created_at: row.try_get("createdAt").ok(),
    })
}

/// Stored properties text → JSON object; empty or unparseable becomes `{}`
fn parse_properties(slug: &str, text: Option<&str>) -> serde_json::Value {
    let empty = || serde_json::Value::Object(Default::default());

    match text.map(str::trim) {
        None | Some("") => empty(),
        Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            warn!("Species '{}' has invalid properties JSON: {}", slug, e);
            empty()
        }),
    }
}
