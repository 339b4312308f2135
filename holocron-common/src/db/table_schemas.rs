//! Table schema definitions
//!
//! Single source of truth for the catalog tables. New stat columns are added
//! here; `SchemaSync` adds them to existing databases on the next start.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;

pub struct SpeciesTable;

impl TableSchema for SpeciesTable {
    fn table_name() -> &'static str {
        "species"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("slug", "TEXT").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null(),
            ColumnDefinition::new("classification", "TEXT"),
            ColumnDefinition::new("homeworld", "TEXT"),
            ColumnDefinition::new("description", "TEXT"),
            // JSON object
            ColumnDefinition::new("properties", "TEXT"),
            ColumnDefinition::new("imageUrl", "TEXT"),
            ColumnDefinition::new("createdAt", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        ]
    }
}

pub struct StarshipsTable;

impl TableSchema for StarshipsTable {
    fn table_name() -> &'static str {
        "starships"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("slug", "TEXT").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null(),
            ColumnDefinition::new("category", "TEXT")
                .not_null()
                .default("'transport'"),

            // Family lineage (written by the resolver only)
            ColumnDefinition::new("parent", "TEXT"),
            ColumnDefinition::new("isVariant", "INTEGER")
                .not_null()
                .default("0"),

            // Stat block
            ColumnDefinition::new("craft", "TEXT"),
            ColumnDefinition::new("affiliation", "TEXT"),
            ColumnDefinition::new("type", "TEXT"),
            ColumnDefinition::new("scale", "TEXT"),
            ColumnDefinition::new("length", "TEXT"),
            ColumnDefinition::new("crew", "TEXT"),
            ColumnDefinition::new("passengers", "TEXT"),
            ColumnDefinition::new("cargoCapacity", "TEXT"),
            ColumnDefinition::new("consumables", "TEXT"),
            ColumnDefinition::new("cost", "TEXT"),
            ColumnDefinition::new("hyperdrive", "TEXT"),
            ColumnDefinition::new("maneuverability", "TEXT"),
            ColumnDefinition::new("space", "TEXT"),
            ColumnDefinition::new("atmosphere", "TEXT"),
            ColumnDefinition::new("hull", "TEXT"),
            ColumnDefinition::new("shields", "TEXT"),

            // JSON blobs
            ColumnDefinition::new("weapons_json", "TEXT"),
            ColumnDefinition::new("sensors_json", "TEXT"),
            ColumnDefinition::new("sources_json", "TEXT"),

            ColumnDefinition::new("description", "TEXT"),
            ColumnDefinition::new("imageUrl", "TEXT"),
            ColumnDefinition::new("imageFilename", "TEXT"),
            ColumnDefinition::new("createdAt", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        ]
    }
}

/// Create or sync every catalog table
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    SchemaSync::ensure_table::<SpeciesTable>(pool).await?;
    SchemaSync::ensure_table::<StarshipsTable>(pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_starships_category ON starships(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_starships_parent ON starships(parent)")
        .execute(pool)
        .await?;

    Ok(())
}
