//! Declarative schema maintenance
//!
//! Each catalog table is described once in code (see `table_schemas`). On
//! startup the description is used to:
//! 1. **Create** the table if it does not exist
//! 2. **Sync** an existing table by adding any column the description has
//!    and the database lacks (`ALTER TABLE ... ADD COLUMN`)
//!
//! Type and constraint drift is reported but never repaired automatically.
//!
//! ```rust,ignore
//! pub struct StarshipsTable;
//!
//! impl TableSchema for StarshipsTable {
//!     fn table_name() -> &'static str { "starships" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("slug", "TEXT").primary_key(),
//!             ColumnDefinition::new("hull", "TEXT"),  // ADD COLUMN HERE
//!         ]
//!     }
//! }
//!
//! SchemaSync::ensure_table::<StarshipsTable>(&pool).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g. "TEXT", "INTEGER", "TIMESTAMP")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// DEFAULT clause, given as SQL (`"0"`, `"'transport'"`, `"CURRENT_TIMESTAMP"`)
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Column clause for CREATE TABLE
    fn create_clause(&self) -> String {
        let mut clause = format!("\"{}\" {}", self.name, self.sql_type);
        if self.primary_key {
            clause.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            clause.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            clause.push_str(&format!(" DEFAULT {}", default));
        }
        clause
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub pk: bool,
}

/// Difference between the declared and the actual schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
}

/// Declared schema of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Column definitions, in CREATE TABLE order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Read the actual columns of a table, ordered by position
pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
    let rows = sqlx::query(&format!("PRAGMA table_info(\"{}\")", table_name))
        .fetch_all(pool)
        .await?;

    let mut columns: Vec<ActualColumn> = rows
        .iter()
        .map(|row| ActualColumn {
            cid: row.get("cid"),
            name: row.get("name"),
            type_name: row.get("type"),
            not_null: row.get::<i32, _>("notnull") != 0,
            pk: row.get::<i32, _>("pk") != 0,
        })
        .collect();

    columns.sort_by_key(|c| c.cid);
    Ok(columns)
}

pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
    )
    .bind(table_name)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Compare declared columns against the database
///
/// Column names compare case-insensitively, as SQLite resolves them.
pub fn compare(table_name: &str, expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Vec<SchemaDrift> {
    expected
        .iter()
        .filter_map(|want| {
            match actual.iter().find(|have| have.name.eq_ignore_ascii_case(&want.name)) {
                None => Some(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: want.clone(),
                }),
                Some(have) if !types_compatible(&want.sql_type, &have.type_name) => {
                    Some(SchemaDrift::TypeMismatch {
                        table: table_name.to_string(),
                        column: want.name.clone(),
                        expected: want.sql_type.clone(),
                        actual: have.type_name.clone(),
                    })
                }
                Some(_) => None,
            }
        })
        .collect()
}

/// SQLite type affinity comparison
fn types_compatible(expected: &str, actual: &str) -> bool {
    fn affinity(sql_type: &str) -> &'static str {
        let t = sql_type.to_ascii_uppercase();
        if t.contains("INT") || t == "BOOLEAN" {
            "INTEGER"
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") || t == "JSON" {
            "TEXT"
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            "REAL"
        } else if t.is_empty() || t.contains("BLOB") {
            "BLOB"
        } else {
            "NUMERIC"
        }
    }

    expected.eq_ignore_ascii_case(actual) || affinity(expected) == affinity(actual)
}

/// Applies declared schemas to the database
pub struct SchemaSync;

impl SchemaSync {
    /// Create the table if missing, otherwise add any missing columns
    pub async fn ensure_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
        let table = T::table_name();
        let expected = T::expected_columns();

        if !table_exists(pool, table).await? {
            Self::create_table(pool, table, &expected).await?;
            info!("Created table '{}'", table);
            return Ok(());
        }

        let actual = introspect_table(pool, table).await?;
        let drift = compare(table, &expected, &actual);

        if drift.is_empty() {
            debug!("Schema up to date for '{}'", table);
            return Ok(());
        }

        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, &table, &column).await?;
                }
                SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                        table, column, expected, actual
                    );
                }
            }
        }

        Ok(())
    }

    async fn create_table(pool: &SqlitePool, table: &str, columns: &[ColumnDefinition]) -> Result<()> {
        let clauses: Vec<String> = columns.iter().map(ColumnDefinition::create_clause).collect();
        let sql = format!("CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)", table, clauses.join(",\n    "));

        sqlx::query(&sql).execute(pool).await?;
        Ok(())
    }

    /// ALTER TABLE ADD COLUMN, within SQLite's limits
    ///
    /// PRIMARY KEY cannot be added, NOT NULL only with a DEFAULT, and the
    /// DEFAULT must be constant (no `CURRENT_TIMESTAMP`).
    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        let mut sql = format!(
            "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {}",
            table, column.name, column.sql_type
        );

        if column.primary_key {
            warn!(
                "Cannot add PRIMARY KEY column {}.{} via ALTER TABLE; adding it as a plain column",
                table, column.name
            );
        }

        let default_value = column.default_value.as_ref().filter(|d| {
            let constant = !d.to_ascii_uppercase().starts_with("CURRENT_");
            if !constant {
                warn!(
                    "Cannot add {}.{} with non-constant DEFAULT {}; existing rows get NULL",
                    table, column.name, d
                );
            }
            constant
        });

        match (default_value, column.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, true) => warn!(
                "Cannot add NOT NULL column {}.{} without DEFAULT; column will be nullable",
                table, column.name
            ),
            (None, false) => {}
        }

        info!("Adding column {}.{} ({})", table, column.name, column.sql_type);

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                debug!("Column {}.{} already present", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    struct WidgetsV1;

    impl TableSchema for WidgetsV1 {
        fn table_name() -> &'static str {
            "widgets"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("slug", "TEXT").primary_key(),
                ColumnDefinition::new("name", "TEXT").not_null(),
            ]
        }
    }

    struct WidgetsV2;

    impl TableSchema for WidgetsV2 {
        fn table_name() -> &'static str {
            "widgets"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("slug", "TEXT").primary_key(),
                ColumnDefinition::new("name", "TEXT").not_null(),
                ColumnDefinition::new("isVariant", "INTEGER").not_null().default("0"),
                ColumnDefinition::new("hull", "TEXT"),
            ]
        }
    }

    #[test]
    fn test_types_compatible() {
        assert!(types_compatible("TEXT", "text"));
        assert!(types_compatible("TEXT", "VARCHAR(255)"));
        assert!(types_compatible("JSON", "LONGTEXT"));
        assert!(types_compatible("INTEGER", "BOOLEAN"));
        assert!(!types_compatible("TEXT", "INTEGER"));
    }

    #[test]
    fn test_create_clause() {
        let col = ColumnDefinition::new("isVariant", "INTEGER").not_null().default("0");
        assert_eq!(col.create_clause(), "\"isVariant\" INTEGER NOT NULL DEFAULT 0");
    }

    #[tokio::test]
    async fn test_ensure_table_creates_missing_table() {
        let pool = setup_test_db().await;

        SchemaSync::ensure_table::<WidgetsV1>(&pool).await.unwrap();

        let columns = introspect_table(&pool, "widgets").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert!(columns[0].pk);
        assert!(columns[1].not_null);
    }

    #[tokio::test]
    async fn test_ensure_table_adds_missing_columns() {
        let pool = setup_test_db().await;
        SchemaSync::ensure_table::<WidgetsV1>(&pool).await.unwrap();
        sqlx::query("INSERT INTO widgets (slug, name) VALUES ('a', 'A')")
            .execute(&pool)
            .await
            .unwrap();

        SchemaSync::ensure_table::<WidgetsV2>(&pool).await.unwrap();

        let columns = introspect_table(&pool, "widgets").await.unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["slug", "name", "isVariant", "hull"]);

        // Existing rows pick up the default
        let is_variant: i64 = sqlx::query_scalar("SELECT isVariant FROM widgets WHERE slug = 'a'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(is_variant, 0);
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let pool = setup_test_db().await;

        SchemaSync::ensure_table::<WidgetsV2>(&pool).await.unwrap();
        SchemaSync::ensure_table::<WidgetsV2>(&pool).await.unwrap();

        let actual = introspect_table(&pool, "widgets").await.unwrap();
        assert!(compare("widgets", &WidgetsV2::expected_columns(), &actual).is_empty());
    }
}
