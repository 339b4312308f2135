//! Database initialization
//!
//! Opens the relational store from a connection string and brings the
//! catalog tables up to the declared schema. Safe to call on every start.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::db::table_schemas::sync_all_table_schemas;

/// Open the store and create/sync the catalog tables
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let pool = connect(database_url).await?;
    sync_all_table_schemas(&pool).await?;
    Ok(pool)
}

/// Open a connection pool without touching the schema
///
/// In-memory databases exist per connection, so they get a single
/// connection that is never recycled.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(std::time::Duration::from_millis(5000));

    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        // WAL lets the read API keep serving while a batch job writes
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        pool
    };

    info!("Opened database ({})", if in_memory { "in-memory" } else { "file" });
    Ok(pool)
}
