//! Relational store: initialization, schema sync and catalog queries

pub mod init;
pub mod schema_sync;
pub mod species;
pub mod starships;
pub mod table_schemas;

pub use init::{connect, init_database};
pub use species::LIST_LIMIT;
pub use starships::FieldPatch;
