//! holocron-batch library - sequential maintenance passes over the catalog
//!
//! - `runner`: pacing, per-record outcome tally, family and parent passes
//! - `import`: species and starship JSON importers
//! - `patch`: field patch job

pub mod import;
pub mod patch;
pub mod runner;

pub use runner::{BatchOptions, BatchSummary};
