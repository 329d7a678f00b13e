//! # Typed Settings
//!
//! Validated views over the configuration subtrees the engine itself reads.
//! Backend connection parameters stay opaque and are read by the table
//! manager bound to the database.

use crate::config::Configuration;
use errors::{FixtureError, FixtureResult};
use validator::Validate;

pub const DATABASES_SECTION: &str = "databases";
pub const READ_ONLY_TABLE_MANAGER_TYPE: &str = "read_only";
const DEFAULT_BATCH_SIZE: u32 = 1000;

/// Engine-level settings of one configured logical database.
///
/// ## Keys (relative to `databases.<name>`)
/// - `table_manager_type`: manager implementation (default: `read_only`)
/// - `inject_stats_for_immutable_tables`: default stats injection for immutable tables
/// - `inject_stats_for_mutable_tables`: default stats injection for mutable tables
/// - `keep_mutable_tables_on_failure`: skip dropping mutable tables of failed tests
/// - `batch_size`: rows per insert batch (1-100000, default 1000)
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct DatabaseSettings {
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    #[validate(length(min = 1, max = 64))]
    pub table_manager_type: String,

    pub inject_stats_for_immutable_tables: bool,

    pub inject_stats_for_mutable_tables: bool,

    pub keep_mutable_tables_on_failure: bool,

    #[validate(range(min = 1, max = 100_000))]
    pub batch_size: u32
}

impl DatabaseSettings {
    pub fn from_configuration(name: &str, database: &Configuration) -> FixtureResult<Self> {
        let batch_size = match database.get_int("batch_size")? {
            Some(size) => u32::try_from(size).map_err(|_| {
                FixtureError::configuration(format!("batch_size out of range for database {name}: {size}"))
            })?,
            None => DEFAULT_BATCH_SIZE
        };

        let settings = Self {
            name: name.to_string(),
            table_manager_type: database
                .get_string("table_manager_type")
                .unwrap_or(READ_ONLY_TABLE_MANAGER_TYPE)
                .to_lowercase(),
            inject_stats_for_immutable_tables: database
                .get_bool("inject_stats_for_immutable_tables")?
                .unwrap_or(false),
            inject_stats_for_mutable_tables: database
                .get_bool("inject_stats_for_mutable_tables")?
                .unwrap_or(false),
            keep_mutable_tables_on_failure: database
                .get_bool("keep_mutable_tables_on_failure")?
                .unwrap_or(false),
            batch_size
        };

        settings.validate().map_err(|e| {
            FixtureError::configuration(format!("invalid settings for database {name}: {e}"))
        })?;

        Ok(settings)
    }
}

/// Settings of every database declared under `databases`, in name order.
pub fn database_settings(configuration: &Configuration) -> FixtureResult<Vec<DatabaseSettings>> {
    let databases = configuration.subconfiguration(DATABASES_SECTION);
    databases
        .list_prefixes()
        .into_iter()
        .map(|name| DatabaseSettings::from_configuration(&name, &databases.subconfiguration(&name)))
        .collect()
}
