//! Generated table names.
//!
//! Immutable tables keep their logical name. Mutable tables are named
//! `tmp_<name>_<run>_<suffix>`, where `<run>` identifies the process that
//! created them; a mutable name carrying another run id is stale.

use fixture_core::{TableHandle, TableName};
use regex::Regex;
use std::sync::LazyLock;

pub const MUTABLE_TABLE_PREFIX: &str = "tmp_";
const RUN_ID_LENGTH: usize = 8;
const SUFFIX_LENGTH: usize = 6;

static MUTABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^tmp_.+_([0-9a-f]{8})_[0-9a-f]{6}$").expect("valid mutable table name pattern")
});

#[derive(Debug, Clone)]
pub struct TableNameGenerator {
    run_id: String
}

impl Default for TableNameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TableNameGenerator {
    pub fn new() -> Self {
        Self {
            run_id: utils::random_suffix(RUN_ID_LENGTH)
        }
    }

    /// Fixed run id; must be `RUN_ID_LENGTH` lowercase hex digits to be
    /// recognized by [`Self::is_stale`].
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into()
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn immutable_table_name(&self, database: &str, handle: &TableHandle) -> TableName {
        TableName::new(
            database,
            handle.schema().map(str::to_string),
            handle.name(),
            handle.name()
        )
    }

    pub fn mutable_table_name(&self, database: &str, handle: &TableHandle) -> TableName {
        let generated = format!(
            "{MUTABLE_TABLE_PREFIX}{}_{}_{}",
            handle.name().to_lowercase(),
            self.run_id,
            utils::random_suffix(SUFFIX_LENGTH)
        );
        TableName::new(
            database,
            handle.schema().map(str::to_string),
            handle.name(),
            generated
        )
    }

    pub fn is_mutable_table_name(name: &str) -> bool {
        MUTABLE_NAME.is_match(name)
    }

    /// True for mutable names created by a different run.
    pub fn is_stale(&self, name: &str) -> bool {
        let bare = name.rsplit('.').next().unwrap_or(name).to_lowercase();
        MUTABLE_NAME
            .captures(&bare)
            .and_then(|captures| captures.get(1))
            .is_some_and(|run| run.as_str() != self.run_id)
    }
}
