//! Table model: handles, definitions, realized instances and statistics.

use crate::data_source::TableDataSource;
use errors::{FixtureError, FixtureResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use strum::{Display, EnumString};

pub const NAME_PLACEHOLDER: &str = "%NAME%";
pub const LOCATION_PLACEHOLDER: &str = "%LOCATION%";

/// Logical address of a table: `[database.][schema.]name`.
///
/// A handle without database or schema is resolved against the database the
/// definition declares, or the caller's active one.
///
/// Name and schema compare case-insensitively, matching the definitions
/// repository. The spelling of the first handle is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableHandle {
    name: String,
    schema: Option<String>,
    database: Option<String>
}

impl TableHandle {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            database: None
        }
    }

    /// Parses `name`, `schema.name` or `database.schema.name`.
    pub fn parse(value: &str) -> FixtureResult<Self> {
        let parts: Vec<&str> = value.split('.').collect();
        if parts.iter().any(|part| part.trim().is_empty()) {
            return Err(FixtureError::configuration(format!(
                "invalid table handle: '{value}'"
            )));
        }
        match parts.as_slice() {
            [name] => Ok(Self::table(*name)),
            [schema, name] => Ok(Self::table(*name).in_schema(*schema)),
            [database, schema, name] => Ok(Self::table(*name).in_schema(*schema).in_database(*database)),
            _ => Err(FixtureError::configuration(format!(
                "invalid table handle: '{value}', expected [database.][schema.]name"
            )))
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn without_schema(&self) -> Self {
        Self {
            schema: None,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn key(&self) -> (String, Option<String>, Option<&str>) {
        (
            self.name.to_lowercase(),
            self.schema.as_deref().map(str::to_lowercase),
            self.database.as_deref()
        )
    }
}

impl PartialEq for TableHandle {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TableHandle {}

impl Hash for TableHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for TableHandle {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TableHandle {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(database) = &self.database {
            write!(f, "{database}.")?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        write!(f, "{}", self.name)
    }
}

/// Target state of a mutable table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MutableTableState {
    Prepared,
    Created,
    Loaded
}

impl MutableTableState {
    pub fn requires_data(self) -> bool {
        self == Self::Loaded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicSettings {
    pub partitions: i32,
    pub replication_factor: i16
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            partitions: 1,
            replication_factor: 1
        }
    }
}

/// Backend family a definition targets. Dispatch checks that the manager
/// bound to the target database accepts the kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    Hive,
    Relational,
    Topic(TopicSettings)
}

impl TableKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Hive => "hive",
            Self::Relational => "jdbc",
            Self::Topic(_) => "kafka"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub null_count: Option<u64>,
    pub distinct_values: Option<u64>,
    pub min: Option<serde_json::Value>,
    pub max: Option<serde_json::Value>
}

/// Precomputed statistics injected into a metastore instead of running an
/// analyze pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableStatistics {
    pub row_count: u64,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnStatistics>
}

#[derive(Debug, Clone)]
pub struct PartitionDefinition {
    spec: String,
    data_source: Arc<dyn TableDataSource>
}

impl PartitionDefinition {
    /// `spec` is the partition key list, e.g. `p_regionkey=1`.
    pub fn new(spec: impl Into<String>, data_source: Arc<dyn TableDataSource>) -> Self {
        Self {
            spec: spec.into(),
            data_source
        }
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn data_source(&self) -> &Arc<dyn TableDataSource> {
        &self.data_source
    }

    pub fn add_partition_ddl(&self, table_name: &str, location: &str) -> String {
        format!(
            "ALTER TABLE {table_name} ADD PARTITION ({}) LOCATION '{location}'",
            self.spec
        )
    }
}

/// Blueprint of a table. Registered once per process and shared by every
/// instance realized from it.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    handle: TableHandle,
    kind: TableKind,
    ddl_template: String,
    data_source: Arc<dyn TableDataSource>,
    partitions: Vec<PartitionDefinition>,
    statistics: Option<TableStatistics>,
    inject_stats: Option<bool>,
    default_database: Option<String>
}

impl TableDefinition {
    pub fn new(
        handle: TableHandle,
        kind: TableKind,
        ddl_template: impl Into<String>,
        data_source: Arc<dyn TableDataSource>
    ) -> Self {
        Self {
            handle,
            kind,
            ddl_template: ddl_template.into(),
            data_source,
            partitions: Vec::new(),
            statistics: None,
            inject_stats: None,
            default_database: None
        }
    }

    pub fn hive(
        handle: TableHandle,
        ddl_template: impl Into<String>,
        data_source: Arc<dyn TableDataSource>
    ) -> Self {
        Self::new(handle, TableKind::Hive, ddl_template, data_source)
    }

    pub fn relational(
        handle: TableHandle,
        ddl_template: impl Into<String>,
        data_source: Arc<dyn TableDataSource>
    ) -> Self {
        Self::new(handle, TableKind::Relational, ddl_template, data_source)
    }

    pub fn topic(handle: TableHandle, settings: TopicSettings, data_source: Arc<dyn TableDataSource>) -> Self {
        Self::new(handle, TableKind::Topic(settings), String::new(), data_source)
    }

    pub fn with_partitions(mut self, partitions: Vec<PartitionDefinition>) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_statistics(mut self, statistics: TableStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn with_inject_stats(mut self, inject: bool) -> Self {
        self.inject_stats = Some(inject);
        self
    }

    /// Database used when a requirement's handle does not name one.
    pub fn with_default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = Some(database.into());
        self
    }

    pub fn handle(&self) -> &TableHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn kind(&self) -> &TableKind {
        &self.kind
    }

    pub fn ddl_template(&self) -> &str {
        &self.ddl_template
    }

    pub fn data_source(&self) -> &Arc<dyn TableDataSource> {
        &self.data_source
    }

    pub fn partitions(&self) -> &[PartitionDefinition] {
        &self.partitions
    }

    pub fn is_partitioned(&self) -> bool {
        !self.partitions.is_empty()
    }

    /// Explicit statistics, else whatever the data source carries.
    pub fn statistics(&self) -> Option<TableStatistics> {
        self.statistics
            .clone()
            .or_else(|| self.data_source.statistics())
    }

    pub fn inject_stats(&self) -> Option<bool> {
        self.inject_stats
    }

    pub fn default_database(&self) -> Option<&str> {
        self.default_database.as_deref()
    }

    /// Renders the creation statement for `name`. A location is substituted
    /// for `%LOCATION%`, or appended as a `LOCATION` clause when the template
    /// has no placeholder.
    pub fn create_table_ddl(&self, name: &str, location: Option<&str>) -> String {
        let ddl = self.ddl_template.replace(NAME_PLACEHOLDER, name);
        match location {
            Some(location) if ddl.contains(LOCATION_PLACEHOLDER) => {
                ddl.replace(LOCATION_PLACEHOLDER, location)
            }
            Some(location) => format!("{} LOCATION '{location}'", ddl.trim_end()),
            None => ddl
        }
    }
}

impl PartialEq for TableDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && self.kind == other.kind && self.ddl_template == other.ddl_template
    }
}

impl Eq for TableDefinition {}

impl Hash for TableDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

/// Concrete name of a realized table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    database: String,
    schema: Option<String>,
    name: String,
    name_in_database: String
}

impl TableName {
    pub fn new(
        database: impl Into<String>,
        schema: Option<String>,
        name: impl Into<String>,
        name_in_database: impl Into<String>
    ) -> Self {
        Self {
            database: database.into(),
            schema,
            name: name.into(),
            name_in_database: name_in_database.into()
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Logical name the table was requested under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generated name without schema qualification.
    pub fn bare_name_in_database(&self) -> &str {
        &self.name_in_database
    }

    /// Schema-qualified generated name, as used in statements.
    pub fn name_in_database(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name_in_database),
            None => self.name_in_database.clone()
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.name_in_database())
    }
}

/// A table realized by a table manager.
#[derive(Debug, Clone)]
pub struct TableInstance {
    name: TableName,
    definition: Arc<TableDefinition>
}

impl TableInstance {
    pub fn new(name: TableName, definition: Arc<TableDefinition>) -> Self {
        Self { name, definition }
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    pub fn name_in_database(&self) -> String {
        self.name.name_in_database()
    }

    pub fn definition(&self) -> &Arc<TableDefinition> {
        &self.definition
    }
}

impl PartialEq for TableInstance {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.definition == other.definition
    }
}

impl Eq for TableInstance {}
