//! Contracts between the engine and backend drivers.

use crate::data_source::Row;
use crate::table::{
    MutableTableState, TableDefinition, TableHandle, TableInstance, TableKind, TableName,
    TableStatistics, TopicSettings
};
use async_trait::async_trait;
use errors::FixtureResult;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Backend-specific driver that creates and drops tables for one database.
///
/// Managers are shared by every worker of a suite and must tolerate
/// concurrent calls.
#[async_trait]
pub trait TableManager: Send + Sync {
    fn database_name(&self) -> &str;

    /// Registered manager type, e.g. `hive`.
    fn manager_type(&self) -> &str;

    fn accepts(&self, kind: &TableKind) -> bool;

    async fn create_immutable(
        &self,
        definition: &Arc<TableDefinition>,
        handle: &TableHandle
    ) -> FixtureResult<TableInstance>;

    async fn create_mutable(
        &self,
        definition: &Arc<TableDefinition>,
        state: MutableTableState,
        handle: &TableHandle
    ) -> FixtureResult<TableInstance>;

    async fn drop_table(&self, name: &TableName) -> FixtureResult<()>;

    /// Drops mutable tables left behind by earlier runs.
    async fn drop_stale_mutable_tables(&self) -> FixtureResult<()>;

    async fn close(&self) -> FixtureResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// First column of every row rendered as text.
    pub fn first_column_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string()
            })
            .collect()
    }
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> FixtureResult<QueryResult>;

    async fn close(&self) -> FixtureResult<()> {
        Ok(())
    }
}

/// Blob storage beneath table locations.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, contents: Vec<u8>) -> FixtureResult<()>;

    async fn get(&self, path: &str) -> FixtureResult<Option<Vec<u8>>>;

    async fn delete_prefix(&self, prefix: &str) -> FixtureResult<()>;
}

#[async_trait]
pub trait StatisticsClient: Send + Sync {
    async fn set_statistics(&self, table: &TableName, statistics: &TableStatistics) -> FixtureResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    pub partition: Option<i32>,
    pub key: Option<String>,
    pub value: String
}

#[async_trait]
pub trait TopicAdmin: Send + Sync {
    async fn list_topics(&self) -> FixtureResult<Vec<String>>;

    async fn delete_topic(&self, topic: &str) -> FixtureResult<()>;

    async fn create_topic(&self, topic: &str, settings: &TopicSettings) -> FixtureResult<()>;

    async fn produce(&self, topic: &str, message: TopicMessage) -> FixtureResult<()>;
}

/// Directory service addressed by distinguished name.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn entry_exists(&self, dn: &str) -> FixtureResult<bool>;

    async fn add_entry(&self, dn: &str, attributes: &BTreeMap<String, String>) -> FixtureResult<()>;
}
