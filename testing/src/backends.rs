//! In-memory stand-ins for backend clients that record what they were asked
//! to do.

use async_trait::async_trait;
use errors::{FixtureError, FixtureResult};
use fixture_core::{
    DirectoryClient, ObjectStore, QueryExecutor, QueryResult, StatisticsClient, TableName,
    TableStatistics, TopicAdmin, TopicMessage, TopicSettings
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Query executor keeping a statement log and a table catalog.
///
/// `CREATE TABLE` adds to the catalog and `DROP TABLE` removes from it.
/// `SHOW SCHEMAS` lists the schemas of qualified entries, `SHOW TABLES
/// [IN schema]` the bare names of one schema and `information_schema.tables`
/// queries the whole catalog.
#[derive(Debug, Default)]
pub struct RecordingQueryExecutor {
    statements: Mutex<Vec<String>>,
    tables: Mutex<BTreeSet<String>>,
    failures: Mutex<Vec<(String, String)>>,
    closed: AtomicUsize
}

impl RecordingQueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the catalog, e.g. with tables left over by an earlier run.
    pub fn with_tables<I, S>(self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        self.tables.lock().extend(tables.into_iter().map(Into::into));
        self
    }

    /// Every later statement containing `fragment` fails with `reason`.
    pub fn fail_on(&self, fragment: impl Into<String>, reason: impl Into<String>) {
        self.failures.lock().push((fragment.into(), reason.into()));
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub fn statements_starting_with(&self, prefix: &str) -> Vec<String> {
        self.statements
            .lock()
            .iter()
            .filter(|statement| statement.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn tables(&self) -> BTreeSet<String> {
        self.tables.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn catalog_change(&self, sql: &str) {
        let words: Vec<&str> = sql.split_whitespace().collect();
        let keyword = |i: usize| words.get(i).map(|w| w.to_ascii_uppercase());
        match (keyword(0).as_deref(), keyword(1).as_deref(), keyword(2).as_deref()) {
            (Some("CREATE"), Some("TABLE"), _) => {
                self.tables.lock().extend(table_name(&words[2..]));
            }
            (Some("CREATE"), Some("EXTERNAL"), Some("TABLE")) => {
                self.tables.lock().extend(table_name(&words[3..]));
            }
            (Some("DROP"), Some("TABLE"), _) => {
                if let Some(table) = table_name(&words[2..]) {
                    self.tables.lock().remove(&table);
                }
            }
            _ => {}
        }
    }

    fn listing(&self, sql: &str) -> Option<Vec<String>> {
        let lower = sql.to_ascii_lowercase();
        let tables = self.tables.lock();
        if lower.contains("information_schema.tables") {
            return Some(tables.iter().cloned().collect());
        }
        if lower.starts_with("show schemas") {
            let schemas: BTreeSet<String> = tables
                .iter()
                .filter_map(|table| table.split_once('.').map(|(schema, _)| schema.to_string()))
                .collect();
            return Some(schemas.into_iter().collect());
        }
        let rest = lower.strip_prefix("show tables")?.trim();
        Some(match rest.strip_prefix("in ") {
            Some(schema) => {
                let prefix = format!("{}.", schema.trim());
                tables
                    .iter()
                    .filter(|table| table.to_ascii_lowercase().starts_with(&prefix))
                    .map(|table| table[prefix.len()..].to_string())
                    .collect()
            }
            None => tables.iter().filter(|table| !table.contains('.')).cloned().collect()
        })
    }
}

#[async_trait]
impl QueryExecutor for RecordingQueryExecutor {
    async fn execute(&self, sql: &str) -> FixtureResult<QueryResult> {
        self.statements.lock().push(sql.to_string());
        if let Some((_, reason)) = self
            .failures
            .lock()
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
        {
            return Err(FixtureError::backend("recording", reason));
        }

        if let Some(names) = self.listing(sql) {
            return Ok(QueryResult {
                columns: vec!["name".to_string()],
                rows: names.into_iter().map(|name| vec![Value::String(name)]).collect()
            });
        }
        self.catalog_change(sql);
        Ok(QueryResult::empty())
    }

    async fn close(&self) -> FixtureResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// First word after an optional `IF [NOT] EXISTS`, cut at `(`.
fn table_name(words: &[&str]) -> Option<String> {
    words
        .iter()
        .find(|word| !matches!(word.to_ascii_uppercase().as_str(), "IF" | "NOT" | "EXISTS"))
        .and_then(|word| word.split('(').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Object store over a map, logging every write.
#[derive(Debug, Default)]
pub struct RecordingObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    puts: Mutex<Vec<String>>,
    deleted_prefixes: Mutex<Vec<String>>
}

impl RecordingObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().clone()
    }

    /// Writes of table data, leaving out revision markers.
    pub fn uploads(&self) -> Vec<String> {
        self.puts
            .lock()
            .iter()
            .filter(|path| path.ends_with("/data"))
            .cloned()
            .collect()
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn deleted_prefixes(&self) -> Vec<String> {
        self.deleted_prefixes.lock().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    async fn put(&self, path: &str, contents: Vec<u8>) -> FixtureResult<()> {
        self.puts.lock().push(path.to_string());
        self.objects.lock().insert(path.to_string(), contents);
        Ok(())
    }

    async fn get(&self, path: &str) -> FixtureResult<Option<Vec<u8>>> {
        Ok(self.objects.lock().get(path).cloned())
    }

    async fn delete_prefix(&self, prefix: &str) -> FixtureResult<()> {
        self.deleted_prefixes.lock().push(prefix.to_string());
        self.objects.lock().retain(|path, _| !path.starts_with(prefix));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingStatisticsClient {
    injected: Mutex<Vec<(String, TableStatistics)>>
}

impl RecordingStatisticsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn injected(&self) -> Vec<(String, TableStatistics)> {
        self.injected.lock().clone()
    }
}

#[async_trait]
impl StatisticsClient for RecordingStatisticsClient {
    async fn set_statistics(&self, table: &TableName, statistics: &TableStatistics) -> FixtureResult<()> {
        self.injected
            .lock()
            .push((table.name_in_database(), statistics.clone()));
        Ok(())
    }
}

/// Topic admin holding topics and their messages in memory.
#[derive(Debug, Default)]
pub struct InMemoryTopicAdmin {
    topics: Mutex<BTreeMap<String, (TopicSettings, Vec<TopicMessage>)>>,
    deleted: Mutex<Vec<String>>
}

impl InMemoryTopicAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self, topic: &str) -> Vec<TopicMessage> {
        self.topics
            .lock()
            .get(topic)
            .map(|(_, messages)| messages.clone())
            .unwrap_or_default()
    }

    pub fn settings(&self, topic: &str) -> Option<TopicSettings> {
        self.topics.lock().get(topic).map(|(settings, _)| settings.clone())
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl TopicAdmin for InMemoryTopicAdmin {
    async fn list_topics(&self) -> FixtureResult<Vec<String>> {
        Ok(self.topics.lock().keys().cloned().collect())
    }

    async fn delete_topic(&self, topic: &str) -> FixtureResult<()> {
        self.topics.lock().remove(topic);
        self.deleted.lock().push(topic.to_string());
        Ok(())
    }

    async fn create_topic(&self, topic: &str, settings: &TopicSettings) -> FixtureResult<()> {
        self.topics
            .lock()
            .insert(topic.to_string(), (settings.clone(), Vec::new()));
        Ok(())
    }

    async fn produce(&self, topic: &str, message: TopicMessage) -> FixtureResult<()> {
        let mut topics = self.topics.lock();
        let (_, messages) = topics
            .get_mut(topic)
            .ok_or_else(|| FixtureError::backend("kafka", format!("unknown topic {topic}")))?;
        messages.push(message);
        Ok(())
    }
}

/// Directory holding entries in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    added: AtomicUsize
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an entry, as if created outside the fixtures.
    pub fn with_entry(self, dn: impl Into<String>) -> Self {
        self.entries.lock().insert(dn.into(), BTreeMap::new());
        self
    }

    pub fn entry(&self, dn: &str) -> Option<BTreeMap<String, String>> {
        self.entries.lock().get(dn).cloned()
    }

    /// Entries added through the client.
    pub fn added_count(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn entry_exists(&self, dn: &str) -> FixtureResult<bool> {
        Ok(self.entries.lock().contains_key(dn))
    }

    async fn add_entry(&self, dn: &str, attributes: &BTreeMap<String, String>) -> FixtureResult<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(dn) {
            return Err(FixtureError::backend("ldap", format!("entry already exists: {dn}")));
        }
        entries.insert(dn.to_string(), attributes.clone());
        self.added.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catalog_follows_ddl() {
        let executor = RecordingQueryExecutor::new().with_tables(["tmp_old_deadbeef_000000"]);
        executor
            .execute("CREATE TABLE tpch.nation (id INT) LOCATION '/data/nation'")
            .await
            .unwrap();
        executor
            .execute("CREATE TABLE IF NOT EXISTS region(id INT)")
            .await
            .unwrap();
        executor
            .execute("DROP TABLE IF EXISTS tmp_old_deadbeef_000000")
            .await
            .unwrap();

        let listed = executor.execute("SHOW TABLES").await.unwrap();
        assert_eq!(listed.first_column_strings(), ["region"]);
        let listed = executor.execute("SHOW TABLES IN TPCH").await.unwrap();
        assert_eq!(listed.first_column_strings(), ["nation"]);

        executor.fail_on("INSERT", "disk full");
        let err = executor.execute("INSERT INTO region VALUES (1)").await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(executor.statements().len(), 6);
    }
}
