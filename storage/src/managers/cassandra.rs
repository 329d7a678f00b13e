use super::jdbc::sql_literal;
use super::{CASSANDRA_TYPE, ManagerBuildContext};
use crate::naming::TableNameGenerator;
use async_trait::async_trait;
use errors::{FixtureError, FixtureResult};
use fixture_core::{
    MutableTableState, QueryExecutor, Row, TableDefinition, TableHandle, TableInstance, TableKind,
    TableManager, TableName
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const KEYSPACE_KEY: &str = "default_schema";
pub const SKIP_CREATE_KEYSPACE_KEY: &str = "skip_create_schema";

/// Column names of a `CREATE TABLE ... (col type, ..., PRIMARY KEY (..))`
/// statement, in declaration order.
pub fn column_names(ddl: &str) -> FixtureResult<Vec<String>> {
    let malformed = || FixtureError::configuration(format!("no column list in table DDL: {ddl}"));
    let start = ddl.find('(').ok_or_else(malformed)?;

    let mut depth = 0usize;
    let mut current = String::new();
    let mut columns = Vec::new();
    for c in ddl[start + 1..].chars() {
        match c {
            '(' | '<' => depth += 1,
            ')' if depth == 0 => {
                columns.extend(column_of(&current));
                return if columns.is_empty() { Err(malformed()) } else { Ok(columns) };
            }
            ')' | '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                columns.extend(column_of(&current));
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    Err(malformed())
}

fn column_of(entry: &str) -> Option<String> {
    let word = entry.split_whitespace().next()?;
    (!word.eq_ignore_ascii_case("PRIMARY")).then(|| word.trim_matches('"').to_string())
}

/// Manager for wide-column stores speaking CQL. Only immutable tables are
/// supported; rows go in through unlogged batches of single-row inserts.
pub struct CassandraTableManager {
    database: String,
    keyspace: String,
    create_keyspace: bool,
    query_executor: Arc<dyn QueryExecutor>,
    names: Arc<TableNameGenerator>,
    batch_size: usize
}

impl CassandraTableManager {
    pub fn new(
        database: impl Into<String>,
        keyspace: impl Into<String>,
        query_executor: Arc<dyn QueryExecutor>,
        names: Arc<TableNameGenerator>,
        batch_size: usize
    ) -> Self {
        Self {
            database: database.into(),
            keyspace: keyspace.into(),
            create_keyspace: true,
            query_executor,
            names,
            batch_size: batch_size.max(1)
        }
    }

    /// For keyspaces provisioned outside the fixtures.
    pub fn without_keyspace_creation(mut self) -> Self {
        self.create_keyspace = false;
        self
    }

    pub fn from_build_context(ctx: &ManagerBuildContext<'_>) -> FixtureResult<Self> {
        let keyspace = ctx.configuration.get_string_mandatory(KEYSPACE_KEY)?;
        let manager = Self::new(
            ctx.database(),
            keyspace,
            ctx.require_client::<dyn QueryExecutor>("query executor")?,
            Arc::clone(ctx.names),
            ctx.settings.batch_size as usize
        );
        Ok(match ctx.configuration.get_bool(SKIP_CREATE_KEYSPACE_KEY)? {
            Some(true) => manager.without_keyspace_creation(),
            _ => manager
        })
    }

    async fn execute(&self, sql: &str) -> FixtureResult<()> {
        debug!(database = %self.database, sql, "executing");
        self.query_executor.execute(sql).await.map(|_| ())
    }

    fn table_name(&self, handle: &TableHandle) -> TableName {
        let name = self.names.immutable_table_name(&self.database, handle);
        let keyspace = name.schema().unwrap_or(&self.keyspace).to_string();
        TableName::new(&self.database, Some(keyspace), handle.name(), name.bare_name_in_database())
    }

    async fn flush(&self, batch: &mut Vec<String>) -> FixtureResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let statement = format!("BEGIN UNLOGGED BATCH {} APPLY BATCH", batch.join(" "));
        batch.clear();
        self.execute(&statement).await
    }

    async fn load_rows(&self, definition: &TableDefinition, name: &TableName, columns: &[String]) -> FixtureResult<usize> {
        let table = name.name_in_database();
        let column_list = columns.join(", ");
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut loaded = 0;
        for row in definition.data_source().rows()? {
            let row: Row = row?;
            if row.len() != columns.len() {
                return Err(FixtureError::configuration(format!(
                    "row of {table} has {} values, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            let values = row.iter().map(sql_literal).collect::<Vec<_>>().join(", ");
            batch.push(format!("INSERT INTO {table} ({column_list}) VALUES ({values});"));
            loaded += 1;
            if batch.len() == self.batch_size {
                self.flush(&mut batch).await?;
            }
        }
        self.flush(&mut batch).await?;
        Ok(loaded)
    }
}

#[async_trait]
impl TableManager for CassandraTableManager {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn manager_type(&self) -> &str {
        CASSANDRA_TYPE
    }

    fn accepts(&self, kind: &TableKind) -> bool {
        matches!(kind, TableKind::Relational)
    }

    #[instrument(skip(self, definition), fields(database = %self.database))]
    async fn create_immutable(&self, definition: &Arc<TableDefinition>, handle: &TableHandle) -> FixtureResult<TableInstance> {
        let name = self.table_name(handle);
        let result = async {
            if definition.is_partitioned() {
                return Err(FixtureError::unsupported("partitioned tables", CASSANDRA_TYPE));
            }
            let ddl = definition.create_table_ddl(&name.name_in_database(), None);
            let columns = column_names(&ddl)?;
            if self.create_keyspace {
                self.execute(&format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    name.schema().unwrap_or(&self.keyspace)
                ))
                .await?;
            }
            self.execute(&format!("DROP TABLE IF EXISTS {}", name.name_in_database()))
                .await?;
            self.execute(&ddl).await?;
            self.load_rows(definition, &name, &columns).await
        }
        .await;
        let rows = result.map_err(|e| e.for_table(handle))?;
        info!(table = %name, rows, "created immutable table");
        Ok(TableInstance::new(name, Arc::clone(definition)))
    }

    async fn create_mutable(
        &self,
        _definition: &Arc<TableDefinition>,
        _state: MutableTableState,
        handle: &TableHandle
    ) -> FixtureResult<TableInstance> {
        Err(FixtureError::unsupported("mutable tables", CASSANDRA_TYPE).for_table(handle))
    }

    async fn drop_table(&self, name: &TableName) -> FixtureResult<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", name.name_in_database()))
            .await
    }

    /// Nothing to reclaim: mutable tables are never created here.
    async fn drop_stale_mutable_tables(&self) -> FixtureResult<()> {
        Ok(())
    }

    async fn close(&self) -> FixtureResult<()> {
        self.query_executor.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_skip_primary_key_clause() {
        let ddl = "CREATE TABLE ks.nation (n_nationkey bigint, n_name text, n_comment map<text, text>, PRIMARY KEY (n_nationkey))";
        assert_eq!(
            column_names(ddl).unwrap(),
            vec!["n_nationkey", "n_name", "n_comment"]
        );
    }

    #[test]
    fn test_column_names_require_a_column_list() {
        assert!(column_names("CREATE TABLE nation").is_err());
        assert!(column_names("CREATE TABLE nation ()").is_err());
    }
}
