use super::{JDBC_TYPE, ManagerBuildContext};
use crate::clients::PostgresQueryExecutor;
use crate::naming::TableNameGenerator;
use async_trait::async_trait;
use errors::{FixtureError, FixtureResult};
use fixture_core::{
    MutableTableState, QueryExecutor, Row, TableDefinition, TableHandle, TableInstance, TableKind,
    TableManager, TableName
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const JDBC_URL_KEY: &str = "jdbc_url";

const LIST_TABLES_QUERY: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_schema = current_schema()";

/// Renders a JSON value as a SQL literal.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''"))
    }
}

fn insert_statement(table: &str, rows: &[Row]) -> String {
    let values = rows
        .iter()
        .map(|row| {
            format!(
                "({})",
                row.iter().map(sql_literal).collect::<Vec<_>>().join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {table} VALUES {values}")
}

/// Manager for relational databases: tables are created from DDL and
/// loaded with batched multi-row inserts.
pub struct JdbcTableManager {
    database: String,
    query_executor: Arc<dyn QueryExecutor>,
    names: Arc<TableNameGenerator>,
    batch_size: usize
}

impl JdbcTableManager {
    pub fn new(
        database: impl Into<String>,
        query_executor: Arc<dyn QueryExecutor>,
        names: Arc<TableNameGenerator>,
        batch_size: usize
    ) -> Self {
        Self {
            database: database.into(),
            query_executor,
            names,
            batch_size: batch_size.max(1)
        }
    }

    /// Uses the bound query executor, or connects lazily to `jdbc_url`.
    pub fn from_build_context(ctx: &ManagerBuildContext<'_>) -> FixtureResult<Self> {
        let executor: Arc<dyn QueryExecutor> = match ctx.client::<dyn QueryExecutor>() {
            Some(executor) => executor,
            None => {
                let url = ctx.configuration.get_string(JDBC_URL_KEY).ok_or_else(|| {
                    FixtureError::MissingSetting {
                        key: format!("databases.{}.{JDBC_URL_KEY}", ctx.database())
                    }
                })?;
                Arc::new(PostgresQueryExecutor::connect_lazy(url)?)
            }
        };
        Ok(Self::new(
            ctx.database(),
            executor,
            Arc::clone(ctx.names),
            ctx.settings.batch_size as usize
        ))
    }

    async fn execute(&self, sql: &str) -> FixtureResult<()> {
        debug!(database = %self.database, sql, "executing");
        self.query_executor.execute(sql).await.map(|_| ())
    }

    async fn create_table(&self, definition: &TableDefinition, name: &TableName) -> FixtureResult<()> {
        if definition.is_partitioned() {
            return Err(FixtureError::unsupported("partitioned tables", JDBC_TYPE));
        }
        if definition.inject_stats() == Some(true) {
            return Err(FixtureError::InjectionNotPossible {
                table: name.to_string(),
                reason: "relational databases compute their own statistics".to_string()
            });
        }
        if let Some(schema) = name.schema() {
            self.execute(&format!("CREATE SCHEMA IF NOT EXISTS {schema}")).await?;
        }
        self.execute(&definition.create_table_ddl(&name.name_in_database(), None))
            .await
    }

    async fn load_rows(&self, definition: &TableDefinition, name: &TableName) -> FixtureResult<usize> {
        let table = name.name_in_database();
        let mut batch: Vec<Row> = Vec::with_capacity(self.batch_size);
        let mut loaded = 0;
        for row in definition.data_source().rows()? {
            batch.push(row?);
            if batch.len() == self.batch_size {
                self.execute(&insert_statement(&table, &batch)).await?;
                loaded += batch.len();
                batch.clear();
            }
        }
        if !batch.is_empty() {
            self.execute(&insert_statement(&table, &batch)).await?;
            loaded += batch.len();
        }
        Ok(loaded)
    }
}

#[async_trait]
impl TableManager for JdbcTableManager {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn manager_type(&self) -> &str {
        JDBC_TYPE
    }

    fn accepts(&self, kind: &TableKind) -> bool {
        matches!(kind, TableKind::Relational)
    }

    #[instrument(skip(self, definition), fields(database = %self.database))]
    async fn create_immutable(&self, definition: &Arc<TableDefinition>, handle: &TableHandle) -> FixtureResult<TableInstance> {
        let name = self.names.immutable_table_name(&self.database, handle);
        let result = async {
            self.execute(&format!("DROP TABLE IF EXISTS {}", name.name_in_database()))
                .await?;
            self.create_table(definition, &name).await?;
            self.load_rows(definition, &name).await
        }
        .await;
        let rows = result.map_err(|e| e.for_table(handle))?;
        info!(table = %name, rows, "created immutable table");
        Ok(TableInstance::new(name, Arc::clone(definition)))
    }

    #[instrument(skip(self, definition), fields(database = %self.database))]
    async fn create_mutable(
        &self,
        definition: &Arc<TableDefinition>,
        state: MutableTableState,
        handle: &TableHandle
    ) -> FixtureResult<TableInstance> {
        let name = self.names.mutable_table_name(&self.database, handle);
        let result = async {
            self.create_table(definition, &name).await?;
            if state.requires_data() {
                self.load_rows(definition, &name).await?;
            }
            Ok::<(), FixtureError>(())
        }
        .await;
        result.map_err(|e| e.for_table(handle))?;
        info!(table = %name, state = %state, "created mutable table");
        Ok(TableInstance::new(name, Arc::clone(definition)))
    }

    async fn drop_table(&self, name: &TableName) -> FixtureResult<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", name.name_in_database()))
            .await
    }

    #[instrument(skip(self), fields(database = %self.database))]
    async fn drop_stale_mutable_tables(&self) -> FixtureResult<()> {
        let tables = self.query_executor.execute(LIST_TABLES_QUERY).await?;
        for table in tables.first_column_strings() {
            if self.names.is_stale(&table) {
                info!(table = %table, "dropping stale mutable table");
                self.execute(&format!("DROP TABLE IF EXISTS {table}")).await?;
            }
        }
        Ok(())
    }

    async fn close(&self) -> FixtureResult<()> {
        self.query_executor.close().await
    }
}
