use super::{HIVE_TYPE, ManagerBuildContext};
use crate::naming::TableNameGenerator;
use crate::writer::RevisionedDataWriter;
use async_trait::async_trait;
use errors::{FixtureError, FixtureResult};
use fixture_core::{
    MutableTableState, ObjectStore, QueryExecutor, StatisticsClient, TableDefinition, TableHandle,
    TableInstance, TableKind, TableManager, TableName
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const IMMUTABLE_TABLES_LOCATION_KEY: &str = "immutable_tables_location";
pub const MUTABLE_TABLES_LOCATION_KEY: &str = "mutable_tables_location";
pub const DATA_PATH_KEY: &str = "tests.data_path";
const DEFAULT_SCHEMA: &str = "default";

/// Manager for a SQL engine whose tables live in an object store and whose
/// statistics are kept in a metastore.
pub struct HiveTableManager {
    database: String,
    query_executor: Arc<dyn QueryExecutor>,
    writer: RevisionedDataWriter,
    statistics_client: Option<Arc<dyn StatisticsClient>>,
    names: Arc<TableNameGenerator>,
    immutable_tables_location: String,
    mutable_tables_location: String,
    inject_stats_for_immutable_tables: bool,
    inject_stats_for_mutable_tables: bool
}

impl HiveTableManager {
    pub fn new(
        database: impl Into<String>,
        query_executor: Arc<dyn QueryExecutor>,
        object_store: Arc<dyn ObjectStore>,
        names: Arc<TableNameGenerator>,
        immutable_tables_location: impl Into<String>,
        mutable_tables_location: impl Into<String>
    ) -> Self {
        Self {
            database: database.into(),
            query_executor,
            writer: RevisionedDataWriter::new(object_store),
            statistics_client: None,
            names,
            immutable_tables_location: trim_location(immutable_tables_location.into()),
            mutable_tables_location: trim_location(mutable_tables_location.into()),
            inject_stats_for_immutable_tables: false,
            inject_stats_for_mutable_tables: false
        }
    }

    pub fn with_statistics_client(mut self, client: Arc<dyn StatisticsClient>) -> Self {
        self.statistics_client = Some(client);
        self
    }

    pub fn with_stats_injection(mut self, immutable: bool, mutable: bool) -> Self {
        self.inject_stats_for_immutable_tables = immutable;
        self.inject_stats_for_mutable_tables = mutable;
        self
    }

    pub fn from_build_context(ctx: &ManagerBuildContext<'_>) -> FixtureResult<Self> {
        let immutable = match ctx.configuration.get_string(IMMUTABLE_TABLES_LOCATION_KEY) {
            Some(location) => location.to_string(),
            None => ctx.root.get_string_mandatory(DATA_PATH_KEY)?.to_string()
        };
        let mutable = ctx
            .configuration
            .get_string(MUTABLE_TABLES_LOCATION_KEY)
            .map_or_else(|| format!("{}/mutable_tables", trim_location(immutable.clone())), str::to_string);

        let mut manager = Self::new(
            ctx.database(),
            ctx.require_client::<dyn QueryExecutor>("query executor")?,
            ctx.require_client::<dyn ObjectStore>("object store")?,
            Arc::clone(ctx.names),
            immutable,
            mutable
        )
        .with_stats_injection(
            ctx.settings.inject_stats_for_immutable_tables,
            ctx.settings.inject_stats_for_mutable_tables
        );
        if let Some(client) = ctx.client::<dyn StatisticsClient>() {
            manager = manager.with_statistics_client(client);
        }
        Ok(manager)
    }

    async fn execute(&self, sql: &str) -> FixtureResult<()> {
        debug!(database = %self.database, sql, "executing");
        self.query_executor.execute(sql).await.map(|_| ())
    }

    async fn create_table(&self, definition: &TableDefinition, name: &TableName, location: &str) -> FixtureResult<()> {
        if let Some(schema) = name.schema() {
            self.execute(&format!("CREATE SCHEMA IF NOT EXISTS {schema}")).await?;
        }
        self.execute(&definition.create_table_ddl(&name.name_in_database(), Some(location)))
            .await
    }

    async fn drop_table_ignore_error(&self, name: &TableName) {
        if let Err(e) = self.execute(&format!("DROP TABLE IF EXISTS {}", name.name_in_database())).await {
            warn!(table = %name, error = %e, "ignoring failure to drop table");
        }
    }

    async fn mark_table_as_external(&self, name: &TableName) -> FixtureResult<()> {
        self.execute(&format!(
            "ALTER TABLE {} SET TBLPROPERTIES('EXTERNAL'='TRUE')",
            name.name_in_database()
        ))
        .await
    }

    /// Injects precomputed statistics. When injection is impossible the
    /// call fails only if `must_inject` is set.
    async fn inject_statistics(&self, definition: &TableDefinition, name: &TableName, must_inject: bool) -> FixtureResult<()> {
        let impossible = |reason: &str| {
            if must_inject {
                Err(FixtureError::InjectionNotPossible {
                    table: name.to_string(),
                    reason: reason.to_string()
                })
            } else {
                debug!(table = %name, reason, "skipping statistics injection");
                Ok(())
            }
        };

        if definition.is_partitioned() {
            return impossible("table is partitioned");
        }
        let Some(statistics) = definition.statistics() else {
            return impossible("no statistics available");
        };
        let Some(client) = &self.statistics_client else {
            return impossible("no statistics client configured");
        };
        client.set_statistics(name, &statistics).await
    }

    async fn do_create_immutable(&self, definition: &Arc<TableDefinition>, handle: &TableHandle) -> FixtureResult<TableInstance> {
        if definition.is_partitioned() {
            return Err(FixtureError::configuration(
                "partitioning is not supported for immutable tables"
            ));
        }
        let name = self.names.immutable_table_name(&self.database, handle);
        let location = format!(
            "{}/{}",
            self.immutable_tables_location,
            definition.data_source().path_suffix()
        );

        self.writer
            .ensure_data(&location, definition.data_source().as_ref())
            .await?;
        self.drop_table_ignore_error(&name).await;
        self.create_table(definition, &name, &location).await?;
        self.mark_table_as_external(&name).await?;

        if definition
            .inject_stats()
            .unwrap_or(self.inject_stats_for_immutable_tables)
        {
            self.inject_statistics(definition, &name, definition.inject_stats().unwrap_or(false))
                .await?;
        }
        info!(table = %name, "created immutable table");
        Ok(TableInstance::new(name, Arc::clone(definition)))
    }

    async fn do_create_mutable(
        &self,
        definition: &Arc<TableDefinition>,
        state: MutableTableState,
        handle: &TableHandle
    ) -> FixtureResult<TableInstance> {
        let name = self.names.mutable_table_name(&self.database, handle);
        let location = format!("{}/{}", self.mutable_tables_location, name.bare_name_in_database());

        self.create_table(definition, &name, &location).await?;

        if definition.is_partitioned() {
            for (partition_id, partition) in definition.partitions().iter().enumerate() {
                let partition_location = format!("{location}/partition_{partition_id}");
                if state.requires_data() && partition.data_source().has_data() {
                    self.writer
                        .write_data(&partition_location, partition.data_source().as_ref())
                        .await?;
                }
                self.execute(&partition.add_partition_ddl(&name.name_in_database(), &partition_location))
                    .await?;
            }
        } else if state.requires_data() && definition.data_source().has_data() {
            self.writer
                .write_data(&location, definition.data_source().as_ref())
                .await?;
        }

        if state.requires_data()
            && definition
                .inject_stats()
                .unwrap_or(self.inject_stats_for_mutable_tables)
        {
            self.inject_statistics(definition, &name, definition.inject_stats().unwrap_or(false))
                .await?;
        }
        info!(table = %name, state = %state, "created mutable table");
        Ok(TableInstance::new(name, Arc::clone(definition)))
    }
}

fn trim_location(location: String) -> String {
    location.trim_end_matches('/').to_string()
}

#[async_trait]
impl TableManager for HiveTableManager {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn manager_type(&self) -> &str {
        HIVE_TYPE
    }

    fn accepts(&self, kind: &TableKind) -> bool {
        matches!(kind, TableKind::Hive)
    }

    #[instrument(skip(self, definition), fields(database = %self.database))]
    async fn create_immutable(&self, definition: &Arc<TableDefinition>, handle: &TableHandle) -> FixtureResult<TableInstance> {
        self.do_create_immutable(definition, handle)
            .await
            .map_err(|e| e.for_table(handle))
    }

    #[instrument(skip(self, definition), fields(database = %self.database))]
    async fn create_mutable(
        &self,
        definition: &Arc<TableDefinition>,
        state: MutableTableState,
        handle: &TableHandle
    ) -> FixtureResult<TableInstance> {
        self.do_create_mutable(definition, state, handle)
            .await
            .map_err(|e| e.for_table(handle))
    }

    async fn drop_table(&self, name: &TableName) -> FixtureResult<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", name.name_in_database()))
            .await?;
        if TableNameGenerator::is_mutable_table_name(name.bare_name_in_database()) {
            self.writer
                .delete(&format!("{}/{}", self.mutable_tables_location, name.bare_name_in_database()))
                .await?;
        }
        Ok(())
    }

    /// Walks the default schema and every schema the engine lists, dropping
    /// stale mutable tables together with their data.
    #[instrument(skip(self), fields(database = %self.database))]
    async fn drop_stale_mutable_tables(&self) -> FixtureResult<()> {
        let mut schemas = vec![None];
        schemas.extend(
            self.query_executor
                .execute("SHOW SCHEMAS")
                .await?
                .first_column_strings()
                .into_iter()
                .filter(|schema| !schema.eq_ignore_ascii_case(DEFAULT_SCHEMA))
                .map(Some)
        );

        for schema in schemas {
            let listing = match &schema {
                Some(schema) => format!("SHOW TABLES IN {schema}"),
                None => "SHOW TABLES".to_string()
            };
            for table in self.query_executor.execute(&listing).await?.first_column_strings() {
                if !self.names.is_stale(&table) {
                    continue;
                }
                let qualified = schema
                    .as_ref()
                    .map_or_else(|| table.clone(), |schema| format!("{schema}.{table}"));
                info!(table = %qualified, "dropping stale mutable table");
                self.execute(&format!("DROP TABLE IF EXISTS {qualified}")).await?;
                self.writer
                    .delete(&format!("{}/{table}", self.mutable_tables_location))
                    .await?;
            }
        }
        Ok(())
    }

    async fn close(&self) -> FixtureResult<()> {
        self.query_executor.close().await
    }
}
