use super::READ_ONLY_TYPE;
use crate::naming::TableNameGenerator;
use async_trait::async_trait;
use errors::{FixtureError, FixtureResult};
use fixture_core::{
    MutableTableState, TableDefinition, TableHandle, TableInstance, TableKind, TableManager,
    TableName
};
use std::sync::Arc;

/// Default manager. Immutable tables are assumed to exist already and are
/// only named; nothing is ever created or dropped.
pub struct ReadOnlyTableManager {
    database: String,
    names: Arc<TableNameGenerator>
}

impl ReadOnlyTableManager {
    pub fn new(database: impl Into<String>, names: Arc<TableNameGenerator>) -> Self {
        Self {
            database: database.into(),
            names
        }
    }
}

#[async_trait]
impl TableManager for ReadOnlyTableManager {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn manager_type(&self) -> &str {
        READ_ONLY_TYPE
    }

    fn accepts(&self, _kind: &TableKind) -> bool {
        true
    }

    async fn create_immutable(&self, definition: &Arc<TableDefinition>, handle: &TableHandle) -> FixtureResult<TableInstance> {
        Ok(TableInstance::new(
            self.names.immutable_table_name(&self.database, handle),
            Arc::clone(definition)
        ))
    }

    async fn create_mutable(
        &self,
        _definition: &Arc<TableDefinition>,
        _state: MutableTableState,
        handle: &TableHandle
    ) -> FixtureResult<TableInstance> {
        Err(FixtureError::unsupported("mutable tables", READ_ONLY_TYPE).for_table(handle))
    }

    async fn drop_table(&self, _name: &TableName) -> FixtureResult<()> {
        Err(FixtureError::unsupported("drop table", READ_ONLY_TYPE))
    }

    async fn drop_stale_mutable_tables(&self) -> FixtureResult<()> {
        Ok(())
    }

    async fn close(&self) -> FixtureResult<()> {
        Ok(())
    }
}
