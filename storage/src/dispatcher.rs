//! Routes table definitions to the manager bound to their database.

use crate::managers::{ManagerBuildContext, TableManagerFactory};
use crate::naming::TableNameGenerator;
use config::{Configuration, DATABASES_SECTION, database_settings};
use context::Dependencies;
use errors::{FixtureError, FixtureResult};
use fixture_core::{TableDefinition, TableHandle, TableManager};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Database name to manager map. Built once per suite and read-only
/// afterwards.
pub struct TableManagerDispatcher {
    managers: BTreeMap<String, Arc<dyn TableManager>>,
    closed: AtomicBool
}

impl TableManagerDispatcher {
    pub fn new<I>(managers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn TableManager>>
    {
        Self {
            managers: managers
                .into_iter()
                .map(|manager| (manager.database_name().to_string(), manager))
                .collect(),
            closed: AtomicBool::new(false)
        }
    }

    /// Builds one manager per database declared under `databases`, using
    /// the factory registered for its `table_manager_type`.
    pub fn from_configuration(
        configuration: &Configuration,
        factories: &[TableManagerFactory],
        dependencies: &Dependencies,
        names: &Arc<TableNameGenerator>
    ) -> FixtureResult<Self> {
        let databases = configuration.subconfiguration(DATABASES_SECTION);
        let mut managers = Vec::new();
        for settings in database_settings(configuration)? {
            let factory = factories
                .iter()
                .find(|factory| factory.manager_type() == settings.table_manager_type)
                .ok_or_else(|| FixtureError::UnknownTableManagerType {
                    manager_type: settings.table_manager_type.clone(),
                    database: settings.name.clone(),
                    known: factories.iter().map(|f| f.manager_type().to_string()).collect()
                })?;

            let database_configuration = databases.subconfiguration(&settings.name);
            let manager = factory.build(&ManagerBuildContext {
                settings: &settings,
                configuration: &database_configuration,
                root: configuration,
                dependencies,
                names
            })?;
            debug!(database = %settings.name, manager_type = %settings.table_manager_type, "bound table manager");
            managers.push(manager);
        }
        Ok(Self::new(managers))
    }

    /// Manager for the database named by `handle`, else the definition's
    /// default database, else the only database accepting its kind.
    pub fn get_table_manager_for(
        &self,
        definition: &TableDefinition,
        handle: &TableHandle
    ) -> FixtureResult<Arc<dyn TableManager>> {
        let kind = definition.kind();
        let database = match handle.database().or(definition.default_database()) {
            Some(database) => database.to_string(),
            None => self.only_database_accepting(definition)?
        };

        let manager = self
            .managers
            .get(&database)
            .ok_or_else(|| FixtureError::UnknownDatabase {
                database: database.clone(),
                table_kind: kind.type_name().to_string(),
                known: self.database_names()
            })?;

        if !manager.accepts(kind) {
            return Err(FixtureError::configuration(format!(
                "table manager {} for database {database} cannot handle {} table {}",
                manager.manager_type(),
                kind.type_name(),
                definition.handle()
            )));
        }
        Ok(Arc::clone(manager))
    }

    fn only_database_accepting(&self, definition: &TableDefinition) -> FixtureResult<String> {
        let candidates: Vec<&String> = self
            .managers
            .iter()
            .filter(|(_, manager)| manager.accepts(definition.kind()))
            .map(|(name, _)| name)
            .collect();
        match candidates.as_slice() {
            [database] => Ok((*database).clone()),
            [] => Err(FixtureError::UnknownDatabase {
                database: "<unspecified>".to_string(),
                table_kind: definition.kind().type_name().to_string(),
                known: self.database_names()
            }),
            many => Err(FixtureError::configuration(format!(
                "table {} does not name a database and {} databases accept {} tables: {:?}",
                definition.handle(),
                many.len(),
                definition.kind().type_name(),
                many
            )))
        }
    }

    pub fn get_table_manager(&self, database: &str) -> Option<Arc<dyn TableManager>> {
        self.managers.get(database).cloned()
    }

    pub fn all_table_managers(&self) -> impl Iterator<Item = &Arc<dyn TableManager>> {
        self.managers.values()
    }

    pub fn database_names(&self) -> Vec<String> {
        self.managers.keys().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes every manager once. Later calls are no-ops. Every manager is
    /// closed even if an earlier one fails; the first failure is returned
    /// with the rest suppressed.
    pub async fn close_all(&self) -> FixtureResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut failure: Option<FixtureError> = None;
        for (database, manager) in &self.managers {
            if let Err(e) = manager.close().await {
                warn!(database = %database, error = %e, "failed to close table manager");
                failure = Some(match failure {
                    Some(primary) => primary.with_suppressed(e),
                    None => e
                });
            }
        }
        info!(managers = self.managers.len(), "closed table managers");
        failure.map_or(Ok(()), Err)
    }
}
