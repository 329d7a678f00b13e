use crate::dispatch::merge;
use crate::fulfiller::{FulfillerScope, RequirementFulfiller};
use async_trait::async_trait;
use config::{Configuration, DATABASES_SECTION};
use context::TestContext;
use errors::{FixtureError, FixtureResult};
use fixture_core::{
    ImmutableTableRequirement, ImmutableTablesState, MutableTableRequirement, MutableTablesState,
    Requirement, RequirementSet, StateEntry, TableDefinition, TableHandle, TableManager, TableName,
    TableRequirement, TablesState, TestStatus
};
use std::collections::HashSet;
use std::sync::Arc;
use storage::{TableDefinitionsRepository, TableManagerDispatcher};
use tracing::{debug, info, warn};

pub const IMMUTABLE_TABLES_FULFILLER: &str = "ImmutableTablesFulfiller";
pub const MUTABLE_TABLES_FULFILLER: &str = "MutableTablesFulfiller";

/// Table requirement that can be pinned to the database of its manager.
trait TableClaim: Clone + Into<Requirement> {
    fn handle(&self) -> &TableHandle;

    fn pinned(&self, database: &str) -> Self;
}

impl TableClaim for ImmutableTableRequirement {
    fn handle(&self) -> &TableHandle {
        &self.handle
    }

    fn pinned(&self, database: &str) -> Self {
        self.copy_with_database(database)
    }
}

impl TableClaim for MutableTableRequirement {
    fn handle(&self) -> &TableHandle {
        &self.handle
    }

    fn pinned(&self, database: &str) -> Self {
        self.copy_with_database(database)
    }
}

struct Resolved<R> {
    requirement: R,
    definition: Arc<TableDefinition>,
    manager: Arc<dyn TableManager>
}

/// Looks up definition and manager of every claim. Claims that collapse
/// once pinned to their database are resolved once.
fn resolve<'a, R: TableClaim + 'a>(
    context: &TestContext,
    claims: impl Iterator<Item = &'a R>
) -> FixtureResult<Vec<Resolved<R>>> {
    let repository = context.require::<TableDefinitionsRepository>()?;
    let dispatcher = context.require::<TableManagerDispatcher>()?;

    let mut seen = RequirementSet::new();
    let mut resolved = Vec::new();
    for claim in claims {
        let definition = repository.get(claim.handle())?;
        let manager = dispatcher.get_table_manager_for(&definition, claim.handle())?;
        let requirement = claim.pinned(manager.database_name());
        if seen.insert(requirement.clone().into()) {
            resolved.push(Resolved {
                requirement,
                definition,
                manager
            });
        }
    }
    Ok(resolved)
}

/// Creates every immutable table the suite needs, once, and publishes them
/// as [`ImmutableTablesState`]. Immutable tables outlive the suite.
#[derive(Debug, Default)]
pub struct ImmutableTablesFulfiller;

#[async_trait]
impl RequirementFulfiller for ImmutableTablesFulfiller {
    fn name(&self) -> &str {
        IMMUTABLE_TABLES_FULFILLER
    }

    fn scope(&self) -> FulfillerScope {
        FulfillerScope::Suite
    }

    fn filter(&self, requirements: &RequirementSet) -> RequirementSet {
        requirements.filter(|r| matches!(r, Requirement::Table(TableRequirement::Immutable(_))))
    }

    async fn fulfill(&self, requirements: &RequirementSet, context: &TestContext) -> FixtureResult<Vec<StateEntry>> {
        let resolved = resolve(context, requirements.immutable_tables())?;

        let mut tables = TablesState::new();
        for Resolved {
            requirement,
            definition,
            manager
        } in resolved
        {
            let instance = manager
                .create_immutable(&definition, &requirement.handle)
                .await?;
            debug!(table = %requirement.handle, name = %instance.name(), "immutable table ready");
            tables.insert(requirement.handle.name(), instance);
        }
        info!(tables = tables.len(), "immutable tables ready");
        Ok(vec![StateEntry::new(ImmutableTablesState(tables))])
    }

    async fn cleanup(&self, _status: TestStatus, _context: &TestContext) -> FixtureResult<()> {
        Ok(())
    }
}

/// Creates fresh mutable tables for one test and drops them afterwards.
/// Stale tables of earlier runs are reclaimed once per manager before the
/// first table of a pass is created.
#[derive(Debug, Default)]
pub struct MutableTablesFulfiller;

impl MutableTablesFulfiller {
    fn keep_on_failure(configuration: Option<&Configuration>, database: &str) -> FixtureResult<bool> {
        let Some(configuration) = configuration else {
            return Ok(false);
        };
        Ok(configuration
            .get_bool(&format!("{DATABASES_SECTION}.{database}.keep_mutable_tables_on_failure"))?
            .unwrap_or(false))
    }
}

#[async_trait]
impl RequirementFulfiller for MutableTablesFulfiller {
    fn name(&self) -> &str {
        MUTABLE_TABLES_FULFILLER
    }

    fn scope(&self) -> FulfillerScope {
        FulfillerScope::Test
    }

    fn filter(&self, requirements: &RequirementSet) -> RequirementSet {
        requirements.filter(|r| matches!(r, Requirement::Table(TableRequirement::Mutable(_))))
    }

    async fn fulfill(&self, requirements: &RequirementSet, context: &TestContext) -> FixtureResult<Vec<StateEntry>> {
        let resolved = resolve(context, requirements.mutable_tables())?;

        let mut reclaimed = HashSet::new();
        for entry in &resolved {
            let database = entry.manager.database_name().to_string();
            if reclaimed.insert(database) {
                entry.manager.drop_stale_mutable_tables().await?;
            }
        }

        let mut tables = TablesState::new();
        for Resolved {
            requirement,
            definition,
            manager
        } in resolved
        {
            let instance = match manager
                .create_mutable(&definition, requirement.state, &requirement.handle)
                .await
            {
                Ok(instance) => instance,
                Err(e) => {
                    // Tables created so far are not in any frame yet.
                    let mut error = e;
                    for created in tables.instances() {
                        if let Err(drop) = drop_instance(context, created.name()).await {
                            error = error.with_suppressed(drop);
                        }
                    }
                    return Err(error);
                }
            };
            debug!(table = %requirement.handle, name = %instance.name(), state = %requirement.state, "mutable table ready");
            tables.insert(requirement.name.clone(), instance);
        }
        Ok(vec![StateEntry::new(MutableTablesState(tables))])
    }

    async fn cleanup(&self, status: TestStatus, context: &TestContext) -> FixtureResult<()> {
        let configuration = context.get::<Configuration>();
        let mut failure = None;
        for state in context.states() {
            let Some(tables) = state.downcast::<MutableTablesState>() else {
                continue;
            };
            for instance in tables.instances() {
                let name = instance.name();
                if status == TestStatus::Failure && Self::keep_on_failure(configuration.as_deref(), name.database())? {
                    info!(table = %name, "keeping mutable table of failed test");
                    continue;
                }
                if let Err(e) = drop_instance(context, name).await {
                    warn!(table = %name, error = %e, "failed to drop mutable table");
                    failure = Some(merge(failure, e));
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }
}

async fn drop_instance(context: &TestContext, name: &TableName) -> FixtureResult<()> {
    let dispatcher = context.require::<TableManagerDispatcher>()?;
    let manager = dispatcher
        .get_table_manager(name.database())
        .ok_or_else(|| FixtureError::UnknownDatabase {
            database: name.database().to_string(),
            table_kind: "mutable".to_string(),
            known: dispatcher.database_names()
        })?;
    manager.drop_table(name).await
}
