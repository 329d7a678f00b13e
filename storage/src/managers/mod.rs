//! # Table Managers
//!
//! One manager per configured database, built by the factory registered for
//! the database's `table_manager_type`.
//!
//! | Type        | Backend                               | Mutable tables |
//! |-------------|---------------------------------------|----------------|
//! | `cassandra` | wide-column store speaking CQL        | no             |
//! | `hive`      | SQL engine over an object store       | yes            |
//! | `jdbc`      | relational database                   | yes            |
//! | `kafka`     | message broker topics                 | no             |
//! | `read_only` | pre-existing tables, nothing created  | no             |
//!
//! Backend clients are looked up in the suite dependencies, bound as
//! `Arc<dyn Client>` under the database name.

pub mod cassandra;
pub mod hive;
pub mod jdbc;
pub mod kafka;
pub mod read_only;

pub use cassandra::CassandraTableManager;
pub use hive::HiveTableManager;
pub use jdbc::JdbcTableManager;
pub use kafka::KafkaTableManager;
pub use read_only::ReadOnlyTableManager;

use crate::naming::TableNameGenerator;
use config::{Configuration, DatabaseSettings};
use context::Dependencies;
use errors::{FixtureError, FixtureResult};
use fixture_core::TableManager;
use std::fmt;
use std::sync::Arc;

pub const CASSANDRA_TYPE: &str = "cassandra";
pub const HIVE_TYPE: &str = "hive";
pub const JDBC_TYPE: &str = "jdbc";
pub const KAFKA_TYPE: &str = "kafka";
pub const READ_ONLY_TYPE: &str = config::READ_ONLY_TABLE_MANAGER_TYPE;

/// Everything a factory may use to build the manager of one database.
pub struct ManagerBuildContext<'a> {
    pub settings: &'a DatabaseSettings,
    /// The `databases.<name>` subtree.
    pub configuration: &'a Configuration,
    pub root: &'a Configuration,
    pub dependencies: &'a Dependencies,
    pub names: &'a Arc<TableNameGenerator>
}

impl ManagerBuildContext<'_> {
    pub fn database(&self) -> &str {
        &self.settings.name
    }

    /// Client bound for this database, e.g. `client::<dyn QueryExecutor>()`.
    pub fn client<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.dependencies
            .get_named::<Arc<T>>(self.database())
            .map(|client| Arc::clone(client.as_ref()))
    }

    pub fn require_client<T: ?Sized + Send + Sync + 'static>(&self, what: &str) -> FixtureResult<Arc<T>> {
        self.client::<T>()
            .ok_or_else(|| FixtureError::MissingDependency {
                dependency: format!("{what} for database {}", self.database())
            })
    }
}

type BuildFn = dyn Fn(&ManagerBuildContext<'_>) -> FixtureResult<Arc<dyn TableManager>> + Send + Sync;

/// Constructor of managers for one `table_manager_type`.
#[derive(Clone)]
pub struct TableManagerFactory {
    manager_type: String,
    build: Arc<BuildFn>
}

impl TableManagerFactory {
    pub fn new<F>(manager_type: impl Into<String>, build: F) -> Self
    where
        F: Fn(&ManagerBuildContext<'_>) -> FixtureResult<Arc<dyn TableManager>> + Send + Sync + 'static
    {
        Self {
            manager_type: manager_type.into().to_lowercase(),
            build: Arc::new(build)
        }
    }

    pub fn manager_type(&self) -> &str {
        &self.manager_type
    }

    pub fn build(&self, context: &ManagerBuildContext<'_>) -> FixtureResult<Arc<dyn TableManager>> {
        (self.build)(context)
    }
}

impl fmt::Debug for TableManagerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableManagerFactory")
            .field("manager_type", &self.manager_type)
            .finish()
    }
}

pub fn builtin_factories() -> Vec<TableManagerFactory> {
    vec![
        TableManagerFactory::new(CASSANDRA_TYPE, |ctx| {
            Ok(Arc::new(CassandraTableManager::from_build_context(ctx)?) as Arc<dyn TableManager>)
        }),
        TableManagerFactory::new(HIVE_TYPE, |ctx| {
            Ok(Arc::new(HiveTableManager::from_build_context(ctx)?) as Arc<dyn TableManager>)
        }),
        TableManagerFactory::new(JDBC_TYPE, |ctx| {
            Ok(Arc::new(JdbcTableManager::from_build_context(ctx)?) as Arc<dyn TableManager>)
        }),
        TableManagerFactory::new(KAFKA_TYPE, |ctx| {
            Ok(Arc::new(KafkaTableManager::from_build_context(ctx)?) as Arc<dyn TableManager>)
        }),
        TableManagerFactory::new(READ_ONLY_TYPE, |ctx| {
            Ok(Arc::new(ReadOnlyTableManager::new(ctx.database(), Arc::clone(ctx.names))) as Arc<dyn TableManager>)
        })
    ]
}
