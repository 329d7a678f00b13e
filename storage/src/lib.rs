//! # Table Storage Layer
//!
//! Turns table definitions into live tables on heterogeneous backends.
//!
//! - [`TableDefinitionsRepository`]: write-once registry of definitions
//! - [`TableManagerDispatcher`]: database name to manager routing
//! - [`managers`]: hive, jdbc, kafka and read-only managers
//! - [`RevisionedDataWriter`]: object store uploads skipping unchanged data
//! - [`clients`]: Postgres query executor and local object store

pub mod clients;
pub mod convention;
pub mod delimited;
pub mod dispatcher;
pub mod managers;
pub mod naming;
pub mod repository;
pub mod writer;

pub use convention::load_convention_definitions;
pub use delimited::FileDataSource;
pub use dispatcher::TableManagerDispatcher;
pub use managers::{ManagerBuildContext, TableManagerFactory, builtin_factories};
pub use naming::TableNameGenerator;
pub use repository::TableDefinitionsRepository;
pub use writer::RevisionedDataWriter;
