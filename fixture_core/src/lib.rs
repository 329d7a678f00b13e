//! # Fixture Core
//!
//! Shared model of the fixture engine.
//!
//! This crate provides:
//! - The requirement model and its flattening into deduplicated sets
//! - Table handles, definitions, instances and data sources
//! - Typed states produced by fulfillment
//! - Traits implemented by table managers and backend clients

pub mod data_source;
pub mod requirement;
pub mod state;
pub mod table;
pub mod traits;

pub use data_source::{EmptyDataSource, InlineDataSource, Row, RowIter, TableDataSource};
pub use requirement::{
    CommandRequirement, CommandScope, ImmutableTableRequirement, MutableTableRequirement,
    Requirement, RequirementSet, RequirementsProvider, ResourceRequirement, TableRequirement,
    compose
};
pub use state::{ImmutableTablesState, MutableTablesState, StateEntry, TablesState, TestStatus};
pub use table::{
    ColumnStatistics, MutableTableState, PartitionDefinition, TableDefinition, TableHandle,
    TableInstance, TableKind, TableName, TableStatistics, TopicSettings
};
pub use traits::{
    DirectoryClient, ObjectStore, QueryExecutor, QueryResult, StatisticsClient, TableManager,
    TopicAdmin, TopicMessage
};
