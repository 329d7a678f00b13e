//! Concrete backend clients.

pub mod local_store;
pub mod postgres;

pub use local_store::LocalObjectStore;
pub use postgres::PostgresQueryExecutor;
