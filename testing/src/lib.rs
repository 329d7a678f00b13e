//! Shared test tooling for the fixture workspace.
//!
//! - Recording stand-ins for every backend client trait
//! - A scripted [`RecordingFulfiller`] with a shared event log
//! - Sample TPC-H style table definitions
//! - A lazily started PostgreSQL container, shared per test process and
//!   skipped when Docker is unavailable

mod backends;
mod fixtures;
mod fulfillers;
pub mod tables;

pub use backends::{
    InMemoryDirectory, InMemoryTopicAdmin, RecordingObjectStore, RecordingQueryExecutor,
    RecordingStatisticsClient
};
pub use fixtures::*;
pub use fulfillers::{Claim, EventLog, RecordingFulfiller, event_log};
