//! # Fixture Errors
//!
//! Error taxonomy shared by every crate of the fixture engine.
//!
//! Errors fall into four groups:
//! - configuration errors, fatal at suite start
//! - fulfillment errors, which abort the current scope and trigger cleanup
//! - cleanup errors raised while unwinding, kept as suppressed detail
//! - consistency errors, which signal a broken engine contract

use thiserror::Error;

/// Errors raised while provisioning or tearing down fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Missing required setting: {key}")]
    MissingSetting { key: String },

    #[error("Unknown table manager type {manager_type} for database {database}; expecting one of {known:?}")]
    UnknownTableManagerType {
        manager_type: String,
        database: String,
        known: Vec<String>
    },

    #[error("No table manager bound to database {database} (table kind {table_kind}); known databases: {known:?}")]
    UnknownDatabase {
        database: String,
        table_kind: String,
        known: Vec<String>
    },

    #[error("Duplicated table definition: {key}")]
    DuplicateTableDefinition { key: String },

    #[error("No table definition for: {key}")]
    MissingTableDefinition { key: String },

    #[error("Fulfiller {fulfiller} failed: {source}")]
    Fulfillment {
        fulfiller: String,
        #[source]
        source: Box<FixtureError>
    },

    #[error("Failed to create table {handle}: {source}")]
    Table {
        handle: String,
        #[source]
        source: Box<FixtureError>
    },

    #[error("Backend {backend} failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("Injecting statistics requested for {table}, but injecting is not possible: {reason}")]
    InjectionNotPossible { table: String, reason: String },

    #[error("Operation {operation} not supported by {component}")]
    Unsupported {
        operation: String,
        component: String
    },

    #[error("Consistency violation: {message}")]
    Consistency { message: String },

    #[error("Test suite not initialized")]
    SuiteNotInitialized,

    #[error("Hook {hook} failed: {reason}")]
    Hook { hook: String, reason: String },

    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Table lookup failed: {message}")]
    TableLookup { message: String },

    #[error("No binding for {dependency}")]
    MissingDependency { dependency: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{source} ({} suppressed)", .suppressed.len())]
    Unwound {
        #[source]
        source: Box<FixtureError>,
        suppressed: Vec<FixtureError>
    }
}

pub type FixtureResult<T> = Result<T, FixtureError>;

impl FixtureError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into()
        }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into()
        }
    }

    pub fn backend(backend: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Backend {
            backend: backend.into(),
            reason: reason.to_string()
        }
    }

    pub fn unsupported(operation: impl Into<String>, component: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            component: component.into()
        }
    }

    /// Wraps a failure with the handle of the table being realized.
    pub fn for_table(self, handle: impl std::fmt::Display) -> Self {
        Self::Table {
            handle: handle.to_string(),
            source: Box::new(self)
        }
    }

    /// Wraps a failure with the name of the fulfiller that raised it.
    pub fn in_fulfiller(self, fulfiller: impl Into<String>) -> Self {
        Self::Fulfillment {
            fulfiller: fulfiller.into(),
            source: Box::new(self)
        }
    }

    /// Attaches `other` as suppressed detail; the receiver stays primary.
    pub fn with_suppressed(self, other: FixtureError) -> Self {
        match self {
            Self::Unwound {
                source,
                mut suppressed
            } => {
                suppressed.push(other);
                Self::Unwound { source, suppressed }
            }
            primary => Self::Unwound {
                source: Box::new(primary),
                suppressed: vec![other]
            }
        }
    }

    /// The error that caused the failure, ignoring suppressed detail.
    pub fn primary(&self) -> &FixtureError {
        match self {
            Self::Unwound { source, .. } => source.primary(),
            other => other
        }
    }

    pub fn suppressed(&self) -> &[FixtureError] {
        match self {
            Self::Unwound { suppressed, .. } => suppressed,
            _ => &[]
        }
    }

    pub fn is_consistency_violation(&self) -> bool {
        matches!(self.primary(), Self::Consistency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_suppressed_keeps_primary() {
        let original = FixtureError::backend("hive", "connection refused");
        let err = original
            .with_suppressed(FixtureError::backend("hive", "drop failed"))
            .with_suppressed(FixtureError::consistency("late"));

        assert!(matches!(err.primary(), FixtureError::Backend { reason, .. } if reason == "connection refused"));
        assert_eq!(err.suppressed().len(), 2);
        assert!(err.to_string().contains("2 suppressed"));
    }

    #[test]
    fn test_table_wrapping_names_handle() {
        let err = FixtureError::backend("jdbc", "syntax error").for_table("psql.public.nation");
        assert!(err.to_string().contains("psql.public.nation"));
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_consistency_detection_through_unwind() {
        let err = FixtureError::consistency("stack size mismatch")
            .with_suppressed(FixtureError::backend("kafka", "boom"));
        assert!(err.is_consistency_violation());
        assert!(!FixtureError::SuiteNotInitialized.is_consistency_violation());
    }
}
