//! Registry of table definitions, filled once at startup.

use errors::{FixtureError, FixtureResult};
use fixture_core::{TableDefinition, TableHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Definitions keyed by `(name, schema)`. Write-once, then read
/// concurrently without locking.
#[derive(Debug, Default)]
pub struct TableDefinitionsRepository {
    definitions: HashMap<(String, Option<String>), Arc<TableDefinition>>
}

impl TableDefinitionsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions<I>(definitions: I) -> FixtureResult<Self>
    where
        I: IntoIterator<Item = TableDefinition>
    {
        let mut repository = Self::new();
        for definition in definitions {
            repository.register(definition)?;
        }
        Ok(repository)
    }

    pub fn register(&mut self, definition: TableDefinition) -> FixtureResult<Arc<TableDefinition>> {
        let key = Self::key(definition.handle());
        if self.definitions.contains_key(&key) {
            return Err(FixtureError::DuplicateTableDefinition {
                key: definition.handle().to_string()
            });
        }
        debug!(table = %definition.handle(), kind = definition.kind().type_name(), "registered table definition");
        let definition = Arc::new(definition);
        self.definitions.insert(key, Arc::clone(&definition));
        Ok(definition)
    }

    /// Looks up `(name, schema)`, then `(name)` when the schema-qualified
    /// lookup misses.
    pub fn get(&self, handle: &TableHandle) -> FixtureResult<Arc<TableDefinition>> {
        self.definitions
            .get(&Self::key(handle))
            .or_else(|| {
                handle
                    .schema()
                    .and_then(|_| self.definitions.get(&Self::key(&handle.without_schema())))
            })
            .cloned()
            .ok_or_else(|| FixtureError::MissingTableDefinition {
                key: handle.to_string()
            })
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn key(handle: &TableHandle) -> (String, Option<String>) {
        (
            handle.name().to_lowercase(),
            handle.schema().map(str::to_lowercase)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixture_core::EmptyDataSource;

    fn definition(handle: TableHandle) -> TableDefinition {
        TableDefinition::relational(
            handle,
            "CREATE TABLE %NAME% (id INT)",
            Arc::new(EmptyDataSource::new("t"))
        )
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut repo = TableDefinitionsRepository::new();
        repo.register(definition(TableHandle::table("nation"))).unwrap();
        let err = repo
            .register(definition(TableHandle::table("NATION")))
            .unwrap_err();
        assert!(matches!(err, FixtureError::DuplicateTableDefinition { .. }));
    }

    #[test]
    fn test_lookup_falls_back_to_unqualified_name() {
        let repo = TableDefinitionsRepository::from_definitions([
            definition(TableHandle::table("nation")),
            definition(TableHandle::table("region").in_schema("tpch"))
        ])
        .unwrap();

        let found = repo
            .get(&TableHandle::table("nation").in_schema("tpch"))
            .unwrap();
        assert_eq!(found.name(), "nation");

        assert!(repo.get(&TableHandle::table("region").in_schema("tpch")).is_ok());
        let err = repo.get(&TableHandle::table("region")).unwrap_err();
        assert!(matches!(err, FixtureError::MissingTableDefinition { .. }));
    }

    #[test]
    fn test_database_is_not_part_of_the_key() {
        let repo = TableDefinitionsRepository::from_definitions([definition(
            TableHandle::table("nation")
        )])
        .unwrap();
        assert!(repo.get(&TableHandle::table("nation").in_database("psql")).is_ok());
    }
}
