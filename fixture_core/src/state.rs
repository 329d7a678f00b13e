//! States produced by fulfillment and the table lookups built on them.

use crate::table::{TableHandle, TableInstance};
use errors::{FixtureError, FixtureResult};
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TestStatus {
    Success,
    Failure
}

/// Typed payload contributed by a fulfiller, optionally named.
#[derive(Clone)]
pub struct StateEntry {
    name: Option<String>,
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>
}

impl StateEntry {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(None, Arc::new(value))
    }

    pub fn named<T: Any + Send + Sync>(name: impl Into<String>, value: T) -> Self {
        Self::from_arc(Some(name.into()), Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(name: Option<String>, value: Arc<T>) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn value(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.value
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl fmt::Debug for StateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateEntry")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .finish()
    }
}

/// Realized tables, looked up by logical name with optional schema and
/// database qualification.
#[derive(Debug, Clone, Default)]
pub struct TablesState {
    tables: Vec<(String, TableInstance)>
}

impl TablesState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, instance: TableInstance) {
        self.tables.push((name.into(), instance));
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn instances(&self) -> impl Iterator<Item = &TableInstance> {
        self.tables.iter().map(|(_, instance)| instance)
    }

    /// A handle without schema matches any schema; a schema-qualified
    /// handle falls back to unqualified instances.
    pub fn get(&self, handle: &TableHandle) -> FixtureResult<&TableInstance> {
        let by_name: Vec<&TableInstance> = self
            .tables
            .iter()
            .filter(|(name, instance)| {
                name.eq_ignore_ascii_case(handle.name())
                    && handle
                        .database()
                        .is_none_or(|database| instance.name().database() == database)
            })
            .map(|(_, instance)| instance)
            .collect();

        let candidates: Vec<&TableInstance> = match handle.schema() {
            Some(schema) => {
                let exact: Vec<_> = by_name
                    .iter()
                    .copied()
                    .filter(|instance| {
                        instance
                            .name()
                            .schema()
                            .is_some_and(|own| own.eq_ignore_ascii_case(schema))
                    })
                    .collect();
                if exact.is_empty() {
                    by_name
                        .iter()
                        .copied()
                        .filter(|instance| instance.name().schema().is_none())
                        .collect()
                } else {
                    exact
                }
            }
            None => by_name
        };

        match candidates.as_slice() {
            [instance] => Ok(*instance),
            [] => Err(FixtureError::TableLookup {
                message: format!("no table instance found for {handle}")
            }),
            many => Err(FixtureError::TableLookup {
                message: format!(
                    "ambiguous table {handle}, matches: {}",
                    many.iter()
                        .map(|instance| instance.name().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
        }
    }

    pub fn get_by_name(&self, name: &str) -> FixtureResult<&TableInstance> {
        self.get(&TableHandle::table(name))
    }
}

/// Tables shared by the whole suite.
#[derive(Debug, Clone, Default)]
pub struct ImmutableTablesState(pub TablesState);

impl Deref for ImmutableTablesState {
    type Target = TablesState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Tables created for a single test invocation.
#[derive(Debug, Clone, Default)]
pub struct MutableTablesState(pub TablesState);

impl Deref for MutableTablesState {
    type Target = TablesState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
