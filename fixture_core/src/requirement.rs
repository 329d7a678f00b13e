//! # Requirement Model
//!
//! Declarative description of the fixtures a test needs. Requirements are
//! immutable values; structural equality drives deduplication, so the same
//! table requested through two composite paths collapses to one leaf.

use crate::table::{MutableTableState, TableHandle};
use config::Configuration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use strum::{Display, EnumString};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImmutableTableRequirement {
    pub handle: TableHandle
}

impl ImmutableTableRequirement {
    pub fn new(handle: TableHandle) -> Self {
        Self { handle }
    }

    /// Pins the requirement to `database` unless the handle already names one.
    pub fn copy_with_database(&self, database: &str) -> Self {
        match self.handle.database() {
            Some(_) => self.clone(),
            None => Self::new(self.handle.clone().in_database(database))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutableTableRequirement {
    pub handle: TableHandle,
    /// Name the realized table is published under in `MutableTablesState`.
    pub name: String,
    pub state: MutableTableState
}

impl MutableTableRequirement {
    pub fn new(handle: TableHandle) -> Self {
        Self {
            name: handle.name().to_string(),
            handle,
            state: MutableTableState::Loaded
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_state(mut self, state: MutableTableState) -> Self {
        self.state = state;
        self
    }

    pub fn copy_with_database(&self, database: &str) -> Self {
        match self.handle.database() {
            Some(_) => self.clone(),
            None => Self {
                handle: self.handle.clone().in_database(database),
                ..self.clone()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableRequirement {
    Immutable(ImmutableTableRequirement),
    Mutable(MutableTableRequirement)
}

impl TableRequirement {
    pub fn handle(&self) -> &TableHandle {
        match self {
            Self::Immutable(req) => &req.handle,
            Self::Mutable(req) => &req.handle
        }
    }

    pub fn copy_with_database(&self, database: &str) -> Self {
        match self {
            Self::Immutable(req) => Self::Immutable(req.copy_with_database(database)),
            Self::Mutable(req) => Self::Mutable(req.copy_with_database(database))
        }
    }
}

/// Opaque external resource (directory entry, bucket, ...) handled by the
/// provisioner registered for `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRequirement {
    pub kind: String,
    pub key: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>
}

impl ResourceRequirement {
    pub fn new(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
            attributes: BTreeMap::new()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandScope {
    Suite,
    Test
}

/// Shell commands run when the owning scope is entered and left.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandRequirement {
    pub scope: CommandScope,
    pub setup: Vec<String>,
    #[serde(default)]
    pub teardown: Vec<String>
}

impl CommandRequirement {
    pub fn new(scope: CommandScope) -> Self {
        Self {
            scope,
            setup: Vec::new(),
            teardown: Vec::new()
        }
    }

    pub fn setup(mut self, command: impl Into<String>) -> Self {
        self.setup.push(command.into());
        self
    }

    pub fn teardown(mut self, command: impl Into<String>) -> Self {
        self.teardown.push(command.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Requirement {
    Table(TableRequirement),
    Resource(ResourceRequirement),
    Command(CommandRequirement),
    /// Conjunction of children.
    Composite(Vec<Requirement>)
}

impl Requirement {
    pub fn immutable_table(handle: TableHandle) -> Self {
        Self::Table(TableRequirement::Immutable(ImmutableTableRequirement::new(handle)))
    }

    pub fn mutable_table(handle: TableHandle) -> Self {
        Self::Table(TableRequirement::Mutable(MutableTableRequirement::new(handle)))
    }

    pub fn none() -> Self {
        Self::Composite(Vec::new())
    }

    /// Leaf requirements with structural duplicates removed, in first-seen
    /// order.
    pub fn flatten(&self) -> RequirementSet {
        let mut set = RequirementSet::new();
        set.insert(self.clone());
        set
    }
}

impl From<TableRequirement> for Requirement {
    fn from(requirement: TableRequirement) -> Self {
        Self::Table(requirement)
    }
}

impl From<ImmutableTableRequirement> for Requirement {
    fn from(requirement: ImmutableTableRequirement) -> Self {
        Self::Table(TableRequirement::Immutable(requirement))
    }
}

impl From<MutableTableRequirement> for Requirement {
    fn from(requirement: MutableTableRequirement) -> Self {
        Self::Table(TableRequirement::Mutable(requirement))
    }
}

impl From<ResourceRequirement> for Requirement {
    fn from(requirement: ResourceRequirement) -> Self {
        Self::Resource(requirement)
    }
}

impl From<CommandRequirement> for Requirement {
    fn from(requirement: CommandRequirement) -> Self {
        Self::Command(requirement)
    }
}

pub fn compose<I>(requirements: I) -> Requirement
where
    I: IntoIterator<Item = Requirement>
{
    Requirement::Composite(requirements.into_iter().collect())
}

/// Insertion-ordered set of leaf requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    items: Vec<Requirement>,
    seen: HashSet<Requirement>
}

impl RequirementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `requirement`, flattening composites. Returns whether any new
    /// leaf was added.
    pub fn insert(&mut self, requirement: Requirement) -> bool {
        match requirement {
            Requirement::Composite(children) => children
                .into_iter()
                .fold(false, |added, child| self.insert(child) || added),
            leaf => {
                if self.seen.contains(&leaf) {
                    return false;
                }
                self.seen.insert(leaf.clone());
                self.items.push(leaf);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, requirement: &Requirement) -> bool {
        self.seen.contains(requirement)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Requirement> {
        self.items.iter()
    }

    pub fn union(&self, other: &RequirementSet) -> RequirementSet {
        let mut merged = self.clone();
        merged.extend(other.iter().cloned());
        merged
    }

    pub fn filter<F>(&self, predicate: F) -> RequirementSet
    where
        F: Fn(&Requirement) -> bool
    {
        self.iter().filter(|r| predicate(r)).cloned().collect()
    }

    pub fn table_requirements(&self) -> impl Iterator<Item = &TableRequirement> {
        self.iter().filter_map(|r| match r {
            Requirement::Table(table) => Some(table),
            _ => None
        })
    }

    pub fn immutable_tables(&self) -> impl Iterator<Item = &ImmutableTableRequirement> {
        self.table_requirements().filter_map(|r| match r {
            TableRequirement::Immutable(req) => Some(req),
            TableRequirement::Mutable(_) => None
        })
    }

    pub fn mutable_tables(&self) -> impl Iterator<Item = &MutableTableRequirement> {
        self.table_requirements().filter_map(|r| match r {
            TableRequirement::Mutable(req) => Some(req),
            TableRequirement::Immutable(_) => None
        })
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceRequirement> {
        self.iter().filter_map(|r| match r {
            Requirement::Resource(req) => Some(req),
            _ => None
        })
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandRequirement> {
        self.iter().filter_map(|r| match r {
            Requirement::Command(req) => Some(req),
            _ => None
        })
    }
}

impl Extend<Requirement> for RequirementSet {
    fn extend<T: IntoIterator<Item = Requirement>>(&mut self, iter: T) {
        for requirement in iter {
            self.insert(requirement);
        }
    }
}

impl FromIterator<Requirement> for RequirementSet {
    fn from_iter<T: IntoIterator<Item = Requirement>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a RequirementSet {
    type Item = &'a Requirement;
    type IntoIter = std::slice::Iter<'a, Requirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Requirement source that depends on the test configuration, e.g. a table
/// whose database is chosen by a setting.
pub trait RequirementsProvider: Send + Sync {
    fn requirements(&self, configuration: &Configuration) -> Requirement;
}

impl RequirementsProvider for Requirement {
    fn requirements(&self, _configuration: &Configuration) -> Requirement {
        self.clone()
    }
}

impl<F> RequirementsProvider for F
where
    F: Fn(&Configuration) -> Requirement + Send + Sync
{
    fn requirements(&self, configuration: &Configuration) -> Requirement {
        self(configuration)
    }
}
