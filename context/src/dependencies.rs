//! Typed dependency registry: values bound by type and optional name.

use errors::{FixtureError, FixtureResult};
use fixture_core::StateEntry;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type BindingKey = (TypeId, Option<String>);

#[derive(Clone)]
struct Binding {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>
}

#[derive(Clone, Default)]
pub struct Dependencies {
    bindings: HashMap<BindingKey, Binding>
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.bind_arc(None, Arc::new(value))
    }

    pub fn bind_named<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> &mut Self {
        self.bind_arc(Some(name.into()), Arc::new(value))
    }

    /// Binds a shared value, typically a trait object such as
    /// `Arc<dyn QueryExecutor>` wrapped once more.
    pub fn bind_arc<T: Any + Send + Sync>(&mut self, name: Option<String>, value: Arc<T>) -> &mut Self {
        self.bindings.insert(
            (TypeId::of::<T>(), name),
            Binding {
                type_name: std::any::type_name::<T>(),
                value
            }
        );
        self
    }

    /// Binds a fulfillment state under its type and name. A second state
    /// with the same key in one registry is a consistency error.
    pub fn bind_state(&mut self, state: &StateEntry) -> FixtureResult<()> {
        let key = (state.type_id(), state.name().map(str::to_string));
        if self.bindings.contains_key(&key) {
            return Err(FixtureError::consistency(format!(
                "state {} bound twice in one context",
                describe(state.type_name(), state.name())
            )));
        }
        self.bindings.insert(
            key,
            Binding {
                type_name: state.type_name(),
                value: Arc::clone(state.value())
            }
        );
        Ok(())
    }

    /// Copies every binding of `other` into `self`, replacing equal keys.
    pub fn extend(&mut self, other: &Dependencies) {
        for (key, binding) in &other.bindings {
            self.bindings.insert(key.clone(), binding.clone());
        }
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.lookup((TypeId::of::<T>(), None))
    }

    pub fn get_named<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.lookup((TypeId::of::<T>(), Some(name.to_string())))
    }

    pub fn contains<T: Any>(&self, name: Option<&str>) -> bool {
        self.bindings
            .contains_key(&(TypeId::of::<T>(), name.map(str::to_string)))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn lookup<T: Any + Send + Sync>(&self, key: BindingKey) -> Option<Arc<T>> {
        self.bindings
            .get(&key)
            .and_then(|binding| Arc::clone(&binding.value).downcast::<T>().ok())
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .bindings
            .iter()
            .map(|((_, name), binding)| describe(binding.type_name, name.as_deref()))
            .collect();
        names.sort();
        f.debug_struct("Dependencies").field("bindings", &names).finish()
    }
}

pub(crate) fn describe(type_name: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{type_name} named '{name}'"),
        None => type_name.to_string()
    }
}
