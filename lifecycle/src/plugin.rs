//! # Plugin Registry
//!
//! Plugins contribute fulfillers, dependency modules, table manager
//! factories, table definitions and resource provisioners. The registry is
//! assembled explicitly; each category is the in-order concatenation of what
//! every plugin contributes.

use crate::command::{CommandExecutor, LocalCommandExecutor};
use crate::fulfiller::{FulfillerScope, RequirementFulfiller};
use crate::fulfillers::{LdapObjectProvisioner, ResourceProvisioner, builtin_fulfillers};
use crate::test_method::TestMethod;
use config::Configuration;
use context::Dependencies;
use errors::FixtureResult;
use fixture_core::TableDefinition;
use std::fmt;
use std::sync::Arc;
use storage::{TableManagerFactory, builtin_factories};

/// Adds suite-wide bindings before the suite base frame is built.
pub trait SuiteModule: Send + Sync {
    fn configure(&self, configuration: &Configuration, dependencies: &mut Dependencies) -> FixtureResult<()>;
}

impl<F> SuiteModule for F
where
    F: Fn(&Configuration, &mut Dependencies) -> FixtureResult<()> + Send + Sync
{
    fn configure(&self, configuration: &Configuration, dependencies: &mut Dependencies) -> FixtureResult<()> {
        self(configuration, dependencies)
    }
}

/// Adds per-test bindings to a test base frame.
pub trait TestModule: Send + Sync {
    fn configure(
        &self,
        test: &TestMethod,
        configuration: &Configuration,
        dependencies: &mut Dependencies
    ) -> FixtureResult<()>;
}

impl<F> TestModule for F
where
    F: Fn(&TestMethod, &Configuration, &mut Dependencies) -> FixtureResult<()> + Send + Sync
{
    fn configure(
        &self,
        test: &TestMethod,
        configuration: &Configuration,
        dependencies: &mut Dependencies
    ) -> FixtureResult<()> {
        self(test, configuration, dependencies)
    }
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn fulfillers(&self) -> Vec<Arc<dyn RequirementFulfiller>> {
        Vec::new()
    }

    fn suite_modules(&self) -> Vec<Arc<dyn SuiteModule>> {
        Vec::new()
    }

    fn test_modules(&self) -> Vec<Arc<dyn TestModule>> {
        Vec::new()
    }

    fn table_manager_factories(&self) -> Vec<TableManagerFactory> {
        Vec::new()
    }

    fn tables(&self) -> Vec<TableDefinition> {
        Vec::new()
    }

    fn resource_provisioners(&self) -> Vec<Arc<dyn ResourceProvisioner>> {
        Vec::new()
    }
}

/// Built-in fulfillers, table managers and the directory entry provisioner,
/// plus a local command executor and the
/// [`TestMethodInfo`](crate::TestMethodInfo) binding.
#[derive(Debug, Default)]
pub struct Builtins;

impl Plugin for Builtins {
    fn name(&self) -> &str {
        "builtins"
    }

    fn fulfillers(&self) -> Vec<Arc<dyn RequirementFulfiller>> {
        builtin_fulfillers()
    }

    fn suite_modules(&self) -> Vec<Arc<dyn SuiteModule>> {
        let bind_executor = |_: &Configuration, dependencies: &mut Dependencies| -> FixtureResult<()> {
            if !dependencies.contains::<Arc<dyn CommandExecutor>>(None) {
                dependencies.bind::<Arc<dyn CommandExecutor>>(Arc::new(LocalCommandExecutor));
            }
            Ok(())
        };
        vec![Arc::new(bind_executor)]
    }

    fn test_modules(&self) -> Vec<Arc<dyn TestModule>> {
        let bind_info = |test: &TestMethod, _: &Configuration, dependencies: &mut Dependencies| -> FixtureResult<()> {
            dependencies.bind(test.info());
            Ok(())
        };
        vec![Arc::new(bind_info)]
    }

    fn table_manager_factories(&self) -> Vec<TableManagerFactory> {
        builtin_factories()
    }

    fn resource_provisioners(&self) -> Vec<Arc<dyn ResourceProvisioner>> {
        vec![Arc::new(LdapObjectProvisioner)]
    }
}

#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only [`Builtins`].
    pub fn builtin() -> Self {
        Self::new().register(Builtins)
    }

    pub fn register(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    fn collect<T>(&self, contribution: impl Fn(&dyn Plugin) -> Vec<T>) -> Vec<T> {
        self.plugins
            .iter()
            .flat_map(|plugin| contribution(plugin.as_ref()))
            .collect()
    }

    pub fn fulfillers(&self, scope: FulfillerScope) -> Vec<Arc<dyn RequirementFulfiller>> {
        self.collect(|plugin| plugin.fulfillers())
            .into_iter()
            .filter(|fulfiller| fulfiller.scope() == scope)
            .collect()
    }

    pub fn suite_modules(&self) -> Vec<Arc<dyn SuiteModule>> {
        self.collect(|plugin| plugin.suite_modules())
    }

    pub fn test_modules(&self) -> Vec<Arc<dyn TestModule>> {
        self.collect(|plugin| plugin.test_modules())
    }

    pub fn table_manager_factories(&self) -> Vec<TableManagerFactory> {
        self.collect(|plugin| plugin.table_manager_factories())
    }

    pub fn tables(&self) -> Vec<TableDefinition> {
        self.collect(|plugin| plugin.tables())
    }

    pub fn resource_provisioners(&self) -> Vec<Arc<dyn ResourceProvisioner>> {
        self.collect(|plugin| plugin.resource_provisioners())
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugin_names())
            .finish()
    }
}
