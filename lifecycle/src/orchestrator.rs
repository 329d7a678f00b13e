//! Suite and test lifecycle entry points driven by the host.

use crate::dispatch::{FulfillmentScope, combine, do_cleanup, do_fulfillment, merge};
use crate::fulfiller::{FulfillerScope, RequirementFulfiller};
use crate::fulfillers::ResourceProvisioners;
use crate::plugin::{PluginRegistry, SuiteModule, TestModule};
use crate::test_method::{TestMethod, TestOutcome};
use config::Configuration;
use context::{Dependencies, TestContext};
use errors::{FixtureError, FixtureResult};
use fixture_core::{RequirementSet, TestStatus};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use storage::{
    TableDefinitionsRepository, TableManagerDispatcher, TableManagerFactory, TableNameGenerator,
    load_convention_definitions
};
use tracing::{debug, info, instrument, warn};

/// Directory of convention table definitions, if any.
pub const TABLES_PATH_KEY: &str = "tests.tables_path";

/// Fulfilled state of a running test. Handed back to
/// [`Orchestrator::on_test_finished`].
#[derive(Debug)]
pub struct TestScope {
    name: String,
    scope: FulfillmentScope
}

impl TestScope {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully populated context the test body runs against.
    pub fn context(&self) -> FixtureResult<TestContext> {
        self.scope.context()
    }

    pub fn into_parts(self) -> (String, FulfillmentScope) {
        (self.name, self.scope)
    }

    pub fn from_parts(name: String, scope: FulfillmentScope) -> Self {
        Self { name, scope }
    }
}

struct Suite {
    scope: FulfillmentScope,
    dispatcher: Arc<TableManagerDispatcher>
}

/// Drives fulfillment and cleanup for one suite run. Suite entry points are
/// called once; test entry points may be called concurrently from several
/// workers once the suite has started.
pub struct Orchestrator {
    configuration: Arc<Configuration>,
    registry: PluginRegistry,
    suite_fulfillers: Vec<Arc<dyn RequirementFulfiller>>,
    test_fulfillers: Vec<Arc<dyn RequirementFulfiller>>,
    test_modules: Vec<Arc<dyn TestModule>>,
    names: Arc<TableNameGenerator>,
    suite: RwLock<Option<Suite>>,
    /// Frame tests derive from; read without touching `suite`.
    suite_context: RwLock<Option<TestContext>>,
    failed_tests: AtomicUsize
}

impl Orchestrator {
    pub fn new(configuration: Configuration, registry: PluginRegistry) -> Self {
        Self {
            configuration: Arc::new(configuration),
            suite_fulfillers: registry.fulfillers(FulfillerScope::Suite),
            test_fulfillers: registry.fulfillers(FulfillerScope::Test),
            test_modules: registry.test_modules(),
            registry,
            names: Arc::new(TableNameGenerator::new()),
            suite: RwLock::new(None),
            suite_context: RwLock::new(None),
            failed_tests: AtomicUsize::new(0)
        }
    }

    /// Replaces the generated run id, e.g. to make mutable names
    /// predictable.
    pub fn with_names(mut self, names: TableNameGenerator) -> Self {
        self.names = Arc::new(names);
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn names(&self) -> &TableNameGenerator {
        &self.names
    }

    pub fn failed_tests(&self) -> usize {
        self.failed_tests.load(Ordering::SeqCst)
    }

    /// Union of the flattened requirements of every test.
    pub fn suite_requirements(&self, tests: &[TestMethod]) -> RequirementSet {
        tests.iter().fold(RequirementSet::new(), |mut all, test| {
            all.extend(test.requirements(&self.configuration).iter().cloned());
            all
        })
    }

    fn table_definitions(&self) -> FixtureResult<TableDefinitionsRepository> {
        let mut definitions = self.registry.tables();
        if let Some(path) = self.configuration.get_string(TABLES_PATH_KEY) {
            definitions.extend(load_convention_definitions(Path::new(path))?);
        }
        TableDefinitionsRepository::from_definitions(definitions)
    }

    fn suite_dependencies(&self) -> FixtureResult<(Dependencies, Arc<TableManagerDispatcher>)> {
        let mut dependencies = Dependencies::new();
        dependencies.bind_arc(None, Arc::clone(&self.configuration));
        for module in self.registry.suite_modules() {
            module.configure(&self.configuration, &mut dependencies)?;
        }

        let repository = self.table_definitions()?;
        info!(tables = repository.len(), "table definitions registered");
        dependencies.bind(repository);
        dependencies.bind(ResourceProvisioners::new(self.registry.resource_provisioners()));

        let factories: Vec<TableManagerFactory> = self.registry.table_manager_factories();
        let dispatcher = Arc::new(TableManagerDispatcher::from_configuration(
            &self.configuration,
            &factories,
            &dependencies,
            &self.names
        )?);
        dependencies.bind_arc(None, Arc::clone(&dispatcher));
        dependencies.bind_arc(None, Arc::clone(&self.names));
        Ok((dependencies, dispatcher))
    }

    fn log_configuration(&self) {
        info!(keys = self.configuration.list_keys().len(), run_id = self.names.run_id(), "test configuration");
        for line in self.configuration.to_string().lines() {
            debug!("{line}");
        }
    }

    /// Fulfills the union of every test's requirements. Fails without
    /// leaving anything open when any suite fulfiller fails.
    #[instrument(skip_all, fields(tests = tests.len()))]
    pub async fn on_suite_start(&self, tests: &[TestMethod]) -> FixtureResult<()> {
        if self.suite.read().is_some() {
            return Err(FixtureError::consistency("suite already started"));
        }
        self.log_configuration();

        let requirements = self.suite_requirements(tests);
        let (dependencies, dispatcher) = self.suite_dependencies()?;
        let mut scope = FulfillmentScope::new(FulfillerScope::Suite, TestContext::new(dependencies));

        if let Err(e) = do_fulfillment(&mut scope, &self.suite_fulfillers, &requirements).await {
            return Err(match Self::close_suite(&mut scope, &dispatcher).await {
                Ok(()) => e,
                Err(close) => e.with_suppressed(close)
            });
        }

        *self.suite_context.write() = Some(scope.context()?);
        *self.suite.write() = Some(Suite { scope, dispatcher });
        info!(requirements = requirements.len(), "suite started");
        Ok(())
    }

    /// Closes managers once only the base frame is left, then the base
    /// frame itself.
    async fn close_suite(scope: &mut FulfillmentScope, dispatcher: &TableManagerDispatcher) -> FixtureResult<()> {
        let closed = dispatcher.close_all().await;
        let base = scope.close_base();
        combine(closed, base)
    }

    /// Cleans up suite fulfillers with FAILURE if any test failed.
    #[instrument(skip_all)]
    pub async fn on_suite_finish(&self) -> FixtureResult<()> {
        let Suite {
            mut scope,
            dispatcher
        } = self.suite.write().take().ok_or(FixtureError::SuiteNotInitialized)?;
        self.suite_context.write().take();

        let status = if self.failed_tests() > 0 {
            TestStatus::Failure
        } else {
            TestStatus::Success
        };
        let cleaned = do_cleanup(&mut scope, status).await;
        let closed = Self::close_suite(&mut scope, &dispatcher).await;
        info!(%status, failed_tests = self.failed_tests(), "suite finished");
        combine(cleaned, closed)
    }

    /// Fulfills one test's own requirements on top of the suite context and
    /// runs its before hooks. A failure here fails the test and leaves
    /// nothing of it open.
    #[instrument(skip_all, fields(test = test.name()))]
    pub async fn on_test_start(&self, test: &TestMethod) -> FixtureResult<TestScope> {
        let suite_context = self
            .suite_context
            .read()
            .clone()
            .ok_or(FixtureError::SuiteNotInitialized)?;

        let started = self.start_test(test, suite_context).await;
        if started.is_err() {
            self.failed_tests.fetch_add(1, Ordering::SeqCst);
        }
        started
    }

    async fn start_test(&self, test: &TestMethod, suite_context: TestContext) -> FixtureResult<TestScope> {
        let mut dependencies = Dependencies::new();
        for module in &self.test_modules {
            module.configure(test, &self.configuration, &mut dependencies)?;
        }
        let base = suite_context.create_child_context_with(Vec::new(), dependencies)?;
        let mut scope = FulfillmentScope::new(FulfillerScope::Test, base);

        let requirements = test.requirements(&self.configuration);
        if let Err(e) = do_fulfillment(&mut scope, &self.test_fulfillers, &requirements).await {
            return Err(match scope.close_base() {
                Ok(()) => e,
                Err(close) => e.with_suppressed(close)
            });
        }

        let context = scope.context()?;
        for hook in test.before_hooks() {
            if let Err(e) = hook.run(&context).await {
                warn!(hook = hook.name(), error = %e, "before hook failed");
                let cleaned = Self::finish_scope(&mut scope, TestStatus::Failure).await;
                return Err(match cleaned {
                    Ok(()) => e,
                    Err(cleanup) => e.with_suppressed(cleanup)
                });
            }
        }
        debug!(applied = ?scope.applied().collect::<Vec<_>>(), "test started");
        Ok(TestScope {
            name: test.name().to_string(),
            scope
        })
    }

    async fn finish_scope(scope: &mut FulfillmentScope, status: TestStatus) -> FixtureResult<()> {
        let cleaned = do_cleanup(scope, status).await;
        combine(cleaned, scope.close_base())
    }

    /// Runs after hooks, then cleans up the test scope. Cleanup always runs;
    /// a failing after hook turns the cleanup status into FAILURE.
    #[instrument(skip_all, fields(test = test.name(), %outcome))]
    pub async fn on_test_finished(&self, test: &TestMethod, scope: TestScope, outcome: TestOutcome) -> FixtureResult<()> {
        let TestScope { scope: mut fulfilled, .. } = scope;

        let mut failure: Option<FixtureError> = None;
        match fulfilled.context() {
            Ok(context) => {
                for hook in test.after_hooks() {
                    if let Err(e) = hook.run(&context).await {
                        warn!(hook = hook.name(), error = %e, "after hook failed");
                        failure = Some(merge(failure, e));
                    }
                }
            }
            Err(e) => failure = Some(e)
        }

        let status = if failure.is_some() {
            TestStatus::Failure
        } else {
            outcome.status()
        };
        if status == TestStatus::Failure {
            self.failed_tests.fetch_add(1, Ordering::SeqCst);
        }

        if let Err(e) = Self::finish_scope(&mut fulfilled, status).await {
            failure = Some(merge(failure, e));
        }
        debug!(%status, "test finished");
        failure.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("run_id", &self.names.run_id())
            .field("failed_tests", &self.failed_tests())
            .finish()
    }
}

/// Plugin made of a single suite module, typically binding backend clients
/// for the table manager factories.
pub struct SuiteBindings<F>(pub F);

impl<F> crate::plugin::Plugin for SuiteBindings<F>
where
    F: Fn(&Configuration, &mut Dependencies) -> FixtureResult<()> + Send + Sync + Clone + 'static
{
    fn name(&self) -> &str {
        "suite_bindings"
    }

    fn suite_modules(&self) -> Vec<Arc<dyn SuiteModule>> {
        vec![Arc::new(self.0.clone())]
    }
}
