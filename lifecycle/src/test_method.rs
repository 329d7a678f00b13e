//! What the host tells the engine about one test method.

use async_trait::async_trait;
use config::Configuration;
use context::TestContext;
use errors::{FixtureError, FixtureResult};
use fixture_core::{RequirementSet, RequirementsProvider, TestStatus};
use std::fmt;
use std::sync::Arc;
use strum::Display;

/// Hook run before or after a test body. Arguments are looked up in the
/// context by type.
#[async_trait]
pub trait TestHook: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, context: &TestContext) -> FixtureResult<()>;
}

/// Adapts a synchronous closure into a [`TestHook`].
pub struct FnHook<F> {
    name: String,
    hook: F
}

impl<F> FnHook<F>
where
    F: Fn(&TestContext) -> FixtureResult<()> + Send + Sync
{
    pub fn new(name: impl Into<String>, hook: F) -> Self {
        Self {
            name: name.into(),
            hook
        }
    }
}

#[async_trait]
impl<F> TestHook for FnHook<F>
where
    F: Fn(&TestContext) -> FixtureResult<()> + Send + Sync
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, context: &TestContext) -> FixtureResult<()> {
        (self.hook)(context).map_err(|e| FixtureError::Hook {
            hook: self.name.clone(),
            reason: e.to_string()
        })
    }
}

/// Identity of the running test, bound in every test base frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMethodInfo {
    pub name: String
}

#[derive(Clone)]
pub struct TestMethod {
    name: String,
    requirements: Vec<Arc<dyn RequirementsProvider>>,
    before: Vec<Arc<dyn TestHook>>,
    after: Vec<Arc<dyn TestHook>>
}

impl TestMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirements: Vec::new(),
            before: Vec::new(),
            after: Vec::new()
        }
    }

    pub fn requires(mut self, provider: impl RequirementsProvider + 'static) -> Self {
        self.requirements.push(Arc::new(provider));
        self
    }

    pub fn before(mut self, hook: impl TestHook + 'static) -> Self {
        self.before.push(Arc::new(hook));
        self
    }

    pub fn after(mut self, hook: impl TestHook + 'static) -> Self {
        self.after.push(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> TestMethodInfo {
        TestMethodInfo {
            name: self.name.clone()
        }
    }

    /// Flattened requirements of this test under `configuration`.
    pub fn requirements(&self, configuration: &Configuration) -> RequirementSet {
        self.requirements
            .iter()
            .map(|provider| provider.requirements(configuration))
            .collect()
    }

    pub fn before_hooks(&self) -> &[Arc<dyn TestHook>] {
        &self.before
    }

    pub fn after_hooks(&self) -> &[Arc<dyn TestHook>] {
        &self.after
    }
}

impl fmt::Debug for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestMethod")
            .field("name", &self.name)
            .field("requirements", &self.requirements.len())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

/// How the host saw a test end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TestOutcome {
    Success,
    Failure,
    Skipped
}

impl TestOutcome {
    /// Skipped tests clean up as successful ones.
    pub fn status(self) -> TestStatus {
        match self {
            Self::Success | Self::Skipped => TestStatus::Success,
            Self::Failure => TestStatus::Failure
        }
    }
}
