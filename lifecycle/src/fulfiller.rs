use async_trait::async_trait;
use context::TestContext;
use errors::FixtureResult;
use fixture_core::{RequirementSet, StateEntry, TestStatus};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FulfillerScope {
    /// Applied once before any test runs.
    Suite,
    /// Applied afresh for every test method.
    Test
}

/// Turns the requirements it claims into states and tears them down later.
///
/// Fulfillers are shared by every worker and keep no state between calls:
/// whatever `cleanup` needs must be published as a state by `fulfill`.
/// `cleanup` receives the frame that holds those states.
#[async_trait]
pub trait RequirementFulfiller: Send + Sync {
    fn name(&self) -> &str;

    fn scope(&self) -> FulfillerScope;

    /// Subset of `requirements` this fulfiller handles. Must be free of
    /// side effects.
    fn filter(&self, requirements: &RequirementSet) -> RequirementSet;

    /// Unconditional fulfillers run even when they claim nothing.
    fn is_unconditional(&self) -> bool {
        false
    }

    async fn fulfill(&self, requirements: &RequirementSet, context: &TestContext) -> FixtureResult<Vec<StateEntry>>;

    async fn cleanup(&self, status: TestStatus, context: &TestContext) -> FixtureResult<()>;
}
