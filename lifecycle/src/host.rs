//! Synchronous adapter for hosts running each test on its own worker thread.
//!
//! The test context stack of a running test lives in the worker's slot
//! ([`context::holder`]), so code without a context argument can reach it
//! through [`context::current_test_context`]. A worker holds at most one
//! test at a time.

use crate::dispatch::FulfillmentScope;
use crate::fulfiller::{FulfillerScope, RequirementFulfiller};
use crate::orchestrator::{Orchestrator, TestScope};
use crate::test_method::{TestMethod, TestOutcome};
use context::holder;
use dashmap::DashMap;
use errors::{FixtureError, FixtureResult};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tokio::runtime::Handle;
use tracing::debug;

/// Applied fulfillers of the test running on each worker. The matching
/// context stack is in the worker's slot.
type Running = (String, Vec<Arc<dyn RequirementFulfiller>>);

pub struct ThreadedHost {
    orchestrator: Arc<Orchestrator>,
    runtime: Handle,
    running: DashMap<ThreadId, Running>
}

impl ThreadedHost {
    /// `runtime` must not be the runtime of the calling thread: every entry
    /// point blocks on it.
    pub fn new(orchestrator: Arc<Orchestrator>, runtime: Handle) -> Self {
        Self {
            orchestrator,
            runtime,
            running: DashMap::new()
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn on_suite_start(&self, tests: &[TestMethod]) -> FixtureResult<()> {
        self.runtime.block_on(self.orchestrator.on_suite_start(tests))
    }

    pub fn on_suite_finish(&self) -> FixtureResult<()> {
        self.runtime.block_on(self.orchestrator.on_suite_finish())
    }

    /// Fulfills `test` and parks its context stack in this worker's slot.
    pub fn on_test_start(&self, test: &TestMethod) -> FixtureResult<()> {
        holder::assert_test_context_not_set()?;
        let scope = self.runtime.block_on(self.orchestrator.on_test_start(test))?;

        let (name, fulfilled) = scope.into_parts();
        let (stack, applied) = fulfilled.into_parts();
        holder::set_test_context_stack(stack)?;
        self.running.insert(thread::current().id(), (name, applied));
        Ok(())
    }

    /// Cleans up the test started on this worker and empties the slot.
    ///
    /// A worker whose start failed holds nothing: its start already unwound
    /// and counted the failure, so finishing it is a no-op.
    pub fn on_test_finished(&self, test: &TestMethod, outcome: TestOutcome) -> FixtureResult<()> {
        let Some((_, (name, applied))) = self.running.remove(&thread::current().id()) else {
            if holder::is_test_context_set() {
                return Err(FixtureError::consistency(format!(
                    "test {} was not started on this worker",
                    test.name()
                )));
            }
            debug!(test = test.name(), %outcome, "no test context on this worker, nothing to clean up");
            return Ok(());
        };
        let stack = holder::take_test_context_stack()
            .ok_or_else(|| FixtureError::consistency("test context not set on this worker"))?;

        let scope = TestScope::from_parts(name, FulfillmentScope::from_parts(FulfillerScope::Test, stack, applied));
        self.runtime
            .block_on(self.orchestrator.on_test_finished(test, scope, outcome))
    }

    /// Number of workers currently holding a started test.
    pub fn running_tests(&self) -> usize {
        self.running.len()
    }
}
