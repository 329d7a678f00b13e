//! Applies an ordered fulfiller list to a requirement set and unwinds it.
//!
//! Every fulfiller that runs pushes exactly one frame, so a scope's stack
//! always holds one base frame plus one frame per applied fulfiller.
//! Cleanup walks both in reverse.

use crate::fulfiller::{FulfillerScope, RequirementFulfiller};
use context::{TestContext, TestContextStack};
use errors::{FixtureError, FixtureResult};
use fixture_core::{RequirementSet, TestStatus};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Context stack of one scope plus the fulfillers applied to it, most
/// recent last.
pub struct FulfillmentScope {
    scope: FulfillerScope,
    stack: TestContextStack,
    applied: Vec<Arc<dyn RequirementFulfiller>>
}

impl FulfillmentScope {
    pub fn new(scope: FulfillerScope, base: TestContext) -> Self {
        Self::from_parts(scope, TestContextStack::with_base(base), Vec::new())
    }

    pub fn from_parts(
        scope: FulfillerScope,
        stack: TestContextStack,
        applied: Vec<Arc<dyn RequirementFulfiller>>
    ) -> Self {
        Self { scope, stack, applied }
    }

    pub fn into_parts(self) -> (TestContextStack, Vec<Arc<dyn RequirementFulfiller>>) {
        (self.stack, self.applied)
    }

    pub fn scope(&self) -> FulfillerScope {
        self.scope
    }

    pub fn stack(&self) -> &TestContextStack {
        &self.stack
    }

    /// Top frame: the context tests and hooks resolve against.
    pub fn context(&self) -> FixtureResult<TestContext> {
        self.stack.peek().cloned()
    }

    pub fn applied(&self) -> impl Iterator<Item = &str> {
        self.applied.iter().map(|fulfiller| fulfiller.name())
    }

    /// Pops and closes the base frame once every fulfiller is unwound.
    pub fn close_base(&mut self) -> FixtureResult<()> {
        if self.stack.size() != 1 || !self.applied.is_empty() {
            return Err(FixtureError::consistency(format!(
                "{} scope still holds {} frames over its base",
                self.scope,
                self.stack.size().saturating_sub(1)
            )));
        }
        self.stack.pop()?.close();
        Ok(())
    }
}

impl fmt::Debug for FulfillmentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FulfillmentScope")
            .field("scope", &self.scope)
            .field("stack_size", &self.stack.size())
            .field("applied", &self.applied().collect::<Vec<_>>())
            .finish()
    }
}

pub(crate) fn merge(failure: Option<FixtureError>, error: FixtureError) -> FixtureError {
    match failure {
        Some(primary) => primary.with_suppressed(error),
        None => error
    }
}

/// First failure of two independent steps, the second suppressed.
pub(crate) fn combine(first: FixtureResult<()>, second: FixtureResult<()>) -> FixtureResult<()> {
    match (first, second) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(e), Err(other)) => Err(e.with_suppressed(other))
    }
}

/// Runs `fulfillers` in order. A fulfiller with an empty claim is skipped
/// unless it is unconditional. On the first failure the fulfillers already
/// applied are cleaned up with [`TestStatus::Failure`] and their errors are
/// attached to the returned one as suppressed.
pub async fn do_fulfillment(
    scope: &mut FulfillmentScope,
    fulfillers: &[Arc<dyn RequirementFulfiller>],
    requirements: &RequirementSet
) -> FixtureResult<()> {
    for fulfiller in fulfillers {
        let claim = fulfiller.filter(requirements);
        if claim.is_empty() && !fulfiller.is_unconditional() {
            continue;
        }

        debug!(fulfiller = fulfiller.name(), scope = %scope.scope, claimed = claim.len(), "fulfilling");
        let parent = scope.stack.peek()?.clone();
        let outcome = match fulfiller.fulfill(&claim, &parent).await {
            Ok(states) => parent.create_child_context(states),
            Err(e) => Err(e)
        };

        match outcome {
            Ok(child) => {
                scope.stack.push(child);
                scope.applied.push(Arc::clone(fulfiller));
            }
            Err(e) => {
                let error = e.in_fulfiller(fulfiller.name());
                warn!(fulfiller = fulfiller.name(), error = %error, "fulfillment failed, unwinding");
                return Err(match do_cleanup(scope, TestStatus::Failure).await {
                    Ok(()) => error,
                    Err(cleanup) => error.with_suppressed(cleanup)
                });
            }
        }
    }
    info!(scope = %scope.scope, applied = scope.applied.len(), "fulfillment complete");
    Ok(())
}

/// Cleans up every applied fulfiller in reverse order, closing its frame
/// first. All fulfillers are visited; the first failure is returned with the
/// rest suppressed. The base frame is left in place.
pub async fn do_cleanup(scope: &mut FulfillmentScope, status: TestStatus) -> FixtureResult<()> {
    let expected = scope.applied.len() + 1;
    if scope.stack.size() != expected {
        return Err(FixtureError::consistency(format!(
            "{} context stack holds {} frames, expected {expected} for {} applied fulfillers",
            scope.scope,
            scope.stack.size(),
            scope.applied.len()
        )));
    }

    let mut failure: Option<FixtureError> = None;
    while let Some(fulfiller) = scope.applied.pop() {
        let frame = scope.stack.pop()?;
        frame.close();
        debug!(fulfiller = fulfiller.name(), %status, "cleaning up");
        if let Err(e) = fulfiller.cleanup(status, &frame).await {
            warn!(fulfiller = fulfiller.name(), error = %e, "cleanup failed");
            failure = Some(merge(failure, e.in_fulfiller(fulfiller.name())));
        }
    }
    failure.map_or(Ok(()), Err)
}
