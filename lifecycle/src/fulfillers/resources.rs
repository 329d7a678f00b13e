use crate::dispatch::merge;
use crate::fulfiller::{FulfillerScope, RequirementFulfiller};
use async_trait::async_trait;
use context::TestContext;
use errors::{FixtureError, FixtureResult};
use fixture_core::{Requirement, RequirementSet, ResourceRequirement, StateEntry, TestStatus};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub const PROVISIONED_RESOURCES_FULFILLER: &str = "ProvisionedResourcesFulfiller";
pub const TEST_RESOURCE_FULFILLER: &str = "TestResourceFulfiller";
pub const SUITE_RESOURCE_FULFILLER: &str = "SuiteResourceFulfiller";

/// Name under which the suite-level [`ResourcesState`] is published. The
/// test-level one is unnamed, so a plain lookup from test code finds it
/// first.
pub const SUITE_RESOURCES: &str = "suite_resources";

/// Creates and releases external resources of one kind.
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    fn kind(&self) -> &str;

    /// Provisions `requirement`. The returned state, if any, is published
    /// next to the provisioned resources.
    async fn provision(&self, requirement: &ResourceRequirement, context: &TestContext) -> FixtureResult<Option<StateEntry>>;

    async fn release(&self, requirement: &ResourceRequirement, status: TestStatus) -> FixtureResult<()>;
}

/// Provisioners by resource kind. Later registrations of a kind win.
#[derive(Default, Clone)]
pub struct ResourceProvisioners {
    by_kind: BTreeMap<String, Arc<dyn ResourceProvisioner>>
}

impl ResourceProvisioners {
    pub fn new<I>(provisioners: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ResourceProvisioner>>
    {
        Self {
            by_kind: provisioners
                .into_iter()
                .map(|provisioner| (provisioner.kind().to_string(), provisioner))
                .collect()
        }
    }

    pub fn get(&self, kind: &str) -> FixtureResult<&Arc<dyn ResourceProvisioner>> {
        self.by_kind.get(kind).ok_or_else(|| {
            FixtureError::configuration(format!(
                "no resource provisioner for kind {kind}; known kinds: {:?}",
                self.by_kind.keys().collect::<Vec<_>>()
            ))
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.by_kind.keys().map(String::as_str)
    }
}

impl fmt::Debug for ResourceProvisioners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

/// Resources provisioned for the suite, in provisioning order.
#[derive(Debug, Clone, Default)]
pub struct ProvisionedResources {
    pub resources: Vec<ResourceRequirement>
}

/// Provisions every [`ResourceRequirement`] of the suite through the
/// provisioner registered for its kind, and releases them in reverse.
#[derive(Debug, Default)]
pub struct ProvisionedResourcesFulfiller;

impl ProvisionedResourcesFulfiller {
    async fn release_all(
        provisioners: &ResourceProvisioners,
        resources: &[ResourceRequirement],
        status: TestStatus
    ) -> FixtureResult<()> {
        let mut failure = None;
        for resource in resources.iter().rev() {
            let released = match provisioners.get(&resource.kind) {
                Ok(provisioner) => provisioner.release(resource, status).await,
                Err(e) => Err(e)
            };
            if let Err(e) = released {
                warn!(kind = %resource.kind, key = %resource.key, error = %e, "failed to release resource");
                failure = Some(merge(failure, e));
            }
        }
        failure.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl RequirementFulfiller for ProvisionedResourcesFulfiller {
    fn name(&self) -> &str {
        PROVISIONED_RESOURCES_FULFILLER
    }

    fn scope(&self) -> FulfillerScope {
        FulfillerScope::Suite
    }

    fn filter(&self, requirements: &RequirementSet) -> RequirementSet {
        requirements.filter(|r| matches!(r, Requirement::Resource(_)))
    }

    async fn fulfill(&self, requirements: &RequirementSet, context: &TestContext) -> FixtureResult<Vec<StateEntry>> {
        let provisioners = context.require::<ResourceProvisioners>()?;
        let mut provisioned = ProvisionedResources::default();
        let mut states = Vec::new();
        for resource in requirements.resources() {
            let outcome = match provisioners.get(&resource.kind) {
                Ok(provisioner) => provisioner.provision(resource, context).await,
                Err(e) => Err(e)
            };
            match outcome {
                Ok(state) => {
                    debug!(kind = %resource.kind, key = %resource.key, "provisioned resource");
                    states.extend(state);
                    provisioned.resources.push(resource.clone());
                }
                Err(e) => {
                    let released =
                        Self::release_all(&provisioners, &provisioned.resources, TestStatus::Failure).await;
                    return Err(match released {
                        Ok(()) => e,
                        Err(cleanup) => e.with_suppressed(cleanup)
                    });
                }
            }
        }
        states.push(StateEntry::new(provisioned));
        Ok(states)
    }

    async fn cleanup(&self, status: TestStatus, context: &TestContext) -> FixtureResult<()> {
        let Some(provisioned) = context
            .states()
            .iter()
            .find_map(|state| state.downcast::<ProvisionedResources>())
        else {
            return Ok(());
        };
        let provisioners = context.require::<ResourceProvisioners>()?;
        Self::release_all(&provisioners, &provisioned.resources, status).await
    }
}

type Closer = Box<dyn FnOnce() -> FixtureResult<()> + Send>;

/// Closers registered by test code, run in reverse registration order when
/// the owning scope ends.
#[derive(Default)]
pub struct ResourcesState {
    closers: Mutex<Vec<(String, Closer)>>
}

impl ResourcesState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, name: impl Into<String>, closer: F)
    where
        F: FnOnce() -> FixtureResult<()> + Send + 'static
    {
        self.closers.lock().push((name.into(), Box::new(closer)));
    }

    pub fn len(&self) -> usize {
        self.closers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs and forgets every closer. All closers run even if one fails.
    pub fn close_all(&self) -> FixtureResult<()> {
        let closers = std::mem::take(&mut *self.closers.lock());
        let mut failure = None;
        for (name, closer) in closers.into_iter().rev() {
            if let Err(e) = closer() {
                warn!(resource = %name, error = %e, "failed to close resource");
                failure = Some(merge(failure, e));
            }
        }
        failure.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for ResourcesState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let closers = self.closers.lock();
        f.debug_list().entries(closers.iter().map(|(name, _)| name)).finish()
    }
}

/// Publishes an empty [`ResourcesState`] at its scope and closes whatever
/// was registered in it at cleanup. Runs with an empty claim.
#[derive(Debug)]
pub struct ResourcesFulfiller {
    scope: FulfillerScope
}

impl ResourcesFulfiller {
    pub fn suite() -> Self {
        Self {
            scope: FulfillerScope::Suite
        }
    }

    pub fn test() -> Self {
        Self {
            scope: FulfillerScope::Test
        }
    }
}

#[async_trait]
impl RequirementFulfiller for ResourcesFulfiller {
    fn name(&self) -> &str {
        match self.scope {
            FulfillerScope::Suite => SUITE_RESOURCE_FULFILLER,
            FulfillerScope::Test => TEST_RESOURCE_FULFILLER
        }
    }

    fn scope(&self) -> FulfillerScope {
        self.scope
    }

    fn filter(&self, _requirements: &RequirementSet) -> RequirementSet {
        RequirementSet::new()
    }

    fn is_unconditional(&self) -> bool {
        true
    }

    async fn fulfill(&self, _requirements: &RequirementSet, _context: &TestContext) -> FixtureResult<Vec<StateEntry>> {
        let state = match self.scope {
            FulfillerScope::Suite => StateEntry::named(SUITE_RESOURCES, ResourcesState::new()),
            FulfillerScope::Test => StateEntry::new(ResourcesState::new())
        };
        Ok(vec![state])
    }

    async fn cleanup(&self, _status: TestStatus, context: &TestContext) -> FixtureResult<()> {
        match context
            .states()
            .iter()
            .find_map(|state| state.downcast::<ResourcesState>())
        {
            Some(resources) => resources.close_all(),
            None => Ok(())
        }
    }
}
