use async_trait::async_trait;
use context::TestContext;
use errors::{FixtureError, FixtureResult};
use fixture_core::{Requirement, RequirementSet, StateEntry, TestStatus};
use lifecycle::{FulfillerScope, RequirementFulfiller};
use parking_lot::Mutex;
use std::sync::Arc;

/// Ordered log shared by several recording fulfillers.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// What a [`RecordingFulfiller`] claims from the requirement set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Everything,
    Nothing,
    Tables,
    Resources
}

/// Fulfiller that logs `fulfill:<name>` and `cleanup:<name>:<STATUS>` and
/// fails on request. It publishes its name as a `String` state named after
/// itself.
pub struct RecordingFulfiller {
    name: String,
    scope: FulfillerScope,
    claim: Claim,
    unconditional: bool,
    fail_fulfill: bool,
    fail_cleanup: bool,
    events: EventLog
}

impl RecordingFulfiller {
    pub fn new(name: impl Into<String>, scope: FulfillerScope, events: &EventLog) -> Self {
        Self {
            name: name.into(),
            scope,
            claim: Claim::Everything,
            unconditional: false,
            fail_fulfill: false,
            fail_cleanup: false,
            events: Arc::clone(events)
        }
    }

    pub fn claiming(mut self, claim: Claim) -> Self {
        self.claim = claim;
        self
    }

    pub fn unconditional(mut self) -> Self {
        self.unconditional = true;
        self
    }

    pub fn failing_fulfill(mut self) -> Self {
        self.fail_fulfill = true;
        self
    }

    pub fn failing_cleanup(mut self) -> Self {
        self.fail_cleanup = true;
        self
    }

    pub fn into_arc(self) -> Arc<dyn RequirementFulfiller> {
        Arc::new(self)
    }
}

#[async_trait]
impl RequirementFulfiller for RecordingFulfiller {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> FulfillerScope {
        self.scope
    }

    fn filter(&self, requirements: &RequirementSet) -> RequirementSet {
        match self.claim {
            Claim::Everything => requirements.clone(),
            Claim::Nothing => RequirementSet::new(),
            Claim::Tables => requirements.filter(|r| matches!(r, Requirement::Table(_))),
            Claim::Resources => requirements.filter(|r| matches!(r, Requirement::Resource(_)))
        }
    }

    fn is_unconditional(&self) -> bool {
        self.unconditional
    }

    async fn fulfill(&self, _requirements: &RequirementSet, _context: &TestContext) -> FixtureResult<Vec<StateEntry>> {
        self.events.lock().push(format!("fulfill:{}", self.name));
        if self.fail_fulfill {
            return Err(FixtureError::backend(self.name.clone(), "scripted fulfill failure"));
        }
        Ok(vec![StateEntry::named(self.name.clone(), self.name.clone())])
    }

    async fn cleanup(&self, status: TestStatus, _context: &TestContext) -> FixtureResult<()> {
        self.events
            .lock()
            .push(format!("cleanup:{}:{status}", self.name));
        if self.fail_cleanup {
            return Err(FixtureError::backend(self.name.clone(), "scripted cleanup failure"));
        }
        Ok(())
    }
}
