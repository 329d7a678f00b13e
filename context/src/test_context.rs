//! Context frames: a lookup scope plus the states of one fulfiller
//! invocation, chained to the frame it was derived from.

use crate::dependencies::{Dependencies, describe};
use errors::{FixtureError, FixtureResult};
use fixture_core::StateEntry;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

type CloseCallback = Box<dyn FnOnce() + Send>;

struct Frame {
    parent: Option<TestContext>,
    dependencies: Dependencies,
    states: Vec<StateEntry>,
    close_callbacks: Mutex<Vec<CloseCallback>>,
    closed: AtomicBool
}

impl Frame {
    fn run_close_callbacks(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let callbacks = std::mem::take(&mut *self.close_callbacks.lock());
        debug!(callbacks = callbacks.len(), "closing test context");
        for callback in callbacks {
            callback();
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.run_close_callbacks();
    }
}

/// Cheaply cloneable handle to a context frame.
#[derive(Clone)]
pub struct TestContext {
    frame: Arc<Frame>
}

impl TestContext {
    /// Base frame of a scope.
    pub fn new(dependencies: Dependencies) -> Self {
        Self::build(None, dependencies, Vec::new())
    }

    fn build(parent: Option<TestContext>, dependencies: Dependencies, states: Vec<StateEntry>) -> Self {
        Self {
            frame: Arc::new(Frame {
                parent,
                dependencies,
                states,
                close_callbacks: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false)
            })
        }
    }

    pub fn create_child_context(&self, states: Vec<StateEntry>) -> FixtureResult<TestContext> {
        self.create_child_context_with(states, Dependencies::new())
    }

    /// Child frame carrying `states` and extra bindings. Lookups that miss
    /// in the child continue in this frame.
    pub fn create_child_context_with(
        &self,
        states: Vec<StateEntry>,
        mut dependencies: Dependencies
    ) -> FixtureResult<TestContext> {
        for state in &states {
            dependencies.bind_state(state)?;
        }
        Ok(Self::build(Some(self.clone()), dependencies, states))
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.ancestors().find_map(|context| context.frame.dependencies.get::<T>())
    }

    pub fn get_named<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.ancestors()
            .find_map(|context| context.frame.dependencies.get_named::<T>(name))
    }

    pub fn require<T: Any + Send + Sync>(&self) -> FixtureResult<Arc<T>> {
        self.get::<T>().ok_or_else(|| FixtureError::MissingDependency {
            dependency: describe(std::any::type_name::<T>(), None)
        })
    }

    pub fn require_named<T: Any + Send + Sync>(&self, name: &str) -> FixtureResult<Arc<T>> {
        self.get_named::<T>(name)
            .ok_or_else(|| FixtureError::MissingDependency {
                dependency: describe(std::any::type_name::<T>(), Some(name))
            })
    }

    /// States contributed to this frame only.
    pub fn states(&self) -> &[StateEntry] {
        &self.frame.states
    }

    pub fn parent(&self) -> Option<&TestContext> {
        self.frame.parent.as_ref()
    }

    /// Number of frames from the base frame to this one, inclusive.
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Runs `callback` exactly once when this frame closes, or right away if
    /// it already has.
    pub fn register_close_callback<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static
    {
        {
            let mut callbacks = self.frame.close_callbacks.lock();
            if !self.frame.closed.load(Ordering::SeqCst) {
                callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    pub fn close(&self) {
        self.frame.run_close_callbacks();
    }

    pub fn is_closed(&self) -> bool {
        self.frame.closed.load(Ordering::SeqCst)
    }

    pub fn ptr_eq(&self, other: &TestContext) -> bool {
        Arc::ptr_eq(&self.frame, &other.frame)
    }

    fn ancestors(&self) -> impl Iterator<Item = &TestContext> {
        std::iter::successors(Some(self), |context| context.parent())
    }
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("depth", &self.depth())
            .field("states", &self.frame.states)
            .field("dependencies", &self.frame.dependencies)
            .field("closed", &self.is_closed())
            .finish()
    }
}
