//! Per-worker slot for the test-level context stack.
//!
//! Test code running on a worker thread reads its fixtures through
//! [`current_test_context`]. Engine code passes contexts explicitly; only
//! the host adapter writes this slot.

use crate::stack::TestContextStack;
use crate::test_context::TestContext;
use errors::{FixtureError, FixtureResult};
use std::cell::RefCell;

thread_local! {
    static TEST_CONTEXT_STACK: RefCell<Option<TestContextStack>> = const { RefCell::new(None) };
}

/// Installs `stack` for the calling thread. Fails if one is already set.
pub fn set_test_context_stack(stack: TestContextStack) -> FixtureResult<()> {
    TEST_CONTEXT_STACK.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(FixtureError::consistency("test context already set"));
        }
        *slot = Some(stack);
        Ok(())
    })
}

pub fn take_test_context_stack() -> Option<TestContextStack> {
    TEST_CONTEXT_STACK.with(|slot| slot.borrow_mut().take())
}

pub fn is_test_context_set() -> bool {
    TEST_CONTEXT_STACK.with(|slot| slot.borrow().is_some())
}

pub fn assert_test_context_not_set() -> FixtureResult<()> {
    if is_test_context_set() {
        return Err(FixtureError::consistency("test context already set"));
    }
    Ok(())
}

/// Top frame of the calling thread's test stack.
pub fn current_test_context() -> Option<TestContext> {
    TEST_CONTEXT_STACK.with(|slot| {
        slot.borrow()
            .as_ref()
            .and_then(|stack| stack.peek().ok().cloned())
    })
}
