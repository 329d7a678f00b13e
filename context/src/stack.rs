use crate::test_context::TestContext;
use errors::{FixtureError, FixtureResult};

/// Frames of one scope, base frame first. Each successful fulfiller adds
/// exactly one frame.
#[derive(Debug, Default)]
pub struct TestContextStack {
    frames: Vec<TestContext>
}

impl TestContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: TestContext) -> Self {
        Self { frames: vec![base] }
    }

    pub fn push(&mut self, context: TestContext) {
        self.frames.push(context);
    }

    pub fn pop(&mut self) -> FixtureResult<TestContext> {
        self.frames
            .pop()
            .ok_or_else(|| FixtureError::consistency("pop from an empty test context stack"))
    }

    pub fn peek(&self) -> FixtureResult<&TestContext> {
        self.frames
            .last()
            .ok_or_else(|| FixtureError::consistency("peek at an empty test context stack"))
    }

    pub fn size(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
