use crate::command::{CommandExecutor, LocalCommandExecutor};
use crate::dispatch::merge;
use crate::fulfiller::{FulfillerScope, RequirementFulfiller};
use async_trait::async_trait;
use context::TestContext;
use errors::{FixtureError, FixtureResult};
use fixture_core::{CommandScope, Requirement, RequirementSet, StateEntry, TestStatus};
use std::sync::Arc;
use tracing::debug;

pub const SUITE_COMMAND_FULFILLER: &str = "SuiteCommandFulfiller";
pub const TEST_COMMAND_FULFILLER: &str = "TestCommandFulfiller";

/// Teardown commands still owed by a command fulfiller, in setup order.
#[derive(Debug, Clone, Default)]
pub struct PendingTeardown {
    pub commands: Vec<String>
}

/// Runs the setup commands of its scope and the matching teardown
/// commands, in reverse, at cleanup.
#[derive(Debug)]
pub struct CommandFulfiller {
    scope: CommandScope
}

impl CommandFulfiller {
    pub fn suite() -> Self {
        Self {
            scope: CommandScope::Suite
        }
    }

    pub fn test() -> Self {
        Self {
            scope: CommandScope::Test
        }
    }

    fn executor(context: &TestContext) -> Arc<dyn CommandExecutor> {
        context
            .get::<Arc<dyn CommandExecutor>>()
            .map(|executor| Arc::clone(&*executor))
            .unwrap_or_else(|| Arc::new(LocalCommandExecutor))
    }

    /// Runs every teardown, last first, and keeps going past failures.
    async fn tear_down(&self, executor: &dyn CommandExecutor, commands: &[String]) -> Option<FixtureError> {
        let mut failure = None;
        for command in commands.iter().rev() {
            debug!(scope = %self.scope, command, "running teardown command");
            if let Err(e) = executor.run(command).await {
                failure = Some(merge(failure, e));
            }
        }
        failure
    }
}

#[async_trait]
impl RequirementFulfiller for CommandFulfiller {
    fn name(&self) -> &str {
        match self.scope {
            CommandScope::Suite => SUITE_COMMAND_FULFILLER,
            CommandScope::Test => TEST_COMMAND_FULFILLER
        }
    }

    fn scope(&self) -> FulfillerScope {
        match self.scope {
            CommandScope::Suite => FulfillerScope::Suite,
            CommandScope::Test => FulfillerScope::Test
        }
    }

    fn filter(&self, requirements: &RequirementSet) -> RequirementSet {
        requirements.filter(|r| matches!(r, Requirement::Command(command) if command.scope == self.scope))
    }

    async fn fulfill(&self, requirements: &RequirementSet, context: &TestContext) -> FixtureResult<Vec<StateEntry>> {
        let executor = Self::executor(context);
        let mut pending = PendingTeardown::default();
        for requirement in requirements.commands() {
            for command in &requirement.setup {
                debug!(scope = %self.scope, command, "running setup command");
                if let Err(e) = executor.run(command).await {
                    // Teardowns owed so far are in no frame yet.
                    return Err(match self.tear_down(executor.as_ref(), &pending.commands).await {
                        Some(teardown) => e.with_suppressed(teardown),
                        None => e
                    });
                }
            }
            pending.commands.extend(requirement.teardown.iter().cloned());
        }
        Ok(vec![StateEntry::named(self.name(), pending)])
    }

    async fn cleanup(&self, _status: TestStatus, context: &TestContext) -> FixtureResult<()> {
        let Some(pending) = context.states().iter().find_map(|s| s.downcast::<PendingTeardown>()) else {
            return Ok(());
        };
        let executor = Self::executor(context);
        self.tear_down(executor.as_ref(), &pending.commands)
            .await
            .map_or(Ok(()), Err)
    }
}
