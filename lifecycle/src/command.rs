//! Shell command execution for command requirements.

use async_trait::async_trait;
use errors::{FixtureError, FixtureResult};
use tokio::process::Command;
use tracing::{debug, instrument};

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, command: &str) -> FixtureResult<()>;
}

/// Runs commands through `sh -c` on the local host. A non-zero exit status
/// is a failure carrying the command's stderr.
#[derive(Debug, Clone, Default)]
pub struct LocalCommandExecutor;

#[async_trait]
impl CommandExecutor for LocalCommandExecutor {
    #[instrument(skip(self))]
    async fn run(&self, command: &str) -> FixtureResult<()> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| FixtureError::Command {
                command: command.to_string(),
                reason: e.to_string()
            })?;

        if output.status.success() {
            debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim_end(), "command finished");
            return Ok(());
        }
        Err(FixtureError::Command {
            command: command.to_string(),
            reason: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            )
        })
    }
}
