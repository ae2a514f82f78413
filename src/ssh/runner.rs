// ABOUTME: RemoteRunner trait, the seam between pipeline stages and SSH.
// ABOUTME: Provides required/best-effort command helpers with fail-fast semantics.

use async_trait::async_trait;

use super::client::{CommandOutput, Session};
use super::error::Result;

/// Executes commands on the deployment target.
///
/// Implemented by [`Session`] for real hosts and by scripted fakes in tests.
/// Every remote effect in the pipeline goes through this trait as a discrete
/// POSIX shell command; there is no richer RPC.
#[async_trait]
pub trait RemoteRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<CommandOutput>;

    /// Run a command with `input` streamed to its stdin.
    async fn run_with_input(&self, command: &str, input: &[u8]) -> Result<CommandOutput>;
}

#[async_trait]
impl RemoteRunner for Session {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.exec(command).await
    }

    async fn run_with_input(&self, command: &str, input: &[u8]) -> Result<CommandOutput> {
        self.exec_with_input(command, input).await
    }
}

/// A required remote step that exited non-zero or failed to execute.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("{what} exited with code {code}: {detail}")]
    NonZeroExit {
        what: String,
        code: u32,
        detail: String,
    },

    #[error("{what} could not be executed: {source}")]
    Channel {
        what: String,
        source: super::error::Error,
    },
}

impl StepError {
    /// The remote command's own diagnostic text, verbatim where available.
    pub fn detail(&self) -> &str {
        match self {
            StepError::NonZeroExit { detail, .. } => detail,
            StepError::Channel { .. } => "",
        }
    }
}

/// Run a command that must succeed; a non-zero exit fails the calling stage.
///
/// This is the explicit stop-on-first-nonzero contract: multi-step remote
/// work is an ordered list of `required` calls, not one opaque script.
pub async fn required<R: RemoteRunner + ?Sized>(
    runner: &R,
    what: &str,
    command: &str,
) -> std::result::Result<CommandOutput, StepError> {
    let output = runner.run(command).await.map_err(|source| StepError::Channel {
        what: what.to_string(),
        source,
    })?;

    if output.success() {
        Ok(output)
    } else {
        Err(StepError::NonZeroExit {
            what: what.to_string(),
            code: output.exit_code,
            detail: output.detail(),
        })
    }
}

/// Run a command whose failure is expected and non-fatal.
///
/// "Already absent" is success here: stopping a container that does not
/// exist, removing an image that was never built. Non-zero exits are logged
/// at debug, channel failures at warn; neither propagates.
pub async fn best_effort<R: RemoteRunner + ?Sized>(
    runner: &R,
    what: &str,
    command: &str,
) -> Option<CommandOutput> {
    match runner.run(command).await {
        Ok(output) => {
            if !output.success() {
                tracing::debug!(
                    what,
                    exit_code = output.exit_code,
                    "best-effort step skipped: {}",
                    output.detail()
                );
            }
            Some(output)
        }
        Err(e) => {
            tracing::warn!(what, "best-effort step could not run: {}", e);
            None
        }
    }
}
