// ABOUTME: Container runtime error types with SNAFU pattern.
// ABOUTME: Keeps build failures distinguishable from start failures for diagnosis.

use snafu::Snafu;

/// Errors from driving the container lifecycle over the remote shell.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeployError {
    /// The image (or compose project) failed to build. `detail` carries the
    /// build output; that is the diagnosis, not the runtime logs.
    #[snafu(display("image build failed: {detail}"))]
    Build { detail: String },

    /// The container was built but could not be started.
    #[snafu(display("container start failed: {detail}"))]
    Start { detail: String },

    /// The remote command could not be executed at all.
    #[snafu(display("remote command failed: {source}"))]
    Command { source: crate::ssh::Error },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Build,
    Start,
    Command,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Build { .. } => DeployErrorKind::Build,
            DeployError::Start { .. } => DeployErrorKind::Start,
            DeployError::Command { .. } => DeployErrorKind::Command,
        }
    }
}
