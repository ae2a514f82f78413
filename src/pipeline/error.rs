// ABOUTME: Stage error taxonomy and the pipeline's terminal failure type.
// ABOUTME: Every variant is fatal; the first failing stage ends the run.

use std::path::PathBuf;
use thiserror::Error;

use super::stage::Stage;

/// Why a stage failed. Each variant maps to one entry of the error
/// taxonomy; none is retried at this layer.
#[derive(Debug, Error)]
pub enum StageError {
    /// Unreachable host or failed authentication.
    #[error("connectivity: {0}")]
    Connectivity(#[from] crate::ssh::Error),

    #[error("source sync: {0}")]
    Sync(#[from] crate::repo::SyncError),

    /// No recognized build descriptor. A precondition violation, not a
    /// condition to default around.
    #[error("no Dockerfile or compose manifest at the top level of {}", .0.display())]
    Structural(PathBuf),

    #[error("artifact transfer: {0}")]
    Transfer(#[from] crate::transfer::TransferError),

    #[error("provisioning: {0}")]
    Provision(#[from] crate::provision::ProvisionError),

    /// Build or start failure; `kind()` on the source separates the two
    /// for diagnosis.
    #[error("{0}")]
    Deploy(#[from] crate::runtime::DeployError),

    /// The poller exhausted its attempt budget. Diagnosed with recent
    /// runtime logs, not build output.
    #[error("{what} not ready after {attempts} attempts; recent logs:\n{logs}")]
    ReadinessTimeout {
        what: &'static str,
        attempts: u32,
        logs: String,
    },

    /// The workload observably died; waiting longer would not have helped.
    #[error("workload failed before becoming ready: {detail}; recent logs:\n{logs}")]
    ReadinessTerminal { detail: String, logs: String },

    #[error("proxy configuration: {0}")]
    Configuration(#[from] crate::proxy::ConfigureError),

    #[error("TLS configuration: {0}")]
    Tls(#[from] crate::tls::TlsError),

    #[error("application not reachable through the proxy after {attempts} attempts")]
    Unreachable { attempts: u32 },
}

/// The run's terminal failure: which stage, and why.
///
/// Invariant: this is always the *first* failure encountered; no later
/// stage executed.
#[derive(Debug, Error)]
#[error("stage {stage} failed: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: StageError,
}

impl PipelineFailure {
    pub fn new(stage: Stage, error: StageError) -> Self {
        Self { stage, error }
    }
}
