// ABOUTME: The ordered stage sequence of the deployment pipeline.
// ABOUTME: Stages execute strictly in order; the first failure is terminal.

use std::fmt;

/// One discrete, ordered phase of the deployment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sync,
    Verify,
    Connect,
    Provision,
    Deploy,
    ConfigureProxy,
    ConfigureTls,
    Validate,
}

impl Stage {
    /// The total order stages execute in. Connect must succeed before any
    /// remote-mutating stage runs.
    pub const SEQUENCE: [Stage; 8] = [
        Stage::Sync,
        Stage::Verify,
        Stage::Connect,
        Stage::Provision,
        Stage::Deploy,
        Stage::ConfigureProxy,
        Stage::ConfigureTls,
        Stage::Validate,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Sync => "sync",
            Stage::Verify => "verify",
            Stage::Connect => "connect",
            Stage::Provision => "provision",
            Stage::Deploy => "deploy",
            Stage::ConfigureProxy => "configure-proxy",
            Stage::ConfigureTls => "configure-tls",
            Stage::Validate => "validate",
        };
        write!(f, "{}", label)
    }
}
