// ABOUTME: Deployment kind detection from the synced working copy.
// ABOUTME: A Dockerfile wins over any compose manifest; neither is a hard failure.

use std::fmt;
use std::path::Path;

/// Compose manifest filenames recognized at the working copy top level.
pub const COMPOSE_MANIFESTS: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Which container build/run convention governs this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentKind {
    SingleContainer,
    Compose,
}

impl fmt::Display for DeploymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentKind::SingleContainer => write!(f, "single-container"),
            DeploymentKind::Compose => write!(f, "compose"),
        }
    }
}

/// Inspect the top level of `workdir` for a build descriptor.
///
/// Priority is deterministic: a Dockerfile fixes the kind even when a
/// compose manifest is also present. No recursive search, no inference
/// from sources; `None` means the run must fail before touching the host.
pub fn detect_kind(workdir: &Path) -> Option<DeploymentKind> {
    if workdir.join("Dockerfile").is_file() {
        return Some(DeploymentKind::SingleContainer);
    }

    for manifest in COMPOSE_MANIFESTS {
        if workdir.join(manifest).is_file() {
            return Some(DeploymentKind::Compose);
        }
    }

    None
}
