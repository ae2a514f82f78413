// ABOUTME: Idempotent host provisioning: docker, compose, nginx, certbot.
// ABOUTME: Each tool gets one check-then-install command; re-runs are no-ops.

use thiserror::Error;

use crate::ssh::{RemoteRunner, StepError, required};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("provisioning step '{name}' failed: {source}")]
    Step { name: &'static str, source: StepError },
}

/// One "ensure present" step. The install recipe is deliberately a single
/// opaque command; the pipeline only cares that the tool ends up available.
pub struct ProvisionStep {
    pub name: &'static str,
    pub command: &'static str,
}

/// Ordered provisioning steps. Docker must be usable before the compose
/// plugin check, and nginx before certbot's nginx authenticator.
pub const STEPS: [ProvisionStep; 6] = [
    ProvisionStep {
        name: "docker engine",
        command: "command -v docker >/dev/null 2>&1 || \
                  (apt-get update -qq && DEBIAN_FRONTEND=noninteractive apt-get install -y -qq docker.io)",
    },
    ProvisionStep {
        name: "docker service",
        command: "systemctl is-active --quiet docker || systemctl start docker",
    },
    ProvisionStep {
        name: "compose plugin",
        command: "docker compose version >/dev/null 2>&1 || \
                  DEBIAN_FRONTEND=noninteractive apt-get install -y -qq docker-compose-v2",
    },
    ProvisionStep {
        name: "nginx",
        command: "command -v nginx >/dev/null 2>&1 || \
                  DEBIAN_FRONTEND=noninteractive apt-get install -y -qq nginx",
    },
    ProvisionStep {
        name: "nginx service",
        command: "systemctl is-active --quiet nginx || systemctl start nginx",
    },
    ProvisionStep {
        name: "certbot",
        command: "command -v certbot >/dev/null 2>&1 || \
                  DEBIAN_FRONTEND=noninteractive apt-get install -y -qq certbot python3-certbot-nginx",
    },
];

/// Ensure the host can build containers and serve as a reverse proxy.
pub async fn ensure_host<R: RemoteRunner + ?Sized>(runner: &R) -> Result<(), ProvisionError> {
    for step in &STEPS {
        tracing::debug!(step = step.name, "ensuring present");
        required(runner, step.name, step.command)
            .await
            .map_err(|source| ProvisionError::Step {
                name: step.name,
                source,
            })?;
    }

    Ok(())
}
