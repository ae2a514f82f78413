// ABOUTME: Shell-driven container lifecycle for single-container and compose deployments.
// ABOUTME: Issues discrete docker commands over the RemoteRunner seam.

use crate::health::CheckOutcome;
use crate::pipeline::DeploymentContext;
use crate::ssh::{RemoteRunner, best_effort};

use super::error::DeployError;
use super::kind::DeploymentKind;

/// Go template handed to `docker inspect` for the readiness probe.
const INSPECT_FORMAT: &str = "{{.State.Running}} {{.State.Status}}";

/// Drives the application's container lifecycle on the target host.
///
/// `deploy` returns once the start command has been issued; readiness
/// confirmation is the caller's business (via the health poller).
pub struct ContainerDriver<'a, R: RemoteRunner + ?Sized> {
    runner: &'a R,
    ctx: &'a DeploymentContext,
}

impl<'a, R: RemoteRunner + ?Sized> ContainerDriver<'a, R> {
    pub fn new(runner: &'a R, ctx: &'a DeploymentContext) -> Self {
        Self { runner, ctx }
    }

    /// Replace whatever is running with a fresh build of the synced tree.
    pub async fn deploy(&self, kind: DeploymentKind) -> Result<(), DeployError> {
        match kind {
            DeploymentKind::SingleContainer => self.deploy_single().await,
            DeploymentKind::Compose => self.deploy_compose().await,
        }
    }

    async fn deploy_single(&self) -> Result<(), DeployError> {
        let name = self.ctx.container_name();
        let image = self.ctx.image_tag();
        let dir = self.ctx.remote_dir();
        let port = self.ctx.port;

        // Absence is success: a first deploy has nothing to stop or remove.
        self.stop_and_remove().await;
        best_effort(self.runner, "remove stale image", &format!("docker rmi {}", image)).await;

        let build = self
            .run(&format!("docker build -t {} {}", image, dir))
            .await?;
        if !build.success() {
            return Err(DeployError::Build {
                detail: combined_output(&build.stdout, &build.stderr),
            });
        }

        let run = self
            .run(&format!(
                "docker run -d --name {} --restart unless-stopped -p {port}:{port} {}",
                name, image
            ))
            .await?;
        if !run.success() {
            return Err(DeployError::Start { detail: run.detail() });
        }

        Ok(())
    }

    async fn deploy_compose(&self) -> Result<(), DeployError> {
        let dir = self.ctx.remote_dir();

        best_effort(
            self.runner,
            "compose down",
            &format!("cd {} && docker compose down --remove-orphans", dir),
        )
        .await;

        // `up --build` rebuilds and starts in one step, so its failure is
        // diagnosed as a build failure with the full output.
        let up = self
            .run(&format!("cd {} && docker compose up -d --build", dir))
            .await?;
        if !up.success() {
            return Err(DeployError::Build {
                detail: combined_output(&up.stdout, &up.stderr),
            });
        }

        Ok(())
    }

    /// One readiness probe attempt against the started workload.
    ///
    /// An exited or absent container is a terminal failure: it will never
    /// become ready by waiting longer.
    pub async fn running_state(&self, kind: DeploymentKind) -> CheckOutcome {
        match kind {
            DeploymentKind::SingleContainer => self.container_state().await,
            DeploymentKind::Compose => self.compose_state().await,
        }
    }

    async fn container_state(&self) -> CheckOutcome {
        let name = self.ctx.container_name();
        let command = format!("docker inspect -f '{}' {}", INSPECT_FORMAT, name);

        let output = match self.runner.run(&command).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("readiness probe could not run: {}", e);
                return CheckOutcome::StillPending;
            }
        };

        if !output.success() {
            return CheckOutcome::TerminalFailure(format!("container {} not found", name));
        }

        let state = output.stdout.trim();
        match state.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["true", _] => CheckOutcome::Ready,
            ["false", "created"] | ["false", "restarting"] => {
                tracing::debug!(state, "container not yet running");
                CheckOutcome::StillPending
            }
            ["false", status] => {
                CheckOutcome::TerminalFailure(format!("container {} is {}", name, status))
            }
            _ => CheckOutcome::TerminalFailure(format!("unexpected container state: {}", state)),
        }
    }

    async fn compose_state(&self) -> CheckOutcome {
        let dir = self.ctx.remote_dir();

        let running = match self
            .runner
            .run(&format!("cd {} && docker compose ps --status running -q", dir))
            .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("readiness probe could not run: {}", e);
                return CheckOutcome::StillPending;
            }
        };
        if running.success() && !running.stdout.trim().is_empty() {
            return CheckOutcome::Ready;
        }

        let exited = match self
            .runner
            .run(&format!("cd {} && docker compose ps --status exited -q", dir))
            .await
        {
            Ok(output) => output,
            Err(_) => return CheckOutcome::StillPending,
        };
        if exited.success() && !exited.stdout.trim().is_empty() {
            return CheckOutcome::TerminalFailure("one or more services exited".to_string());
        }

        CheckOutcome::StillPending
    }

    /// One TCP reachability attempt against the published port, from the
    /// host itself; the proxy upstream is 127.0.0.1, so this is the
    /// address that must answer.
    pub async fn port_open(&self) -> CheckOutcome {
        let command = format!(
            "timeout 2 bash -c 'exec 3<>/dev/tcp/127.0.0.1/{}' 2>/dev/null",
            self.ctx.port
        );

        match self.runner.run(&command).await {
            Ok(output) if output.success() => CheckOutcome::Ready,
            Ok(_) => CheckOutcome::StillPending,
            Err(e) => {
                tracing::warn!("port probe could not run: {}", e);
                CheckOutcome::StillPending
            }
        }
    }

    /// Recent runtime logs, for diagnosing readiness failures. Best-effort.
    pub async fn recent_logs(&self, kind: DeploymentKind) -> String {
        let command = match kind {
            DeploymentKind::SingleContainer => {
                format!("docker logs --tail 50 {}", self.ctx.container_name())
            }
            DeploymentKind::Compose => {
                format!("cd {} && docker compose logs --tail 50", self.ctx.remote_dir())
            }
        };

        match best_effort(self.runner, "collect runtime logs", &command).await {
            Some(output) => combined_output(&output.stdout, &output.stderr),
            None => String::new(),
        }
    }

    /// Stop and remove the named container. Best-effort on both steps.
    pub async fn stop_and_remove(&self) {
        let name = self.ctx.container_name();
        best_effort(self.runner, "stop container", &format!("docker stop {}", name)).await;
        best_effort(self.runner, "remove container", &format!("docker rm {}", name)).await;
    }

    async fn run(&self, command: &str) -> Result<crate::ssh::CommandOutput, DeployError> {
        self.runner
            .run(command)
            .await
            .map_err(|source| DeployError::Command { source })
    }
}

fn combined_output(stdout: &str, stderr: &str) -> String {
    let mut text = String::new();
    if !stdout.trim().is_empty() {
        text.push_str(stdout.trim());
    }
    if !stderr.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr.trim());
    }
    text
}
