// ABOUTME: Sequential fail-fast pipeline orchestrator and best-effort cleanup.
// ABOUTME: Drives each stage in order; the first failure is the run's result.

use std::path::Path;
use std::time::Duration;

use crate::diagnostics::{Diagnostics, Warning};
use crate::health::{PollOutcome, poll};
use crate::output::Output;
use crate::probe;
use crate::provision;
use crate::proxy;
use crate::repo;
use crate::runtime::{ContainerDriver, DeploymentKind, detect_kind};
use crate::ssh::{RemoteRunner, Session, best_effort};
use crate::tls::{self, TlsOutcome};
use crate::transfer;
use crate::types::AppName;

use super::context::DeploymentContext;
use super::error::{PipelineFailure, StageError};
use super::stage::Stage;

/// Terminal success of a run.
#[derive(Debug)]
pub struct DeploySummary {
    pub app: AppName,
    pub head: String,
    pub kind: DeploymentKind,
    pub url: String,
}

/// Per-step outcome of the cleanup entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The step ran and exited zero.
    Applied,
    /// The step exited non-zero; an expected prior state (already absent).
    Skipped,
    /// The step could not be executed at all.
    Unavailable,
}

#[derive(Debug)]
pub struct CleanupStep {
    pub name: &'static str,
    pub outcome: CleanupOutcome,
}

/// What cleanup attempted; every step is attempted regardless of earlier
/// failures.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub steps: Vec<CleanupStep>,
}

/// Drives the full stage sequence against one host.
pub struct Orchestrator {
    ctx: DeploymentContext,
}

impl Orchestrator {
    pub fn new(ctx: DeploymentContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &DeploymentContext {
        &self.ctx
    }

    /// Run the whole pipeline: Sync and Verify locally, Connect, then the
    /// remote stages. Fail-fast: the result is the first failure, and no
    /// stage after it executes.
    pub async fn run(
        &self,
        checkout_parent: &Path,
        output: &Output,
        diagnostics: &mut Diagnostics,
    ) -> Result<DeploySummary, PipelineFailure> {
        output.progress(&format!("Syncing {} @ {}...", self.ctx.repo_url, self.ctx.revision));
        let synced = repo::sync(checkout_parent, &self.ctx)
            .await
            .map_err(|e| PipelineFailure::new(Stage::Sync, e.into()))?;

        let kind = detect_kind(&synced.workdir).ok_or_else(|| {
            PipelineFailure::new(Stage::Verify, StageError::Structural(synced.workdir.clone()))
        })?;
        output.progress(&format!("Detected {} deployment", kind));

        output.progress(&format!("Connecting to {}...", self.ctx.host));
        let session = Session::connect(self.ctx.session_config())
            .await
            .map_err(|e| PipelineFailure::new(Stage::Connect, StageError::Connectivity(e)))?;

        let result = self
            .run_remote(&session, &synced.workdir, kind, output)
            .await;

        if let Err(e) = session.disconnect().await {
            diagnostics.warn(Warning::ssh_disconnect(e.to_string()));
        }

        result?;

        Ok(DeploySummary {
            app: self.ctx.app.clone(),
            head: synced.head,
            kind,
            url: format!("http://{}/", self.ctx.public_host()),
        })
    }

    /// The remote-mutating stages, in order. Split out so the sequence is
    /// exercisable against any [`RemoteRunner`].
    pub async fn run_remote<R: RemoteRunner + ?Sized>(
        &self,
        runner: &R,
        workdir: &Path,
        kind: DeploymentKind,
        output: &Output,
    ) -> Result<(), PipelineFailure> {
        self.provision_stage(runner, output).await?;
        self.deploy_stage(runner, workdir, kind, output).await?;
        self.proxy_stage(runner, output).await?;
        self.tls_stage(runner, output).await?;
        self.validate_stage(output).await?;
        Ok(())
    }

    pub async fn provision_stage<R: RemoteRunner + ?Sized>(
        &self,
        runner: &R,
        output: &Output,
    ) -> Result<(), PipelineFailure> {
        output.progress("Provisioning host...");
        provision::ensure_host(runner)
            .await
            .map_err(|e| PipelineFailure::new(Stage::Provision, e.into()))
    }

    /// Transfer the tree, replace the running workload, and wait for it to
    /// come up. Build failures carry build output; readiness failures carry
    /// recent runtime logs, so callers can tell them apart.
    pub async fn deploy_stage<R: RemoteRunner + ?Sized>(
        &self,
        runner: &R,
        workdir: &Path,
        kind: DeploymentKind,
        output: &Output,
    ) -> Result<(), PipelineFailure> {
        output.progress("Uploading artifacts...");
        transfer::upload_tree(runner, workdir, &self.ctx.remote_dir())
            .await
            .map_err(|e| PipelineFailure::new(Stage::Deploy, e.into()))?;

        output.progress(&format!("Deploying {} ({})...", self.ctx.app, kind));
        let driver = ContainerDriver::new(runner, &self.ctx);
        driver
            .deploy(kind)
            .await
            .map_err(|e| PipelineFailure::new(Stage::Deploy, e.into()))?;

        output.progress("Waiting for workload...");
        match poll(self.ctx.poll.container, || driver.running_state(kind)).await {
            PollOutcome::Ready => {}
            PollOutcome::TimedOut => {
                let logs = driver.recent_logs(kind).await;
                return Err(PipelineFailure::new(
                    Stage::Deploy,
                    StageError::ReadinessTimeout {
                        what: "workload",
                        attempts: self.ctx.poll.container.max_attempts,
                        logs,
                    },
                ));
            }
            PollOutcome::TerminalFailure(detail) => {
                let logs = driver.recent_logs(kind).await;
                return Err(PipelineFailure::new(
                    Stage::Deploy,
                    StageError::ReadinessTerminal { detail, logs },
                ));
            }
        }

        output.progress(&format!("Waiting for port {}...", self.ctx.port));
        match poll(self.ctx.poll.port, || driver.port_open()).await {
            PollOutcome::Ready => Ok(()),
            PollOutcome::TimedOut => {
                let logs = driver.recent_logs(kind).await;
                Err(PipelineFailure::new(
                    Stage::Deploy,
                    StageError::ReadinessTimeout {
                        what: "service port",
                        attempts: self.ctx.poll.port.max_attempts,
                        logs,
                    },
                ))
            }
            PollOutcome::TerminalFailure(detail) => {
                let logs = driver.recent_logs(kind).await;
                Err(PipelineFailure::new(
                    Stage::Deploy,
                    StageError::ReadinessTerminal { detail, logs },
                ))
            }
        }
    }

    pub async fn proxy_stage<R: RemoteRunner + ?Sized>(
        &self,
        runner: &R,
        output: &Output,
    ) -> Result<(), PipelineFailure> {
        output.progress("Configuring reverse proxy...");
        proxy::configure(runner, &self.ctx)
            .await
            .map_err(|e| PipelineFailure::new(Stage::ConfigureProxy, e.into()))
    }

    pub async fn tls_stage<R: RemoteRunner + ?Sized>(
        &self,
        runner: &R,
        output: &Output,
    ) -> Result<(), PipelineFailure> {
        match tls::configure_tls(runner, &self.ctx).await {
            Ok(TlsOutcome::Configured) => {
                output.progress("TLS certificate ensured");
                Ok(())
            }
            Ok(TlsOutcome::Skipped) => {
                output.progress("TLS skipped (no domain or contact configured)");
                Ok(())
            }
            Err(e) => Err(PipelineFailure::new(Stage::ConfigureTls, e.into())),
        }
    }

    /// Confirm the application answers through the proxy from outside.
    pub async fn validate_stage(&self, output: &Output) -> Result<(), PipelineFailure> {
        let host = self.ctx.public_host();
        output.progress(&format!("Validating http://{}/ ...", host));

        match poll(self.ctx.poll.proxy, || {
            probe::http_check(host, 80, Duration::from_secs(5))
        })
        .await
        {
            PollOutcome::Ready => Ok(()),
            _ => Err(PipelineFailure::new(
                Stage::Validate,
                StageError::Unreachable {
                    attempts: self.ctx.poll.proxy.max_attempts,
                },
            )),
        }
    }

    /// Best-effort teardown of everything a deploy creates on the host.
    ///
    /// Bypasses Sync…Validate. Partial environments are the expected prior
    /// state, so every step runs regardless of earlier step outcomes and
    /// failures are logged, not fatal.
    pub async fn cleanup(
        &self,
        output: &Output,
        diagnostics: &mut Diagnostics,
    ) -> Result<CleanupReport, crate::error::Error> {
        output.progress(&format!("Connecting to {}...", self.ctx.host));
        let session = Session::connect(self.ctx.session_config())
            .await
            .map_err(|e| crate::error::Error::Ssh(e.to_string()))?;

        let report = self.cleanup_remote(&session, output).await;

        for step in &report.steps {
            if step.outcome == CleanupOutcome::Unavailable {
                diagnostics.warn(Warning::teardown(format!(
                    "teardown step '{}' could not run",
                    step.name
                )));
            }
        }

        if let Err(e) = session.disconnect().await {
            diagnostics.warn(Warning::ssh_disconnect(e.to_string()));
        }

        Ok(report)
    }

    pub async fn cleanup_remote<R: RemoteRunner + ?Sized>(
        &self,
        runner: &R,
        output: &Output,
    ) -> CleanupReport {
        let name = self.ctx.container_name();
        let image = self.ctx.image_tag();
        let dir = self.ctx.remote_dir();
        let site = proxy::site_path(&self.ctx);
        let enabled = proxy::enabled_path(&self.ctx);

        let steps: [(&'static str, String); 8] = [
            ("stop container", format!("docker stop {}", name)),
            ("remove container", format!("docker rm {}", name)),
            ("remove image", format!("docker rmi {}", image)),
            (
                "compose down",
                format!(
                    "if [ -d {dir} ]; then cd {dir} && docker compose down --remove-orphans; fi",
                    dir = dir
                ),
            ),
            ("remove site definition", format!("rm -f {}", site)),
            ("remove site link", format!("rm -f {}", enabled)),
            ("reload nginx", "systemctl reload nginx".to_string()),
            ("remove remote tree", format!("rm -rf {}", dir)),
        ];

        let mut report = CleanupReport::default();
        for (step_name, command) in steps {
            output.progress(&format!("Cleanup: {}...", step_name));
            let outcome = match best_effort(runner, step_name, &command).await {
                Some(out) if out.success() => CleanupOutcome::Applied,
                Some(_) => CleanupOutcome::Skipped,
                None => CleanupOutcome::Unavailable,
            };
            report.steps.push(CleanupStep {
                name: step_name,
                outcome,
            });
        }

        report
    }
}
