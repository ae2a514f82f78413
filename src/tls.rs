// ABOUTME: TLS certificate issuance via certbot.
// ABOUTME: One idempotent external call; skipped unless domain and contact are set.

use thiserror::Error;

use crate::pipeline::DeploymentContext;
use crate::ssh::{RemoteRunner, StepError, required};

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certbot failed: {source}")]
    Certbot { source: StepError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsOutcome {
    Configured,
    /// Domain or contact address unset; nothing to issue against.
    Skipped,
}

/// Ensure a certificate for the public hostname.
///
/// Re-running against an already-issued domain is certbot's own documented
/// no-op; slipway does not inspect certificate state itself.
pub async fn configure_tls<R: RemoteRunner + ?Sized>(
    runner: &R,
    ctx: &DeploymentContext,
) -> Result<TlsOutcome, TlsError> {
    let (Some(domain), Some(email)) = (&ctx.domain, &ctx.tls_email) else {
        tracing::info!("skipping TLS: domain or tls_email not configured");
        return Ok(TlsOutcome::Skipped);
    };

    let command = format!(
        "certbot --nginx --non-interactive --agree-tos --redirect -d {} -m {}",
        domain, email
    );

    required(runner, "certbot", &command)
        .await
        .map_err(|source| TlsError::Certbot { source })?;

    Ok(TlsOutcome::Configured)
}
