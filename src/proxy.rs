// ABOUTME: Nginx site generation and installation with backup-before-overwrite.
// ABOUTME: Renders the reverse-proxy config, installs it atomically, validates, reloads.

use thiserror::Error;

use crate::pipeline::DeploymentContext;
use crate::ssh::{RemoteRunner, StepError, required};

pub const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error("proxy step '{step}' failed: {source}")]
    Step { step: &'static str, source: StepError },

    /// The validator's own diagnostic text, verbatim. This is the most actionable
    /// error a caller can get.
    #[error("nginx rejected the configuration:\n{diagnostic}")]
    Validation { diagnostic: String },

    #[error("failed to upload site definition: {0}")]
    Upload(#[from] crate::ssh::Error),
}

/// Path of the installed site definition for this app.
pub fn site_path(ctx: &DeploymentContext) -> String {
    format!("{}/{}", SITES_AVAILABLE, ctx.app)
}

/// Path of the enablement link for this app.
pub fn enabled_path(ctx: &DeploymentContext) -> String {
    format!("{}/{}", SITES_ENABLED, ctx.app)
}

fn staged_path(ctx: &DeploymentContext) -> String {
    format!("{}/.{}.staged", SITES_AVAILABLE, ctx.app)
}

/// Render the site definition.
///
/// The upstream is the published port on localhost. Forwarded-* headers
/// preserve client identity; the Upgrade/Connection pair lets websocket
/// traffic pass through unmodified. All interpolated values are validated
/// upstream (`AppName` for the filename, domain shape at config load).
pub fn render_site(ctx: &DeploymentContext) -> String {
    let server_name = ctx.domain.as_deref().unwrap_or("_");

    format!(
        r#"server {{
    listen 80;
    server_name {server_name};

    location / {{
        proxy_pass http://127.0.0.1:{port};
        proxy_http_version 1.1;
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection "upgrade";
    }}
}}
"#,
        server_name = server_name,
        port = ctx.port,
    )
}

/// Install the rendered site and make it live.
///
/// Steps, each required to succeed before the next begins: stage the new
/// definition, back up a differing pre-existing site with a timestamped
/// suffix, install atomically, enable, drop the default catch-all site,
/// validate the full configuration, reload (not restart) nginx.
pub async fn configure<R: RemoteRunner + ?Sized>(
    runner: &R,
    ctx: &DeploymentContext,
) -> Result<(), ConfigureError> {
    let site = site_path(ctx);
    let enabled = enabled_path(ctx);
    let staged = staged_path(ctx);
    let rendered = render_site(ctx);

    // Stage next to the target so the final install is an atomic rename.
    let upload = runner
        .run_with_input(&format!("cat > {}", staged), rendered.as_bytes())
        .await?;
    if !upload.success() {
        return Err(ConfigureError::Step {
            step: "stage site definition",
            source: StepError::NonZeroExit {
                what: "stage site definition".to_string(),
                code: upload.exit_code,
                detail: upload.detail(),
            },
        });
    }

    // Back up only when the live site differs from what we are about to
    // install: at most one backup per distinct prior configuration.
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let backup_cmd = format!(
        "if [ -f {site} ] && ! cmp -s {site} {staged}; then cp -p {site} {site}.{stamp}.bak; fi",
        site = site,
        staged = staged,
        stamp = stamp,
    );
    step(runner, "back up existing site", &backup_cmd).await?;

    step(runner, "install site definition", &format!("mv {} {}", staged, site)).await?;

    step(runner, "enable site", &format!("ln -sfn {} {}", site, enabled)).await?;

    // The stock catch-all would otherwise win unmatched requests.
    step(
        runner,
        "remove default site",
        &format!("rm -f {}/default", SITES_ENABLED),
    )
    .await?;

    validate(runner).await?;

    step(runner, "reload nginx", "systemctl reload nginx").await?;

    tracing::info!(site = %site, "proxy site installed");

    Ok(())
}

/// Validate the full proxy configuration before touching the running process.
async fn validate<R: RemoteRunner + ?Sized>(runner: &R) -> Result<(), ConfigureError> {
    let output = runner
        .run("nginx -t")
        .await
        .map_err(ConfigureError::Upload)?;

    if output.success() {
        Ok(())
    } else {
        // nginx -t reports on stderr; surface it untouched.
        Err(ConfigureError::Validation {
            diagnostic: output.stderr.trim().to_string(),
        })
    }
}

async fn step<R: RemoteRunner + ?Sized>(
    runner: &R,
    name: &'static str,
    command: &str,
) -> Result<(), ConfigureError> {
    required(runner, name, command)
        .await
        .map(|_| ())
        .map_err(|source| ConfigureError::Step { step: name, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DeploymentContext;

    fn ctx(domain: Option<&str>) -> DeploymentContext {
        let mut ctx = DeploymentContext::template();
        ctx.domain = domain.map(String::from);
        ctx
    }

    #[test]
    fn render_binds_upstream_port() {
        let site = render_site(&ctx(None));
        assert!(site.contains("proxy_pass http://127.0.0.1:3000;"));
        assert!(site.contains("listen 80;"));
    }

    #[test]
    fn render_uses_domain_as_server_name() {
        let site = render_site(&ctx(Some("demo.example.com")));
        assert!(site.contains("server_name demo.example.com;"));
    }

    #[test]
    fn render_falls_back_to_catch_all_server_name() {
        let site = render_site(&ctx(None));
        assert!(site.contains("server_name _;"));
    }

    #[test]
    fn render_passes_upgrade_traffic_through() {
        let site = render_site(&ctx(None));
        assert!(site.contains("proxy_set_header Upgrade $http_upgrade;"));
        assert!(site.contains(r#"proxy_set_header Connection "upgrade";"#));
        assert!(site.contains("proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;"));
    }

    #[test]
    fn site_paths_derive_from_app_name() {
        let ctx = ctx(None);
        assert_eq!(site_path(&ctx), "/etc/nginx/sites-available/demo");
        assert_eq!(enabled_path(&ctx), "/etc/nginx/sites-enabled/demo");
    }
}
