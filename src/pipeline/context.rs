// ABOUTME: DeploymentContext, the immutable record every stage reads.
// ABOUTME: Built once from validated config; derives names, paths, and poll policies.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::health::HealthCheckPolicy;
use crate::ssh::SessionConfig;
use crate::types::AppName;

/// Resolved poll policies for the three polling sites.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub container: HealthCheckPolicy,
    pub port: HealthCheckPolicy,
    pub proxy: HealthCheckPolicy,
}

/// Everything a stage needs to know about this run.
///
/// Immutable after construction: stages read it, none mutates it. Re-running
/// the pipeline with the same context must converge to the same host state,
/// and mid-run mutation would break that stage-to-stage.
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    /// Clone URL as configured; the credential is embedded only at clone time.
    pub repo_url: String,
    pub repo_token: Option<String>,
    /// Branch, tag, or commit hash to deploy.
    pub revision: String,

    pub host: String,
    pub ssh_port: u16,
    pub user: String,
    pub key_path: Option<PathBuf>,
    pub trust_first_connection: bool,

    pub app: AppName,
    /// Internal service port, published on the host and fronted by nginx.
    pub port: u16,

    pub domain: Option<String>,
    pub tls_email: Option<String>,

    pub poll: PollSettings,
}

impl DeploymentContext {
    /// Build the context from a parsed config, resolving secrets and
    /// filling defaults. This is the single intake point; stages assume
    /// every field is already validated.
    pub fn from_config(config: &Config) -> Result<Self> {
        let repo_token = match &config.repository.token {
            Some(value) => Some(value.resolve()?),
            None => None,
        };

        let user = config.server.user.clone().unwrap_or_else(|| {
            std::env::var("USER").unwrap_or_else(|_| "root".to_string())
        });

        if let Some(domain) = &config.proxy.domain {
            ensure_template_safe("proxy.domain", domain)?;
        }
        if let Some(email) = &config.proxy.tls_email {
            ensure_template_safe("proxy.tls_email", email)?;
        }

        Ok(Self {
            repo_url: config.repository.url.clone(),
            repo_token,
            revision: config.repository.revision.clone(),
            host: config.server.host.clone(),
            ssh_port: config.server.port,
            user,
            key_path: config.server.key.clone(),
            trust_first_connection: config.server.trust_first_connection,
            app: config.app.name.clone(),
            port: config.app.port,
            domain: config.proxy.domain.clone(),
            tls_email: config.proxy.tls_email.clone(),
            poll: PollSettings {
                container: config.health.container.policy(),
                port: config.health.port.policy(),
                proxy: config.health.proxy.policy(),
            },
        })
    }

    /// Image tag derived from the application identifier. Deterministic so
    /// that repeated runs target the same logical resource.
    pub fn image_tag(&self) -> String {
        format!("{}:latest", self.app)
    }

    /// Container name; same derivation rule as the image tag.
    pub fn container_name(&self) -> &str {
        self.app.as_str()
    }

    /// Remote directory the source tree is mirrored into.
    pub fn remote_dir(&self) -> String {
        format!("/opt/{}", self.app)
    }

    /// Hostname the deployed application is validated against.
    pub fn public_host(&self) -> &str {
        self.domain.as_deref().unwrap_or(&self.host)
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(&self.host, &self.user)
            .port(self.ssh_port)
            .trust_on_first_use(self.trust_first_connection);
        if let Some(key) = &self.key_path {
            config = config.key_path(key.clone());
        }
        config
    }

    /// Fixture context for tests; fields are public so tests adjust what
    /// they need.
    pub fn template() -> Self {
        Self {
            repo_url: "https://github.com/acme/demo.git".to_string(),
            repo_token: None,
            revision: "main".to_string(),
            host: "127.0.0.1".to_string(),
            ssh_port: 22,
            user: "root".to_string(),
            key_path: None,
            trust_first_connection: true,
            app: AppName::new("demo").expect("fixture app name is valid"),
            port: 3000,
            domain: None,
            tls_email: None,
            poll: PollSettings {
                container: HealthCheckPolicy::new(3, Duration::from_millis(1)),
                port: HealthCheckPolicy::new(3, Duration::from_millis(1)),
                proxy: HealthCheckPolicy::new(3, Duration::from_millis(1)),
            },
        }
    }
}

/// Reject values that could escape the nginx template or a shell word.
fn ensure_template_safe(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidConfig(format!("{} cannot be empty", what)));
    }

    let forbidden = |c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | ';' | '{' | '}' | '$' | '`' | '\\')
    };

    if let Some(c) = value.chars().find(|&c| forbidden(c)) {
        return Err(Error::InvalidConfig(format!(
            "{} contains forbidden character '{}'",
            what, c
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names_are_deterministic() {
        let ctx = DeploymentContext::template();
        assert_eq!(ctx.image_tag(), "demo:latest");
        assert_eq!(ctx.container_name(), "demo");
        assert_eq!(ctx.remote_dir(), "/opt/demo");
    }

    #[test]
    fn public_host_prefers_domain() {
        let mut ctx = DeploymentContext::template();
        assert_eq!(ctx.public_host(), "127.0.0.1");
        ctx.domain = Some("demo.example.com".to_string());
        assert_eq!(ctx.public_host(), "demo.example.com");
    }

    #[test]
    fn template_safety_rejects_shell_metacharacters() {
        assert!(ensure_template_safe("proxy.domain", "demo.example.com").is_ok());
        assert!(ensure_template_safe("proxy.domain", "demo;rm -rf /").is_err());
        assert!(ensure_template_safe("proxy.domain", "demo example.com").is_err());
        assert!(ensure_template_safe("proxy.domain", "$(whoami).example.com").is_err());
        assert!(ensure_template_safe("proxy.domain", "").is_err());
    }
}
