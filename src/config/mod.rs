// ABOUTME: Configuration types and parsing for slipway.yml.
// ABOUTME: Handles YAML parsing, env var indirection, and the init template.

mod env_value;

pub use env_value::EnvValue;

use crate::error::{Error, Result};
use crate::health::HealthCheckPolicy;
use crate::types::AppName;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "slipway.yml";
pub const CONFIG_FILENAME_ALT: &str = "slipway.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".slipway/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub repository: RepositoryConfig,

    #[serde(deserialize_with = "deserialize_server")]
    pub server: ServerConfig,

    pub app: AppConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    /// Clone URL (https or ssh).
    pub url: String,

    /// Branch, tag, or commit hash to deploy.
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Access token embedded into https URLs. Use `{env: VAR}` to keep it
    /// out of the config file.
    #[serde(default)]
    pub token: Option<EnvValue>,
}

fn default_revision() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    #[serde(default)]
    pub user: Option<String>,

    /// Path to the private key for authentication.
    /// If unset, the SSH agent and default key locations are tried.
    #[serde(default)]
    pub key: Option<PathBuf>,

    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_trust_first_connection() -> bool {
    true
}

impl ServerConfig {
    /// Parse formats like "host", "user@host", "host:port", "user@host:port".
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        let (user_part, rest) = if let Some(at_pos) = s.find('@') {
            (Some(&s[..at_pos]), &s[at_pos + 1..])
        } else {
            (None, s)
        };

        let (host, port) = if let Some(colon_pos) = rest.rfind(':') {
            let port_str = &rest[colon_pos + 1..];
            let port = port_str
                .parse::<u16>()
                .map_err(|_| format!("invalid port: {}", port_str))?;
            (&rest[..colon_pos], port)
        } else {
            (rest, 22)
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(ServerConfig {
            host: host.to_string(),
            port,
            user: user_part.map(|s| s.to_string()),
            key: None,
            trust_first_connection: true,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(deserialize_with = "deserialize_app_name")]
    pub name: AppName,

    /// Internal service port; published on the host and fronted by nginx.
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProxyConfig {
    /// Public hostname for the nginx server_name. Falls back to a
    /// catch-all listener when unset.
    #[serde(default)]
    pub domain: Option<String>,

    /// Contact address for TLS issuance. TLS is configured only when both
    /// domain and tls_email are set.
    #[serde(default)]
    pub tls_email: Option<String>,
}

/// Retry knobs for the three polling sites.
///
/// Each site is independently tunable; the defaults differ on purpose
/// (a build-then-start container converges slower than a TCP accept).
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_container_poll")]
    pub container: PollPolicyConfig,

    #[serde(default = "default_port_poll")]
    pub port: PollPolicyConfig,

    #[serde(default = "default_proxy_poll")]
    pub proxy: PollPolicyConfig,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            container: default_container_poll(),
            port: default_port_poll(),
            proxy: default_proxy_poll(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollPolicyConfig {
    pub attempts: u32,

    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl PollPolicyConfig {
    pub fn policy(&self) -> HealthCheckPolicy {
        HealthCheckPolicy::new(self.attempts, self.interval)
    }
}

fn default_container_poll() -> PollPolicyConfig {
    PollPolicyConfig {
        attempts: 10,
        interval: Duration::from_secs(3),
    }
}

fn default_port_poll() -> PollPolicyConfig {
    PollPolicyConfig {
        attempts: 20,
        interval: Duration::from_secs(2),
    }
}

fn default_proxy_poll() -> PollPolicyConfig {
    PollPolicyConfig {
        attempts: 12,
        interval: Duration::from_secs(5),
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }
}

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, template_yaml())?;

    Ok(())
}

fn template_yaml() -> &'static str {
    r#"repository:
  url: https://github.com/acme/my-app.git
  revision: main
  # token: {env: GIT_TOKEN}

server: root@server.example.com

app:
  name: my-app
  port: 3000

proxy:
  domain: my-app.example.com
  tls_email: ops@example.com
"#
}

// Custom deserializers

fn deserialize_app_name<'de, D>(deserializer: D) -> std::result::Result<AppName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    AppName::new(&s).map_err(serde::de::Error::custom)
}

fn deserialize_server<'de, D>(deserializer: D) -> std::result::Result<ServerConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entry = ServerEntry::deserialize(deserializer)?;
    entry.into_server_config().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(ServerConfig),
}

impl ServerEntry {
    fn into_server_config(self) -> std::result::Result<ServerConfig, String> {
        match self {
            ServerEntry::Simple(s) => ServerConfig::parse(&s),
            ServerEntry::Detailed(c) => Ok(c),
        }
    }
}
