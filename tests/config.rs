// ABOUTME: Tests for configuration parsing and discovery.
// ABOUTME: Covers YAML forms, defaults, env-indirect secrets, and validation.

use slipway::config::{Config, EnvValue};
use slipway::pipeline::DeploymentContext;
use std::fs;
use std::time::Duration;

const MINIMAL: &str = r#"
repository:
  url: https://github.com/acme/demo.git
server: deploy@203.0.113.7
app:
  name: demo
  port: 3000
"#;

#[test]
fn minimal_config_parses_with_defaults() {
    let config = Config::from_yaml(MINIMAL).unwrap();

    assert_eq!(config.repository.url, "https://github.com/acme/demo.git");
    assert_eq!(config.repository.revision, "main");
    assert_eq!(config.server.host, "203.0.113.7");
    assert_eq!(config.server.port, 22);
    assert_eq!(config.server.user.as_deref(), Some("deploy"));
    assert_eq!(config.app.name.as_str(), "demo");
    assert_eq!(config.app.port, 3000);
    assert!(config.proxy.domain.is_none());
}

#[test]
fn poll_policies_default_per_site() {
    let config = Config::from_yaml(MINIMAL).unwrap();

    let container = config.health.container.policy();
    let port = config.health.port.policy();
    let proxy = config.health.proxy.policy();

    // The three sites are tuned independently; the numbers differ on purpose.
    assert_eq!(container.max_attempts, 10);
    assert_eq!(container.interval, Duration::from_secs(3));
    assert_eq!(port.max_attempts, 20);
    assert_eq!(port.interval, Duration::from_secs(2));
    assert_eq!(proxy.max_attempts, 12);
    assert_eq!(proxy.interval, Duration::from_secs(5));
}

#[test]
fn poll_policies_are_overridable() {
    let yaml = format!(
        "{}\nhealth:\n  container:\n    attempts: 4\n    interval: 500ms\n  port:\n    attempts: 2\n    interval: 1s\n  proxy:\n    attempts: 1\n    interval: 10s\n",
        MINIMAL
    );
    let config = Config::from_yaml(&yaml).unwrap();

    assert_eq!(config.health.container.policy().max_attempts, 4);
    assert_eq!(
        config.health.container.policy().interval,
        Duration::from_millis(500)
    );
    assert_eq!(config.health.port.policy().max_attempts, 2);
    assert_eq!(config.health.proxy.policy().max_attempts, 1);
}

#[test]
fn detailed_server_form_parses() {
    let yaml = r#"
repository:
  url: https://github.com/acme/demo.git
  revision: v2.1.0
server:
  host: 203.0.113.7
  port: 2222
  user: root
  key: /home/ci/.ssh/deploy_ed25519
  trust_first_connection: false
app:
  name: demo
  port: 8080
proxy:
  domain: demo.example.com
  tls_email: ops@example.com
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.server.port, 2222);
    assert!(!config.server.trust_first_connection);
    assert_eq!(
        config.server.key.as_deref(),
        Some(std::path::Path::new("/home/ci/.ssh/deploy_ed25519"))
    );
    assert_eq!(config.repository.revision, "v2.1.0");
    assert_eq!(config.proxy.domain.as_deref(), Some("demo.example.com"));
}

#[test]
fn invalid_app_name_is_rejected_at_parse() {
    let yaml = MINIMAL.replace("name: demo", "name: Demo_App");
    assert!(Config::from_yaml(&yaml).is_err());
}

#[test]
fn token_resolves_from_environment() {
    let yaml = r#"
repository:
  url: https://github.com/acme/demo.git
  token:
    env: SLIPWAY_TEST_TOKEN
server: deploy@203.0.113.7
app:
  name: demo
  port: 3000
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert!(matches!(
        config.repository.token,
        Some(EnvValue::FromEnv { .. })
    ));

    temp_env::with_var("SLIPWAY_TEST_TOKEN", Some("s3kr1t"), || {
        let ctx = DeploymentContext::from_config(&config).unwrap();
        assert_eq!(ctx.repo_token.as_deref(), Some("s3kr1t"));
    });
}

#[test]
fn missing_token_env_var_fails_context_construction() {
    let mut config = Config::from_yaml(MINIMAL).unwrap();
    config.repository.token = Some(EnvValue::FromEnv {
        var: "SLIPWAY_DEFINITELY_UNSET".to_string(),
        default: None,
    });

    temp_env::with_var_unset("SLIPWAY_DEFINITELY_UNSET", || {
        assert!(DeploymentContext::from_config(&config).is_err());
    });
}

#[test]
fn unsafe_domain_is_rejected_at_context_construction() {
    let mut config = Config::from_yaml(MINIMAL).unwrap();
    config.proxy.domain = Some("demo.example.com; rm -rf /".to_string());

    assert!(DeploymentContext::from_config(&config).is_err());
}

#[test]
fn discovery_prefers_slipway_yml() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".slipway")).unwrap();
    fs::write(
        dir.path().join(".slipway/config.yml"),
        MINIMAL.replace("port: 3000", "port: 4000"),
    )
    .unwrap();
    fs::write(dir.path().join("slipway.yml"), MINIMAL).unwrap();

    let config = Config::discover(dir.path()).unwrap();
    assert_eq!(config.app.port, 3000);
}

#[test]
fn discovery_falls_back_to_dir_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".slipway")).unwrap();
    fs::write(dir.path().join(".slipway/config.yml"), MINIMAL).unwrap();

    let config = Config::discover(dir.path()).unwrap();
    assert_eq!(config.app.name.as_str(), "demo");
}

#[test]
fn discovery_fails_without_config() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::discover(dir.path()).is_err());
}
