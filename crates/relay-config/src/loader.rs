//! Configuration loading.
//!
//! Sources, lowest precedence first: built-in defaults, the config file
//! (YAML or TOML, chosen by extension), then `RELAY_*` environment variables.

use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

use crate::config::RelayConfig;
use crate::error::{ConfigError, Result};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";

/// Builder for loading a [`RelayConfig`]
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    use_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader with no file and environment overrides enabled
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: None,
            use_env: true,
        }
    }

    /// Read this config file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Enable or disable environment overrides
    #[must_use]
    pub fn with_env(mut self, enabled: bool) -> Self {
        self.use_env = enabled;
        self
    }

    /// Load, apply overrides and validate.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, an override has an
    /// invalid value, or validation fails
    pub async fn load(&self) -> Result<RelayConfig> {
        let mut config = match &self.file {
            Some(path) => load_file(path).await?,
            None => RelayConfig::default(),
        };

        if self.use_env {
            apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Load configuration using `RELAY_CONFIG` (if set) and the environment.
///
/// # Errors
/// See [`ConfigLoader::load`]
pub async fn load_config() -> Result<RelayConfig> {
    let mut loader = ConfigLoader::new();
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        info!(path = %path, "Loading configuration file");
        loader = loader.with_file(path);
    }
    loader.load().await
}

async fn load_file(path: &Path) -> Result<RelayConfig> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    parse(path, &contents)
}

fn parse(path: &Path, contents: &str) -> Result<RelayConfig> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("yaml" | "yml") => serde_yaml::from_str(contents).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
        Some("toml") => toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Apply `RELAY_*` overrides read through `lookup`
pub(crate) fn apply_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("RELAY_HOST") {
        config.server.host = host;
    }

    for name in ["PORT", "RELAY_PORT"] {
        if let Some(port) = lookup(name) {
            config.server.port = port.trim().parse().map_err(|_| ConfigError::Env {
                name: name.to_string(),
                message: format!("'{port}' is not a valid port"),
            })?;
        }
    }

    if let Some(endpoint) = lookup("RELAY_UPSTREAM_URL") {
        config.upstream.endpoint = endpoint;
    }

    if let Some(file) = lookup("RELAY_CREDENTIALS_FILE") {
        config.credentials.file = Some(PathBuf::from(file));
    }

    if let Some(keys) = lookup("RELAY_API_KEYS") {
        config.auth.api_keys = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| SecretString::new(k.to_string()))
            .collect();
    }

    if let Some(level) = lookup("RELAY_LOG_LEVEL") {
        config.logging.level = level;
    }

    if let Some(json) = lookup("RELAY_LOG_JSON") {
        config.logging.json = match json.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" | "" => false,
            other => {
                return Err(ConfigError::Env {
                    name: "RELAY_LOG_JSON".to_string(),
                    message: format!("'{other}' is not a boolean"),
                })
            }
        };
    }

    debug!("Applied environment overrides");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn temp_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("tempfile");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[tokio::test]
    async fn test_load_yaml() {
        let file = temp_config(
            ".yaml",
            r"
server:
  port: 9100
upstream:
  endpoint: http://localhost:9999/chat
  backoff:
    initial: 250ms
    max: 4s
credentials:
  entries:
    - email: a@example.com
      token: t1
    - email: b@example.com
      token: t2
auth:
  api_keys: [sk-local]
",
        );

        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_env(false)
            .load()
            .await
            .expect("config");

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.upstream.endpoint, "http://localhost:9999/chat");
        assert_eq!(config.upstream.backoff.initial, Duration::from_millis(250));
        assert_eq!(config.upstream.backoff.max, Duration::from_secs(4));
        assert_eq!(config.upstream.backoff.multiplier, 2);
        assert_eq!(config.credentials.entries.len(), 2);
        assert_eq!(config.credentials.entries[1].email, "b@example.com");
        assert!(config.auth.accepts("sk-local"));
        assert_eq!(config.models.len(), 3);
    }

    #[tokio::test]
    async fn test_load_toml() {
        let file = temp_config(
            ".toml",
            r#"
models = ["anthropic:claude-sonnet-4@20250514"]

[server]
host = "127.0.0.1"

[credentials]
file = "/etc/relay/credentials.yaml"

[logging]
json = true
"#,
        );

        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_env(false)
            .load()
            .await
            .expect("config");

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(
            config.credentials.file.as_deref(),
            Some(Path::new("/etc/relay/credentials.yaml"))
        );
        assert_eq!(config.models, vec!["anthropic:claude-sonnet-4@20250514"]);
        assert!(config.logging.json);
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let file = temp_config(".ini", "port=1");
        let err = ConfigLoader::new()
            .with_file(file.path())
            .load()
            .await
            .expect_err("ini is not supported");
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = ConfigLoader::new()
            .with_file("/nonexistent/relay.yaml")
            .load()
            .await
            .expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[tokio::test]
    async fn test_invalid_file_fails_validation() {
        let file = temp_config(".yaml", "upstream:\n  stream_buffer: 0\n");
        let err = ConfigLoader::new()
            .with_file(file.path())
            .with_env(false)
            .load()
            .await
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RelayConfig::default();
        apply_overrides(
            &mut config,
            env(&[
                ("RELAY_HOST", "127.0.0.1"),
                ("PORT", "7000"),
                ("RELAY_UPSTREAM_URL", "http://upstream.local/chat"),
                ("RELAY_CREDENTIALS_FILE", "/tmp/creds.json"),
                ("RELAY_API_KEYS", "sk-a, sk-b,,"),
                ("RELAY_LOG_LEVEL", "debug"),
                ("RELAY_LOG_JSON", "true"),
            ]),
        )
        .expect("overrides");

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.upstream.endpoint, "http://upstream.local/chat");
        assert_eq!(
            config.credentials.file.as_deref(),
            Some(Path::new("/tmp/creds.json"))
        );
        assert_eq!(config.auth.api_keys.len(), 2);
        assert!(config.auth.accepts("sk-b"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_relay_port_wins_over_port() {
        let mut config = RelayConfig::default();
        apply_overrides(&mut config, env(&[("PORT", "7000"), ("RELAY_PORT", "7001")]))
            .expect("overrides");
        assert_eq!(config.server.port, 7001);
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = RelayConfig::default();
        let err = apply_overrides(&mut config, env(&[("RELAY_PORT", "http")])).expect_err("port");
        assert!(matches!(err, ConfigError::Env { ref name, .. } if name == "RELAY_PORT"));

        let err =
            apply_overrides(&mut config, env(&[("RELAY_LOG_JSON", "maybe")])).expect_err("bool");
        assert!(matches!(err, ConfigError::Env { .. }));
    }
}
