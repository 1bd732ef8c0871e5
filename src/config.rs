use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::poller::DEFAULT_POLL_INTERVAL_SECS;
use crate::providers::circleci::{
    candidate_slugs, dedup_slugs, ClientOptions, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Configuration file structure for DeployLens.
///
/// Loaded from the current directory or a specified path. Command-line flags
/// and environment variables take precedence over anything set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// CircleCI connection settings
    #[serde(default)]
    pub circleci: CircleCiConfig,

    /// Status polling settings
    #[serde(default)]
    pub poller: PollerConfig,

    /// Status endpoint settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CircleCiConfig {
    /// CircleCI personal API token
    pub token: Option<String>,

    /// CircleCI host, without the `/api` suffix
    #[serde(default = "default_circleci_base_url")]
    pub base_url: String,

    /// Project path (e.g., 'org/site'), expanded into candidate slugs
    pub project: Option<String>,

    /// Explicit v1.1 project slugs, tried in order; overrides `project`
    #[serde(default)]
    pub project_slugs: Vec<String>,

    /// Timeout applied to every HTTP call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on simultaneous CircleCI requests
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollerConfig {
    /// Seconds between two status polls
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Address the status endpoint listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for CircleCiConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_circleci_base_url(),
            project: None,
            project_slugs: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_circleci_base_url() -> String {
    "https://circleci.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

impl CircleCiConfig {
    /// Ordered candidate slugs for the v1.1 job API.
    pub fn candidate_slugs(&self) -> Vec<String> {
        if self.project_slugs.is_empty() {
            self.project
                .as_deref()
                .map(candidate_slugs)
                .unwrap_or_default()
        } else {
            dedup_slugs(self.project_slugs.iter().cloned())
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout: self.request_timeout(),
            max_concurrent_requests: self.max_concurrent_requests.max(1),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.bind_address))
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./deploylens.toml
    /// 3. ./deploylens.json
    /// 4. ./deploylens.yaml
    /// 5. ./deploylens.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "deploylens.toml",
            "deploylens.json",
            "deploylens.yaml",
            "deploylens.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.circleci.base_url, "https://circleci.com");
        assert_eq!(config.circleci.request_timeout_secs, 30);
        assert_eq!(config.poller.interval(), Duration::from_secs(5));
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "127.0.0.1:3000".parse::<SocketAddr>().unwrap()
        );
        assert!(config.circleci.candidate_slugs().is_empty());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[circleci]
token = "circle-test-token"
base-url = "https://circleci.example.com"
project = "Majersingh/staticwebsitegenerator"
request-timeout-secs = 10

[poller]
interval-secs = 2
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.circleci.token, Some("circle-test-token".to_string()));
        assert_eq!(config.circleci.base_url, "https://circleci.example.com");
        assert_eq!(
            config.circleci.candidate_slugs(),
            vec![
                "gh/Majersingh/staticwebsitegenerator",
                "github/Majersingh/staticwebsitegenerator"
            ]
        );
        assert_eq!(
            config.circleci.client_options().request_timeout,
            Duration::from_secs(10)
        );
        assert_eq!(config.poller.interval_secs, 2);
        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn test_load_json_config_with_explicit_slugs() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "circleci": {
    "project": "ignored/when-slugs-set",
    "project-slugs": ["github/org/site", "gh/org/site", "github/org/site"]
  },
  "server": {
    "bind-address": "0.0.0.0:8080"
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(
            config.circleci.candidate_slugs(),
            vec!["github/org/site", "gh/org/site"]
        );
        assert_eq!(config.server.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml_content = "circleci:\n  max-concurrent-requests: 2\npoller:\n  interval-secs: 7\n";
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.circleci.max_concurrent_requests, 2);
        assert_eq!(config.poller.interval_secs, 7);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("does-not-exist/deploylens.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("deploylens.toml");

        let mut config = Config::default();
        config.circleci.project = Some("org/site".to_string());
        config.poller.interval_secs = 3;
        config.save(&path).unwrap();

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.circleci.project, Some("org/site".to_string()));
        assert_eq!(reloaded.poller.interval_secs, 3);
    }

    #[test]
    fn test_invalid_bind_address() {
        let config = ServerConfig {
            bind_address: "not-an-address".to_string(),
        };
        assert!(config.socket_addr().is_err());
    }
}
