//! Configuration for deploylistd

use deploylist_controller::{GithubConfig, DEFAULT_API_URL};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// GitHub API access
    #[serde(default)]
    pub github: GithubSettings,

    /// Where token secrets are read from
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// GitHub API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSettings {
    /// API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl GithubSettings {
    /// Client settings handed to the lister factory
    pub fn client_config(&self) -> GithubConfig {
        GithubConfig {
            api_url: self.api_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Secret source
///
/// With a directory set, secrets are read from
/// `<dir>/<namespace>/<secretName>/<key>`. Without one, only objects without
/// a `tokenRef` can be reconciled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay before retrying a pass whose status could not be written
    #[serde(default = "default_persist_retry")]
    pub persist_retry_secs: u64,

    /// How often workers are reconciled against the object store
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            persist_retry_secs: default_persist_retry(),
            resync_interval_secs: default_resync_interval(),
        }
    }
}

impl SchedulerConfig {
    pub fn persist_retry(&self) -> Duration {
        Duration::from_secs(self.persist_retry_secs)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs.max(1))
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Manifest files or directories applied at startup
    #[serde(default)]
    pub manifests: Vec<PathBuf>,

    /// Directory mirroring each object's status as JSON
    #[serde(default)]
    pub status_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_user_agent() -> String {
    concat!("deploylistd/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_persist_retry() -> u64 {
    30
}

fn default_resync_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `DEPLOYLIST_*` environment variables (`__` separates sections, e.g.
    /// `DEPLOYLIST_SCHEDULER__PERSIST_RETRY_SECS`)
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DEPLOYLIST")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("storage.manifests")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(config.server.enable_cors);
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
        assert!(config.secrets.dir.is_none());
        assert!(config.storage.manifests.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.persist_retry(), Duration::from_secs(30));
        assert_eq!(config.resync_interval(), Duration::from_secs(60));

        let zero = SchedulerConfig {
            resync_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(zero.resync_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_client_config() {
        let settings = GithubSettings {
            api_url: "https://ghe.example.com/api/v3".into(),
            request_timeout_secs: 5,
            ..Default::default()
        };
        let client = settings.client_config();
        assert_eq!(client.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploylistd.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "server:\n  listen_addr: 0.0.0.0:9090\nscheduler:\n  persist_retry_secs: 5\nsecrets:\n  dir: /var/run/secrets\n"
        )
        .unwrap();

        let config = DaemonConfig::load(path.to_str()).unwrap();
        assert_eq!(config.server.listen_addr.port(), 9090);
        assert_eq!(config.scheduler.persist_retry_secs, 5);
        assert_eq!(config.secrets.dir, Some(PathBuf::from("/var/run/secrets")));
        // Untouched sections keep their defaults
        assert_eq!(config.github.request_timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = DaemonConfig::load(Some("/nonexistent/deploylistd")).unwrap();
        assert_eq!(config.server.listen_addr, default_listen_addr());
    }
}
