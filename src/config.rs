//! Service configuration
//!
//! Everything is read from environment variables once at startup:
//!
//! | Variable | Default |
//! |---|---|
//! | `CLIMB_USAGE_BIND` | `127.0.0.1:8890` |
//! | `CLIMB_USAGE_BASE_URL` | `/` |
//! | `CLIMB_USAGE_CGROUP_ROOT` | `/sys/fs/cgroup` |
//! | `HOME` | `.` |
//! | `CLIMB_USAGE_SHARED_DIR` | `/shared/team` (empty disables) |
//! | `CLIMB_USAGE_TOKEN` / `JUPYTERHUB_API_TOKEN` | unset (no auth) |
//! | `CLIMB_USAGE_LOG_FORMAT` | `text` |
//! | `CLIMB_USAGE_OTLP_ENDPOINT` | unset (no export) |

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::cgroups::CGROUP_ROOT;
use crate::usage::{EnvSource, Volume};

pub const DEFAULT_BIND: &str = "127.0.0.1:8890";
pub const DEFAULT_SHARED_DIR: &str = "/shared/team";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for the usage service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server listens on
    pub bind: SocketAddr,
    /// Notebook server base URL the routes are mounted under
    pub base_url: String,
    /// cgroup v2 directory of this container
    pub cgroup_root: PathBuf,
    /// The user's home directory
    pub home_dir: PathBuf,
    /// Team shared directory (None disables the volume)
    pub shared_dir: Option<PathBuf>,
    /// Token required on every request (None disables authentication)
    pub auth_token: Option<String>,
    pub log_format: LogFormat,
    /// OTLP endpoint for trace export
    pub otlp_endpoint: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8890)),
            base_url: "/".to_string(),
            cgroup_root: PathBuf::from(CGROUP_ROOT),
            home_dir: PathBuf::from("."),
            shared_dir: Some(PathBuf::from(DEFAULT_SHARED_DIR)),
            auth_token: None,
            log_format: LogFormat::Text,
            otlp_endpoint: None,
        }
    }
}

/// Error type for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    /// A variable holds a value that can't be used
    Invalid { var: &'static str, value: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { var, value, reason } => {
                write!(f, "Invalid {}={:?}: {}", var, value, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServiceConfig {
    /// Load from the given environment, falling back to defaults
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = env.var("CLIMB_USAGE_BIND") {
            config.bind = value.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    var: "CLIMB_USAGE_BIND",
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        if let Some(value) = env.var("CLIMB_USAGE_BASE_URL") {
            config.base_url = value;
        }

        if let Some(value) = env.var("CLIMB_USAGE_CGROUP_ROOT") {
            config.cgroup_root = PathBuf::from(value);
        }

        if let Some(value) = env.var("HOME") {
            config.home_dir = PathBuf::from(value);
        }

        if let Some(value) = env.var("CLIMB_USAGE_SHARED_DIR") {
            config.shared_dir = (!value.is_empty()).then(|| PathBuf::from(value));
        }

        config.auth_token = env
            .var("CLIMB_USAGE_TOKEN")
            .or_else(|| env.var("JUPYTERHUB_API_TOKEN"))
            .filter(|token| !token.is_empty());

        if let Some(value) = env.var("CLIMB_USAGE_LOG_FORMAT") {
            config.log_format = match value.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "CLIMB_USAGE_LOG_FORMAT",
                        value,
                        reason: "expected \"text\" or \"json\"".to_string(),
                    })
                }
            };
        }

        config.otlp_endpoint = env
            .var("CLIMB_USAGE_OTLP_ENDPOINT")
            .filter(|endpoint| !endpoint.is_empty());

        Ok(config)
    }

    /// Volumes shown on the dashboard, in display order
    pub fn volumes(&self) -> Vec<Volume> {
        let mut volumes = vec![Volume::home(&self.home_dir)];
        if let Some(shared) = &self.shared_dir {
            volumes.push(Volume::shared_team(shared));
        }
        volumes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::StaticEnv;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_env(&StaticEnv::new()).unwrap();

        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.base_url, "/");
        assert_eq!(config.cgroup_root, PathBuf::from("/sys/fs/cgroup"));
        assert_eq!(config.shared_dir, Some(PathBuf::from("/shared/team")));
        assert!(config.auth_token.is_none());
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_overrides() {
        let env = StaticEnv::new()
            .with("CLIMB_USAGE_BIND", "0.0.0.0:9000")
            .with("CLIMB_USAGE_BASE_URL", "/user/jdoe/")
            .with("CLIMB_USAGE_CGROUP_ROOT", "/tmp/cgroup")
            .with("HOME", "/home/jdoe")
            .with("CLIMB_USAGE_SHARED_DIR", "")
            .with("JUPYTERHUB_API_TOKEN", "secret")
            .with("CLIMB_USAGE_LOG_FORMAT", "JSON");

        let config = ServiceConfig::from_env(&env).unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.base_url, "/user/jdoe/");
        assert_eq!(config.cgroup_root, PathBuf::from("/tmp/cgroup"));
        assert_eq!(config.shared_dir, None);
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.volumes(), vec![Volume::home("/home/jdoe")]);
    }

    #[test]
    fn test_explicit_token_wins() {
        let env = StaticEnv::new()
            .with("CLIMB_USAGE_TOKEN", "mine")
            .with("JUPYTERHUB_API_TOKEN", "hub");
        let config = ServiceConfig::from_env(&env).unwrap();
        assert_eq!(config.auth_token.as_deref(), Some("mine"));
    }

    #[test]
    fn test_invalid_values() {
        let env = StaticEnv::new().with("CLIMB_USAGE_BIND", "not an address");
        assert!(ServiceConfig::from_env(&env).is_err());

        let env = StaticEnv::new().with("CLIMB_USAGE_LOG_FORMAT", "xml");
        assert!(ServiceConfig::from_env(&env).is_err());
    }

    #[test]
    fn test_volume_order() {
        let config = ServiceConfig::default();
        let prefixes: Vec<_> = config.volumes().into_iter().map(|v| v.id_prefix).collect();
        assert_eq!(prefixes, vec!["home", "shared-team"]);
    }
}
