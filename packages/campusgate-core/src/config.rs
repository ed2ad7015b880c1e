//! Portal configuration.
//!
//! One explicit value object, constructed once and handed to each
//! component. Load priority per field group:
//! 1. Environment variables (`CAMPUSGATE_*`)
//! 2. Config file (`~/.config/campusgate/config.toml`)
//! 3. Hardcoded defaults

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::credentials::Credential;

/// Default eportal API base; the per-operation `method=` value is appended.
pub const DEFAULT_EPORTAL_BASE: &str =
    "https://ismu.shmtu.edu.cn:8443/eportal/InterFace.do?method=";

/// Plain-HTTP landing page the portal rewrites with its redirect script.
pub const DEFAULT_LANDING_URL: &str = "http://www.shmtu.edu.cn/";

/// Generate-204 endpoint used for connectivity probing.
pub const DEFAULT_PROBE_URL: &str = "http://www.google.cn/generate_204";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2.1 Safari/605.1.15";

const ENV_USER_AGENT: &str = "CAMPUSGATE_USER_AGENT";
const ENV_CHECK_INTERVAL: &str = "CAMPUSGATE_CHECK_INTERVAL";
const ENV_USER_LIST: &str = "CAMPUSGATE_USER_LIST";
const ENV_USER_PWD_PREFIX: &str = "CAMPUSGATE_USER_PWD_";
const ENV_USER_PWD_ENCRYPT_PREFIX: &str = "CAMPUSGATE_USER_PWD_ENCRYPT_";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    portal: Option<PortalSection>,
    monitor: Option<MonitorSection>,
    #[serde(default)]
    users: Vec<Credential>,
}

#[derive(Debug, Deserialize, Default)]
struct PortalSection {
    eportal_base: Option<String>,
    landing_url: Option<String>,
    probe_url: Option<String>,
    user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct MonitorSection {
    /// Seconds between connectivity checks
    check_interval: Option<u64>,
    /// Probe attempts per check
    retry_times: Option<u32>,
    /// Seconds between probe attempts
    retry_wait: Option<u64>,
}

/// Runtime portal configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Base URL for eportal API calls, ending in `method=`
    pub eportal_base: String,
    /// Landing page scraped for the redirect
    pub landing_url: String,
    /// Generate-204 probe endpoint
    pub probe_url: String,
    pub user_agent: String,
    /// Per-request timeout for the probe, in seconds
    pub probe_timeout_secs: u64,
    /// Per-request timeout for portal API calls, in seconds
    pub request_timeout_secs: u64,
    pub check_interval_secs: u64,
    pub retry_times: u32,
    pub retry_wait_secs: u64,
    /// Query string cache file
    pub cache_path: PathBuf,
    /// Where the configuration came from (for logging)
    pub source: ConfigSource,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            eportal_base: DEFAULT_EPORTAL_BASE.to_string(),
            landing_url: DEFAULT_LANDING_URL.to_string(),
            probe_url: DEFAULT_PROBE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            probe_timeout_secs: 5,
            request_timeout_secs: 10,
            check_interval_secs: 60,
            retry_times: 3,
            retry_wait_secs: 30,
            cache_path: default_cache_path(),
            source: ConfigSource::Default,
        }
    }
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// At least one value from an environment variable
    Environment,
    /// Loaded from config file
    ConfigFile,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("campusgate"))
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

fn default_cache_path() -> PathBuf {
    config_dir()
        .map(|p| p.join("query_string.txt"))
        .unwrap_or_else(|| PathBuf::from("query_string.txt"))
}

/// Load configuration from the config file
fn load_config_file() -> Option<ConfigFile> {
    let path = get_config_file_path()?;

    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

fn apply_file(config: &mut PortalConfig, file: &ConfigFile) {
    if let Some(portal) = &file.portal {
        if let Some(base) = non_empty(&portal.eportal_base) {
            config.eportal_base = base;
        }
        if let Some(url) = non_empty(&portal.landing_url) {
            config.landing_url = url;
        }
        if let Some(url) = non_empty(&portal.probe_url) {
            config.probe_url = url;
        }
        if let Some(ua) = non_empty(&portal.user_agent) {
            config.user_agent = ua;
        }
        config.source = ConfigSource::ConfigFile;
    }
    if let Some(monitor) = &file.monitor {
        if let Some(secs) = monitor.check_interval.filter(|s| *s > 0) {
            config.check_interval_secs = secs;
        }
        if let Some(times) = monitor.retry_times.filter(|t| *t > 0) {
            config.retry_times = times;
        }
        if let Some(wait) = monitor.retry_wait {
            config.retry_wait_secs = wait;
        }
        config.source = ConfigSource::ConfigFile;
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Load the portal configuration: defaults, overlaid by the config file,
/// overlaid by environment variables.
pub fn load_config() -> PortalConfig {
    let mut config = PortalConfig::default();

    if let Some(file) = load_config_file() {
        apply_file(&mut config, &file);
    }

    if let Ok(ua) = std::env::var(ENV_USER_AGENT) {
        if !ua.trim().is_empty() {
            tracing::info!("Using User-Agent from environment variable");
            config.user_agent = ua.trim().to_string();
            config.source = ConfigSource::Environment;
        }
    }
    if let Ok(raw) = std::env::var(ENV_CHECK_INTERVAL) {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => {
                tracing::info!("Using check interval from environment variable: {}s", secs);
                config.check_interval_secs = secs;
                config.source = ConfigSource::Environment;
            }
            _ => tracing::warn!("Ignoring invalid {}: {:?}", ENV_CHECK_INTERVAL, raw),
        }
    }

    tracing::debug!("Portal configuration loaded from {}", config.source);
    config
}

/// Load the ordered credential list: `[[users]]` tables from the config
/// file first, then any users declared through the environment
/// (`CAMPUSGATE_USER_LIST` = comma-separated ids, with per-id
/// `CAMPUSGATE_USER_PWD_<id>` and optional `CAMPUSGATE_USER_PWD_ENCRYPT_<id>`).
pub fn load_credentials() -> Vec<Credential> {
    let mut users = load_config_file().map(|f| f.users).unwrap_or_default();
    users.extend(env_credentials());
    users
}

fn env_credentials() -> Vec<Credential> {
    let Ok(list) = std::env::var(ENV_USER_LIST) else {
        return Vec::new();
    };

    let mut users = Vec::new();
    for id in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Ok(password) = std::env::var(format!("{ENV_USER_PWD_PREFIX}{id}")) else {
            tracing::warn!(
                "User {} listed in {} but has no password variable",
                crate::credentials::mask_user_id(id),
                ENV_USER_LIST
            );
            continue;
        };
        if password.is_empty() {
            continue;
        }
        let encrypted = std::env::var(format!("{ENV_USER_PWD_ENCRYPT_PREFIX}{id}"))
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        users.push(Credential::new(id, password, encrypted));
    }
    users
}

/// Get the path to the config file for documentation purposes
pub fn config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/campusgate/config.toml".to_string())
}

/// Generate example config file content
pub fn example_config() -> String {
    r#"# CampusGate Configuration
# Place this file at: ~/.config/campusgate/config.toml

[portal]
# Override the portal endpoints for a different campus deployment.
# eportal_base = "https://portal.example.edu:8443/eportal/InterFace.do?method="
# landing_url = "http://www.example.edu/"
# probe_url = "http://www.google.cn/generate_204"
# user_agent = "Mozilla/5.0 ..."

[monitor]
# Seconds between connectivity checks (default: 60)
# check_interval = 60
# Probe attempts per check (default: 3)
# retry_times = 3
# Seconds between probe attempts (default: 30)
# retry_wait = 30

# Ordered credential list; the first one that authenticates wins.
# [[users]]
# user_id = "202412300001"
# display_name = "primary"
# password = "changeme"
# is_encrypted = false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [portal]
            eportal_base = "https://portal.test:8443/eportal/InterFace.do?method="
            user_agent = "test-agent"

            [monitor]
            check_interval = 120
            retry_times = 5
            retry_wait = 10
            "#,
        )
        .unwrap();

        let mut config = PortalConfig::default();
        apply_file(&mut config, &file);

        assert_eq!(
            config.eportal_base,
            "https://portal.test:8443/eportal/InterFace.do?method="
        );
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.landing_url, DEFAULT_LANDING_URL);
        assert_eq!(config.check_interval_secs, 120);
        assert_eq!(config.retry_times, 5);
        assert_eq!(config.retry_wait_secs, 10);
        assert_eq!(config.source, ConfigSource::ConfigFile);
    }

    #[test]
    fn empty_and_zero_file_values_are_ignored() {
        let file: ConfigFile = toml::from_str(
            r#"
            [portal]
            eportal_base = "  "

            [monitor]
            check_interval = 0
            "#,
        )
        .unwrap();

        let mut config = PortalConfig::default();
        apply_file(&mut config, &file);

        assert_eq!(config.eportal_base, DEFAULT_EPORTAL_BASE);
        assert_eq!(config.check_interval_secs, 60);
    }

    #[test]
    fn users_parse_from_config_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            [[users]]
            user_id = "202412300001"
            password = "first"

            [[users]]
            user_id = "202412300002"
            display_name = "backup"
            password = "second"
            is_encrypted = true
            "#,
        )
        .unwrap();

        assert_eq!(file.users.len(), 2);
        assert_eq!(file.users[0].user_id, "202412300001");
        assert!(!file.users[0].is_encrypted);
        assert_eq!(file.users[1].display_name, "backup");
        assert!(file.users[1].is_encrypted);
    }

    #[test]
    fn defaults_are_sane() {
        let config = PortalConfig::default();
        assert_eq!(config.check_interval_secs, 60);
        assert_eq!(config.retry_times, 3);
        assert_eq!(config.retry_wait_secs, 30);
        assert_eq!(config.source, ConfigSource::Default);
        assert!(config.eportal_base.ends_with("method="));
    }
}
