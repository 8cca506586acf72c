//! Client configuration: defaults, optional TOML file, environment overrides.
//!
//! Resolution order, highest first: command-line flags (applied by the
//! binaries), environment variables, the config file, built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::poller::PollConfig;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_POLL_DURATION: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub poll_interval: Duration,
    /// `None` polls until the backend reports a terminal state.
    pub max_poll_duration: Option<Duration>,
    pub request_timeout: Duration,
    pub session_path: PathBuf,
    /// Directory holding the Noto Sans script fonts used by PDF export.
    pub font_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_duration: Some(DEFAULT_MAX_POLL_DURATION),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_path: config_dir()
                .map(|d| d.join("session.json"))
                .unwrap_or_else(|| PathBuf::from(".scriptsense-session.json")),
            font_dir: None,
        }
    }
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_url: Option<String>,
    poll_interval_ms: Option<u64>,
    max_poll_secs: Option<u64>,
    timeout_secs: Option<u64>,
    session_path: Option<PathBuf>,
    font_dir: Option<PathBuf>,
}

/// `<platform config dir>/scriptsense`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scriptsense"))
}

impl Config {
    /// Load defaults, then the config file, then environment variables.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let (file, required) = match path {
            Some(p) => (Some(p.to_path_buf()), true),
            None => (config_dir().map(|d| d.join("config.toml")), false),
        };
        if let Some(file) = file {
            if required || file.exists() {
                config.apply_file(&file)?;
            }
        }

        config.apply_vars(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded config from {}", path.display());

        if let Some(url) = file.api_url {
            self.api_url = url;
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = file.max_poll_secs {
            self.max_poll_duration = max_poll(secs);
        }
        if let Some(secs) = file.timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(p) = file.session_path {
            self.session_path = p;
        }
        if file.font_dir.is_some() {
            self.font_dir = file.font_dir;
        }
        Ok(())
    }

    /// Apply `SCRIPTSENSE_*` overrides from the given variable lookup.
    pub fn apply_vars(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("SCRIPTSENSE_API_URL") {
            self.api_url = url;
        }
        if let Some(ms) = parse_var(&lookup, "SCRIPTSENSE_POLL_INTERVAL_MS")? {
            self.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = parse_var(&lookup, "SCRIPTSENSE_MAX_POLL_SECS")? {
            self.max_poll_duration = max_poll(secs);
        }
        if let Some(secs) = parse_var(&lookup, "SCRIPTSENSE_TIMEOUT_SECS")? {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(p) = lookup("SCRIPTSENSE_SESSION") {
            self.session_path = PathBuf::from(p);
        }
        if let Some(p) = lookup("SCRIPTSENSE_FONT_DIR") {
            self.font_dir = Some(PathBuf::from(p));
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: self.poll_interval,
            max_duration: self.max_poll_duration,
        }
    }
}

// 0 disables the limit
fn max_poll(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { var, value }),
    }
}
