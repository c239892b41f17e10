//! Configuration for the emrscope CLI.
//!
//! A flat TOML file under the platform config directory, layered over
//! built-in defaults and under `EMRSCOPE_*` environment variables, plus
//! translation into the core's context defaults and filter overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use emrscope_core::{ContextDefaults, DEFAULT_PAGE_CAP, StatusSet, status_set};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "EMRSCOPE_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Region used when none is selected (falls back to `AWS_REGION`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Named AWS credential profile (falls back to `AWS_PROFILE`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Item cap per listing.
    #[serde(default = "default_page_cap")]
    pub page_cap: usize,

    /// Per-operation timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Service endpoint override (local emulators).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Allowed states per domain key, replacing the domain default.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            page_cap: default_page_cap(),
            timeout: default_timeout(),
            endpoint_url: None,
            output: default_output(),
            color: default_color(),
            filters: BTreeMap::new(),
        }
    }
}

fn default_page_cap() -> usize {
    DEFAULT_PAGE_CAP
}
fn default_timeout() -> u64 {
    30
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

impl Config {
    /// Reject values the rest of the tool cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_cap == 0 {
            return Err(ConfigError::Validation {
                field: "page_cap".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        if let Some(endpoint) = &self.endpoint_url {
            url::Url::parse(endpoint).map_err(|e| ConfigError::Validation {
                field: "endpoint_url".into(),
                reason: format!("{e}: {endpoint}"),
            })?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Region and profile from the file, to be layered over the environment.
    pub fn context_defaults(&self) -> ContextDefaults {
        ContextDefaults {
            region: self.region.clone().filter(|r| !r.is_empty()),
            profile: self.profile.clone().filter(|p| !p.is_empty()),
        }
    }

    /// Persisted filter for `domain`, if one was saved.
    pub fn filter(&self, domain: &str) -> Option<StatusSet> {
        self.filters.get(domain).map(|states| status_set(states))
    }

    /// All persisted filters as status sets.
    pub fn filter_overrides(&self) -> impl Iterator<Item = (&str, StatusSet)> {
        self.filters
            .iter()
            .map(|(domain, states)| (domain.as_str(), status_set(states)))
    }

    pub fn set_filter(&mut self, domain: &str, allowed: &StatusSet) {
        self.filters
            .insert(domain.to_owned(), allowed.iter().cloned().collect());
    }

    /// Forget the persisted filter so the domain default applies again.
    pub fn clear_filter(&mut self, domain: &str) -> bool {
        self.filters.remove(domain).is_some()
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `EMRSCOPE_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "emrscope", "emrscope").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("emrscope");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file (missing files are fine) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("EMRSCOPE_").split("__").ignore(&["config"]));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if it is missing or unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.page_cap, DEFAULT_PAGE_CAP);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.output, "table");
        assert!(cfg.filters.is_empty());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
region = "eu-west-1"
profile = "analytics"
page_cap = 250

[filters]
emr-ec2 = ["running", "TERMINATED_WITH_ERRORS"]
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.page_cap, 250);
        assert_eq!(
            cfg.context_defaults(),
            ContextDefaults {
                region: Some("eu-west-1".into()),
                profile: Some("analytics".into()),
            }
        );
        assert_eq!(
            cfg.filter("emr-ec2"),
            Some(status_set(["RUNNING", "TERMINATED_WITH_ERRORS"]))
        );
        assert_eq!(cfg.filter("glue-catalog"), None);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config {
            region: Some("ap-south-1".into()),
            ..Config::default()
        };
        cfg.set_filter("emr-serverless", &status_set(["STARTED"]));
        save_config_to(&cfg, &path).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), cfg);
        assert!(cfg.clear_filter("emr-serverless"));
        assert!(!cfg.clear_filter("emr-serverless"));
    }

    #[test]
    fn zero_page_cap_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_cap = 0\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "page_cap"));
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        let cfg = Config {
            endpoint_url: Some("localhost without scheme".into()),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
