//! Project-level configuration support
//!
//! Loads `deltacal.toml` from the working directory, or from an explicit
//! `--config` path.
//!
//! # Configuration Format
//!
//! ```toml
//! [ranges]            # active ranges used by the monitor (inclusive mV)
//! aa = [-50, 50]
//! aaa = [280, 380]
//!
//! [monitor]
//! poll_interval_ms = 500
//! timeout_secs = 5
//! default_port = 8000
//! status_path = "/api/v2/charger/status"
//! logs_dir = "logs"
//! detail_every = 10
//!
//! [calibration]
//! logs_dir = "logs"
//! aaa_fallback = [250, 380]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::calibrate::FallbackRanges;
use crate::models::CellType;

/// Name of the config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "deltacal.toml";

/// Template written by `deltacal init`
pub const CONFIG_TEMPLATE: &str = r#"# deltacal configuration

[ranges]
# Active detection ranges (inclusive, mV) the monitor classifies against.
# Paste the output of `deltacal calibrate --format toml` here.
aa = [-50, 50]
aaa = [280, 380]

[monitor]
poll_interval_ms = 500
timeout_secs = 5
default_port = 8000
status_path = "/api/v2/charger/status"
logs_dir = "logs"
# Full slot dump every N readings
detail_every = 10

[calibration]
logs_dir = "logs"
# Used when a class has no measurements and too few misdetections
aaa_fallback = [250, 380]
# aa_fallback = [-50, 50]
"#;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub ranges: RangesConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,
}

/// Active inclusive ranges per class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangesConfig {
    #[serde(default = "default_aa_range")]
    pub aa: (i64, i64),

    #[serde(default = "default_aaa_range")]
    pub aaa: (i64, i64),
}

impl Default for RangesConfig {
    fn default() -> Self {
        Self {
            aa: default_aa_range(),
            aaa: default_aaa_range(),
        }
    }
}

impl RangesConfig {
    pub fn get(&self, class: CellType) -> (i64, i64) {
        match class {
            CellType::Aa => self.aa,
            CellType::Aaa => self.aaa,
        }
    }

    pub fn contains(&self, class: CellType, delta: i64) -> bool {
        let (min, max) = self.get(class);
        min <= delta && delta <= max
    }
}

fn default_aa_range() -> (i64, i64) {
    (-50, 50)
}

fn default_aaa_range() -> (i64, i64) {
    (280, 380)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_port")]
    pub default_port: u16,

    #[serde(default = "default_status_path")]
    pub status_path: String,

    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// Full slot dump every N readings; 0 disables the periodic dump
    #[serde(default = "default_detail_every")]
    pub detail_every: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
            default_port: default_port(),
            status_path: default_status_path(),
            logs_dir: default_logs_dir(),
            detail_every: default_detail_every(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_port() -> u16 {
    8000
}

fn default_status_path() -> String {
    "/api/v2/charger/status".to_string()
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_detail_every() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    #[serde(default)]
    pub aa_fallback: Option<(i64, i64)>,

    #[serde(default = "default_aaa_fallback")]
    pub aaa_fallback: Option<(i64, i64)>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
            aa_fallback: None,
            aaa_fallback: default_aaa_fallback(),
        }
    }
}

impl CalibrationConfig {
    pub fn fallback(&self) -> FallbackRanges {
        FallbackRanges {
            aa: self.aa_fallback,
            aaa: self.aaa_fallback,
        }
    }
}

fn default_aaa_fallback() -> Option<(i64, i64)> {
    Some((250, 380))
}

/// Load configuration.
///
/// An explicit path that cannot be loaded falls back to defaults with a
/// warning, the same as a malformed `deltacal.toml`. A missing file in the
/// working directory is not worth a warning.
pub fn load_project_config(explicit: Option<&Path>, cwd: &Path) -> ProjectConfig {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => cwd.join(CONFIG_FILE_NAME),
    };

    if !path.exists() {
        if explicit.is_some() {
            warn!("Config file {} not found, using defaults", path.display());
        } else {
            debug!("No {} found, using defaults", CONFIG_FILE_NAME);
        }
        return ProjectConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            debug!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            ProjectConfig::default()
        }
    }
}

/// Load configuration from a TOML file
fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}
