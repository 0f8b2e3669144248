//! Configuration module for deltacal
//!
//! This module handles:
//! - The active detection ranges the monitor classifies against
//! - Monitor polling and logging settings
//! - Calibration fallbacks for classes without measurements

mod project_config;

pub use project_config::{
    load_project_config, CalibrationConfig, MonitorConfig, ProjectConfig, RangesConfig,
    CONFIG_FILE_NAME, CONFIG_TEMPLATE,
};
