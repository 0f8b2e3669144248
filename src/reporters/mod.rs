//! Output reporters for calibration results
//!
//! Supports multiple output formats:
//! - `text` - Full terminal report with every analysis section
//! - `json` - The persisted `CalibrationResult`
//! - `header` - C `#define` constants for the firmware
//! - `toml` - A `[ranges]` block the monitor config can take verbatim

mod header;
mod json;
mod text;
mod toml_block;

use crate::calibrate::Calibration;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Header,
    Toml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "header" | "h" | "c" => Ok(OutputFormat::Header),
            "toml" => Ok(OutputFormat::Toml),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: text, json, header, toml",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Header => write!(f, "header"),
            OutputFormat::Toml => write!(f, "toml"),
        }
    }
}

/// Render a calibration using an OutputFormat enum
pub fn report_with_format(calibration: &Calibration, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(calibration),
        OutputFormat::Json => json::render(&calibration.result),
        OutputFormat::Header => header::render(&calibration.result),
        OutputFormat::Toml => toml_block::render(&calibration.result),
    }
}

/// Get the recommended file extension for a format
pub fn file_extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
        OutputFormat::Header => "h",
        OutputFormat::Toml => "toml",
    }
}
