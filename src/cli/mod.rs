//! CLI command definitions and handlers

mod calibrate;
mod init;
mod monitor;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::load_project_config;
use crate::models::TestMode;
use crate::reporters::OutputFormat;

/// Parse a test mode token (aa, aaa, both; any case)
fn parse_mode(s: &str) -> Result<TestMode, String> {
    s.parse()
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

/// deltacal - Dual-range voltage-delta calibration for AA/AAA detection
#[derive(Parser, Debug)]
#[command(name = "deltacal")]
#[command(
    version,
    about = "Calibrate AA/AAA detection ranges from session logs and monitor a charger live",
    after_help = "\
Examples:
  deltacal calibrate logs/                     Full report over a log directory
  deltacal calibrate --format header           #define constants only
  deltacal calibrate --format toml -o r.toml   [ranges] block for deltacal.toml
  deltacal monitor 10.110.73.155 aa            Watch for AA cells detected as AAA
  deltacal monitor https://host.example aaa    Tunnelled endpoint, AAA test
  deltacal init                                Write a deltacal.toml template"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Config file (default: ./deltacal.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive AA/AAA delta ranges from a directory of session logs
    Calibrate {
        /// Log directory (default: [calibration] logs_dir)
        dir: Option<PathBuf>,

        /// Output format: text, json, header, toml
        #[arg(long, short = 'f', default_value = "text", value_parser = parse_format)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Rows in the most-common delta tables
        #[arg(long, default_value_t = crate::calibrate::DEFAULT_TOP)]
        top: usize,
    },

    /// Poll a charger and flag detections that disagree with the test mode
    Monitor {
        /// Charger IP/host or full http(s) URL
        target: Option<String>,

        /// Test mode: aa, aaa or both (prompted when omitted)
        #[arg(value_parser = parse_mode)]
        mode: Option<TestMode>,
    },

    /// Write a deltacal.toml template
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show version
    Version,
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = load_project_config(cli.config.as_deref(), &cwd);

    match cli.command {
        Commands::Calibrate {
            dir,
            format,
            output,
            top,
        } => {
            let dir = dir.unwrap_or_else(|| config.calibration.logs_dir.clone());
            calibrate::run(&dir, &config, format, output.as_deref(), top)
        }

        Commands::Monitor { target, mode } => monitor::run(target.as_deref(), mode, &config),

        Commands::Init { force } => {
            let path = cli
                .config
                .unwrap_or_else(|| cwd.join(crate::config::CONFIG_FILE_NAME));
            init::run(&path, force)
        }

        Commands::Version => {
            println!("deltacal {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
