//! Calibrate command - derive ranges from historical session logs

use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};

use crate::calibrate::Calibrator;
use crate::config::ProjectConfig;
use crate::corpus::collect_samples;
use crate::reporters::{file_extension, report_with_format, OutputFormat};

pub fn run(
    dir: &Path,
    config: &ProjectConfig,
    format: OutputFormat,
    output: Option<&Path>,
    top: usize,
) -> Result<()> {
    let show_progress = console::Term::stderr().is_term();
    let corpus = collect_samples(dir, show_progress)?;

    eprintln!(
        "{} {} samples from {} files in {}",
        style("📂").bold(),
        corpus.total(),
        corpus.files_used,
        style(dir.display()).cyan()
    );
    if corpus.unattributed_files > 0 {
        eprintln!(
            "   {} files without an aa_/aaa_ hint were ignored",
            corpus.unattributed_files
        );
    }
    for skipped in &corpus.skipped {
        eprintln!(
            "   {} skipped {}: {}",
            style("⚠").yellow(),
            skipped.path.display(),
            skipped.reason
        );
    }

    let calibration = Calibrator::new(config.calibration.fallback())
        .with_top(top)
        .calibrate(&corpus)
        .with_context(|| format!("Calibration over {} failed", dir.display()))?;

    match output {
        Some(path) => {
            let path = resolve_output(path, format);
            if format == OutputFormat::Json {
                calibration.result.save(&path)?;
            } else {
                console::set_colors_enabled(false);
                let rendered = report_with_format(&calibration, format)?;
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, rendered)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            eprintln!(
                "{} Wrote {} report to {}",
                style("✓").green(),
                format,
                style(path.display()).cyan()
            );
        }
        None => {
            let rendered = report_with_format(&calibration, format)?;
            print!("{}", rendered);
        }
    }

    Ok(())
}

/// An existing directory gets `calibration.<ext>` inside it
fn resolve_output(path: &Path, format: OutputFormat) -> PathBuf {
    if path.is_dir() {
        path.join(format!("calibration.{}", file_extension(format)))
    } else {
        path.to_path_buf()
    }
}
