//! Sample collection from a directory of session logs

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::parser::{class_hint, parse_content, parse_file_stamp};
use super::SampleCorpus;
use crate::models::ObservationRecord;

/// Extension of session log files
pub const LOG_EXTENSION: &str = "log";

/// A file that was left out of the batch, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// List `*.log` files directly under `dir`, sorted by name so repeated
/// runs see the same order.
pub fn list_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION))
        .collect();
    files.sort();
    Ok(files)
}

/// Scan `dir` and partition every attributable measurement into the four
/// labeled sample sets.
///
/// Only a missing or unreadable directory is an error. Files without a class
/// hint are skipped silently; unreadable files are recorded in
/// `SampleCorpus::skipped` and the batch continues.
pub fn collect_samples(dir: &Path, show_progress: bool) -> Result<SampleCorpus> {
    let files = list_log_files(dir)?;
    let mut corpus = SampleCorpus::default();

    let progress = if show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/dim}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(pb)
    } else {
        None
    };

    for path in &files {
        if let Some(pb) = &progress {
            pb.inc(1);
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let Some(expected) = class_hint(&file_name) else {
            debug!("No class hint in {}, skipping", file_name);
            corpus.unattributed_files += 1;
            continue;
        };

        match read_records(path, &file_name, expected) {
            Ok(records) => {
                debug!("{}: {} measurements ({})", file_name, records.len(), expected);
                corpus.files_used += 1;
                for record in &records {
                    corpus.push(record);
                }
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                corpus.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    info!(
        "Collected {} samples from {} files ({} skipped, {} without class hint)",
        corpus.total(),
        corpus.files_used,
        corpus.skipped.len(),
        corpus.unattributed_files
    );

    Ok(corpus)
}

fn read_records(
    path: &Path,
    file_name: &str,
    expected: crate::models::CellType,
) -> Result<Vec<ObservationRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_content(&content, Some(expected), parse_file_stamp(file_name)))
}
