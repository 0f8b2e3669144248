//! Init command - write a deltacal.toml template

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::config::CONFIG_TEMPLATE;

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("✓").green(),
            style(path.display()).cyan()
        );
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} Created {}",
        style("✓").green(),
        style(path.display()).cyan()
    );
    println!("\nNext steps:");
    println!(
        "  {} Calibrate from your session logs",
        style("deltacal calibrate logs/").cyan()
    );
    println!(
        "  {} Paste the [ranges] block into {}",
        style("deltacal calibrate --format toml").cyan(),
        path.display()
    );

    Ok(())
}
