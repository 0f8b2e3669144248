//! Monitor command - live detection monitoring against a charger

use anyhow::{Context, Result};
use chrono::Local;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::config::ProjectConfig;
use crate::models::TestMode;
use crate::monitor::{
    build_base_url, open_log_file, HttpStatusSource, RunSession, StatusSource, DEFAULT_TARGET,
};

pub fn run(target: Option<&str>, mode: Option<TestMode>, config: &ProjectConfig) -> Result<()> {
    let base_url = build_base_url(target.unwrap_or(DEFAULT_TARGET), config.monitor.default_port);

    let mode = match mode {
        Some(m) => m,
        None => {
            let stdin = io::stdin();
            match prompt_mode(stdin.lock(), io::stdout())? {
                Some(m) => m,
                None => {
                    println!("\n👋 Cancelled");
                    return Ok(());
                }
            }
        }
    };

    let started = Local::now().naive_local();
    let (log_path, log_file) = open_log_file(&config.monitor.logs_dir, mode, &started)
        .with_context(|| {
            format!(
                "Failed to create session log in {}",
                config.monitor.logs_dir.display()
            )
        })?;

    let source: Arc<dyn StatusSource> = Arc::new(HttpStatusSource::new(
        base_url.clone(),
        &config.monitor.status_path,
        config.monitor.timeout(),
    ));
    let session = RunSession::new(
        base_url,
        mode,
        config.ranges,
        config.monitor.detail_every,
        log_file,
        io::stdout(),
    )
    .with_log_path(log_path);

    crate::monitor::run(source, session, config.monitor.poll_interval())?;
    Ok(())
}

/// Ask for a test mode until a valid choice is entered.
///
/// Returns `None` when input ends before a choice is made.
pub fn prompt_mode<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<Option<TestMode>> {
    writeln!(output, "🔋 Charger - Battery Detection Monitor")?;
    writeln!(output, "{}", "=".repeat(50))?;
    writeln!(output, "Select test mode:")?;
    writeln!(output, "  1. AA  - Test AA batteries (detect misdetections as AAA)")?;
    writeln!(output, "  2. AAA - Test AAA batteries (detect detection failures)")?;
    writeln!(output, "  3. BOTH - Monitor both types")?;
    writeln!(output)?;

    let mut line = String::new();
    loop {
        write!(output, "Enter choice (1/2/3): ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let choice = line.trim();
        let mode = match choice {
            "1" => Some(TestMode::Aa),
            "2" => Some(TestMode::Aaa),
            "3" => Some(TestMode::Both),
            other => other.parse().ok(),
        };
        match mode {
            Some(m) => return Ok(Some(m)),
            None => writeln!(output, "❌ Invalid choice. Please enter 1, 2, or 3.")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_retries_until_valid() {
        let input = io::Cursor::new("9\nfoo\n2\n");
        let mut out = Vec::new();
        let mode = prompt_mode(input, &mut out).unwrap();
        assert_eq!(mode, Some(TestMode::Aaa));
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("Invalid choice").count(), 2);
    }

    #[test]
    fn test_prompt_accepts_mode_names() {
        let mode = prompt_mode(io::Cursor::new("Both\n"), io::sink()).unwrap();
        assert_eq!(mode, Some(TestMode::Both));
    }

    #[test]
    fn test_prompt_eof_cancels() {
        assert_eq!(prompt_mode(io::Cursor::new(""), io::sink()).unwrap(), None);
    }
}
