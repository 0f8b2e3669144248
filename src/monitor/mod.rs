//! Live detection monitor
//!
//! Polls the charger status endpoint at a fixed cadence, classifies every
//! occupied slot against the active ranges and the run's test mode, and
//! writes each reading to the terminal and to an append-only session log.
//!
//! One cycle at a time: fetch (bounded by the HTTP timeout), classify,
//! write and flush, sleep. Ctrl+C interrupts either the fetch or the sleep.

mod analysis;
pub mod format;
mod session;
mod status;

pub use analysis::{classify, CycleAnalysis, RangeVerdict, SlotReading};
pub use session::{
    log_file_name, open_log_file, CycleOutcome, MonitorState, RunSession, SessionSummary,
};
pub use status::{
    build_base_url, BatteryStatus, DetectionDebug, FetchError, FetchResult, HttpStatusSource,
    StatusSnapshot, StatusSource, DEFAULT_TARGET,
};

use chrono::Local;
use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Drive `session` until `shutdown` resolves or `limit` readings are taken.
///
/// A fetch still in flight when `shutdown` fires is abandoned.
pub async fn poll_loop<L, C, S>(
    source: Arc<dyn StatusSource>,
    session: &mut RunSession<L, C>,
    interval: Duration,
    shutdown: S,
    limit: Option<u64>,
) -> io::Result<()>
where
    L: Write,
    C: Write,
    S: Future,
{
    tokio::pin!(shutdown);

    loop {
        if limit.is_some_and(|n| session.readings() >= n) {
            break;
        }

        let src = Arc::clone(&source);
        let fetch = tokio::task::spawn_blocking(move || src.fetch());
        let fetched = tokio::select! {
            _ = &mut shutdown => {
                debug!("Interrupted during fetch");
                break;
            }
            joined = fetch => joined.unwrap_or_else(|e| Err(FetchError::Transport(e.to_string()))),
        };

        session.record_cycle(fetched, &Local::now().naive_local())?;

        if limit.is_some_and(|n| session.readings() >= n) {
            break;
        }

        tokio::select! {
            _ = &mut shutdown => {
                debug!("Interrupted during sleep");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    Ok(())
}

/// Resolve when `signal` fires. A signal that cannot be registered never
/// resolves, so the loop keeps running instead of stopping at once.
pub async fn interrupted<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Cannot listen for Ctrl+C ({}); stop the process another way", e);
        std::future::pending::<()>().await;
    }
}

/// Run a session until Ctrl+C, then tear it down and return its summary.
pub fn run<L: Write, C: Write>(
    source: Arc<dyn StatusSource>,
    mut session: RunSession<L, C>,
    interval: Duration,
) -> anyhow::Result<SessionSummary> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    session.start(&Local::now().naive_local())?;
    let looped = rt.block_on(poll_loop(
        source,
        &mut session,
        interval,
        interrupted(tokio::signal::ctrl_c()),
        None,
    ));
    rt.shutdown_timeout(Duration::from_millis(200));

    // Tear down even when a write failed mid-loop
    let (summary, _, _) = session.finish()?;
    looped?;
    Ok(summary)
}
