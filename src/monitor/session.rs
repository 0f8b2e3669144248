//! Run state for one monitoring session

use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::RangesConfig;
use crate::models::TestMode;

use super::analysis::{classify, CycleAnalysis};
use super::format;
use super::status::{FetchError, StatusSnapshot};

/// Where the loop is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No successful fetch yet, or the last one failed
    Connecting,
    Classifying,
    /// The last cycle raised an alert
    Alerting,
}

/// What one cycle produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub reading: u64,
    pub state: MonitorState,
    /// `None` when the fetch failed
    pub analysis: Option<CycleAnalysis>,
    pub lines: Vec<String>,
}

/// Totals reported when the session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub readings: u64,
    pub misdetections: u64,
    pub borderline: u64,
    pub connection_failures: u64,
    /// Longest run of consecutive alerting cycles
    pub longest_alert_streak: u64,
    pub log_path: Option<PathBuf>,
}

impl SessionSummary {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            String::new(),
            "👋 Monitoring stopped".to_string(),
            format!("Total readings: {}", self.readings),
            format!("Misdetections: {}", self.misdetections),
            format!("Borderline readings: {}", self.borderline),
            format!("Connection failures: {}", self.connection_failures),
        ];
        if self.longest_alert_streak > 1 {
            lines.push(format!(
                "Longest alert streak: {} consecutive readings",
                self.longest_alert_streak
            ));
        }
        if let Some(path) = &self.log_path {
            lines.push(format!("Log saved to: {}", path.display()));
        }
        lines
    }
}

/// `logs/detection_monitor_{mode}_{YYYYmmdd_HHMMSS}.log`
pub fn log_file_name(mode: TestMode, started: &NaiveDateTime) -> String {
    format!(
        "detection_monitor_{}_{}.log",
        mode.token(),
        started.format("%Y%m%d_%H%M%S")
    )
}

/// Create the logs directory if needed and open a fresh session log
pub fn open_log_file(
    logs_dir: &Path,
    mode: TestMode,
    started: &NaiveDateTime,
) -> io::Result<(PathBuf, File)> {
    std::fs::create_dir_all(logs_dir)?;
    let path = logs_dir.join(log_file_name(mode, started));
    let file = File::create(&path)?;
    info!("Writing session log to {}", path.display());
    Ok((path, file))
}

/// Monitoring session: counters, state and the two output sinks.
///
/// Every line goes to both sinks and is flushed before the cycle returns.
pub struct RunSession<L: Write, C: Write> {
    endpoint: String,
    mode: TestMode,
    ranges: RangesConfig,
    detail_every: u64,
    log: L,
    console: C,
    log_path: Option<PathBuf>,
    reading: u64,
    last_total: Option<usize>,
    misdetections: u64,
    borderline: u64,
    connection_failures: u64,
    consecutive_alerts: u64,
    longest_alert_streak: u64,
    state: MonitorState,
}

impl<L: Write, C: Write> RunSession<L, C> {
    pub fn new(
        endpoint: impl Into<String>,
        mode: TestMode,
        ranges: RangesConfig,
        detail_every: u64,
        log: L,
        console: C,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode,
            ranges,
            detail_every,
            log,
            console,
            log_path: None,
            reading: 0,
            last_total: None,
            misdetections: 0,
            borderline: 0,
            connection_failures: 0,
            consecutive_alerts: 0,
            longest_alert_streak: 0,
            state: MonitorState::Connecting,
        }
    }

    pub fn with_log_path(mut self, path: PathBuf) -> Self {
        self.log_path = Some(path);
        self
    }

    pub fn mode(&self) -> TestMode {
        self.mode
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn readings(&self) -> u64 {
        self.reading
    }

    pub fn misdetections(&self) -> u64 {
        self.misdetections
    }

    pub fn consecutive_alerts(&self) -> u64 {
        self.consecutive_alerts
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Console banner followed by the log header
    pub fn start(&mut self, started: &NaiveDateTime) -> io::Result<()> {
        let log_path = self.log_path.as_ref().map(|p| p.display().to_string());
        for line in format::console_banner(&self.endpoint, self.mode, log_path.as_deref()) {
            writeln!(self.console, "{}", line)?;
        }
        for line in format::log_header(started, &self.endpoint, self.mode, &self.ranges) {
            writeln!(self.log, "{}", line)?;
        }
        self.console.flush()?;
        self.log.flush()
    }

    /// Process one fetch result and write its lines to both sinks
    pub fn record_cycle(
        &mut self,
        fetched: Result<StatusSnapshot, FetchError>,
        now: &NaiveDateTime,
    ) -> io::Result<CycleOutcome> {
        self.reading += 1;
        let reading = self.reading;

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Reading {}: {}", reading, e);
                self.connection_failures += 1;
                self.consecutive_alerts = 0;
                self.last_total = None;
                self.state = MonitorState::Connecting;
                let lines = vec![format::connection_failed(reading, now)];
                self.emit(&lines)?;
                return Ok(CycleOutcome {
                    reading,
                    state: self.state,
                    analysis: None,
                    lines,
                });
            }
        };

        let analysis = classify(&snapshot, self.mode, &self.ranges);
        let lines = self.render(reading, now, &analysis);

        let misdetections = analysis.misdetection_count();
        self.misdetections += misdetections as u64;
        self.borderline += analysis.borderline_count() as u64;
        if analysis.is_alert() {
            self.consecutive_alerts += 1;
            self.longest_alert_streak = self.longest_alert_streak.max(self.consecutive_alerts);
            self.state = MonitorState::Alerting;
        } else {
            self.consecutive_alerts = 0;
            self.state = MonitorState::Classifying;
        }
        self.last_total = Some(analysis.total);

        debug!(
            "Reading {}: {} occupied, {} misdetections, state {:?}",
            reading, analysis.total, misdetections, self.state
        );
        self.emit(&lines)?;

        Ok(CycleOutcome {
            reading,
            state: self.state,
            analysis: Some(analysis),
            lines,
        })
    }

    fn render(&self, reading: u64, now: &NaiveDateTime, analysis: &CycleAnalysis) -> Vec<String> {
        let mut lines = vec![format::summary_line(reading, now, analysis)];

        let periodic = reading == 1
            || (self.detail_every > 0 && reading % self.detail_every == 1)
            || (self.detail_every == 1);
        if periodic || analysis.is_alert() || analysis.misdetection_count() > 0 {
            lines.extend(
                analysis
                    .slots
                    .iter()
                    .filter_map(|slot| format::slot_line(self.mode, slot)),
            );
        }

        let misdetections = analysis.misdetection_count();
        if misdetections > 0 {
            lines.push(format::alert_banner(self.mode, misdetections));
            lines.extend(analysis.misdetections().map(format::details_line));
        }

        let borderline = analysis.borderline_count();
        if borderline > 0 && analysis.is_alert() {
            lines.push(format::borderline_banner(borderline, &self.ranges));
            lines.extend(analysis.borderline().map(format::details_line));
        }

        if let Some(previous) = self.last_total {
            if previous != analysis.total {
                lines.push(format::count_change(previous, analysis.total));
            }
        }

        lines
    }

    fn emit(&mut self, lines: &[String]) -> io::Result<()> {
        for line in lines {
            writeln!(self.console, "{}", line)?;
            writeln!(self.log, "{}", line)?;
        }
        self.console.flush()?;
        self.log.flush()
    }

    /// Write the end-of-run summary, flush both sinks and release them
    pub fn finish(mut self) -> io::Result<(SessionSummary, L, C)> {
        let summary = SessionSummary {
            readings: self.reading,
            misdetections: self.misdetections,
            borderline: self.borderline,
            connection_failures: self.connection_failures,
            longest_alert_streak: self.longest_alert_streak,
            log_path: self.log_path.clone(),
        };
        self.emit(&summary.lines())?;
        info!(
            "Session ended after {} readings ({} misdetections)",
            summary.readings, summary.misdetections
        );
        Ok((summary, self.log, self.console))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::status::{BatteryStatus, DetectionDebug};

    fn at(s: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 1, 14)
            .unwrap()
            .and_hms_opt(10, 0, s)
            .unwrap()
    }

    fn battery(detected: &str, delta: i64) -> BatteryStatus {
        BatteryStatus {
            slot_state: "charging".into(),
            battery_detected: detected.into(),
            debug: Some(DetectionDebug {
                on_mv: 950 + delta,
                off_mv: 950,
                delta_mv: delta,
                ..Default::default()
            }),
        }
    }

    fn session(mode: TestMode) -> RunSession<Vec<u8>, Vec<u8>> {
        RunSession::new("http://test:8000", mode, RangesConfig::default(), 10, Vec::new(), Vec::new())
    }

    #[test]
    fn test_misdetection_enters_alerting_and_logs_details() {
        let mut s = session(TestMode::Aa);
        let snapshot = StatusSnapshot {
            batteries: vec![battery("KLVR-AA", 2), battery("KLVR-AAA", 300)],
        };
        let outcome = s.record_cycle(Ok(snapshot), &at(0)).unwrap();
        assert_eq!(outcome.state, MonitorState::Alerting);
        assert_eq!(outcome.analysis.as_ref().unwrap().misdetection_count(), 1);
        assert_eq!(s.misdetections(), 1);
        assert_eq!(s.consecutive_alerts(), 1);

        let (summary, log, console) = s.finish().unwrap();
        let log = String::from_utf8(log).unwrap();
        assert!(log.contains("[AA TEST] Total:  2 | Correct AA:  1 | Misdetected as AAA:  1"));
        assert!(log.contains("🚨 SLOT  1: KLVR-AAA | AAA_ON=1250mV | AAA_OFF= 950mV | Δ= 300mV"));
        assert!(log.contains("🔬 SLOT 1 DETAILS"));
        assert_eq!(log, String::from_utf8(console).unwrap());
        assert_eq!(summary.readings, 1);
        assert_eq!(summary.misdetections, 1);
    }

    #[test]
    fn test_connection_failure_then_recovery() {
        let mut s = session(TestMode::Aa);
        let failed = s
            .record_cycle(Err(FetchError::Transport("timed out".into())), &at(0))
            .unwrap();
        assert_eq!(failed.state, MonitorState::Connecting);
        assert!(failed.lines[0].ends_with("❌ Connection failed"));

        let ok = s
            .record_cycle(Ok(StatusSnapshot { batteries: vec![battery("KLVR-AA", 1)] }), &at(1))
            .unwrap();
        assert_eq!(ok.reading, 2);
        assert_eq!(ok.state, MonitorState::Classifying);

        let (summary, _, _) = s.finish().unwrap();
        assert_eq!(summary.connection_failures, 1);
        assert_eq!(summary.readings, 2);
    }

    #[test]
    fn test_slot_dump_cadence_and_count_changes() {
        let mut s = session(TestMode::Both);
        let one = StatusSnapshot { batteries: vec![battery("KLVR-AA", 1)] };
        let two = StatusSnapshot {
            batteries: vec![battery("KLVR-AA", 1), battery("KLVR-AAA", 310)],
        };

        let first = s.record_cycle(Ok(one.clone()), &at(0)).unwrap();
        assert_eq!(first.lines.len(), 2);

        let second = s.record_cycle(Ok(two), &at(1)).unwrap();
        // summary + count change, no dump on reading 2
        assert_eq!(second.lines.len(), 2);
        assert_eq!(second.lines[1], "    📥 BATTERY COUNT: 1 → 2");

        for i in 3..=10 {
            s.record_cycle(Ok(one.clone()), &at(i)).unwrap();
        }
        let eleventh = s.record_cycle(Ok(one), &at(11)).unwrap();
        assert_eq!(eleventh.reading, 11);
        assert!(eleventh.lines.iter().any(|l| l.contains("📊 SLOT")));
    }

    #[test]
    fn test_failed_cycle_breaks_count_comparison() {
        let mut s = session(TestMode::Both);
        let one = StatusSnapshot { batteries: vec![battery("KLVR-AA", 1)] };
        let two = StatusSnapshot {
            batteries: vec![battery("KLVR-AA", 1), battery("KLVR-AAA", 310)],
        };
        s.record_cycle(Ok(one), &at(0)).unwrap();
        s.record_cycle(Err(FetchError::Transport("timed out".into())), &at(1))
            .unwrap();
        let third = s.record_cycle(Ok(two), &at(2)).unwrap();
        assert!(third.lines.iter().all(|l| !l.contains("BATTERY COUNT")));

        // comparison resumes against the cycle just before
        let fourth = s
            .record_cycle(Ok(StatusSnapshot { batteries: vec![] }), &at(3))
            .unwrap();
        assert!(fourth.lines.contains(&"    📥 BATTERY COUNT: 2 → 0".to_string()));
    }

    #[test]
    fn test_consecutive_alerts_reset_on_clean_cycle() {
        let mut s = session(TestMode::Aaa);
        let bad = StatusSnapshot { batteries: vec![battery("KLVR-AA", 5)] };
        let good = StatusSnapshot { batteries: vec![battery("KLVR-AAA", 300)] };
        s.record_cycle(Ok(bad.clone()), &at(0)).unwrap();
        s.record_cycle(Ok(bad), &at(1)).unwrap();
        assert_eq!(s.consecutive_alerts(), 2);
        s.record_cycle(Ok(good), &at(2)).unwrap();
        assert_eq!(s.consecutive_alerts(), 0);
        assert_eq!(s.state(), MonitorState::Classifying);
        let (summary, _, _) = s.finish().unwrap();
        assert_eq!(summary.longest_alert_streak, 2);
        assert_eq!(summary.misdetections, 2);
    }

    #[test]
    fn test_log_file_name() {
        let name = log_file_name(TestMode::Aaa, &at(5));
        assert_eq!(name, "detection_monitor_aaa_20250114_100005.log");
        assert_eq!(crate::corpus::class_hint(&name), Some(crate::models::CellType::Aaa));
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("nested").join("logs");
        let (path, _file) = open_log_file(&logs, TestMode::Aa, &at(0)).unwrap();
        assert!(path.exists());
        assert!(path.starts_with(&logs));
    }
}
