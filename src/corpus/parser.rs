//! Line-level parsing of session log files
//!
//! A measurement line looks like
//! `    ✅ SLOT  3: KLVR-AA  | AAA_ON= 952mV | AAA_OFF= 950mV | Δ=   2mV`.
//! Summary lines (`#  12 14:03:22 | ...`) carry the wall-clock time used to
//! timestamp the measurement lines that follow them.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

use crate::models::{CellType, ObservationRecord};

static MEASUREMENT: OnceLock<Regex> = OnceLock::new();
static SUMMARY_TIME: OnceLock<Regex> = OnceLock::new();
static FILE_STAMP: OnceLock<Regex> = OnceLock::new();

fn measurement_pattern() -> &'static Regex {
    MEASUREMENT.get_or_init(|| {
        Regex::new(
            r"(✅|🚨)\s+SLOT\s+(\d+):\s+(\S+)\s+\|\s+AAA_ON=\s*(-?\d+)mV\s+\|\s+AAA_OFF=\s*(-?\d+)mV\s+\|\s+Δ=\s*(-?\d+)mV",
        )
        .expect("measurement line pattern")
    })
}

fn summary_time_pattern() -> &'static Regex {
    SUMMARY_TIME.get_or_init(|| {
        Regex::new(r"^#\s*\d+\s+(\d{2}:\d{2}:\d{2})\s+\|").expect("summary line pattern")
    })
}

fn file_stamp_pattern() -> &'static Regex {
    FILE_STAMP.get_or_init(|| Regex::new(r"(\d{8})_(\d{6})").expect("file stamp pattern"))
}

/// Status marker at the start of a measurement line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Ok,
    Alert,
}

/// A measurement line broken into its fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementLine {
    pub status: LineStatus,
    pub slot: u32,
    pub detected: CellType,
    pub on_mv: i64,
    pub off_mv: i64,
    pub delta_mv: i64,
}

impl MeasurementLine {
    pub fn into_record(
        self,
        expected: Option<CellType>,
        timestamp: Option<NaiveDateTime>,
    ) -> ObservationRecord {
        ObservationRecord {
            expected,
            observed: self.detected,
            on_mv: self.on_mv,
            off_mv: self.off_mv,
            delta_mv: self.delta_mv,
            slot: self.slot,
            timestamp,
        }
    }
}

/// Parse one measurement line. Anything that does not have the full shape,
/// or whose type token names neither class, yields `None`.
pub fn parse_measurement(line: &str) -> Option<MeasurementLine> {
    let caps = measurement_pattern().captures(line)?;
    let status = match &caps[1] {
        "✅" => LineStatus::Ok,
        _ => LineStatus::Alert,
    };
    Some(MeasurementLine {
        status,
        slot: caps[2].parse().ok()?,
        detected: CellType::resolve(&caps[3])?,
        on_mv: caps[4].parse().ok()?,
        off_mv: caps[5].parse().ok()?,
        delta_mv: caps[6].parse().ok()?,
    })
}

/// Time of day from a per-reading summary line
pub fn parse_summary_time(line: &str) -> Option<NaiveTime> {
    let caps = summary_time_pattern().captures(line.trim_start())?;
    NaiveTime::parse_from_str(&caps[1], "%H:%M:%S").ok()
}

/// Session start encoded in a log filename (`..._20250114_093012.log`)
pub fn parse_file_stamp(file_name: &str) -> Option<NaiveDateTime> {
    let caps = file_stamp_pattern().captures(file_name)?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y%m%d").ok()?;
    let time = NaiveTime::parse_from_str(&caps[2], "%H%M%S").ok()?;
    Some(date.and_time(time))
}

/// Ground-truth class carried by a log filename.
///
/// `aaa_` is checked first since every `aaa_` name also contains `aa_`.
pub fn class_hint(file_name: &str) -> Option<CellType> {
    let lower = file_name.to_lowercase();
    if lower.contains("aaa_") {
        Some(CellType::Aaa)
    } else if lower.contains("aa_") {
        Some(CellType::Aa)
    } else {
        None
    }
}

/// Parse every measurement line of one file's content.
///
/// Timestamps combine the session date from the filename with the most recent
/// summary-line time; a reading that crosses midnight rolls the date forward.
pub fn parse_content(
    content: &str,
    expected: Option<CellType>,
    session_start: Option<NaiveDateTime>,
) -> Vec<ObservationRecord> {
    let mut records = Vec::new();
    let mut current_date = session_start.map(|s| s.date());
    let mut last_time: Option<NaiveTime> = None;

    for line in content.lines() {
        if let Some(time) = parse_summary_time(line) {
            if let (Some(prev), Some(date)) = (last_time, current_date) {
                if time < prev {
                    current_date = date.succ_opt();
                }
            }
            last_time = Some(time);
            continue;
        }

        if let Some(m) = parse_measurement(line) {
            let timestamp = match (current_date, last_time) {
                (Some(date), Some(time)) => Some(date.and_time(time)),
                _ => session_start,
            };
            records.push(m.into_record(expected, timestamp));
        }
    }

    records
}
