//! Monitor output lines
//!
//! Slot lines use the same layout the corpus parser reads, so a monitor log
//! can be fed straight back into `deltacal calibrate`.

use chrono::NaiveDateTime;

use crate::config::RangesConfig;
use crate::models::{CellType, TestMode};

use super::analysis::{CycleAnalysis, SlotReading};

pub const RULE_WIDTH: usize = 60;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn clock(now: &NaiveDateTime) -> String {
    now.format("%H:%M:%S").to_string()
}

/// Header written at the top of every log file
pub fn log_header(
    started: &NaiveDateTime,
    endpoint: &str,
    mode: TestMode,
    ranges: &RangesConfig,
) -> Vec<String> {
    vec![
        format!(
            "Charger Detection Monitor - Started {}",
            started.format("%Y-%m-%d %H:%M:%S")
        ),
        format!("Monitoring: {}", endpoint),
        format!("Test mode: {}", mode.token().to_uppercase()),
        format!(
            "Active ranges: AA {}..{} mV | AAA {}..{} mV",
            ranges.aa.0, ranges.aa.1, ranges.aaa.0, ranges.aaa.1
        ),
        rule(),
        String::new(),
    ]
}

/// Console banner shown before the first reading
pub fn console_banner(endpoint: &str, mode: TestMode, log_path: Option<&str>) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        rule(),
        "🔋 Charger Detection Monitor".to_string(),
        rule(),
        format!("📍 Endpoint: {}", endpoint),
        format!("🎯 Test Mode: {}", mode.token().to_uppercase()),
    ];
    match mode {
        TestMode::Aa => {
            lines.push("   → Testing AA batteries - Will highlight any misdetections as AAA".into());
            lines.push("   → Insert ONLY AA batteries for clean test data".into());
        }
        TestMode::Aaa => {
            lines.push("   → Testing AAA batteries - Will highlight any detection failures".into());
            lines.push("   → Insert ONLY AAA batteries for clean test data".into());
        }
        TestMode::Both => {
            lines.push("   → Monitoring both types - General detection monitoring".into());
        }
    }
    if let Some(path) = log_path {
        lines.push(format!("📝 Log file: {}", path));
    }
    lines.push("⚡ Press Ctrl+C to stop monitoring".into());
    lines.push(rule());
    lines.push(String::new());
    lines
}

pub fn connection_failed(reading: u64, now: &NaiveDateTime) -> String {
    format!("#{:3} {} | ❌ Connection failed", reading, clock(now))
}

/// One summary line per reading
pub fn summary_line(reading: u64, now: &NaiveDateTime, analysis: &CycleAnalysis) -> String {
    let prefix = format!("#{:3} {}", reading, clock(now));
    let retries = format!(" | Retries: {}", analysis.retried());
    let misdetections = analysis.misdetection_count();
    let borderline = analysis.borderline_count();

    match analysis.mode {
        TestMode::Aa => {
            let status = if misdetections > 0 {
                "🚨 MISDETECTION!"
            } else if borderline > 0 {
                "⚠️  BORDERLINE"
            } else {
                "✅ All correct"
            };
            format!(
                "{} | [AA TEST] Total: {:2} | Correct AA: {:2} | Misdetected as AAA: {:2}{} | {}",
                prefix, analysis.total, analysis.correct, misdetections, retries, status
            )
        }
        TestMode::Aaa => {
            let status = if misdetections > 0 {
                "🚨 DETECTION FAILED!"
            } else if borderline > 0 {
                "⚠️  BORDERLINE"
            } else {
                "✅ All detected"
            };
            format!(
                "{} | [AAA TEST] Total: {:2} | Detected AAA: {:2} | Failed to detect: {:2}{} | {}",
                prefix, analysis.total, analysis.correct, misdetections, retries, status
            )
        }
        TestMode::Both => format!(
            "{} | [BOTH] Total: {:2} | AA: {:2} | AAA: {:2}{}",
            prefix, analysis.total, analysis.aa_count, analysis.aaa_count, retries
        ),
    }
}

fn debug_suffix(slot: &SlotReading) -> String {
    let mut suffix = String::new();
    if let Some(debug) = slot.debug {
        if debug.retry_count > 0 {
            suffix.push_str(&format!(" | Retries={}", debug.retry_count));
        }
        if debug.median_cycle_selected > 0 {
            suffix.push_str(&format!(" | Cycle={}", debug.median_cycle_selected));
        }
    }
    suffix
}

/// Voltage line for one slot; `None` when the firmware sent no debug block
pub fn slot_line(mode: TestMode, slot: &SlotReading) -> Option<String> {
    let debug = slot.debug?;
    let indicator = match mode {
        TestMode::Aa if slot.class == Some(CellType::Aaa) => "🚨",
        TestMode::Aa => "✅",
        TestMode::Aaa if slot.class == Some(CellType::Aaa) => "✅",
        TestMode::Aaa => "🚨",
        TestMode::Both => "📊",
    };
    let mut line = format!(
        "    {} SLOT {:2}: {:8} | AAA_ON={:4}mV | AAA_OFF={:4}mV | Δ={:4}mV{}",
        indicator,
        slot.slot,
        slot.detected,
        debug.on_mv,
        debug.off_mv,
        debug.delta_mv,
        debug_suffix(slot)
    );
    if let Some(verdict) = slot.verdict.filter(|v| v.is_borderline()) {
        line.push_str(&format!(" | ⚠️  {}", verdict.describe()));
    }
    Some(line)
}

pub fn alert_banner(mode: TestMode, count: usize) -> String {
    match mode {
        TestMode::Aa => format!(
            "    🚨🚨 AA MISDETECTION ALERT! {} AA batteries detected as AAA!",
            count
        ),
        TestMode::Aaa => format!(
            "    🚨🚨 AAA DETECTION FAILURE! {} AAA batteries not detected!",
            count
        ),
        TestMode::Both => format!("    🚨🚨 DETECTION ISSUE! {} problematic detections!", count),
    }
}

pub fn borderline_banner(count: usize, ranges: &RangesConfig) -> String {
    format!(
        "    ⚠️  BORDERLINE! {} readings not cleanly inside one range (AA {}..{} mV, AAA {}..{} mV)",
        count, ranges.aa.0, ranges.aa.1, ranges.aaa.0, ranges.aaa.1
    )
}

pub fn details_line(slot: &SlotReading) -> String {
    match slot.debug {
        Some(debug) => format!(
            "    🔬 SLOT {} DETAILS: Detected={} | AAA_ON={}mV | AAA_OFF={}mV | Δ={}mV{}",
            slot.slot,
            slot.detected,
            debug.on_mv,
            debug.off_mv,
            debug.delta_mv,
            debug_suffix(slot)
        ),
        None => format!(
            "    🔬 SLOT {} DETAILS: Detected={} | no debug data",
            slot.slot, slot.detected
        ),
    }
}

pub fn count_change(previous: usize, current: usize) -> String {
    format!("    📥 BATTERY COUNT: {} → {}", previous, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::parse_measurement;
    use crate::monitor::status::DetectionDebug;

    fn slot(detected: &str, class: Option<CellType>, delta: i64, retries: u32) -> SlotReading {
        SlotReading {
            slot: 3,
            detected: detected.into(),
            class,
            debug: Some(DetectionDebug {
                on_mv: 950 + delta,
                off_mv: 950,
                delta_mv: delta,
                retry_count: retries,
                ..Default::default()
            }),
            verdict: None,
            misdetected: false,
            borderline: false,
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 1, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_slot_line_round_trips_through_corpus_parser() {
        let reading = slot("KLVR-AA", Some(CellType::Aa), -7, 2);
        let line = slot_line(TestMode::Aa, &reading).unwrap();
        assert_eq!(
            line,
            "    ✅ SLOT  3: KLVR-AA  | AAA_ON= 943mV | AAA_OFF= 950mV | Δ=  -7mV | Retries=2"
        );
        let parsed = parse_measurement(&line).unwrap();
        assert_eq!(parsed.delta_mv, -7);
        assert_eq!(parsed.detected, CellType::Aa);
    }

    #[test]
    fn test_both_mode_slot_lines_are_not_corpus_lines() {
        let reading = slot("KLVR-AAA", Some(CellType::Aaa), 300, 0);
        let line = slot_line(TestMode::Both, &reading).unwrap();
        assert!(line.contains("📊"));
        assert!(parse_measurement(&line).is_none());
    }

    #[test]
    fn test_summary_lines() {
        let analysis = CycleAnalysis {
            mode: TestMode::Aa,
            total: 2,
            aa_count: 1,
            aaa_count: 1,
            correct: 1,
            slots: vec![SlotReading {
                misdetected: true,
                ..slot("KLVR-AAA", Some(CellType::Aaa), 300, 1)
            }],
        };
        assert_eq!(
            summary_line(7, &at(9, 30, 12), &analysis),
            "#  7 09:30:12 | [AA TEST] Total:  2 | Correct AA:  1 | Misdetected as AAA:  1 | Retries: 1 | 🚨 MISDETECTION!"
        );
        assert_eq!(
            connection_failed(12, &at(23, 0, 1)),
            "# 12 23:00:01 | ❌ Connection failed"
        );
        assert!(crate::corpus::parse_summary_time(&summary_line(7, &at(9, 30, 12), &analysis)).is_some());
    }

    #[test]
    fn test_alert_and_detail_lines() {
        assert_eq!(
            alert_banner(TestMode::Aa, 1),
            "    🚨🚨 AA MISDETECTION ALERT! 1 AA batteries detected as AAA!"
        );
        let d = details_line(&slot("KLVR-AAA", Some(CellType::Aaa), 300, 0));
        assert_eq!(
            d,
            "    🔬 SLOT 3 DETAILS: Detected=KLVR-AAA | AAA_ON=1250mV | AAA_OFF=950mV | Δ=300mV"
        );
        assert!(parse_measurement(&d).is_none());
        assert_eq!(count_change(2, 3), "    📥 BATTERY COUNT: 2 → 3");
    }
}
