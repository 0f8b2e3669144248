//! Per-cycle classification of a status snapshot

use crate::config::RangesConfig;
use crate::models::{CellType, TestMode};

use super::status::{DetectionDebug, StatusSnapshot};

/// Where a slot's delta falls relative to the active ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeVerdict {
    InAa,
    InAaa,
    /// Ranges overlap and the delta sits in both
    Both,
    Neither,
}

impl RangeVerdict {
    pub fn of(delta: i64, ranges: &RangesConfig) -> Self {
        match (
            ranges.contains(CellType::Aa, delta),
            ranges.contains(CellType::Aaa, delta),
        ) {
            (true, false) => RangeVerdict::InAa,
            (false, true) => RangeVerdict::InAaa,
            (true, true) => RangeVerdict::Both,
            (false, false) => RangeVerdict::Neither,
        }
    }

    pub fn is_borderline(&self) -> bool {
        matches!(self, RangeVerdict::Both | RangeVerdict::Neither)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            RangeVerdict::InAa => "in AA range",
            RangeVerdict::InAaa => "in AAA range",
            RangeVerdict::Both => "in both ranges",
            RangeVerdict::Neither => "outside both ranges",
        }
    }
}

/// One occupied slot after classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotReading {
    /// Position in the status array
    pub slot: usize,
    /// Raw type token from the firmware
    pub detected: String,
    pub class: Option<CellType>,
    pub debug: Option<DetectionDebug>,
    pub verdict: Option<RangeVerdict>,
    pub misdetected: bool,
    pub borderline: bool,
}

impl SlotReading {
    pub fn retry_count(&self) -> u32 {
        self.debug.map_or(0, |d| d.retry_count)
    }
}

/// Classification of one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleAnalysis {
    pub mode: TestMode,
    pub total: usize,
    pub aa_count: usize,
    pub aaa_count: usize,
    /// Slots that resolved to the expected class
    pub correct: usize,
    pub slots: Vec<SlotReading>,
}

impl CycleAnalysis {
    pub fn misdetections(&self) -> impl Iterator<Item = &SlotReading> {
        self.slots.iter().filter(|s| s.misdetected)
    }

    pub fn misdetection_count(&self) -> usize {
        self.misdetections().count()
    }

    /// Borderline slots that are not already misdetections
    pub fn borderline(&self) -> impl Iterator<Item = &SlotReading> {
        self.slots.iter().filter(|s| s.borderline && !s.misdetected)
    }

    pub fn borderline_count(&self) -> usize {
        self.borderline().count()
    }

    /// Slots that needed at least one detection retry
    pub fn retried(&self) -> usize {
        self.slots.iter().filter(|s| s.retry_count() > 0).count()
    }

    /// Whether this cycle raises an alert. BOTH mode only tallies.
    pub fn is_alert(&self) -> bool {
        self.mode.expected().is_some()
            && (self.misdetection_count() > 0 || self.borderline_count() > 0)
    }
}

/// Classify every occupied slot of `snapshot` under `mode`.
///
/// A misdetection is a slot resolving to the other class than the one the
/// mode expects. Unresolved tokens and deltas that land in neither or both
/// ranges are borderline.
pub fn classify(snapshot: &StatusSnapshot, mode: TestMode, ranges: &RangesConfig) -> CycleAnalysis {
    let expected = mode.expected();
    let mut slots = Vec::new();

    for (index, battery) in snapshot.batteries.iter().enumerate() {
        if !battery.is_occupied() {
            continue;
        }
        let class = CellType::resolve(&battery.battery_detected);
        let verdict = battery.debug.map(|d| RangeVerdict::of(d.delta_mv, ranges));
        let misdetected = match (expected, class) {
            (Some(e), Some(c)) => e != c,
            _ => false,
        };
        let borderline = (expected.is_some() && class.is_none())
            || verdict.is_some_and(|v| v.is_borderline());

        slots.push(SlotReading {
            slot: index,
            detected: battery.battery_detected.clone(),
            class,
            debug: battery.debug,
            verdict,
            misdetected,
            borderline,
        });
    }

    let aa_count = slots.iter().filter(|s| s.class == Some(CellType::Aa)).count();
    let aaa_count = slots.iter().filter(|s| s.class == Some(CellType::Aaa)).count();
    let correct = match expected {
        Some(e) => slots.iter().filter(|s| s.class == Some(e)).count(),
        None => 0,
    };

    CycleAnalysis {
        mode,
        total: slots.len(),
        aa_count,
        aaa_count,
        correct,
        slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::status::BatteryStatus;

    fn battery(detected: &str, delta: i64) -> BatteryStatus {
        BatteryStatus {
            slot_state: "charging".into(),
            battery_detected: detected.into(),
            debug: Some(DetectionDebug {
                on_mv: 1000 + delta,
                off_mv: 1000,
                delta_mv: delta,
                ..Default::default()
            }),
        }
    }

    fn empty() -> BatteryStatus {
        BatteryStatus {
            slot_state: "empty".into(),
            battery_detected: "none".into(),
            debug: None,
        }
    }

    #[test]
    fn test_aa_mode_flags_aaa_slot() {
        let snapshot = StatusSnapshot {
            batteries: vec![battery("KLVR-AA", 3), empty(), battery("KLVR-AAA", 300)],
        };
        let a = classify(&snapshot, TestMode::Aa, &RangesConfig::default());
        assert_eq!(a.total, 2);
        assert_eq!(a.correct, 1);
        assert_eq!(a.misdetection_count(), 1);
        assert_eq!(a.misdetections().next().unwrap().slot, 2);
        assert!(a.is_alert());
    }

    #[test]
    fn test_aaa_mode_flags_aa_slot() {
        let snapshot = StatusSnapshot {
            batteries: vec![battery("KLVR-AA", 3), battery("KLVR-AAA", 300)],
        };
        let a = classify(&snapshot, TestMode::Aaa, &RangesConfig::default());
        assert_eq!(a.misdetection_count(), 1);
        assert_eq!(a.misdetections().next().unwrap().slot, 0);
    }

    #[test]
    fn test_both_mode_tallies_without_alerting() {
        let snapshot = StatusSnapshot {
            batteries: vec![battery("KLVR-AA", 3), battery("KLVR-AAA", 300), battery("KLVR-AA", 150)],
        };
        let a = classify(&snapshot, TestMode::Both, &RangesConfig::default());
        assert_eq!((a.aa_count, a.aaa_count), (2, 1));
        assert_eq!(a.misdetection_count(), 0);
        assert_eq!(a.borderline_count(), 1);
        assert!(!a.is_alert());
    }

    #[test]
    fn test_borderline_verdicts() {
        let ranges = RangesConfig {
            aa: (-50, 50),
            aaa: (40, 380),
        };
        assert_eq!(RangeVerdict::of(45, &ranges), RangeVerdict::Both);
        assert_eq!(RangeVerdict::of(-80, &ranges), RangeVerdict::Neither);
        assert_eq!(RangeVerdict::of(0, &ranges), RangeVerdict::InAa);

        let snapshot = StatusSnapshot {
            batteries: vec![battery("KLVR-AA", 45), battery("UNKNOWN", 0)],
        };
        let a = classify(&snapshot, TestMode::Aa, &ranges);
        assert_eq!(a.misdetection_count(), 0);
        assert_eq!(a.borderline_count(), 2);
        assert!(a.is_alert());
    }

    #[test]
    fn test_slot_without_debug_has_no_verdict() {
        let mut b = battery("KLVR-AA", 0);
        b.debug = None;
        let a = classify(&StatusSnapshot { batteries: vec![b] }, TestMode::Aa, &RangesConfig::default());
        assert_eq!(a.slots[0].verdict, None);
        assert!(!a.slots[0].borderline);
        assert_eq!(a.retried(), 0);
    }
}
