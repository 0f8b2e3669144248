//! Calibration result schema and I/O

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::CellType;

/// How much the recommendation can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn name(&self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a range came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSource {
    /// Percentiles of the class's own correct detections
    Empirical,
    /// mean ± sd of the opposite class's misdetections into this class
    MisdetectionProxy,
    /// Configured fallback, not backed by any measurement
    Theoretical,
}

impl RangeSource {
    pub fn describe(&self) -> &'static str {
        match self {
            RangeSource::Empirical => "measured",
            RangeSource::MisdetectionProxy => "estimated from misdetections",
            RangeSource::Theoretical => "theoretical fallback",
        }
    }
}

/// Closed interval `[min, max]` claimed to hold one class's deltas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBoundary {
    pub class: CellType,
    pub min: i64,
    pub max: i64,
    /// Nominal two-sided coverage; `None` for non-empirical ranges
    pub coverage: Option<CoverageLevel>,
    pub source: RangeSource,
}

impl RangeBoundary {
    pub fn contains(&self, delta: i64) -> bool {
        self.min <= delta && delta <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }
}

/// A two-sided coverage level and the tail percentiles that bound it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageLevel {
    pub percent: f64,
    pub low: f64,
    pub high: f64,
}

impl CoverageLevel {
    pub const fn new(percent: f64, low: f64, high: f64) -> Self {
        Self { percent, low, high }
    }
}

/// Two-sided levels evaluated for every class
pub const TWO_SIDED_LEVELS: [CoverageLevel; 3] = [
    CoverageLevel::new(90.0, 5.0, 95.0),
    CoverageLevel::new(95.0, 2.5, 97.5),
    CoverageLevel::new(99.0, 0.5, 99.5),
];

/// The level the final ranges are taken from
pub const RECOMMENDED_LEVEL: CoverageLevel = TWO_SIDED_LEVELS[1];

/// One-sided |Δ| coverage levels
pub const ONE_SIDED_LEVELS: [f64; 4] = [90.0, 95.0, 99.0, 99.9];

/// Final recommendation for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecommendation {
    pub range: RangeBoundary,
    /// Correct samples of this class inside the range
    pub covered: usize,
    pub total: usize,
    /// `covered / total` in percent; `None` without correct samples
    pub coverage_percent: Option<f64>,
    /// Correct samples of the other class that the range would admit
    pub leakage: usize,
    pub leakage_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SampleCounts {
    pub aa_correct: usize,
    pub aa_misdetected: usize,
    pub aaa_correct: usize,
    pub aaa_misdetected: usize,
}

/// One-sided threshold recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecommendation {
    /// `|Δ| <= threshold` classifies as the near-zero class
    pub threshold: i64,
    /// Coverage tier the threshold was derived from
    pub coverage: f64,
    pub clean: bool,
    pub confidence: Confidence,
}

/// Output of one calibration run. Advisory: nothing applies it automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub version: u32,
    pub samples: SampleCounts,
    pub aa: ClassRecommendation,
    pub aaa: ClassRecommendation,
    /// Ranges at the recommended level do not touch
    pub separated: bool,
    /// Width of the gap between ranges, or of the overlap when negative
    pub gap_mv: i64,
    pub threshold: Option<ThresholdRecommendation>,
    pub confidence: Confidence,
    pub warnings: Vec<String>,
}

impl CalibrationResult {
    pub const VERSION: u32 = 1;

    pub fn recommendation(&self, class: CellType) -> &ClassRecommendation {
        match class {
            CellType::Aa => &self.aa,
            CellType::Aaa => &self.aaa,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let result: Self = serde_json::from_str(&data)
            .with_context(|| format!("Invalid calibration result in {}", path.display()))?;
        if result.version != Self::VERSION {
            anyhow::bail!(
                "Calibration result version mismatch ({} vs {})",
                result.version,
                Self::VERSION
            );
        }
        Ok(result)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert_eq!(Confidence::Medium.min(Confidence::Low), Confidence::Low);
    }

    #[test]
    fn test_confidence_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Confidence::High).unwrap(), "\"HIGH\"");
    }

    #[test]
    fn test_range_is_inclusive() {
        let r = RangeBoundary {
            class: CellType::Aa,
            min: -50,
            max: 50,
            coverage: Some(RECOMMENDED_LEVEL),
            source: RangeSource::Empirical,
        };
        assert!(r.contains(-50));
        assert!(r.contains(50));
        assert!(!r.contains(51));
        assert_eq!(r.midpoint(), 0.0);
    }

    #[test]
    fn test_two_sided_levels_are_symmetric() {
        for level in TWO_SIDED_LEVELS {
            assert!((level.low + level.high - 100.0).abs() < 1e-9);
            assert!((level.high - level.low - level.percent).abs() < 1e-9);
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("calibration.json");
        let result = crate::reporters::tests::test_calibration().result;
        result.save(&path).unwrap();
        let loaded = CalibrationResult::load(&path).unwrap();
        assert_eq!(loaded.aa.range, result.aa.range);
        assert_eq!(loaded.aaa.range, result.aaa.range);
        assert_eq!(loaded.samples, result.samples);
        assert_eq!(loaded.confidence, result.confidence);

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("\"version\": 1", "\"version\": 99")).unwrap();
        assert!(CalibrationResult::load(&path).is_err());
    }
}
