//! One-sided |Δ| threshold analysis for the near-zero class
//!
//! The firmware rule is `|Δ| <= T → AA, otherwise AAA`. For each coverage
//! tier the candidate `T` is that percentile of |Δ| over correct AA
//! detections. A candidate is clean when it sits strictly below the smallest
//! |Δ| among AA cells the firmware called AAA.

use serde::{Deserialize, Serialize};

use super::distribution::{Distribution, StatsResult};
use super::result::{Confidence, ThresholdRecommendation, ONE_SIDED_LEVELS};
use crate::models::CellType;

/// Relationship between a candidate and the misdetection evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdSeparation {
    /// `threshold < min misdetection`; `optimal` is their midpoint
    Clean { optimal: i64 },
    /// Misdetections reach down into `[low, high]`
    Overlap { low: i64, high: i64 },
    /// No misdetections recorded for this class
    NoEvidence,
}

impl ThresholdSeparation {
    pub fn is_clean(&self) -> bool {
        matches!(self, ThresholdSeparation::Clean { .. })
    }
}

/// One coverage tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCandidate {
    pub coverage: f64,
    pub threshold: i64,
    pub separation: ThresholdSeparation,
    /// Correct samples with |Δ| above the threshold
    pub lost_correct: usize,
    /// Misdetections with |Δ| above the threshold, i.e. caught by it
    pub caught_misdetections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneSidedAnalysis {
    pub class: CellType,
    pub correct_abs: Distribution,
    pub misdetected_abs: Option<Distribution>,
    pub candidates: Vec<ThresholdCandidate>,
    pub confidence: Confidence,
    pub recommendation: ThresholdRecommendation,
}

impl OneSidedAnalysis {
    pub fn candidate(&self, coverage: f64) -> Option<&ThresholdCandidate> {
        self.candidates
            .iter()
            .find(|c| (c.coverage - coverage).abs() < f64::EPSILON)
    }

    pub fn min_misdetection(&self) -> Option<i64> {
        self.misdetected_abs.as_ref().map(|d| d.min)
    }
}

/// Evaluate every tier in `ONE_SIDED_LEVELS` and pick a recommendation.
///
/// Fails only when `correct` is empty. An empty `misdetected` set caps
/// confidence at MEDIUM.
pub fn analyze(class: CellType, correct: &[i64], misdetected: &[i64]) -> StatsResult<OneSidedAnalysis> {
    let correct_abs = Distribution::from_abs_samples(&format!("{} correct |Δ|", class), correct)?;
    let misdetected_abs = if misdetected.is_empty() {
        None
    } else {
        Some(Distribution::from_abs_samples(
            &format!("{} misdetected |Δ|", class),
            misdetected,
        )?)
    };
    let min_mis = misdetected_abs.as_ref().map(|d| d.min);

    let candidates: Vec<ThresholdCandidate> = ONE_SIDED_LEVELS
        .iter()
        .map(|&coverage| {
            let threshold = correct_abs.percentile(coverage);
            let separation = match min_mis {
                None => ThresholdSeparation::NoEvidence,
                Some(m) if threshold < m => ThresholdSeparation::Clean {
                    optimal: (threshold + m).div_euclid(2),
                },
                Some(m) => ThresholdSeparation::Overlap {
                    low: m,
                    high: threshold,
                },
            };
            ThresholdCandidate {
                coverage,
                threshold,
                separation,
                lost_correct: correct_abs.count_above(threshold),
                caught_misdetections: misdetected_abs
                    .as_ref()
                    .map_or(0, |d| d.count_above(threshold)),
            }
        })
        .collect();

    let p95 = correct_abs.percentile(95.0);
    let p99 = correct_abs.percentile(99.0);
    let (confidence, tier) = grade(min_mis, p95, p99);

    let chosen = candidates
        .iter()
        .find(|c| (c.coverage - tier).abs() < f64::EPSILON)
        .copied()
        .unwrap_or(candidates[0]);
    let (threshold, clean) = match chosen.separation {
        ThresholdSeparation::Clean { optimal } => (optimal, true),
        _ => (chosen.threshold, false),
    };

    Ok(OneSidedAnalysis {
        class,
        correct_abs,
        misdetected_abs,
        candidates,
        confidence,
        recommendation: ThresholdRecommendation {
            threshold,
            coverage: tier,
            clean,
            confidence,
        },
    })
}

/// Confidence grade and the coverage tier it selects.
///
/// HIGH when even p99 stays below every misdetection, MEDIUM when only p95
/// does, LOW otherwise. Without misdetections the p99 tier is used at MEDIUM.
pub fn grade(min_misdetection: Option<i64>, p95: i64, p99: i64) -> (Confidence, f64) {
    match min_misdetection {
        None => (Confidence::Medium, 99.0),
        Some(m) if m > p99 => (Confidence::High, 99.0),
        Some(m) if m > p95 => (Confidence::Medium, 95.0),
        Some(_) => (Confidence::Low, 90.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_separation_example() {
        let a = analyze(CellType::Aa, &[-10, -5, 0, 5, 10], &[280, 300, 320]).unwrap();
        let p99 = a.candidate(99.0).unwrap();
        assert_eq!(p99.threshold, 10);
        assert_eq!(a.min_misdetection(), Some(280));
        assert_eq!(p99.separation, ThresholdSeparation::Clean { optimal: 145 });
        assert_eq!(a.confidence, Confidence::High);
        assert_eq!(a.recommendation.threshold, 145);
        assert!(a.recommendation.clean);
        assert_eq!(p99.caught_misdetections, 3);
        assert_eq!(p99.lost_correct, 0);
    }

    #[test]
    fn test_overlap_grades_low() {
        let correct: Vec<i64> = (0..100).collect();
        let a = analyze(CellType::Aa, &correct, &[40, 300]).unwrap();
        // p90 = 90 >= 40, so nothing is clean
        assert!(a.candidates.iter().all(|c| !c.separation.is_clean()));
        assert_eq!(a.confidence, Confidence::Low);
        assert_eq!(a.recommendation.coverage, 90.0);
        assert_eq!(a.recommendation.threshold, 90);
        assert_eq!(
            a.candidate(90.0).unwrap().separation,
            ThresholdSeparation::Overlap { low: 40, high: 90 }
        );
    }

    #[test]
    fn test_medium_when_only_p95_clears() {
        let correct: Vec<i64> = (0..100).collect();
        // p95 = 95, p99 = 99
        let a = analyze(CellType::Aa, &correct, &[97, 400]).unwrap();
        assert_eq!(a.confidence, Confidence::Medium);
        assert_eq!(a.recommendation.coverage, 95.0);
        assert_eq!(a.recommendation.threshold, (95 + 97) / 2);
    }

    #[test]
    fn test_no_misdetections_caps_at_medium() {
        let a = analyze(CellType::Aa, &[1, 2, 3], &[]).unwrap();
        assert_eq!(a.confidence, Confidence::Medium);
        assert!(a
            .candidates
            .iter()
            .all(|c| c.separation == ThresholdSeparation::NoEvidence));
        assert_eq!(a.recommendation.threshold, 3);
        assert!(!a.recommendation.clean);
    }

    #[test]
    fn test_empty_correct_set_is_rejected() {
        assert!(analyze(CellType::Aa, &[], &[300]).is_err());
    }

    #[test]
    fn test_clean_at_99_is_evaluable_at_999() {
        let a = analyze(CellType::Aa, &[0, 1, 2, 3, 4, 5], &[6]).unwrap();
        assert!(a.candidate(99.0).unwrap().separation.is_clean());
        assert!(a.candidate(99.9).is_some());
    }
}
