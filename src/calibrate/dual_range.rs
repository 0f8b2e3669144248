//! Two-sided inclusion ranges per class and their trade-offs
//!
//! Each class gets `[percentile(low), percentile(high)]` at every level in
//! `TWO_SIDED_LEVELS`. A class without correct samples gets one substitute
//! range that is reused at every level.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::distribution::Distribution;
use super::result::{CoverageLevel, RangeBoundary, RangeSource, TWO_SIDED_LEVELS};
use super::{CalibrateError, CalibrateResult};
use crate::models::CellType;

/// Minimum number of misdetections for the mean ± sd proxy
pub const MIN_PROXY_SAMPLES: usize = 2;

/// Candidate ranges for one class, one per two-sided level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRanges {
    pub class: CellType,
    pub source: RangeSource,
    pub ranges: Vec<RangeBoundary>,
}

impl ClassRanges {
    pub fn at(&self, level: &CoverageLevel) -> Option<RangeBoundary> {
        match self.source {
            RangeSource::Empirical => self
                .ranges
                .iter()
                .find(|r| r.coverage.map(|c| c.percent) == Some(level.percent))
                .copied(),
            _ => self.ranges.first().copied(),
        }
    }
}

/// Empirical ranges from a class's correct detections
pub fn empirical_ranges(class: CellType, dist: &Distribution) -> ClassRanges {
    let ranges = TWO_SIDED_LEVELS
        .iter()
        .map(|level| RangeBoundary {
            class,
            min: dist.percentile(level.low),
            max: dist.percentile(level.high),
            coverage: Some(*level),
            source: RangeSource::Empirical,
        })
        .collect();
    ClassRanges {
        class,
        source: RangeSource::Empirical,
        ranges,
    }
}

/// `[trunc(mean - sd), trunc(mean + sd)]` of deltas the firmware labelled
/// `class` although they came from the other class.
pub fn misdetection_proxy(class: CellType, observed_as_class: &[i64]) -> Option<RangeBoundary> {
    if observed_as_class.len() < MIN_PROXY_SAMPLES {
        return None;
    }
    let dist = Distribution::from_samples("misdetection proxy", observed_as_class).ok()?;
    Some(RangeBoundary {
        class,
        min: (dist.mean - dist.stddev).trunc() as i64,
        max: (dist.mean + dist.stddev).trunc() as i64,
        coverage: None,
        source: RangeSource::MisdetectionProxy,
    })
}

/// Pick ranges for `class`: empirical, then misdetection proxy, then the
/// configured theoretical range.
pub fn resolve_ranges(
    class: CellType,
    correct: &[i64],
    observed_as_class: &[i64],
    fallback: Option<(i64, i64)>,
) -> CalibrateResult<ClassRanges> {
    if let Ok(dist) = Distribution::from_samples(&format!("{} correct", class), correct) {
        return Ok(empirical_ranges(class, &dist));
    }

    if let Some(range) = misdetection_proxy(class, observed_as_class) {
        warn!(
            "No correct {} samples; estimating range {}..{} mV from {} misdetections",
            class,
            range.min,
            range.max,
            observed_as_class.len()
        );
        return Ok(single(range));
    }

    match fallback {
        Some((min, max)) if min <= max => {
            warn!(
                "No {} measurements; using theoretical range {}..{} mV",
                class, min, max
            );
            Ok(single(RangeBoundary {
                class,
                min,
                max,
                coverage: None,
                source: RangeSource::Theoretical,
            }))
        }
        Some((min, max)) => Err(CalibrateError::InvalidFallback { class, min, max }),
        None => Err(CalibrateError::NoRange(class)),
    }
}

fn single(range: RangeBoundary) -> ClassRanges {
    ClassRanges {
        class: range.class,
        source: range.source,
        ranges: vec![range],
    }
}

/// How two ranges relate once ordered by centre
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeSeparation {
    /// `first.max < second.min`
    Clean { gap: i64 },
    /// Both ranges admit `[low, high]`
    Overlap { low: i64, high: i64 },
}

impl RangeSeparation {
    pub fn between(a: &RangeBoundary, b: &RangeBoundary) -> Self {
        let (first, second) = if a.midpoint() <= b.midpoint() { (a, b) } else { (b, a) };
        if first.max < second.min {
            RangeSeparation::Clean {
                gap: second.min - first.max,
            }
        } else {
            RangeSeparation::Overlap {
                low: second.min,
                high: first.max.min(second.max),
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, RangeSeparation::Clean { .. })
    }

    /// Gap width, negative for the width of an overlap
    pub fn gap_mv(&self) -> i64 {
        match *self {
            RangeSeparation::Clean { gap } => gap,
            RangeSeparation::Overlap { low, high } => -(high - low + 1),
        }
    }
}

/// Effect of one range on one class's samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RangeEffect {
    /// Correct samples of the class outside its own range
    pub lost: usize,
    pub total: usize,
    /// Correct samples of the other class inside this range
    pub leakage: usize,
    /// Misdetected samples of this class the pair of ranges would classify right
    pub recovered: usize,
    pub missed: usize,
}

/// One two-sided level evaluated for both classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEvaluation {
    pub level: CoverageLevel,
    pub aa: RangeBoundary,
    pub aaa: RangeBoundary,
    pub separation: RangeSeparation,
    pub aa_effect: RangeEffect,
    pub aaa_effect: RangeEffect,
}

impl LevelEvaluation {
    pub fn range(&self, class: CellType) -> &RangeBoundary {
        match class {
            CellType::Aa => &self.aa,
            CellType::Aaa => &self.aaa,
        }
    }

    pub fn effect(&self, class: CellType) -> &RangeEffect {
        match class {
            CellType::Aa => &self.aa_effect,
            CellType::Aaa => &self.aaa_effect,
        }
    }
}

/// Samples the evaluator needs, borrowed from the corpus
#[derive(Debug, Clone, Copy)]
pub struct EvaluationSamples<'a> {
    pub aa_correct: &'a [i64],
    pub aa_misdetected: &'a [i64],
    pub aaa_correct: &'a [i64],
    pub aaa_misdetected: &'a [i64],
}

impl<'a> EvaluationSamples<'a> {
    fn correct(&self, class: CellType) -> &'a [i64] {
        match class {
            CellType::Aa => self.aa_correct,
            CellType::Aaa => self.aaa_correct,
        }
    }

    fn misdetected(&self, class: CellType) -> &'a [i64] {
        match class {
            CellType::Aa => self.aa_misdetected,
            CellType::Aaa => self.aaa_misdetected,
        }
    }
}

pub fn evaluate_level(
    level: CoverageLevel,
    aa: RangeBoundary,
    aaa: RangeBoundary,
    samples: &EvaluationSamples<'_>,
) -> LevelEvaluation {
    LevelEvaluation {
        level,
        aa,
        aaa,
        separation: RangeSeparation::between(&aa, &aaa),
        aa_effect: effect(CellType::Aa, &aa, &aaa, samples),
        aaa_effect: effect(CellType::Aaa, &aaa, &aa, samples),
    }
}

fn effect(
    class: CellType,
    own: &RangeBoundary,
    other: &RangeBoundary,
    samples: &EvaluationSamples<'_>,
) -> RangeEffect {
    let correct = samples.correct(class);
    let misdetected = samples.misdetected(class);
    let recovered = misdetected
        .iter()
        .filter(|&&d| own.contains(d) && !other.contains(d))
        .count();
    RangeEffect {
        lost: correct.iter().filter(|&&d| !own.contains(d)).count(),
        total: correct.len(),
        leakage: samples
            .correct(class.other())
            .iter()
            .filter(|&&d| own.contains(d))
            .count(),
        recovered,
        missed: misdetected.len() - recovered,
    }
}

/// Evaluate every two-sided level for both classes
pub fn evaluate_all(
    aa: &ClassRanges,
    aaa: &ClassRanges,
    samples: &EvaluationSamples<'_>,
) -> Vec<LevelEvaluation> {
    TWO_SIDED_LEVELS
        .iter()
        .filter_map(|level| {
            let a = aa.at(level)?;
            let b = aaa.at(level)?;
            Some(evaluate_level(*level, a, b, samples))
        })
        .collect()
}
