//! Dual-range threshold calibration
//!
//! Reads the four labeled sample sets of a corpus and derives:
//! - an inclusion range per class at several two-sided coverage levels,
//!   with the loss, leakage and misdetection recovery of each
//! - a one-sided |Δ| threshold for the AA class, graded against the AA
//!   misdetection evidence
//!
//! The result is advisory. Nothing here touches the ranges the monitor uses.

mod distribution;
mod dual_range;
mod histogram;
mod one_sided;
mod result;

pub use distribution::{
    percentile_checked, BandShare, Distribution, StatsError, StatsResult, ValueGap,
};
pub use dual_range::{
    empirical_ranges, evaluate_all, evaluate_level, misdetection_proxy, resolve_ranges,
    ClassRanges, EvaluationSamples, LevelEvaluation, RangeEffect, RangeSeparation,
    MIN_PROXY_SAMPLES,
};
pub use histogram::{Bucket, BucketCount, AAA_BUCKETS, AA_BUCKETS, WIDE_BUCKETS};
pub use one_sided::{analyze as analyze_one_sided, OneSidedAnalysis, ThresholdCandidate, ThresholdSeparation};
pub use result::{
    CalibrationResult, ClassRecommendation, Confidence, CoverageLevel, RangeBoundary,
    RangeSource, SampleCounts, ThresholdRecommendation, ONE_SIDED_LEVELS, RECOMMENDED_LEVEL,
    TWO_SIDED_LEVELS,
};

use thiserror::Error;
use tracing::{info, warn};

use crate::corpus::SampleCorpus;
use crate::models::CellType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrateError {
    #[error("no correct AA or AAA detections in the corpus; nothing to calibrate")]
    NoCorrectData,

    #[error("cannot derive a {0} range: no correct samples, too few misdetections and no fallback configured")]
    NoRange(CellType),

    #[error("invalid {class} fallback range [{min}, {max}]: min is above max")]
    InvalidFallback { class: CellType, min: i64, max: i64 },

    #[error(transparent)]
    Stats(#[from] StatsError),
}

pub type CalibrateResult<T> = Result<T, CalibrateError>;

/// Percentiles shown in each class's ladder
pub const LADDER_LEVELS: [f64; 13] = [
    0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 50.0, 90.0, 95.0, 97.5, 99.0, 99.5, 99.9,
];

/// Rows in the most-common table for correct detections
pub const DEFAULT_TOP: usize = 20;

/// Rows in the most-common table for misdetections
pub const MISDETECTION_TOP: usize = 10;

/// Jumps between distinct correct deltas wider than this are reported
pub const GAP_MIN_MV: i64 = 10;

/// |Δ| split points for correct AA samples
pub const AA_ABS_BANDS: [(i64, i64, &str); 3] = [
    (0, 50, "|Δ| ≤ 50 mV"),
    (51, 100, "50 < |Δ| ≤ 100 mV"),
    (101, i64::MAX, "|Δ| > 100 mV"),
];

/// Band around the nominal AAA delta
pub const AAA_CENTER_BAND: (i64, i64) = (250, 350);

/// Configured ranges for classes without any measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FallbackRanges {
    pub aa: Option<(i64, i64)>,
    pub aaa: Option<(i64, i64)>,
}

impl FallbackRanges {
    pub fn get(&self, class: CellType) -> Option<(i64, i64)> {
        match class {
            CellType::Aa => self.aa,
            CellType::Aaa => self.aaa,
        }
    }
}

/// A titled histogram for the report
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSection {
    pub title: &'static str,
    pub counts: Vec<BucketCount>,
}

/// Everything the report shows about one class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAnalysis {
    pub class: CellType,
    pub correct: Option<Distribution>,
    pub misdetected: Option<Distribution>,
    pub misdetected_abs: Option<Distribution>,
    pub ladder: Vec<(f64, i64)>,
    pub most_common: Vec<(i64, usize)>,
    pub misdetected_common: Vec<(i64, usize)>,
    pub histograms: Vec<HistogramSection>,
    /// Natural breakpoints in the correct samples
    pub gaps: Vec<ValueGap>,
    /// Shares of the correct samples in the bands of interest for this class
    pub bands: Vec<BandShare>,
    pub ranges: ClassRanges,
}

/// Full output of one run: the report data plus the persisted result
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub aa: ClassAnalysis,
    pub aaa: ClassAnalysis,
    /// `None` without correct AA samples
    pub one_sided: Option<OneSidedAnalysis>,
    pub levels: Vec<LevelEvaluation>,
    pub result: CalibrationResult,
}

impl Calibration {
    pub fn class(&self, class: CellType) -> &ClassAnalysis {
        match class {
            CellType::Aa => &self.aa,
            CellType::Aaa => &self.aaa,
        }
    }

    pub fn level(&self, percent: f64) -> Option<&LevelEvaluation> {
        self.levels.iter().find(|l| l.level.percent == percent)
    }
}

/// Runs calibration over a corpus
#[derive(Debug, Clone)]
pub struct Calibrator {
    fallback: FallbackRanges,
    top: usize,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(FallbackRanges::default())
    }
}

impl Calibrator {
    pub fn new(fallback: FallbackRanges) -> Self {
        Self {
            fallback,
            top: DEFAULT_TOP,
        }
    }

    pub fn with_top(mut self, top: usize) -> Self {
        self.top = top;
        self
    }

    pub fn calibrate(&self, corpus: &SampleCorpus) -> CalibrateResult<Calibration> {
        let aa_correct = corpus.correct(CellType::Aa).as_slice();
        let aaa_correct = corpus.correct(CellType::Aaa).as_slice();
        if aa_correct.is_empty() && aaa_correct.is_empty() {
            return Err(CalibrateError::NoCorrectData);
        }

        let samples = EvaluationSamples {
            aa_correct,
            aa_misdetected: corpus.misdetected(CellType::Aa).as_slice(),
            aaa_correct,
            aaa_misdetected: corpus.misdetected(CellType::Aaa).as_slice(),
        };

        let aa = self.analyze_class(CellType::Aa, corpus)?;
        let aaa = self.analyze_class(CellType::Aaa, corpus)?;
        let levels = evaluate_all(&aa.ranges, &aaa.ranges, &samples);

        let one_sided = if aa_correct.is_empty() {
            warn!("No correct AA samples; skipping one-sided threshold analysis");
            None
        } else {
            Some(one_sided::analyze(
                CellType::Aa,
                aa_correct,
                samples.aa_misdetected,
            )?)
        };

        let recommended = evaluate_level(
            RECOMMENDED_LEVEL,
            aa.ranges
                .at(&RECOMMENDED_LEVEL)
                .ok_or(CalibrateError::NoRange(CellType::Aa))?,
            aaa.ranges
                .at(&RECOMMENDED_LEVEL)
                .ok_or(CalibrateError::NoRange(CellType::Aaa))?,
            &samples,
        );

        let result = build_result(corpus, &recommended, one_sided.as_ref());
        info!(
            "Calibrated AA [{}, {}] AAA [{}, {}] ({} confidence)",
            result.aa.range.min,
            result.aa.range.max,
            result.aaa.range.min,
            result.aaa.range.max,
            result.confidence
        );

        Ok(Calibration {
            aa,
            aaa,
            one_sided,
            levels,
            result,
        })
    }

    fn analyze_class(&self, class: CellType, corpus: &SampleCorpus) -> CalibrateResult<ClassAnalysis> {
        let correct_set = corpus.correct(class);
        let misdetected_set = corpus.misdetected(class);

        let correct = Distribution::from_samples(&correct_set.name, correct_set.as_slice()).ok();
        let misdetected =
            Distribution::from_samples(&misdetected_set.name, misdetected_set.as_slice()).ok();
        let misdetected_abs =
            Distribution::from_abs_samples(&misdetected_set.name, misdetected_set.as_slice()).ok();

        let ranges = resolve_ranges(
            class,
            correct_set.as_slice(),
            corpus.misdetected(class.other()).as_slice(),
            self.fallback.get(class),
        )?;

        let histograms = match (&correct, class) {
            (Some(dist), CellType::Aa) => vec![
                HistogramSection {
                    title: "AA deltas, wide range",
                    counts: dist.histogram(WIDE_BUCKETS),
                },
                HistogramSection {
                    title: "AA deltas, centred on 0 mV",
                    counts: dist.histogram(AA_BUCKETS),
                },
            ],
            (Some(dist), CellType::Aaa) => vec![HistogramSection {
                title: "AAA deltas, centred on 300 mV",
                counts: dist.histogram(AAA_BUCKETS),
            }],
            (None, _) => Vec::new(),
        };

        let bands = match (&correct, class) {
            (Some(_), CellType::Aa) => {
                let abs = Distribution::from_abs_samples(&correct_set.name, correct_set.as_slice())?;
                AA_ABS_BANDS
                    .iter()
                    .map(|&(min, max, label)| abs.band(label, min, max))
                    .collect()
            }
            (Some(dist), CellType::Aaa) => {
                let (min, max) = AAA_CENTER_BAND;
                vec![dist.band(format!("{}–{} mV", min, max), min, max)]
            }
            (None, _) => Vec::new(),
        };

        Ok(ClassAnalysis {
            class,
            ladder: correct
                .as_ref()
                .map(|d| d.ladder(&LADDER_LEVELS))
                .unwrap_or_default(),
            most_common: correct
                .as_ref()
                .map(|d| d.most_common(self.top))
                .unwrap_or_default(),
            misdetected_common: misdetected
                .as_ref()
                .map(|d| d.most_common(MISDETECTION_TOP.min(self.top)))
                .unwrap_or_default(),
            histograms,
            gaps: correct
                .as_ref()
                .map(|d| d.gaps(GAP_MIN_MV))
                .unwrap_or_default(),
            bands,
            correct,
            misdetected,
            misdetected_abs,
            ranges,
        })
    }
}

/// Convenience wrapper with default settings
pub fn calibrate(corpus: &SampleCorpus, fallback: FallbackRanges) -> CalibrateResult<Calibration> {
    Calibrator::new(fallback).calibrate(corpus)
}

fn build_result(
    corpus: &SampleCorpus,
    recommended: &LevelEvaluation,
    one_sided: Option<&OneSidedAnalysis>,
) -> CalibrationResult {
    let mut warnings = Vec::new();

    for class in CellType::all() {
        let range = recommended.range(*class);
        if range.source != RangeSource::Empirical {
            warnings.push(format!(
                "{} range {}..{} mV is {}, not measured",
                class,
                range.min,
                range.max,
                range.source.describe()
            ));
        }
    }

    if let RangeSeparation::Overlap { low, high } = recommended.separation {
        warnings.push(format!(
            "AA and AAA ranges overlap in {}..{} mV; an operator has to choose the split",
            low, high
        ));
    }

    match one_sided {
        None => warnings.push("no correct AA samples; one-sided threshold not computed".into()),
        Some(a) if a.misdetected_abs.is_none() => warnings.push(
            "no AA misdetections recorded; separation from AAA is unproven".into(),
        ),
        Some(_) => {}
    }

    if !corpus.skipped.is_empty() {
        warnings.push(format!("{} unreadable log files were skipped", corpus.skipped.len()));
    }

    let confidence = overall_confidence(recommended, one_sided);

    CalibrationResult {
        version: CalibrationResult::VERSION,
        samples: SampleCounts {
            aa_correct: corpus.aa_correct.len(),
            aa_misdetected: corpus.aa_as_aaa.len(),
            aaa_correct: corpus.aaa_correct.len(),
            aaa_misdetected: corpus.aaa_as_aa.len(),
        },
        aa: recommendation(recommended, CellType::Aa),
        aaa: recommendation(recommended, CellType::Aaa),
        separated: recommended.separation.is_clean(),
        gap_mv: recommended.separation.gap_mv(),
        threshold: one_sided.map(|a| a.recommendation),
        confidence,
        warnings,
    }
}

fn recommendation(eval: &LevelEvaluation, class: CellType) -> ClassRecommendation {
    let effect = eval.effect(class);
    let other_total = eval.effect(class.other()).total;
    let covered = effect.total - effect.lost;
    ClassRecommendation {
        range: *eval.range(class),
        covered,
        total: effect.total,
        coverage_percent: percent(covered, effect.total),
        leakage: effect.leakage,
        leakage_percent: percent(effect.leakage, other_total),
    }
}

fn percent(part: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| part as f64 / total as f64 * 100.0)
}

/// One-sided grade, capped at LOW on overlapping ranges and at MEDIUM when
/// either range is not measured.
fn overall_confidence(recommended: &LevelEvaluation, one_sided: Option<&OneSidedAnalysis>) -> Confidence {
    let mut confidence = one_sided.map_or(Confidence::Low, |a| a.confidence);
    if !recommended.separation.is_clean() {
        confidence = confidence.min(Confidence::Low);
    }
    let measured = recommended.aa.source == RangeSource::Empirical
        && recommended.aaa.source == RangeSource::Empirical;
    if !measured {
        confidence = confidence.min(Confidence::Medium);
    }
    confidence
}
