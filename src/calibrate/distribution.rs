//! Descriptive statistics over a set of delta samples
//!
//! One `Distribution` is built per labeled sample set and reused by every
//! report section: summary stats, percentile ladders, histograms and the
//! coverage counts the calibrator needs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::histogram::{Bucket, BucketCount};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("no samples in '{0}': statistics are undefined for an empty set")]
    Empty(String),
}

pub type StatsResult<T> = Result<T, StatsError>;

/// Statistical summary of one sample set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Most frequent value; ties go to the value seen first
    pub mode: i64,
    /// Sample standard deviation (n - 1); 0 for a single sample
    pub stddev: f64,
    pub min: i64,
    pub max: i64,
    #[serde(skip)]
    sorted: Vec<i64>,
    /// Distinct values with their counts, in order of first appearance
    #[serde(skip)]
    frequencies: Vec<(i64, usize)>,
}

/// A jump between two consecutive distinct values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueGap {
    pub from: i64,
    pub to: i64,
    pub size: i64,
}

/// Samples inside a closed band, with their share of the set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandShare {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

impl Distribution {
    /// Build a distribution from samples in their original order.
    ///
    /// Original order matters only for mode tie-breaking.
    pub fn from_samples(name: &str, samples: &[i64]) -> StatsResult<Self> {
        if samples.is_empty() {
            return Err(StatsError::Empty(name.to_string()));
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let n = sorted.len();

        let mean = samples.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            sorted[n / 2] as f64
        } else {
            (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
        };
        let stddev = if n < 2 {
            0.0
        } else {
            let ss = samples
                .iter()
                .map(|&v| (v as f64 - mean).powi(2))
                .sum::<f64>();
            (ss / (n - 1) as f64).sqrt()
        };

        let frequencies = frequencies_of(samples);
        let mut mode = samples[0];
        let mut mode_count = 0;
        for &(value, count) in &frequencies {
            if count > mode_count {
                mode = value;
                mode_count = count;
            }
        }

        Ok(Self {
            count: n,
            mean,
            median,
            mode,
            stddev,
            min: sorted[0],
            max: sorted[n - 1],
            sorted,
            frequencies,
        })
    }

    /// Distribution of |Δ| for one-sided threshold analysis
    pub fn from_abs_samples(name: &str, samples: &[i64]) -> StatsResult<Self> {
        let abs: Vec<i64> = samples.iter().map(|v| v.abs()).collect();
        Self::from_samples(name, &abs)
    }

    /// Floor-index percentile: `sorted[floor(p/100 * n)]`, clamped to the last index.
    ///
    /// Not interpolated. Earlier calibration runs were produced with this
    /// estimator, so recommendations stay comparable.
    pub fn percentile(&self, p: f64) -> i64 {
        percentile(&self.sorted, p)
    }

    /// Values at each requested percentile, in request order
    pub fn ladder(&self, levels: &[f64]) -> Vec<(f64, i64)> {
        levels.iter().map(|&p| (p, self.percentile(p))).collect()
    }

    pub fn histogram(&self, buckets: &[Bucket]) -> Vec<BucketCount> {
        super::histogram::count(&self.sorted, buckets)
    }

    /// Top `n` most frequent values, most frequent first; equal counts keep
    /// the order in which the values first appeared.
    pub fn most_common(&self, n: usize) -> Vec<(i64, usize)> {
        let mut runs = self.frequencies.clone();
        runs.sort_by(|a, b| b.1.cmp(&a.1));
        runs.truncate(n);
        runs
    }

    /// Jumps wider than `min_gap` between consecutive distinct values, in
    /// ascending order.
    pub fn gaps(&self, min_gap: i64) -> Vec<ValueGap> {
        let mut distinct = self.sorted.clone();
        distinct.dedup();
        distinct
            .windows(2)
            .map(|w| ValueGap {
                from: w[0],
                to: w[1],
                size: w[1] - w[0],
            })
            .filter(|g| g.size > min_gap)
            .collect()
    }

    /// Samples inside `[min, max]` as a labeled share
    pub fn band(&self, label: impl Into<String>, min: i64, max: i64) -> BandShare {
        let count = self.count_within(min, max);
        BandShare {
            label: label.into(),
            count,
            percent: self.share(count),
        }
    }

    /// Samples strictly outside `[min, max]`
    pub fn count_outside(&self, min: i64, max: i64) -> usize {
        self.sorted.iter().filter(|&&v| v < min || v > max).count()
    }

    /// Samples inside `[min, max]`
    pub fn count_within(&self, min: i64, max: i64) -> usize {
        self.count - self.count_outside(min, max)
    }

    pub fn count_above(&self, threshold: i64) -> usize {
        self.sorted.iter().filter(|&&v| v > threshold).count()
    }

    pub fn share(&self, part: usize) -> f64 {
        part as f64 / self.count as f64 * 100.0
    }

    pub fn sorted(&self) -> &[i64] {
        &self.sorted
    }
}

/// Floor-index percentile over an already sorted slice.
///
/// Returns `None` on an empty slice instead of indexing out of bounds.
pub fn percentile_checked(sorted: &[i64], p: f64) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    let idx = (p / 100.0 * sorted.len() as f64).floor();
    let idx = if idx.is_sign_negative() { 0 } else { idx as usize };
    Some(sorted[idx.min(sorted.len() - 1)])
}

fn percentile(sorted: &[i64], p: f64) -> i64 {
    // Distribution guarantees a non-empty slice
    percentile_checked(sorted, p).unwrap_or_default()
}

fn frequencies_of(samples: &[i64]) -> Vec<(i64, usize)> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut frequencies: Vec<(i64, usize)> = Vec::new();
    for &v in samples {
        match index.get(&v) {
            Some(&i) => frequencies[i].1 += 1,
            None => {
                index.insert(v, frequencies.len());
                frequencies.push((v, 1));
            }
        }
    }
    frequencies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_stats() {
        let dist = Distribution::from_samples("t", &[4, -2, 4, 10, 0]).unwrap();
        assert_eq!(dist.count, 5);
        assert!((dist.mean - 3.2).abs() < 1e-9);
        assert_eq!(dist.median, 4.0);
        assert_eq!(dist.mode, 4);
        assert_eq!(dist.min, -2);
        assert_eq!(dist.max, 10);
        // sample variance = 84.8 / 4
        assert!((dist.stddev - 21.2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_even_median_is_midpoint() {
        let dist = Distribution::from_samples("t", &[1, 2, 3, 10]).unwrap();
        assert_eq!(dist.median, 2.5);
    }

    #[test]
    fn test_empty_is_rejected() {
        let err = Distribution::from_samples("aa correct", &[]).unwrap_err();
        assert_eq!(err, StatsError::Empty("aa correct".into()));
        assert!(err.to_string().contains("aa correct"));
    }

    #[test]
    fn test_single_sample_has_zero_stddev() {
        let dist = Distribution::from_samples("t", &[42]).unwrap();
        assert_eq!(dist.stddev, 0.0);
        assert_eq!(dist.percentile(0.0), 42);
        assert_eq!(dist.percentile(100.0), 42);
    }

    #[test]
    fn test_floor_index_percentile() {
        let values: Vec<i64> = (1..=20).collect();
        let dist = Distribution::from_samples("t", &values).unwrap();
        // floor(0.95 * 20) = 19 -> 20
        assert_eq!(dist.percentile(95.0), 20);
        // floor(0.5 * 20) = 10 -> 11 (not interpolated)
        assert_eq!(dist.percentile(50.0), 11);
        assert_eq!(dist.percentile(2.5), 1);
        assert_eq!(dist.percentile(100.0), 20);
        assert_eq!(dist.percentile(0.0), 1);
    }

    #[test]
    fn test_abs_percentile_example() {
        let dist = Distribution::from_abs_samples("t", &[-10, -5, 0, 5, 10]).unwrap();
        assert_eq!(dist.sorted(), &[0, 5, 5, 10, 10]);
        assert_eq!(dist.percentile(99.0), 10);
        assert_eq!(dist.percentile(99.9), 10);
        assert_eq!(dist.percentile(90.0), 10);
    }

    #[test]
    fn test_mode_tie_goes_to_first_seen() {
        let dist = Distribution::from_samples("t", &[7, 3, 3, 7, 1]).unwrap();
        assert_eq!(dist.mode, 7);
        let dist = Distribution::from_samples("t", &[3, 7, 7, 3]).unwrap();
        assert_eq!(dist.mode, 3);
    }

    #[test]
    fn test_most_common() {
        let dist = Distribution::from_samples("t", &[5, 1, 5, 2, 2, 5, 9]).unwrap();
        assert_eq!(dist.most_common(2), vec![(5, 3), (2, 2)]);
        assert_eq!(dist.most_common(10).len(), 4);
    }

    #[test]
    fn test_most_common_ties_keep_first_appearance() {
        let dist = Distribution::from_samples("t", &[9, 4, 4, 9, 1, 7]).unwrap();
        assert_eq!(dist.most_common(4), vec![(9, 2), (4, 2), (1, 1), (7, 1)]);
        assert_eq!(dist.mode, 9);
    }

    #[test]
    fn test_gaps_between_distinct_values() {
        let dist = Distribution::from_samples("t", &[0, 2, 2, 30, 31, 31, 50, 200]).unwrap();
        assert_eq!(
            dist.gaps(10),
            vec![
                ValueGap { from: 2, to: 30, size: 28 },
                ValueGap { from: 31, to: 50, size: 19 },
                ValueGap { from: 50, to: 200, size: 150 },
            ]
        );
        // strictly wider than the minimum
        assert_eq!(dist.gaps(19).len(), 2);
        assert!(Distribution::from_samples("t", &[5, 5]).unwrap().gaps(0).is_empty());
    }

    #[test]
    fn test_band_share() {
        let dist = Distribution::from_samples("t", &[-60, -50, 0, 50, 51]).unwrap();
        let band = dist.band("within ±50 mV", -50, 50);
        assert_eq!(band.count, 3);
        assert!((band.percent - 60.0).abs() < 1e-9);
        assert_eq!(band.label, "within ±50 mV");
    }

    #[test]
    fn test_coverage_counts() {
        let dist = Distribution::from_samples("t", &[-60, -10, 0, 10, 60]).unwrap();
        assert_eq!(dist.count_outside(-50, 50), 2);
        assert_eq!(dist.count_within(-50, 50), 3);
        assert_eq!(dist.count_above(10), 1);
        assert!((dist.share(1) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_checked_empty() {
        assert_eq!(percentile_checked(&[], 50.0), None);
        assert_eq!(percentile_checked(&[1, 2], -5.0), Some(1));
    }
}
