//! Fixed-bucket histograms over half-open `[low, high)` delta ranges

use serde::Serialize;

/// A half-open `[low, high)` range with a display label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub low: i64,
    pub high: i64,
    pub label: &'static str,
}

impl Bucket {
    pub const fn new(low: i64, high: i64, label: &'static str) -> Self {
        Self { low, high, label }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.low <= value && value < self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub bucket: Bucket,
    pub count: usize,
    /// Share of the whole sample set, 0–100
    pub percent: f64,
}

/// Buckets centred on 0 mV, where AA deltas live
pub const AA_BUCKETS: &[Bucket] = &[
    Bucket::new(-100, -50, "Large Negative"),
    Bucket::new(-50, -20, "Medium Negative"),
    Bucket::new(-20, -5, "Small Negative"),
    Bucket::new(-5, 5, "Near Zero"),
    Bucket::new(5, 20, "Small Positive"),
    Bucket::new(20, 50, "Medium Positive"),
    Bucket::new(50, 100, "Large Positive"),
];

/// Buckets centred on 300 mV, where AAA deltas live
pub const AAA_BUCKETS: &[Bucket] = &[
    Bucket::new(0, 100, "Very Low"),
    Bucket::new(100, 200, "Low"),
    Bucket::new(200, 250, "Below Center"),
    Bucket::new(250, 300, "Near Center Low"),
    Bucket::new(300, 350, "Near Center High"),
    Bucket::new(350, 400, "Above Center"),
    Bucket::new(400, 500, "High"),
    Bucket::new(500, 1000, "Very High"),
];

/// Wide buckets for spotting gross outliers in AA data
pub const WIDE_BUCKETS: &[Bucket] = &[
    Bucket::new(-2100, -100, "Very Negative"),
    Bucket::new(-100, -50, "Moderate Negative"),
    Bucket::new(-50, -20, "Small Negative"),
    Bucket::new(-20, -5, "Tiny Negative"),
    Bucket::new(-5, 5, "Near Zero"),
    Bucket::new(5, 20, "Tiny Positive"),
    Bucket::new(20, 50, "Small Positive"),
    Bucket::new(50, 100, "Moderate Positive"),
    Bucket::new(100, 500, "Large Positive"),
    Bucket::new(500, 3000, "Very Large"),
];

/// Count samples per bucket. Buckets may overlap or leave gaps; each is
/// counted independently against the full set.
pub fn count(samples: &[i64], buckets: &[Bucket]) -> Vec<BucketCount> {
    let total = samples.len();
    buckets
        .iter()
        .map(|bucket| {
            let count = samples.iter().filter(|&&v| bucket.contains(v)).count();
            let percent = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            };
            BucketCount {
                bucket: *bucket,
                count,
                percent,
            }
        })
        .collect()
}
