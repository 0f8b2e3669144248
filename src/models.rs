//! Core data models for deltacal
//!
//! These models are shared by the corpus extractor, the calibrator and the
//! live monitor: the two cell classes, a single observation, and the
//! labeled sample sets built from a batch of observations.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The two cell classes the charger has to tell apart.
///
/// AA cells show a delta near 0 mV, AAA cells a delta near 300 mV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Aa,
    Aaa,
}

impl CellType {
    pub fn all() -> &'static [CellType] {
        &[CellType::Aa, CellType::Aaa]
    }

    /// Resolve a detector token such as `KLVR-AAA` into a class.
    ///
    /// `AAA` wins over `AA` because every AAA token also contains `AA`.
    pub fn resolve(token: &str) -> Option<CellType> {
        let upper = token.to_ascii_uppercase();
        if upper.contains("AAA") {
            Some(CellType::Aaa)
        } else if upper.contains("AA") {
            Some(CellType::Aa)
        } else {
            None
        }
    }

    pub fn other(&self) -> CellType {
        match self {
            CellType::Aa => CellType::Aaa,
            CellType::Aaa => CellType::Aa,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CellType::Aa => "AA",
            CellType::Aaa => "AAA",
        }
    }

    /// Prefix used for the generated `#define` constants
    pub fn constant_prefix(&self) -> &'static str {
        match self {
            CellType::Aa => "AA_DETECTION_DELTA",
            CellType::Aaa => "AAA_DETECTION_DELTA",
        }
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the operator declared to be in the charger for a monitoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Only AA cells inserted; AAA detections are misdetections
    Aa,
    /// Only AAA cells inserted; AA detections are detection failures
    Aaa,
    /// Mixed or unknown contents; tally only
    Both,
}

impl TestMode {
    /// The class every occupied slot should resolve to, if constrained
    pub fn expected(&self) -> Option<CellType> {
        match self {
            TestMode::Aa => Some(CellType::Aa),
            TestMode::Aaa => Some(CellType::Aaa),
            TestMode::Both => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            TestMode::Aa => "aa",
            TestMode::Aaa => "aaa",
            TestMode::Both => "both",
        }
    }
}

impl FromStr for TestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aa" => Ok(TestMode::Aa),
            "aaa" => Ok(TestMode::Aaa),
            "both" => Ok(TestMode::Both),
            other => Err(format!(
                "invalid test mode '{}'. Use: aa, aaa, or both",
                other
            )),
        }
    }
}

impl std::fmt::Display for TestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// One measurement event, either parsed from a session log or taken from a
/// live status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Ground truth from context (file hint or test mode), if known
    pub expected: Option<CellType>,
    /// Class the charger firmware assigned
    pub observed: CellType,
    pub on_mv: i64,
    pub off_mv: i64,
    /// Signed delta as reported by the firmware
    pub delta_mv: i64,
    pub slot: u32,
    pub timestamp: Option<NaiveDateTime>,
}

impl ObservationRecord {
    /// A detection is correct when the observed class matches a known expectation.
    pub fn is_correct(&self) -> Option<bool> {
        self.expected.map(|e| e == self.observed)
    }
}

/// Deltas that share an `(expected, observed)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSampleSet {
    pub name: String,
    pub expected: Option<CellType>,
    pub observed: Option<CellType>,
    pub deltas: Vec<i64>,
}

impl LabeledSampleSet {
    pub fn new(name: impl Into<String>, expected: CellType, observed: CellType) -> Self {
        Self {
            name: name.into(),
            expected: Some(expected),
            observed: Some(observed),
            deltas: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.deltas
    }
}
