//! Historical session corpus
//!
//! Turns a directory of monitor logs into labeled delta samples. Each file's
//! name says which cell type was in the charger for the whole session
//! (`aa_` / `aaa_`); each measurement line says what the firmware detected.
//! Together they sort every delta into one of four sets.

mod collector;
mod parser;

pub use collector::{collect_samples, list_log_files, SkippedFile, LOG_EXTENSION};
pub use parser::{
    class_hint, parse_content, parse_file_stamp, parse_measurement, parse_summary_time,
    LineStatus, MeasurementLine,
};

use crate::models::{CellType, LabeledSampleSet, ObservationRecord};

/// The four disjoint sample sets of one extraction batch
#[derive(Debug, Clone)]
pub struct SampleCorpus {
    pub aa_correct: LabeledSampleSet,
    pub aa_as_aaa: LabeledSampleSet,
    pub aaa_correct: LabeledSampleSet,
    pub aaa_as_aa: LabeledSampleSet,
    pub files_used: usize,
    pub unattributed_files: usize,
    pub skipped: Vec<SkippedFile>,
}

impl Default for SampleCorpus {
    fn default() -> Self {
        Self {
            aa_correct: LabeledSampleSet::new("AA correct", CellType::Aa, CellType::Aa),
            aa_as_aaa: LabeledSampleSet::new("AA misdetected as AAA", CellType::Aa, CellType::Aaa),
            aaa_correct: LabeledSampleSet::new("AAA correct", CellType::Aaa, CellType::Aaa),
            aaa_as_aa: LabeledSampleSet::new("AAA misdetected as AA", CellType::Aaa, CellType::Aa),
            files_used: 0,
            unattributed_files: 0,
            skipped: Vec::new(),
        }
    }
}

impl SampleCorpus {
    /// Build a corpus straight from delta lists (tests, replays)
    pub fn from_deltas(
        aa_correct: Vec<i64>,
        aa_as_aaa: Vec<i64>,
        aaa_correct: Vec<i64>,
        aaa_as_aa: Vec<i64>,
    ) -> Self {
        let mut corpus = Self::default();
        corpus.aa_correct.deltas = aa_correct;
        corpus.aa_as_aaa.deltas = aa_as_aaa;
        corpus.aaa_correct.deltas = aaa_correct;
        corpus.aaa_as_aa.deltas = aaa_as_aa;
        corpus
    }

    /// File a record into its set. Records without ground truth are dropped.
    pub fn push(&mut self, record: &ObservationRecord) -> bool {
        let Some(expected) = record.expected else {
            return false;
        };
        let set = match (expected, record.observed) {
            (CellType::Aa, CellType::Aa) => &mut self.aa_correct,
            (CellType::Aa, CellType::Aaa) => &mut self.aa_as_aaa,
            (CellType::Aaa, CellType::Aaa) => &mut self.aaa_correct,
            (CellType::Aaa, CellType::Aa) => &mut self.aaa_as_aa,
        };
        set.deltas.push(record.delta_mv);
        true
    }

    /// Correctly detected samples of `class`
    pub fn correct(&self, class: CellType) -> &LabeledSampleSet {
        match class {
            CellType::Aa => &self.aa_correct,
            CellType::Aaa => &self.aaa_correct,
        }
    }

    /// Samples of true class `class` that the firmware got wrong
    pub fn misdetected(&self, class: CellType) -> &LabeledSampleSet {
        match class {
            CellType::Aa => &self.aa_as_aaa,
            CellType::Aaa => &self.aaa_as_aa,
        }
    }

    pub fn total(&self) -> usize {
        self.aa_correct.len() + self.aa_as_aaa.len() + self.aaa_correct.len() + self.aaa_as_aa.len()
    }

    pub fn sets(&self) -> [&LabeledSampleSet; 4] {
        [
            &self.aa_correct,
            &self.aa_as_aaa,
            &self.aaa_correct,
            &self.aaa_as_aa,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expected: Option<CellType>, observed: CellType, delta: i64) -> ObservationRecord {
        ObservationRecord {
            expected,
            observed,
            on_mv: 1000 + delta,
            off_mv: 1000,
            delta_mv: delta,
            slot: 0,
            timestamp: None,
        }
    }

    #[test]
    fn test_every_record_lands_in_exactly_one_set() {
        let mut corpus = SampleCorpus::default();
        let records = [
            record(Some(CellType::Aa), CellType::Aa, 1),
            record(Some(CellType::Aa), CellType::Aaa, 290),
            record(Some(CellType::Aaa), CellType::Aaa, 310),
            record(Some(CellType::Aaa), CellType::Aa, 20),
            record(None, CellType::Aa, 5),
        ];
        let pushed = records.iter().filter(|r| corpus.push(r)).count();

        assert_eq!(pushed, 4);
        assert_eq!(corpus.total(), 4);
        for set in corpus.sets() {
            assert_eq!(set.len(), 1);
        }
        assert_eq!(corpus.misdetected(CellType::Aaa).deltas, vec![20]);
        assert_eq!(corpus.correct(CellType::Aaa).deltas, vec![310]);
    }
}
