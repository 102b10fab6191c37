use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geo_types::Coord;
use serde::Serializer;
use serde_derive::Serialize;

use super::vessel::Direction;

/// Fraction of the route covered, or `NoData` when the fix could not be
/// matched to the route at all. `NoData` serializes as `null`, never `0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Matched(f64),
    NoData,
}

impl Progress {
    pub fn value(&self) -> Option<f64> {
        match self {
            Progress::Matched(value) => Some(*value),
            Progress::NoData => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Progress::Matched(_))
    }
}

impl serde::Serialize for Progress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.value(), serializer)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Matched,
    NoData,
    Default,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProgressRecord {
    pub vessel_key: String,
    pub vessel_name: String,
    pub progress: Progress,
    pub direction: Direction,
    pub at_dock: bool,
    pub defaulted: bool,
    pub computed_at: DateTime<Utc>,
    pub source_timestamp: Option<DateTime<Utc>>,

    // Matching internals, only interesting on the debug endpoints
    pub position: Option<Coord>,
    pub segment_index: Option<usize>,
    pub match_distance_m: Option<f64>,
}

impl ProgressRecord {
    pub fn placeholder(index: usize, computed_at: DateTime<Utc>) -> Self {
        Self {
            vessel_key: Self::placeholder_key(index),
            vessel_name: String::new(),
            progress: Progress::Matched(0.0),
            direction: Direction::Unknown,
            at_dock: true,
            defaulted: true,
            computed_at,
            source_timestamp: None,
            position: None,
            segment_index: None,
            match_distance_m: None,
        }
    }

    pub fn placeholder_key(index: usize) -> String {
        format!("default-{}", index)
    }

    pub fn status(&self) -> RecordStatus {
        if self.defaulted {
            RecordStatus::Default
        } else if self.progress.is_matched() {
            RecordStatus::Matched
        } else {
            RecordStatus::NoData
        }
    }
}

/// Every vessel's latest record, stamped with the time of the poll that
/// produced it. `last_updated` is `None` until the first successful poll.
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub records: BTreeMap<String, ProgressRecord>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(last_updated: DateTime<Utc>) -> Self {
        Self {
            records: BTreeMap::new(),
            last_updated: Some(last_updated),
        }
    }

    pub fn placeholders(minimum: usize, now: DateTime<Utc>) -> Self {
        let mut snapshot = Snapshot::default();
        snapshot.fill_to_minimum(minimum, now);
        snapshot
    }

    pub fn insert(&mut self, record: ProgressRecord) {
        self.records.insert(record.vessel_key.clone(), record);
    }

    pub fn get(&self, key: &str) -> Option<&ProgressRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn defaulted_count(&self) -> usize {
        self.records.values().filter(|record| record.defaulted).count()
    }

    /// Pads with defaulted records until at least `minimum` vessels are present.
    pub fn fill_to_minimum(&mut self, minimum: usize, now: DateTime<Utc>) {
        let mut index = 0;
        while self.records.len() < minimum {
            let key = ProgressRecord::placeholder_key(index);
            if !self.records.contains_key(&key) {
                self.insert(ProgressRecord::placeholder(index, now));
            }
            index += 1;
        }
    }

    /// Seconds since the last successful poll.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_updated
            .map(|updated| (now - updated).num_milliseconds().max(0) as f64 / 1000.0)
    }
}
