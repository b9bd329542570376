//! Recorded datasets: named collections of keyframes.
//!
//! The host supplies every dataset wholesale, as a JSON object mapping a
//! dataset key to an array of keyframe records. A bare array is accepted as a
//! single dataset named [`DEFAULT_KEY`].
//!
//! Loading is tolerant per record: a record that cannot be read as a keyframe
//! (missing `id`, `lat`, `lng` or `timestamp`) is skipped with a warning, and
//! the rest of the dataset still loads.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::keyframe::Keyframe;

/// Key given to a dataset supplied as a bare array.
pub const DEFAULT_KEY: &str = "default";

/// Errors raised while reading datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Top level is neither an object nor an array
    #[error("Unsupported dataset layout: expected an object of arrays or an array")]
    UnsupportedLayout,

    #[error("Unknown dataset '{key}' (available: {available})")]
    UnknownKey { key: String, available: String },
}

/// All datasets available to the host, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    sets: BTreeMap<String, Vec<Keyframe>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads datasets from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        debug!("Loading datasets from {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let value: Value = serde_json::from_reader(reader)?;
        Self::from_value(value)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self, DatasetError> {
        let mut dataset = Self::new();
        match value {
            Value::Object(map) => {
                for (key, records) in map {
                    match records {
                        Value::Array(records) => {
                            let keyframes = parse_records(&key, records);
                            dataset.insert(key, keyframes);
                        }
                        _ => warn!("Dataset '{}' is not an array of records, skipping", key),
                    }
                }
            }
            Value::Array(records) => {
                let keyframes = parse_records(DEFAULT_KEY, records);
                dataset.insert(DEFAULT_KEY, keyframes);
            }
            _ => return Err(DatasetError::UnsupportedLayout),
        }
        Ok(dataset)
    }

    /// Adds or replaces a dataset.
    pub fn insert(&mut self, key: impl Into<String>, keyframes: Vec<Keyframe>) {
        self.sets.insert(key.into(), keyframes);
    }

    /// Dataset keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// Returns the keyframes of one dataset.
    pub fn get(&self, key: &str) -> Result<&[Keyframe], DatasetError> {
        self.sets
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| DatasetError::UnknownKey {
                key: key.to_string(),
                available: self.keys().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

fn parse_records(key: &str, records: Vec<Value>) -> Vec<Keyframe> {
    let total = records.len();
    let keyframes: Vec<Keyframe> = records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match serde_json::from_value::<Keyframe>(record) {
            Ok(kf) if kf.lat.is_finite() && kf.lng.is_finite() && kf.timestamp.is_finite() => Some(kf),
            Ok(_) => {
                warn!("Dataset '{}': record {} has non-finite coordinates, skipping", key, idx);
                None
            }
            Err(e) => {
                warn!("Dataset '{}': record {} is malformed ({}), skipping", key, idx, e);
                None
            }
        })
        .collect();

    debug!("Dataset '{}': {} of {} records loaded", key, keyframes.len(), total);
    keyframes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Activity;

    const TWO_SETS: &str = r#"{
        "dev1": [
            {"lat": 0, "lng": 0, "alt": 0, "id": "A1", "timestamp": 0, "floor": "null",
             "horAcc": 3, "verAcc": 1, "locAccConfidence": 0.6, "activity": "walking"},
            {"lat": 1, "lng": 1, "alt": 0, "id": "A1", "timestamp": 1000, "floor": "null",
             "horAcc": 3, "verAcc": 1, "locAccConfidence": 0.6, "activity": "walking"}
        ],
        "dev2": [
            {"lat": 5, "lng": 5, "id": "null", "timestamp": 10, "floor": 3}
        ]
    }"#;

    #[test]
    fn test_load_named_datasets() {
        let dataset = Dataset::from_json_str(TWO_SETS).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.keys().collect::<Vec<_>>(), vec!["dev1", "dev2"]);

        let dev1 = dataset.get("dev1").unwrap();
        assert_eq!(dev1.len(), 2);
        assert_eq!(dev1[0].activity, Activity::Walking);
        assert_eq!(dev1[0].floor, None);

        let dev2 = dataset.get("dev2").unwrap();
        assert_eq!(dev2[0].floor, Some(3));
        assert!(dev2[0].is_anonymous());
    }

    #[test]
    fn test_bare_array_is_default_dataset() {
        let json = r#"[{"id": "A1", "lat": 1, "lng": 2, "timestamp": 0}]"#;
        let dataset = Dataset::from_json_str(json).unwrap();

        assert_eq!(dataset.get(DEFAULT_KEY).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let json = r#"{"dev": [
            {"id": "A1", "lat": 1, "lng": 2, "timestamp": 0},
            {"id": "A1", "lng": 2, "timestamp": 100},
            "not a record",
            {"id": "A1", "lat": 3, "lng": 4, "timestamp": 200}
        ]}"#;
        let dataset = Dataset::from_json_str(json).unwrap();

        let dev = dataset.get("dev").unwrap();
        assert_eq!(dev.len(), 2);
        assert_eq!(dev[1].timestamp, 200.0);
    }

    #[test]
    fn test_unknown_key() {
        let dataset = Dataset::from_json_str(TWO_SETS).unwrap();
        let err = dataset.get("dev3").unwrap_err();

        assert!(matches!(err, DatasetError::UnknownKey { .. }));
        assert!(err.to_string().contains("dev1, dev2"));
    }

    #[test]
    fn test_unsupported_layout() {
        assert!(matches!(
            Dataset::from_json_str("42"),
            Err(DatasetError::UnsupportedLayout)
        ));
        assert!(matches!(Dataset::from_json_str("{"), Err(DatasetError::Json(_))));
    }

    #[test]
    fn test_empty_dataset_loads() {
        let dataset = Dataset::from_json_str(r#"{"empty": []}"#).unwrap();
        assert!(dataset.get("empty").unwrap().is_empty());
    }
}
