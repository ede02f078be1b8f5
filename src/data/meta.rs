//! Key-value metadata attached to a dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Dataset metadata as string keys to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaData(BTreeMap<String, serde_json::Value>);

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Numeric value of a key, if present and numeric.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(serde_json::Value::as_f64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Merge metadata of an appended slice.
    ///
    /// Keys already present keep their value; new keys are added.
    pub fn merge(&mut self, other: MetaData) {
        for (key, value) in other.0 {
            match self.0.get(&key) {
                Some(existing) if *existing != value => {
                    log::trace!("MetaData: keeping '{}' = {} (ignoring {})", key, existing, value);
                }
                Some(_) => {}
                None => {
                    self.0.insert(key, value);
                }
            }
        }
    }
}

impl FromIterator<(String, serde_json::Value)> for MetaData {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
