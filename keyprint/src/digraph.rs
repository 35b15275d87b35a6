//! Keystroke digraphs and their flattening into a sample.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timing features recorded per digraph.
pub const FEATURES_PER_DIGRAPH: usize = 5;

/// Column names of the timing features, in sample order.
///
/// `DU` is key-down to key-up, `DD` down to down, `UD` up to down and `UU`
/// up to up. `key1.key1` is the hold time of the first key.
pub const TIMING_KEYS: [&str; FEATURES_PER_DIGRAPH] = [
    "DU.key1.key1",
    "DD.key1.key2",
    "DU.key1.key2",
    "UD.key1.key2",
    "UU.key1.key2",
];

/// Two consecutive keystrokes and their timing features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digraph {
    pub key1: String,
    pub key2: String,
    pub features: [f64; FEATURES_PER_DIGRAPH],
}

impl Digraph {
    /// Returns a digraph if both keys are single characters and every
    /// feature is finite.
    pub fn new(key1: &str, key2: &str, features: [f64; FEATURES_PER_DIGRAPH]) -> Option<Self> {
        if !is_single_char(key1) || !is_single_char(key2) {
            return None;
        }
        if !features.iter().all(|f| f.is_finite()) {
            return None;
        }
        Some(Self {
            key1: key1.to_string(),
            key2: key2.to_string(),
            features,
        })
    }

    /// Parses `{"key1": "a", "key2": "b", "features": [n, n, n, n, n]}`.
    /// Returns `None` for anything that does not validate.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let key1 = obj.get("key1")?.as_str()?;
        let key2 = obj.get("key2")?.as_str()?;
        let raw = obj.get("features")?.as_array()?;
        if raw.len() != FEATURES_PER_DIGRAPH {
            return None;
        }
        let mut features = [0.0; FEATURES_PER_DIGRAPH];
        for (slot, v) in features.iter_mut().zip(raw) {
            *slot = v.as_f64()?;
        }
        Self::new(key1, key2, features)
    }
}

fn is_single_char(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some() && chars.next().is_none()
}

/// Flattens digraphs row by row into a `len x FEATURES_PER_DIGRAPH` sample.
/// Returns the flat values, rows and cols.
pub fn flatten(digraphs: &[Digraph]) -> (Vec<f64>, usize, usize) {
    let flat = digraphs.iter().flat_map(|d| d.features).collect();
    (flat, digraphs.len(), FEATURES_PER_DIGRAPH)
}
