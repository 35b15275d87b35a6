//! Offline prediction over the first rows of a dataset.

use std::path::Path;

use anyhow::{Context, Result, bail};
use keyprint::{DnnLoader, DnnService, FEATURES_PER_DIGRAPH, TIMING_KEYS};

use crate::store::{Row, participants_in_order, read_records};

#[derive(Debug, PartialEq)]
pub struct Prediction {
    pub index: usize,
    /// Participants in class-index order.
    pub class_labels: Vec<String>,
}

impl Prediction {
    pub fn participant(&self) -> Option<&str> {
        self.class_labels.get(self.index).map(String::as_str)
    }
}

/// Flattens the timing columns of the first `rows` records into a
/// `rows x 5` sample.
pub fn sample_from_rows(records: &[Row], rows: usize) -> Result<Vec<f64>> {
    if records.len() < rows {
        bail!("dataset has {} rows, need {rows}", records.len());
    }
    let mut flat = Vec::with_capacity(rows * FEATURES_PER_DIGRAPH);
    for (i, record) in records.iter().take(rows).enumerate() {
        for key in TIMING_KEYS {
            let raw = record
                .get(key)
                .with_context(|| format!("row {i}: missing column {key}"))?;
            let v: f64 = raw
                .parse()
                .with_context(|| format!("row {i}: {key} = {raw:?} is not a number"))?;
            flat.push(v);
        }
    }
    Ok(flat)
}

pub fn run(model: &Path, csv_path: &Path, rows: usize) -> Result<Prediction> {
    let service = DnnService::new(DnnLoader::default());
    service.load_model(model)?;

    // The sample is the first rows of the file as written, incomplete or not.
    let records = read_records(csv_path)?;
    if records.is_empty() {
        bail!("no usable rows in {}", csv_path.display());
    }

    let flat = sample_from_rows(&records, rows)?;
    let index = service.predict(&flat, rows, FEATURES_PER_DIGRAPH)?;
    Ok(Prediction {
        index,
        class_labels: participants_in_order(&records),
    })
}
