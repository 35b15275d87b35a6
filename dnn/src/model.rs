//! On-disk model format.
//!
//! A model file is a JSON document:
//!
//! ```text
//! {
//!   "format": "keyprint-dnn",
//!   "version": 1,
//!   "architecture": "typing-cnn",
//!   "layers": [
//!     {"type": "con", "filters": 6, "channels": 1, "nr": 2, "nc": 2, ...},
//!     {"type": "relu"},
//!     ...
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arch::Architecture;
use crate::error::DnnError;
use crate::layer::Layer;

/// Value of the `format` header field.
pub const FORMAT: &str = "keyprint-dnn";

/// Current `version` header field.
pub const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    format: String,
    version: u32,
    architecture: String,
    layers: Vec<Layer>,
}

/// Reads a model file and returns its layers after checking the header.
/// Layer shapes are checked by the caller against `arch`.
pub(crate) fn read_layers(path: &Path, arch: &Architecture) -> Result<Vec<Layer>, DnnError> {
    let bytes = fs::read(path).map_err(|source| DnnError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(DnnError::EmptyData);
    }
    let file: ModelFile = serde_json::from_slice(&bytes).map_err(|source| DnnError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    if file.format != FORMAT || file.version != VERSION {
        return Err(DnnError::Format {
            format: file.format,
            version: file.version,
        });
    }
    if file.architecture != arch.name {
        return Err(DnnError::arch(
            0,
            format!(
                "model is {:?}, expected {:?}",
                file.architecture, arch.name
            ),
        ));
    }
    Ok(file.layers)
}

pub(crate) fn write_layers(
    path: &Path,
    arch: &Architecture,
    layers: &[Layer],
) -> Result<(), DnnError> {
    let file = ModelFile {
        format: FORMAT.to_string(),
        version: VERSION,
        architecture: arch.name.to_string(),
        layers: layers.to_vec(),
    };
    let bytes = serde_json::to_vec(&file)?;
    fs::write(path, bytes).map_err(|source| DnnError::Io {
        path: path.to_path_buf(),
        source,
    })
}
