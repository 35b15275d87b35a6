use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by network operations.
#[derive(Debug, Error)]
pub enum DnnError {
    #[error("dnn: read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dnn: decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("dnn: encode: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("dnn: unsupported model format {format:?} version {version}")]
    Format { format: String, version: u32 },

    #[error("dnn: layer {index}: {reason}")]
    Architecture { index: usize, reason: String },

    #[error("dnn: layer {index}: expected {expected} inputs, got {got}")]
    InputShape {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("dnn: empty data")]
    EmptyData,
}

impl DnnError {
    pub(crate) fn arch(index: usize, reason: impl Into<String>) -> Self {
        Self::Architecture {
            index,
            reason: reason.into(),
        }
    }
}
