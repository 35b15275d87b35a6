use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by keyprint operations.
#[derive(Debug, Error)]
pub enum KeyprintError {
    #[error("model not loaded; call load_model() first")]
    NotLoaded,

    #[error("input size mismatch: got {len} values for {rows}x{cols}")]
    ShapeMismatch { len: usize, rows: usize, cols: usize },

    #[error("read model {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("deserialize model {path:?}: {reason}")]
    Deserialize { path: PathBuf, reason: String },

    #[error("inference: {0}")]
    Inference(String),

    /// The model produced a class outside its own range.
    #[error("inference: label {label} out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Stable status codes reported across the C ABI.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    Ok = 0,
    NotLoaded = 1,
    ShapeMismatch = 2,
    Io = 3,
    Deserialize = 4,
    Inference = 5,
    InvalidArgument = 6,
}

impl KeyprintError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotLoaded => ErrorCode::NotLoaded,
            Self::ShapeMismatch { .. } => ErrorCode::ShapeMismatch,
            Self::Io { .. } => ErrorCode::Io,
            Self::Deserialize { .. } => ErrorCode::Deserialize,
            Self::Inference(_) | Self::LabelOutOfRange { .. } => ErrorCode::Inference,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
        }
    }

    /// True for errors caused by the caller's input rather than by the
    /// model or the filesystem.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. } | Self::Inference(_) | Self::InvalidArgument(_)
        )
    }
}
