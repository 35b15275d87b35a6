//! Keystroke-dynamics classification service.
//!
//! # Architecture
//!
//! ```text
//! digraphs ──flatten──▶ flat [f64], rows, cols
//!                            │
//!                 InferenceService::predict
//!                            │  Sample (row-major view, validated)
//!                            ▼
//!                 Classifier::classify ──▶ label
//! ```
//!
//! 1. [`InferenceService::load_model`]: path -> current model (at most one)
//! 2. [`InferenceService::predict`]: flat sample + dimensions -> class label
//! 3. [`ffi`]: the same two operations as a C ABI over a process-wide service
//!
//! The service is generic over a [`ModelLoader`]; [`DnnLoader`] loads the
//! typing network from `keyprint-dnn`, tests substitute their own.
//!
//! # Replacement Policy
//!
//! [`LoadPolicy::KeepOnFailure`] (default) keeps the previous model current
//! when a load fails. [`LoadPolicy::ReleaseFirst`] drops it before loading,
//! so no two models are ever alive together.

mod classifier;
pub mod digraph;
mod error;
pub mod ffi;
mod model_dnn;
mod sample;
mod service;

pub use classifier::{Classifier, Label, ModelLoader};
pub use digraph::{Digraph, FEATURES_PER_DIGRAPH, TIMING_KEYS, flatten};
pub use error::{ErrorCode, KeyprintError};
pub use model_dnn::{DnnClassifier, DnnLoader, DnnService};
pub use sample::Sample;
pub use service::{InferenceService, LoadPolicy};
