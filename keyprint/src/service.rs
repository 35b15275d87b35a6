//! The inference service: one model slot, `load_model` and `predict`.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::{Classifier, Label, ModelLoader};
use crate::error::KeyprintError;
use crate::sample::Sample;

/// What happens to the current model when a replacement is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Deserialize the new model first; swap it in and drop the old one
    /// only on success. A failed load leaves the old model current.
    #[default]
    KeepOnFailure,
    /// Drop the current model before deserializing, so two models are
    /// never alive at once. A failed load leaves no model current.
    ReleaseFirst,
}

struct Loaded<M> {
    model: M,
    path: PathBuf,
}

/// Holds at most one loaded model and runs validated inference on it.
///
/// # Thread Safety
///
/// The model slot is guarded by a single RwLock. `predict` holds a read
/// guard for the duration of the forward pass, so predictions run in
/// parallel; `load_model` and `unload` take the write guard to swap the
/// slot and wait for in-flight predictions to finish.
pub struct InferenceService<L: ModelLoader> {
    loader: L,
    policy: LoadPolicy,
    slot: RwLock<Option<Loaded<L::Model>>>,
}

impl<L: ModelLoader> InferenceService<L> {
    /// Creates an empty service with [`LoadPolicy::KeepOnFailure`].
    pub fn new(loader: L) -> Self {
        Self::with_policy(loader, LoadPolicy::default())
    }

    pub fn with_policy(loader: L, policy: LoadPolicy) -> Self {
        Self {
            loader,
            policy,
            slot: RwLock::new(None),
        }
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    /// Loads the model at `path` and makes it current, releasing the
    /// previous one.
    pub fn load_model(&self, path: impl AsRef<Path>) -> Result<(), KeyprintError> {
        let path = path.as_ref();
        match self.policy {
            LoadPolicy::KeepOnFailure => {
                let model = self.loader.load(path).inspect_err(|e| {
                    warn!(path = %path.display(), error = %e, "model load failed, keeping current model");
                })?;
                let classes = model.num_classes();
                let previous = self.slot.write().replace(Loaded {
                    model,
                    path: path.to_path_buf(),
                });
                // Released outside the lock.
                drop(previous);
                info!(path = %path.display(), classes, "model loaded");
            }
            LoadPolicy::ReleaseFirst => {
                let mut slot = self.slot.write();
                if let Some(old) = slot.take() {
                    debug!(path = %old.path.display(), "releasing model");
                    drop(old);
                }
                let model = self.loader.load(path).inspect_err(|e| {
                    warn!(path = %path.display(), error = %e, "model load failed, no model loaded");
                })?;
                let classes = model.num_classes();
                *slot = Some(Loaded {
                    model,
                    path: path.to_path_buf(),
                });
                info!(path = %path.display(), classes, "model loaded");
            }
        }
        Ok(())
    }

    /// Reshapes `flat` into a `rows x cols` row-major matrix and returns
    /// the current model's class for it.
    pub fn predict(&self, flat: &[f64], rows: usize, cols: usize) -> Result<Label, KeyprintError> {
        let slot = self.slot.read();
        let loaded = slot.as_ref().ok_or(KeyprintError::NotLoaded)?;
        let sample = Sample::new(flat, rows, cols)?;

        let label = loaded.model.classify(&sample)?;
        let classes = loaded.model.num_classes();
        if label >= classes {
            return Err(KeyprintError::LabelOutOfRange { label, classes });
        }
        debug!(rows, cols, label, "predicted");
        Ok(label)
    }

    /// Releases the current model. Returns false if none was loaded.
    pub fn unload(&self) -> bool {
        let previous = self.slot.write().take();
        match previous {
            Some(old) => {
                info!(path = %old.path.display(), "model unloaded");
                true
            }
            None => false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Path the current model was loaded from.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.slot.read().as_ref().map(|l| l.path.clone())
    }

    pub fn num_classes(&self) -> Option<usize> {
        self.slot.read().as_ref().map(|l| l.model.num_classes())
    }
}
