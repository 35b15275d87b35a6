use std::path::Path;

use crate::error::KeyprintError;
use crate::sample::Sample;

/// Class index produced by a [`Classifier`].
pub type Label = usize;

/// A loaded model that maps a sample matrix to a class label.
///
/// The service knows nothing about the network behind this trait; the
/// architecture belongs to the implementation.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait Classifier: Send + Sync {
    /// Runs one forward pass and returns the highest-scoring class.
    fn classify(&self, sample: &Sample<'_>) -> Result<Label, KeyprintError>;

    /// Number of classes the model distinguishes (e.g., 10).
    fn num_classes(&self) -> usize;
}

/// Deserializes a [`Classifier`] from a file path.
pub trait ModelLoader: Send + Sync {
    type Model: Classifier;

    /// Reads and validates a model. Fails with [`KeyprintError::Io`] when
    /// the path is unreadable and [`KeyprintError::Deserialize`] when the
    /// content is not a compatible model.
    fn load(&self, path: &Path) -> Result<Self::Model, KeyprintError>;
}
