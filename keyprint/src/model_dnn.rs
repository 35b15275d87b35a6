//! [`Classifier`] implementation backed by `keyprint-dnn`.

use std::path::Path;

use keyprint_dnn::{Architecture, DnnError, Mat, Net};

use crate::classifier::{Classifier, Label, ModelLoader};
use crate::error::KeyprintError;
use crate::sample::Sample;
use crate::service::InferenceService;

/// Inference service over the typing network.
pub type DnnService = InferenceService<DnnLoader>;

/// [`Classifier`] wrapping a loaded [`Net`].
///
/// The sample becomes a single-channel `rows x cols` Mat; values are
/// narrowed to `f32` for the forward pass.
pub struct DnnClassifier {
    net: Net,
}

impl DnnClassifier {
    pub fn from_net(net: Net) -> Self {
        Self { net }
    }

    pub fn net(&self) -> &Net {
        &self.net
    }
}

impl Classifier for DnnClassifier {
    fn classify(&self, sample: &Sample<'_>) -> Result<Label, KeyprintError> {
        let input = Mat::from_f64_2d(sample.cols(), sample.rows(), sample.as_slice())
            .map_err(|e| KeyprintError::Inference(e.to_string()))?;
        self.net.classify(&input).map_err(|e| match e {
            DnnError::InputShape { .. } => KeyprintError::Inference(format!(
                "{}x{} sample does not fit the model: {e}",
                sample.rows(),
                sample.cols()
            )),
            other => KeyprintError::Inference(other.to_string()),
        })
    }

    fn num_classes(&self) -> usize {
        self.net.num_classes()
    }
}

/// Loads [`DnnClassifier`]s and checks them against a fixed architecture.
#[derive(Debug, Clone, Copy)]
pub struct DnnLoader {
    arch: Architecture,
}

impl DnnLoader {
    pub fn new(arch: Architecture) -> Self {
        Self { arch }
    }
}

impl Default for DnnLoader {
    fn default() -> Self {
        Self::new(Architecture::TYPING)
    }
}

impl ModelLoader for DnnLoader {
    type Model = DnnClassifier;

    fn load(&self, path: &Path) -> Result<DnnClassifier, KeyprintError> {
        let net = Net::from_file_with(path, self.arch).map_err(|e| load_error(path, e))?;
        Ok(DnnClassifier::from_net(net))
    }
}

fn load_error(path: &Path, err: DnnError) -> KeyprintError {
    match err {
        DnnError::Io { path, source } => KeyprintError::Io { path, source },
        other => KeyprintError::Deserialize {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_model(dir: &tempfile::TempDir, rows: usize, cols: usize) -> std::path::PathBuf {
        let path = dir.path().join("typing.dnn");
        Net::from_fn(Architecture::TYPING, rows, cols, |i| ((i as f32) * 0.37).sin() * 0.2)
            .unwrap()
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn loads_and_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let model = DnnLoader::default().load(&write_model(&dir, 3, 5)).unwrap();
        let flat: Vec<f64> = (0..15).map(|i| i as f64 * 0.1).collect();
        let label = model.classify(&Sample::new(&flat, 3, 5).unwrap()).unwrap();
        assert!(label < model.num_classes());
        assert_eq!(model.num_classes(), 10);
    }

    #[test]
    fn missing_path_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = DnnLoader::default()
            .load(&dir.path().join("missing.dnn"))
            .err()
            .unwrap();
        assert!(matches!(err, KeyprintError::Io { .. }));
    }

    #[test]
    fn corrupt_file_is_deserialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.dnn");
        std::fs::write(&path, b"\x00\x01\x02").unwrap();
        let err = DnnLoader::default().load(&path).err().unwrap();
        assert!(matches!(err, KeyprintError::Deserialize { .. }));
    }

    #[test]
    fn untrained_shape_is_inference_error() {
        let dir = tempfile::tempdir().unwrap();
        let model = DnnLoader::default().load(&write_model(&dir, 3, 5)).unwrap();
        let flat = [0.0; 20];
        let err = model
            .classify(&Sample::new(&flat, 4, 5).unwrap())
            .unwrap_err();
        assert!(matches!(err, KeyprintError::Inference(_)));
        assert!(err.to_string().contains("4x5"));
    }
}
