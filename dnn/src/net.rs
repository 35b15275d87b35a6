//! The network: an architecture plus its trained layers.

use std::path::Path;

use crate::arch::{Architecture, LayerSpec, default_padding};
use crate::error::DnnError;
use crate::layer::{Conv, Fc, Layer};
use crate::mat::Mat;
use crate::model;

/// Holds a loaded network.
///
/// A Net is read-only after construction and safe to share between
/// threads; `forward` allocates its own intermediate tensors.
#[derive(Debug, Clone, PartialEq)]
pub struct Net {
    arch: Architecture,
    layers: Vec<Layer>,
}

impl Net {
    /// Loads a [`Architecture::TYPING`] model from a file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DnnError> {
        Self::from_file_with(path, Architecture::TYPING)
    }

    /// Loads a model from disk and checks it against `arch`.
    pub fn from_file_with(path: impl AsRef<Path>, arch: Architecture) -> Result<Self, DnnError> {
        let layers = model::read_layers(path.as_ref(), &arch)?;
        Self::from_layers(arch, layers)
    }

    /// Builds a Net from explicit layers.
    pub fn from_layers(arch: Architecture, layers: Vec<Layer>) -> Result<Self, DnnError> {
        arch.check(&layers)?;
        Ok(Self { arch, layers })
    }

    /// Builds a Net for `rows x cols` inputs, filling every parameter in
    /// layer order (weights, then biases) from `param(i)`.
    pub fn from_fn(
        arch: Architecture,
        rows: usize,
        cols: usize,
        mut param: impl FnMut(usize) -> f32,
    ) -> Result<Self, DnnError> {
        let mut next = 0usize;
        let mut take = |n: usize| -> Vec<f32> {
            let v = (next..next + n).map(&mut param).collect();
            next += n;
            v
        };

        let (mut c, mut h, mut w) = (arch.input_channels, rows, cols);
        let mut features: Option<usize> = None;
        let mut layers = Vec::with_capacity(arch.layers.len());
        for (index, spec) in arch.layers.iter().enumerate() {
            let layer = match *spec {
                LayerSpec::Con {
                    filters,
                    nr,
                    nc,
                    stride_y,
                    stride_x,
                } => {
                    let mut conv = Conv {
                        filters,
                        channels: c,
                        nr,
                        nc,
                        stride_y,
                        stride_x,
                        pad_y: default_padding(nr, stride_y),
                        pad_x: default_padding(nc, stride_x),
                        weights: Vec::new(),
                        bias: Vec::new(),
                    };
                    (h, w) = conv.output_dims(h, w).ok_or(DnnError::InputShape {
                        index,
                        expected: nr * nc,
                        got: h * w,
                    })?;
                    c = filters;
                    let count = conv
                        .weight_count()
                        .ok_or_else(|| DnnError::arch(index, "conv weight count overflows"))?;
                    conv.weights = take(count);
                    conv.bias = take(filters);
                    Layer::Con(conv)
                }
                LayerSpec::Relu => Layer::Relu,
                LayerSpec::Fc { outputs } => {
                    let inputs = match features {
                        Some(n) => n,
                        None => c
                            .checked_mul(h)
                            .and_then(|n| n.checked_mul(w))
                            .ok_or_else(|| DnnError::arch(index, "fc input count overflows"))?,
                    };
                    let count = inputs
                        .checked_mul(outputs)
                        .ok_or_else(|| DnnError::arch(index, "fc weight count overflows"))?;
                    features = Some(outputs);
                    Layer::Fc(Fc {
                        inputs,
                        outputs,
                        weights: take(count),
                        bias: take(outputs),
                    })
                }
            };
            layers.push(layer);
        }
        Self::from_layers(arch, layers)
    }

    /// Writes this Net to `path` in the model file format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DnnError> {
        model::write_layers(path.as_ref(), &self.arch, &self.layers)
    }

    pub fn architecture(&self) -> &Architecture {
        &self.arch
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn num_classes(&self) -> usize {
        self.arch.num_classes()
    }

    /// Number of features the first fc layer consumes, i.e. the flattened
    /// size of the last convolution output this Net was trained on.
    pub fn fc_input_len(&self) -> Option<usize> {
        self.layers.iter().find_map(|l| match l {
            Layer::Fc(fc) => Some(fc.inputs),
            _ => None,
        })
    }

    /// Runs the input through every layer and returns the class scores.
    pub fn forward(&self, input: &Mat) -> Result<Mat, DnnError> {
        if input.c() != self.arch.input_channels {
            return Err(DnnError::InputShape {
                index: 0,
                expected: self.arch.input_channels,
                got: input.c(),
            });
        }
        let mut x = input.clone();
        for (index, layer) in self.layers.iter().enumerate() {
            x = layer.forward(index, x)?;
        }
        Ok(x)
    }

    /// Returns the index of the highest class score. Ties resolve to the
    /// lowest index.
    pub fn classify(&self, input: &Mat) -> Result<usize, DnnError> {
        let scores = self.forward(input)?;
        argmax(scores.data()).ok_or(DnnError::EmptyData)
    }
}

fn argmax(scores: &[f32]) -> Option<usize> {
    let (first, rest) = scores.split_first()?;
    let mut best = (0, *first);
    for (i, &s) in rest.iter().enumerate() {
        if s > best.1 || best.1.is_nan() {
            best = (i + 1, s);
        }
    }
    Some(best.0)
}
