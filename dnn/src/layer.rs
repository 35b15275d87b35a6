//! Layer implementations: convolution, rectifier and fully-connected.

use serde::{Deserialize, Serialize};

use crate::error::DnnError;
use crate::mat::Mat;

// ---------------------------------------------------------------------------
// Conv
// ---------------------------------------------------------------------------

/// 2D convolution (cross-correlation) with zero padding.
///
/// Weights are laid out `[filter][channel][ky][kx]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv {
    pub filters: usize,
    pub channels: usize,
    pub nr: usize,
    pub nc: usize,
    pub stride_y: usize,
    pub stride_x: usize,
    pub pad_y: usize,
    pub pad_x: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Conv {
    /// Number of weights a filter bank of this shape carries, or `None`
    /// if it does not fit in `usize`.
    pub fn weight_count(&self) -> Option<usize> {
        self.filters
            .checked_mul(self.channels)?
            .checked_mul(self.nr)?
            .checked_mul(self.nc)
    }

    /// Output (rows, cols) for an `h x w` input, or `None` if the kernel
    /// does not fit the padded input.
    pub fn output_dims(&self, h: usize, w: usize) -> Option<(usize, usize)> {
        let padded_h = h + 2 * self.pad_y;
        let padded_w = w + 2 * self.pad_x;
        if padded_h < self.nr || padded_w < self.nc || self.stride_y == 0 || self.stride_x == 0 {
            return None;
        }
        Some((
            1 + (padded_h - self.nr) / self.stride_y,
            1 + (padded_w - self.nc) / self.stride_x,
        ))
    }

    pub(crate) fn validate(&self, index: usize) -> Result<(), DnnError> {
        if self.filters == 0 || self.channels == 0 || self.nr == 0 || self.nc == 0 {
            return Err(DnnError::arch(index, "conv dimensions must be positive"));
        }
        if self.stride_y == 0 || self.stride_x == 0 {
            return Err(DnnError::arch(index, "conv stride must be positive"));
        }
        let expected = self
            .weight_count()
            .ok_or_else(|| DnnError::arch(index, "conv weight count overflows"))?;
        if self.weights.len() != expected {
            return Err(DnnError::arch(
                index,
                format!("conv expects {expected} weights, got {}", self.weights.len()),
            ));
        }
        if self.bias.len() != self.filters {
            return Err(DnnError::arch(
                index,
                format!("conv expects {} biases, got {}", self.filters, self.bias.len()),
            ));
        }
        Ok(())
    }

    pub fn forward(&self, index: usize, input: &Mat) -> Result<Mat, DnnError> {
        if input.c() != self.channels {
            return Err(DnnError::InputShape {
                index,
                expected: self.channels,
                got: input.c(),
            });
        }
        let (h, w) = (input.h(), input.w());
        let (oh, ow) = self.output_dims(h, w).ok_or(DnnError::InputShape {
            index,
            expected: self.nr * self.nc,
            got: h * w,
        })?;

        let mut out = Mat::zeros(ow, oh, self.filters);
        let data = out.data_mut();
        for f in 0..self.filters {
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut sum = self.bias[f];
                    for ch in 0..self.channels {
                        for ky in 0..self.nr {
                            let iy = (oy * self.stride_y + ky) as isize - self.pad_y as isize;
                            if iy < 0 || iy >= h as isize {
                                continue;
                            }
                            for kx in 0..self.nc {
                                let ix = (ox * self.stride_x + kx) as isize - self.pad_x as isize;
                                if ix < 0 || ix >= w as isize {
                                    continue;
                                }
                                let wi = ((f * self.channels + ch) * self.nr + ky) * self.nc + kx;
                                sum += self.weights[wi] * input.at(ch, iy as usize, ix as usize);
                            }
                        }
                    }
                    data[(f * oh + oy) * ow + ox] = sum;
                }
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Fc
// ---------------------------------------------------------------------------

/// Fully-connected layer over the flattened input.
///
/// Weights are laid out `[output][input]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fc {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Fc {
    pub(crate) fn validate(&self, index: usize) -> Result<(), DnnError> {
        if self.inputs == 0 || self.outputs == 0 {
            return Err(DnnError::arch(index, "fc dimensions must be positive"));
        }
        let expected = self
            .inputs
            .checked_mul(self.outputs)
            .ok_or_else(|| DnnError::arch(index, "fc weight count overflows"))?;
        if self.weights.len() != expected {
            return Err(DnnError::arch(
                index,
                format!("fc expects {expected} weights, got {}", self.weights.len()),
            ));
        }
        if self.bias.len() != self.outputs {
            return Err(DnnError::arch(
                index,
                format!("fc expects {} biases, got {}", self.outputs, self.bias.len()),
            ));
        }
        Ok(())
    }

    pub fn forward(&self, index: usize, input: &Mat) -> Result<Mat, DnnError> {
        let x = input.data();
        if x.len() != self.inputs {
            return Err(DnnError::InputShape {
                index,
                expected: self.inputs,
                got: x.len(),
            });
        }
        let out: Vec<f32> = self
            .weights
            .chunks_exact(self.inputs)
            .zip(&self.bias)
            .map(|(row, b)| b + row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>())
            .collect();
        Ok(Mat::from_vec(self.outputs, 1, 1, out))
    }
}

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// One stage of a network, as stored in a model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Con(Conv),
    Relu,
    Fc(Fc),
}

impl Layer {
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Con(_) => "con",
            Layer::Relu => "relu",
            Layer::Fc(_) => "fc",
        }
    }

    pub fn forward(&self, index: usize, input: Mat) -> Result<Mat, DnnError> {
        match self {
            Layer::Con(conv) => conv.forward(index, &input),
            Layer::Relu => {
                let mut out = input;
                relu(&mut out);
                Ok(out)
            }
            Layer::Fc(fc) => fc.forward(index, &input),
        }
    }
}

/// Clamps negative activations to zero in place.
pub fn relu(mat: &mut Mat) {
    for v in mat.data_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}
