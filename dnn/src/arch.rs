//! Fixed network architectures a model file must match.

use crate::error::DnnError;
use crate::layer::Layer;

/// Shape of one layer, without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSpec {
    Con {
        filters: usize,
        nr: usize,
        nc: usize,
        stride_y: usize,
        stride_x: usize,
    },
    Relu,
    Fc {
        outputs: usize,
    },
}

impl LayerSpec {
    pub const fn con(
        filters: usize,
        nr: usize,
        nc: usize,
        stride_y: usize,
        stride_x: usize,
    ) -> Self {
        LayerSpec::Con {
            filters,
            nr,
            nc,
            stride_y,
            stride_x,
        }
    }

    pub const fn fc(outputs: usize) -> Self {
        LayerSpec::Fc { outputs }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LayerSpec::Con { .. } => "con",
            LayerSpec::Relu => "relu",
            LayerSpec::Fc { .. } => "fc",
        }
    }
}

/// Padding a convolution uses along one axis: half the kernel when the
/// stride is 1, none otherwise.
pub const fn default_padding(kernel: usize, stride: usize) -> usize {
    if stride == 1 { kernel / 2 } else { 0 }
}

/// A named, ordered list of layer shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Architecture {
    pub name: &'static str,
    pub input_channels: usize,
    pub layers: &'static [LayerSpec],
}

impl Architecture {
    /// Two convolution stages and three fully-connected stages, each
    /// followed by a rectifier except the last, over 10 classes.
    ///
    /// Input: [rows, cols] single-channel matrix (digraphs x timing features)
    /// Output: [10] class scores
    pub const TYPING: Architecture = Architecture {
        name: "typing-cnn",
        input_channels: 1,
        layers: &[
            LayerSpec::con(6, 2, 2, 1, 1),
            LayerSpec::Relu,
            LayerSpec::con(16, 2, 2, 1, 1),
            LayerSpec::Relu,
            LayerSpec::fc(120),
            LayerSpec::Relu,
            LayerSpec::fc(84),
            LayerSpec::Relu,
            LayerSpec::fc(10),
        ],
    };

    /// Number of output classes (outputs of the final fc layer).
    pub fn num_classes(&self) -> usize {
        match self.layers.last() {
            Some(LayerSpec::Fc { outputs }) => *outputs,
            _ => 0,
        }
    }

    /// Checks that `layers` implement this architecture, including the
    /// channel and feature chain between consecutive layers.
    pub fn check(&self, layers: &[Layer]) -> Result<(), DnnError> {
        if layers.len() != self.layers.len() {
            return Err(DnnError::arch(
                layers.len().min(self.layers.len()),
                format!(
                    "{} expects {} layers, got {}",
                    self.name,
                    self.layers.len(),
                    layers.len()
                ),
            ));
        }

        let mut channels = self.input_channels;
        let mut features: Option<usize> = None;
        for (index, (spec, layer)) in self.layers.iter().zip(layers).enumerate() {
            match (spec, layer) {
                (
                    LayerSpec::Con {
                        filters,
                        nr,
                        nc,
                        stride_y,
                        stride_x,
                    },
                    Layer::Con(conv),
                ) => {
                    if features.is_some() {
                        return Err(DnnError::arch(index, "con after fc"));
                    }
                    let shape = (conv.filters, conv.nr, conv.nc, conv.stride_y, conv.stride_x);
                    if shape != (*filters, *nr, *nc, *stride_y, *stride_x) {
                        return Err(DnnError::arch(
                            index,
                            format!(
                                "expected con<{filters},{nr},{nc},{stride_y},{stride_x}>, got con<{},{},{},{},{}>",
                                conv.filters, conv.nr, conv.nc, conv.stride_y, conv.stride_x
                            ),
                        ));
                    }
                    let pad = (default_padding(*nr, *stride_y), default_padding(*nc, *stride_x));
                    if (conv.pad_y, conv.pad_x) != pad {
                        return Err(DnnError::arch(
                            index,
                            format!("expected padding {pad:?}, got ({}, {})", conv.pad_y, conv.pad_x),
                        ));
                    }
                    if conv.channels != channels {
                        return Err(DnnError::arch(
                            index,
                            format!("expected {channels} input channels, got {}", conv.channels),
                        ));
                    }
                    conv.validate(index)?;
                    channels = conv.filters;
                }
                (LayerSpec::Relu, Layer::Relu) => {}
                (LayerSpec::Fc { outputs }, Layer::Fc(fc)) => {
                    if fc.outputs != *outputs {
                        return Err(DnnError::arch(
                            index,
                            format!("expected fc<{outputs}>, got fc<{}>", fc.outputs),
                        ));
                    }
                    match features {
                        Some(prev) if fc.inputs != prev => {
                            return Err(DnnError::arch(
                                index,
                                format!("expected {prev} inputs, got {}", fc.inputs),
                            ));
                        }
                        None if fc.inputs % channels != 0 => {
                            return Err(DnnError::arch(
                                index,
                                format!("{} inputs is not a multiple of {channels} channels", fc.inputs),
                            ));
                        }
                        _ => {}
                    }
                    fc.validate(index)?;
                    features = Some(fc.outputs);
                }
                (spec, layer) => {
                    return Err(DnnError::arch(
                        index,
                        format!("expected {}, got {}", spec.kind(), layer.kind()),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_has_ten_classes() {
        assert_eq!(Architecture::TYPING.num_classes(), 10);
        assert_eq!(Architecture::TYPING.layers.len(), 9);
    }

    #[test]
    fn padding_follows_stride() {
        assert_eq!(default_padding(2, 1), 1);
        assert_eq!(default_padding(5, 1), 2);
        assert_eq!(default_padding(2, 2), 0);
    }

    #[test]
    fn check_rejects_wrong_layer_count() {
        let err = Architecture::TYPING.check(&[Layer::Relu]).unwrap_err();
        assert!(err.to_string().contains("expects 9 layers"));
    }

    #[test]
    fn check_rejects_wrong_kind() {
        let layers = vec![Layer::Relu; 9];
        let err = Architecture::TYPING.check(&layers).unwrap_err();
        assert!(matches!(err, DnnError::Architecture { index: 0, .. }));
    }
}
