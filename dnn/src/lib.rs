//! Convolutional typing classifier.
//!
//! This crate owns everything about the network itself: the tensor type,
//! the layer implementations, the fixed architecture a model must match and
//! the on-disk model format. Callers only load a [`Net`] and ask it for a
//! class.
//!
//! # Usage
//!
//! ```no_run
//! use keyprint_dnn::{Mat, Net};
//!
//! let net = Net::from_file("typing.dnn").unwrap();
//! let sample = [0.0f64; 15];
//! let input = Mat::from_f64_2d(5, 3, &sample).unwrap();
//! let label = net.classify(&input).unwrap();
//! assert!(label < net.num_classes());
//! ```
//!
//! # Architecture
//!
//! ```text
//! input [rows, cols]
//!   -> con<6, 2x2, stride 1>  -> relu
//!   -> con<16, 2x2, stride 1> -> relu
//!   -> fc<120> -> relu -> fc<84> -> relu -> fc<10>
//!   -> argmax
//! ```
//!
//! The first fc layer's input size fixes the sample shape a model accepts;
//! a model trained on `3 x 5` samples rejects `4 x 5` ones.

mod arch;
mod error;
mod layer;
mod mat;
pub mod model;
mod net;

pub use arch::{Architecture, LayerSpec, default_padding};
pub use error::DnnError;
pub use layer::{Conv, Fc, Layer, relu};
pub use mat::Mat;
pub use net::Net;
