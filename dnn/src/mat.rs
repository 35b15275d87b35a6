//! Dense `c x h x w` tensor used as layer input and output.

use crate::error::DnnError;

/// N-dimensional tensor for input/output data.
///
/// Storage is channel-major, then row-major: element `(c, y, x)` lives at
/// `(c * h + y) * w + x`. A 2D Mat has a single channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Mat {
    w: usize,
    h: usize,
    c: usize,
    data: Vec<f32>,
}

impl Mat {
    /// Creates a 2D Mat (h rows x w cols) from row-major data.
    pub fn new_2d(w: usize, h: usize, data: &[f32]) -> Result<Self, DnnError> {
        Self::new_3d(w, h, 1, data)
    }

    /// Creates a 3D Mat (c channels x h rows x w cols).
    pub fn new_3d(w: usize, h: usize, c: usize, data: &[f32]) -> Result<Self, DnnError> {
        if data.is_empty() {
            return Err(DnnError::EmptyData);
        }
        let required = w.checked_mul(h).and_then(|n| n.checked_mul(c));
        if required != Some(data.len()) {
            return Err(DnnError::InputShape {
                index: 0,
                expected: required.unwrap_or(usize::MAX),
                got: data.len(),
            });
        }
        Ok(Self {
            w,
            h,
            c,
            data: data.to_vec(),
        })
    }

    /// Creates a 2D Mat from row-major `f64` samples, narrowing to `f32`.
    pub fn from_f64_2d(w: usize, h: usize, data: &[f64]) -> Result<Self, DnnError> {
        let narrowed: Vec<f32> = data.iter().map(|&v| v as f32).collect();
        Self::new_2d(w, h, &narrowed)
    }

    /// Creates a zero-filled Mat.
    pub fn zeros(w: usize, h: usize, c: usize) -> Self {
        Self {
            w,
            h,
            c,
            data: vec![0.0; w * h * c],
        }
    }

    pub(crate) fn from_vec(w: usize, h: usize, c: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), w * h * c);
        Self { w, h, c, data }
    }

    /// Returns the width (columns).
    pub fn w(&self) -> usize {
        self.w
    }

    /// Returns the height (rows).
    pub fn h(&self) -> usize {
        self.h
    }

    /// Returns the number of channels.
    pub fn c(&self) -> usize {
        self.c
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the element at channel `c`, row `y`, column `x`.
    pub fn at(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[(c * self.h + y) * self.w + x]
    }

    /// Flat view of the underlying storage.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_2d_is_row_major() {
        let m = Mat::new_2d(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m.at(0, 0, 0), 1.0);
        assert_eq!(m.at(0, 0, 1), 2.0);
        assert_eq!(m.at(0, 1, 0), 3.0);
        assert_eq!(m.at(0, 1, 1), 4.0);
        assert_eq!((m.w(), m.h(), m.c()), (2, 2, 1));
    }

    #[test]
    fn new_3d_indexes_channels_first() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let m = Mat::new_3d(3, 2, 2, &data).unwrap();
        assert_eq!(m.at(1, 0, 0), 6.0);
        assert_eq!(m.at(1, 1, 2), 11.0);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = Mat::new_2d(3, 2, &[1.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            DnnError::InputShape {
                expected: 6,
                got: 5,
                ..
            }
        ));
    }

    #[test]
    fn rejects_overflowing_dims() {
        let err = Mat::new_3d(1 << 40, 1 << 40, 1, &[1.0; 4]).unwrap_err();
        assert!(matches!(err, DnnError::InputShape { got: 4, .. }));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(Mat::new_2d(0, 0, &[]), Err(DnnError::EmptyData)));
    }

    #[test]
    fn from_f64_narrows() {
        let m = Mat::from_f64_2d(5, 1, &[0.5, 1.5, -2.0, 0.25, 8.0]).unwrap();
        assert_eq!(m.data(), &[0.5, 1.5, -2.0, 0.25, 8.0]);
    }
}
