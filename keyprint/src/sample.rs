//! Row-major view of a flat sample.

use crate::error::KeyprintError;

/// A flat sample reinterpreted as a `rows x cols` matrix.
///
/// Element `i` of the flat slice sits at `(i / cols, i % cols)`. The view
/// borrows the caller's data for the duration of one prediction.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    flat: &'a [f64],
    rows: usize,
    cols: usize,
}

impl<'a> Sample<'a> {
    /// Validates that `flat` holds exactly `rows * cols` values.
    /// Zero dimensions are rejected as a mismatch.
    pub fn new(flat: &'a [f64], rows: usize, cols: usize) -> Result<Self, KeyprintError> {
        let mismatch = KeyprintError::ShapeMismatch {
            len: flat.len(),
            rows,
            cols,
        };
        if rows == 0 || cols == 0 {
            return Err(mismatch);
        }
        match rows.checked_mul(cols) {
            Some(n) if n == flat.len() => Ok(Self { flat, rows, cols }),
            _ => Err(mismatch),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Value at row `r`, column `c`.
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.flat[r * self.cols + c]
    }

    /// Row `r` as a slice.
    pub fn row(&self, r: usize) -> &'a [f64] {
        &self.flat[r * self.cols..(r + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [f64]> + use<'a> {
        self.flat.chunks_exact(self.cols)
    }

    /// The underlying row-major data.
    pub fn as_slice(&self) -> &'a [f64] {
        self.flat
    }

    pub fn to_matrix(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(<[f64]>::to_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reshape_is_row_major() {
        let flat = [1.0, 2.0, 3.0, 4.0];
        let s = Sample::new(&flat, 2, 2).unwrap();
        assert_eq!(s.to_matrix(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(s.get(1, 0), 3.0);
        assert_eq!(s.row(0), &[1.0, 2.0]);
    }

    #[test]
    fn index_maps_to_div_mod() {
        let flat: Vec<f64> = (0..15).map(|v| v as f64).collect();
        let s = Sample::new(&flat, 3, 5).unwrap();
        for i in 0..15 {
            assert_eq!(s.get(i / 5, i % 5), i as f64);
        }
    }

    #[test]
    fn rejects_length_mismatch() {
        let flat = [0.0; 14];
        let err = Sample::new(&flat, 3, 5).unwrap_err();
        assert!(matches!(
            err,
            KeyprintError::ShapeMismatch {
                len: 14,
                rows: 3,
                cols: 5
            }
        ));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(Sample::new(&[], 0, 5).is_err());
        assert!(Sample::new(&[], 5, 0).is_err());
    }

    #[test]
    fn rejects_overflowing_dimensions() {
        assert!(Sample::new(&[1.0], usize::MAX, 2).is_err());
    }
}
