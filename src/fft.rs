//! Two-dimensional complex FFTs of `ndarray` planes, done as two passes of 1D
//! transforms over contiguous rows with a transposition in between.

use std::sync::Arc;

use ndarray::Array2;
use rustfft::{Fft, FftDirection, FftPlanner};

use crate::error::{RadonError, Result};

pub use rustfft::num_complex::Complex32;

pub const ZERO: Complex32 = Complex32::new(0.0, 0.0);

/// Forward and inverse plans for transforms of one length, applied to every
/// row (axis 1) of a plane. Plans are immutable and may be shared between
/// threads.
#[derive(Clone)]
pub struct Fft1 {
    len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Fft1 {

    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        }
    }

    pub fn len(&self) -> usize { self.len }

    /// Unnormalized forward transform of every row
    pub fn forward_rows(&self, lines: &mut Array2<Complex32>) -> Result<()> { self.rows(lines, FftDirection::Forward) }

    /// Inverse transform of every row, scaled so that it undoes `forward_rows`
    pub fn inverse_rows(&self, lines: &mut Array2<Complex32>) -> Result<()> {
        self.rows(lines, FftDirection::Inverse)?;
        let scale = 1.0 / self.len as f32;
        lines.mapv_inplace(|c| c * scale);
        Ok(())
    }

    fn rows(&self, lines: &mut Array2<Complex32>, direction: FftDirection) -> Result<()> {
        if lines.ncols() != self.len {
            return Err(RadonError::mismatch("FFT row length", &[self.len], &[lines.ncols()]));
        }
        let fft = match direction {
            FftDirection::Forward => &self.forward,
            FftDirection::Inverse => &self.inverse,
        };
        if !lines.is_standard_layout() {
            *lines = lines.as_standard_layout().into_owned();
        }
        if lines.is_empty() { return Ok(()) }
        let mut scratch = vec![ZERO; fft.get_inplace_scratch_len()];
        if let Some(data) = lines.as_slice_mut() {
            fft.process_with_scratch(data, &mut scratch);
        }
        Ok(())
    }
}

/// Plans for planes of one shape: rows (axis 1) first, then columns via the
/// transpose.
#[derive(Clone)]
pub struct Fft2 {
    rows   : Fft1,
    columns: Fft1,
}

impl Fft2 {

    pub fn new((n0, n1): (usize, usize)) -> Self {
        Self { rows: Fft1::new(n1), columns: Fft1::new(n0) }
    }

    pub fn shape(&self) -> (usize, usize) { (self.columns.len(), self.rows.len()) }

    /// Unnormalized forward transform
    pub fn forward(&self, plane: &mut Array2<Complex32>) -> Result<()> {
        self.rows.forward_rows(plane)?;
        transposed(plane, |t| self.columns.forward_rows(t))
    }

    /// Inverse transform, scaled so that `inverse(forward(x)) == x`
    pub fn inverse(&self, plane: &mut Array2<Complex32>) -> Result<()> {
        self.rows.inverse_rows(plane)?;
        transposed(plane, |t| self.columns.inverse_rows(t))
    }
}

fn transposed(plane: &mut Array2<Complex32>, f: impl FnOnce(&mut Array2<Complex32>) -> Result<()>) -> Result<()> {
    let mut t = std::mem::take(plane).reversed_axes();
    let done = f(&mut t);
    *plane = t.reversed_axes();
    done
}

/// `(-1)^(i + j)`: multiplying by it moves the zero frequency between the
/// corner and the centre of an even-sized plane.
#[inline]
pub fn checkerboard(i: i64, j: i64) -> f32 {
    if (i + j).rem_euclid(2) == 0 { 1.0 } else { -1.0 }
}

/// Signed frequency of index `i` in an FFT of length `n`
#[inline]
pub fn frequency(i: usize, n: usize) -> i64 {
    if i <= n / 2 { i as i64 } else { i as i64 - n as i64 }
}
