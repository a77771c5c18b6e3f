//! Plane-by-plane projection of volumes into sinograms and back.
//!
//! Both directions go through the central slice theorem: the 1D Fourier
//! transform of a projection taken at angle θ is the line through the origin
//! of the plane's 2D Fourier transform at angle θ. Moving between the
//! Cartesian and the polar frequency grids is done by kernel interpolation
//! with a `KernelTable`.
//!
//! Volumes are processed as a stack of planes along axis 2; a plane `[a, b]`
//! projected at angle θ gives the sinogram column `s = a·cos θ + b·sin θ`.

use std::f64::consts::{PI, TAU};

use itertools::iproduct;
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};
use ndarray::parallel::prelude::*;

use crate::error::{RadonError, Result};
use crate::fft::{checkerboard, Complex32, Fft1, Fft2, ZERO};
use crate::kernel::{KernelSpec, KernelTable};

/// Angular extent of a projection gallery
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AngularRange {
    /// Angles cover `[0, π)`
    Half,
    /// Angles cover `[0, 2π)`
    Full,
}

impl AngularRange {
    pub fn radians(self) -> f64 {
        match self {
            Self::Half => PI,
            Self::Full => TAU,
        }
    }

    /// Number of angles in a gallery covering this range when a full turn is
    /// sampled `n_theta` times
    pub fn angles(self, n_theta: usize) -> usize {
        match self {
            Self::Half => n_theta / 2,
            Self::Full => n_theta,
        }
    }
}

pub trait Gridding {

    /// Project every `n × n` plane (axis 2) of `volume` along `n_angles`
    /// directions evenly spread over `range`, after shifting its content by
    /// `shift` samples. Output is indexed `[s, angle, plane]`.
    fn project(&self, volume: ArrayView3<f32>, range: AngularRange, n_angles: usize, shift: [f32; 2]) -> Result<Array3<f32>>;

    /// Rebuild the planes from sinograms `[s, angle, plane]` covering `range`.
    /// Output is indexed `[a, b, plane]`.
    fn backproject(&self, sinograms: ArrayView3<f32>, range: AngularRange) -> Result<Array3<f32>>;
}

/// Direct Fourier gridding, optionally on a twice-oversampled grid.
pub struct FourierGridding {
    kernel: KernelTable,
    padding: bool,
}

/// FFT plans for one plane size
struct Plans {
    size: usize,
    plane: Fft2,
    line: Fft1,
}

impl Plans {
    fn new(size: usize) -> Self {
        Self { size, plane: Fft2::new((size, size)), line: Fft1::new(size) }
    }
}

impl FourierGridding {

    pub fn new(kernel: KernelSpec, padding: bool) -> Result<Self> {
        Ok(Self { kernel: KernelTable::build(kernel)?, padding })
    }

    fn plans(&self, n: usize) -> Plans { Plans::new(if self.padding { 2 * n } else { n }) }

    fn sinogram(&self, plane: ArrayView2<f32>, range: AngularRange, n_angles: usize, [dx, dy]: [f32; 2], plans: &Plans) -> Result<Array2<f32>> {
        let n = plane.nrows();
        let m = plans.size;
        let o = (m - n) / 2;
        let half = (m / 2) as i64;

        let mut grid = Array2::from_elem((m, m), ZERO);
        grid.slice_mut(s![o..o + n, o..o + n])
            .zip_mut_with(&plane, |g, &v| *g = Complex32::new(v, 0.0));
        plans.plane.forward(&mut grid)?;

        // Spectrum with the zero frequency (and the phase origin) in the middle
        let shifted = dx != 0.0 || dy != 0.0;
        let centred = Array2::from_shape_fn((m, m), |(u, v)| {
            let (kx, ky) = (u as i64 - half, v as i64 - half);
            let c = grid[[wrap(kx, m), wrap(ky, m)]] * checkerboard(kx, ky);
            if shifted {
                let phase = -TAU as f32 * (kx as f32 * dx + ky as f32 * dy) / m as f32;
                c * Complex32::from_polar(1.0, phase)
            } else { c }
        });

        let step = range.radians() / n_angles as f64;
        let mut lines = Array2::from_elem((n_angles, m), ZERO);
        for (j, mut line) in lines.outer_iter_mut().enumerate() {
            let (sin, cos) = (j as f64 * step).sin_cos();
            for q in 0..m {
                let rho = q as i64 - half;
                let value = self.interpolate(&centred, rho as f64 * cos + half as f64, rho as f64 * sin + half as f64);
                line[wrap(rho, m)] = value * checkerboard(rho, 0);
            }
        }
        plans.line.inverse_rows(&mut lines)?;
        Ok(Array2::from_shape_fn((n, n_angles), |(s, j)| lines[[j, s + o]].re))
    }

    fn reconstruct_plane(&self, sinogram: ArrayView2<f32>, range: AngularRange, plans: &Plans) -> Result<Array2<f32>> {
        let (n, n_angles) = sinogram.dim();
        // A full turn is redundant: the second half mirrors the first
        let rows = match range {
            AngularRange::Half => n_angles,
            AngularRange::Full => n_angles / 2,
        };
        let m = plans.size;
        let o = (m - n) / 2;
        let half = (m / 2) as i64;

        let mut lines = Array2::from_elem((rows, m), ZERO);
        lines.slice_mut(s![.., o..o + n])
            .zip_mut_with(&sinogram.slice(s![.., ..rows]).t(), |l, &v| *l = Complex32::new(v, 0.0));
        plans.line.forward_rows(&mut lines)?;
        let polar = Array2::from_shape_fn((rows, m), |(j, q)| {
            let rho = q as i64 - half;
            lines[[j, wrap(rho, m)]] * checkerboard(rho, 0)
        });

        let limit = (half - 1) as f64;
        let mut grid = Array2::from_elem((m, m), ZERO);
        for (u, v) in iproduct!(0..m, 0..m) {
            let (kx, ky) = (u as i64 - half, v as i64 - half);
            let r = ((kx * kx + ky * ky) as f64).sqrt();
            if r > limit { continue }
            let (mut phi, mut rho) = ((ky as f64).atan2(kx as f64), r);
            if phi < 0.0 { phi += PI; rho = -rho; }
            if phi >= PI { phi -= PI; rho = -rho; }
            let value = self.interpolate_polar(&polar, phi * rows as f64 / PI, rho + half as f64);
            grid[[wrap(kx, m), wrap(ky, m)]] = value * checkerboard(kx, ky);
        }
        plans.plane.inverse(&mut grid)?;
        Ok(Array2::from_shape_fn((n, n), |(a, b)| grid[[a + o, b + o]].re))
    }

    /// Kernel-weighted value of a Cartesian grid at continuous `(x, y)`
    fn interpolate(&self, grid: &Array2<Complex32>, x: f64, y: f64) -> Complex32 {
        let (m0, m1) = grid.dim();
        let (x0, wx) = self.kernel.taps(x);
        let (y0, wy) = self.kernel.taps(y);
        let mut sum = ZERO;
        for (i, &a) in wx.iter().enumerate() {
            let gx = x0 + i as isize;
            if a == 0.0 || gx < 0 || gx >= m0 as isize { continue }
            for (j, &b) in wy.iter().enumerate() {
                let gy = y0 + j as isize;
                if b == 0.0 || gy < 0 || gy >= m1 as isize { continue }
                sum += grid[[gx as usize, gy as usize]] * (a * b);
            }
        }
        sum
    }

    /// Kernel-weighted value of a polar grid `[angle, rho]` at continuous
    /// angle index `t` and radial index `q`. Angles are periodic with period
    /// π, each wrap reversing rho.
    fn interpolate_polar(&self, polar: &Array2<Complex32>, t: f64, q: f64) -> Complex32 {
        let (rows, m) = polar.dim();
        let (rows, m) = (rows as isize, m as isize);
        let (t0, wt) = self.kernel.taps(t);
        let (q0, wq) = self.kernel.taps(q);
        let mut sum = ZERO;
        for (i, &a) in wt.iter().enumerate() {
            if a == 0.0 { continue }
            let ti = t0 + i as isize;
            let row = ti.rem_euclid(rows) as usize;
            let flipped = ti.div_euclid(rows).rem_euclid(2) == 1;
            for (j, &b) in wq.iter().enumerate() {
                if b == 0.0 { continue }
                let qj = q0 + j as isize;
                let qj = if flipped { m - qj } else { qj };
                if qj < 0 || qj >= m { continue }
                sum += polar[[row, qj as usize]] * (a * b);
            }
        }
        sum
    }
}

#[inline]
fn wrap(k: i64, m: usize) -> usize { k.rem_euclid(m as i64) as usize }

fn check_square(what: &'static str, n0: usize, n1: usize) -> Result<()> {
    if n0 != n1 { Err(RadonError::mismatch(what, &[n0, n0], &[n0, n1])) } else { Ok(()) }
}

impl Gridding for FourierGridding {

    fn project(&self, volume: ArrayView3<f32>, range: AngularRange, n_angles: usize, shift: [f32; 2]) -> Result<Array3<f32>> {
        let (n0, n1, depth) = volume.dim();
        check_square("projected plane", n0, n1)?;
        let plans = self.plans(n0);
        let mut out = Array3::zeros((n0, n_angles, depth));
        out.axis_iter_mut(Axis(2))
            .into_par_iter()
            .zip(volume.axis_iter(Axis(2)).into_par_iter())
            .try_for_each(|(mut sinogram, plane)| -> Result<()> {
                sinogram.assign(&self.sinogram(plane, range, n_angles, shift, &plans)?);
                Ok(())
            })?;
        Ok(out)
    }

    fn backproject(&self, sinograms: ArrayView3<f32>, range: AngularRange) -> Result<Array3<f32>> {
        let (n, n_angles, depth) = sinograms.dim();
        if n_angles == 0 || (range == AngularRange::Full && n_angles % 2 != 0) {
            return Err(RadonError::mismatch("sinogram angles", &[2 * (n_angles / 2).max(1)], &[n_angles]));
        }
        let plans = self.plans(n);
        let mut out = Array3::zeros((n, n, depth));
        out.axis_iter_mut(Axis(2))
            .into_par_iter()
            .zip(sinograms.axis_iter(Axis(2)).into_par_iter())
            .try_for_each(|(mut plane, sinogram)| -> Result<()> {
                plane.assign(&self.reconstruct_plane(sinogram, range, &plans)?);
                Ok(())
            })?;
        Ok(out)
    }
}
