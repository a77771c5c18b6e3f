//! Projection onto convex sets, applied to a quarter transform `[θ, φ, ρ]`.
//!
//! Two constraints are alternated: every angular plane of a transform of a
//! finite object is band limited (its angular harmonics cannot reach low
//! radial frequencies), and samples known to be good (flagged in the
//! coverage mask) keep their measured values. Holes in a sparsely covered
//! transform are filled in the process; a completely covered but noisy one
//! is made consistent.

use std::f64::consts::PI;

use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, Axis, Zip};
use ndarray::parallel::prelude::*;

use crate::apodize::{remove_dc, taper_radial};
use crate::error::{RadonError, Result};
use crate::fft::{frequency, Complex32, Fft2, ZERO};
use crate::utils::CancelFlag;
use crate::verbosity::Verbosity;
use crate::volume::Volume;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PocsParams {
    /// Alternations between the two plane orientations
    pub outer_cycles: usize,
    /// Band-limit and restore iterations within each plane
    pub inner_cycles: usize,
    /// Limiting radius of the structure in 3D, in samples; `< 1` selects `N/2 − 1`
    pub radius_3d: f32,
    /// Limiting radius in the single-axis projection plane; `< 1` selects `N/2 − 1`
    pub radius_plane: f32,
    /// Also impose the finite extent along ρ
    pub enforce_support: bool,
}

impl PocsParams {

    /// Filtering is switched on only when both cycle counts are positive
    pub fn enabled(&self) -> bool { self.outer_cycles > 0 && self.inner_cycles > 0 }

    /// More than one inner cycle only does anything useful when measured
    /// samples are restored between cycles, which needs a mask.
    pub fn check(&self, mask: Option<&Array2<f32>>) -> Result<()> {
        if self.inner_cycles > 1 && mask.is_none() {
            return Err(RadonError::PreconditionViolation(
                "to use POCS effectively with more than one inner cycle, a mask must be given".into()));
        }
        Ok(())
    }

    fn radii(&self, n: usize) -> (f32, f32) {
        let fallback = (n / 2) as f32 - 1.0;
        let pick = |r: f32| if r < 1.0 { fallback } else { r };
        (pick(self.radius_3d), pick(self.radius_plane))
    }
}

impl std::str::FromStr for PocsParams {
    type Err = String;
    /// `out,in[,rad3d[,radplane[,support]]]`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 5 {
            return Err(format!("`{s}`: at least the outer and inner cycles must be specified"));
        }
        let int = |t: &str| t.parse::<usize>().map_err(|e| format!("`{t}`: {e}"));
        let real = |i: usize| parts.get(i).map_or(Ok(0.0), |t| t.parse::<f32>().map_err(|e| format!("`{t}`: {e}")));
        Ok(Self {
            outer_cycles: int(parts[0])?,
            inner_cycles: int(parts[1])?,
            radius_3d   : real(2)?,
            radius_plane: real(3)?,
            enforce_support: parts.get(4).map_or(Ok(0), |t| int(t))? != 0,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PocsReport {
    /// Mean absolute change of the transform in each outer cycle
    pub residuals: Vec<f32>,
}

/// Which pair of axes forms the filtered planes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Orientation {
    /// Planes `[θ, ρ]` at fixed φ
    ThetaRho,
    /// Planes `[φ, ρ]` at fixed θ
    PhiRho,
}

/// Filter `transform` in place. `mask`, when given, flags the `[θ, φ]`
/// columns holding measured values that must be kept.
///
/// The inner-cycle precondition is not enforced here: callers are expected
/// to have run `PocsParams::check`.
pub fn run(
    transform: &mut Volume,
    mask     : Option<&Array2<f32>>,
    params   : &PocsParams,
    cancel   : &CancelFlag,
    verbosity: Verbosity,
) -> Result<PocsReport> {
    let [n0, n1, n2] = transform.shape();
    if n0 != n1 || n1 != n2 {
        return Err(RadonError::mismatch("POCS needs a cube quarter transform", &[n0, n0, n0], &[n0, n1, n2]));
    }
    if let Some(mask) = mask {
        if mask.shape() != [n0, n1] {
            return Err(RadonError::mismatch("POCS mask", &[n0, n1], mask.shape()));
        }
    }
    let n = n0;
    let (radius_3d, radius_plane) = params.radii(n);

    remove_dc(transform);

    if verbosity.label() || verbosity.process() {
        println!("POCS filtering of a radon transform:");
    }
    if verbosity.process() {
        println!("Outer and inner cycles:         {} {}", params.outer_cycles, params.inner_cycles);
        println!("Limiting radii, 3D and plane:   {radius_3d} {radius_plane}");
        println!("Finiteness support:             {}\n", params.enforce_support as u8);
    }

    let fft = Fft2::new((2 * n, n));
    let mut residuals = Vec::with_capacity(params.outer_cycles);
    for cycle in 0..params.outer_cycles {
        cancel.check()?;
        let before = transform.data.clone();
        if params.enforce_support { taper_radial(transform, radius_3d) }
        filter_planes(transform, mask, params.inner_cycles, radius_3d   , Orientation::ThetaRho, &fft)?;
        filter_planes(transform, mask, params.inner_cycles, radius_plane, Orientation::PhiRho  , &fft)?;
        let residual = Zip::from(&transform.data).and(&before)
            .fold(0.0_f64, |acc, &a, &b| acc + (a - b).abs() as f64) / transform.data.len() as f64;
        if verbosity.stats() {
            println!("Cycle {:3}: mean change {residual:.6e}", cycle + 1);
        }
        residuals.push(residual as f32);
    }
    if params.enforce_support { taper_radial(transform, radius_3d) }

    Ok(PocsReport { residuals })
}

/// Filter every plane of one orientation, reading from a snapshot so that
/// planes can be processed independently.
fn filter_planes(
    transform: &mut Volume,
    mask     : Option<&Array2<f32>>,
    inner    : usize,
    radius   : f32,
    orientation: Orientation,
    fft      : &Fft2,
) -> Result<()> {
    let snapshot = transform.data.clone();
    let n = snapshot.len_of(Axis(0));
    let axis = match orientation {
        Orientation::ThetaRho => Axis(1),
        Orientation::PhiRho   => Axis(0),
    };
    transform.data.axis_iter_mut(axis)
        .into_par_iter()
        .enumerate()
        .try_for_each(|(index, plane)| -> Result<()> {
            let (mut work, radius) = match orientation {
                Orientation::ThetaRho => (mirrored_plane(snapshot.index_axis(axis, index)), radius),
                Orientation::PhiRho => {
                    // The second half-turn of φ is found in the plane at π − θ
                    let partner = (n - index) % n;
                    let work = stacked_plane(snapshot.index_axis(axis, index), snapshot.index_axis(axis, partner));
                    let foreshortening = (PI * (index as f64 - (n / 2) as f64) / n as f64).sin().abs();
                    (work, radius * foreshortening as f32)
                }
            };
            let known = known_rows(mask, orientation, index, n);
            filter_plane(&mut work, &known, inner, radius, fft)?;
            write_back(plane, &work);
            Ok(())
        })
}

/// Rows of the `2n`-row work plane `index` that hold measured values. Both
/// half-turns are looked up in the mask line of the plane itself.
fn known_rows(mask: Option<&Array2<f32>>, orientation: Orientation, index: usize, n: usize) -> Vec<bool> {
    let known = |theta: usize, phi: usize| mask.map_or(false, |m| m[[theta, phi]] != 0.0);
    (0..2 * n)
        .map(|i| match orientation {
            Orientation::ThetaRho => known(i % n, index),
            Orientation::PhiRho   => known(index, i % n),
        })
        .collect()
}

/// Full period `[2n, N]` of a `[n, N]` plane whose second half-turn is the
/// first one with ρ reversed.
fn mirrored_plane(half: ArrayView2<f32>) -> Array2<Complex32> {
    let (n, nr) = half.dim();
    Array2::from_shape_fn((2 * n, nr), |(i, j)| {
        let v = if i < n { half[[i, j]] } else { half[[i - n, (nr - j) % nr]] };
        Complex32::new(v, 0.0)
    })
}

/// Full period `[2n, N]` made of two `[n, N]` planes one above the other
fn stacked_plane(first: ArrayView2<f32>, second: ArrayView2<f32>) -> Array2<Complex32> {
    let (n, nr) = first.dim();
    Array2::from_shape_fn((2 * n, nr), |(i, j)| {
        let v = if i < n { first[[i, j]] } else { second[[i - n, j]] };
        Complex32::new(v, 0.0)
    })
}

fn write_back(mut plane: ArrayViewMut2<f32>, work: &Array2<Complex32>) {
    let n = plane.nrows();
    Zip::from(&mut plane)
        .and(&work.slice(s![..n, ..]))
        .for_each(|p, w| *p = w.re);
}

/// Alternate band limiting with restoration of the `known` rows.
fn filter_plane(work: &mut Array2<Complex32>, known: &[bool], inner: usize, radius: f32, fft: &Fft2) -> Result<()> {
    let original = work.clone();
    for _ in 0..inner {
        fft.forward(work)?;
        band_limit(work, radius);
        fft.inverse(work)?;
        work.mapv_inplace(|c| Complex32::new(c.re, 0.0));
        for (i, &keep) in known.iter().enumerate() {
            if keep { work.row_mut(i).assign(&original.row(i)) }
        }
    }
    Ok(())
}

/// Zero the spectrum `[angular harmonic, radial frequency]` of an angular
/// plane wherever a structure of the given radius (in whole samples) cannot
/// contribute.
///
/// Harmonic `h` of a point at distance `d` from the centre is carried by
/// radial frequencies above roughly `h·N/(2π·d)`, so for harmonics above the
/// first few the lowest radial frequencies are cleared. The Nyquist row and
/// column are cleared too; the zero harmonic is always kept.
fn band_limit(spectrum: &mut Array2<Complex32>, radius: f32) {
    let radius = radius.trunc();
    let (na, nr) = spectrum.dim();
    let (half_a, half_r) = ((na / 2) as i64, (nr / 2) as i64);
    let slope = if radius > 0.0 && half_a > 2 {
        ((half_a - 1) as f64 / (2.0 * PI * radius as f64 / nr as f64)) / (half_a - 2) as f64
    } else {
        f64::INFINITY
    };
    let limit = |h: i64| -> i64 {
        if h <= 2 { return 1 }
        let raw = slope * (h - 2) as f64;
        if raw.is_finite() { (raw.ceil() as i64).clamp(1, half_r) } else { half_r }
    };
    for ((i, j), c) in spectrum.indexed_iter_mut() {
        let h = frequency(i, na).abs();
        let k = frequency(j, nr).abs();
        let clear = if h == half_a || k == half_r {
            true
        } else if h == 0 {
            false
        } else if h < 2 {
            k == 0
        } else {
            k < limit(h)
        };
        if clear { *c = ZERO }
    }
}
