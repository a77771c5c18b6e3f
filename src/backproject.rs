//! Accumulation of projection lines into the angular reconstruction volume.
//!
//! The accumulator is indexed `[csi, eta, radial]`: elevation bin, azimuth
//! bin, and radial sample along the line. Only half the sphere of directions
//! is stored, so a direction may have to be folded onto its antipode, which
//! reverses the radial axis.

use std::f64::consts::{PI, TAU};

use ndarray::{Array2, Array3, ArrayView1, Axis, Zip};

use crate::error::{RadonError, Result};
use crate::lut::AngularLookupTable;

/// Which reflections a destination sample went through on its way into the
/// stored half of the sphere. Each reflection reverses the radial axis, so
/// the column is traversed backwards when an odd number of them occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fold {
    None,
    Polar,
    Radial,
    Both,
}

impl Fold {

    pub fn flip_polar(self) -> Self {
        match self {
            Self::None   => Self::Polar,
            Self::Polar  => Self::None,
            Self::Radial => Self::Both,
            Self::Both   => Self::Radial,
        }
    }

    pub fn flip_radial(self) -> Self {
        match self {
            Self::None   => Self::Radial,
            Self::Radial => Self::None,
            Self::Polar  => Self::Both,
            Self::Both   => Self::Polar,
        }
    }

    pub fn reverses_column(self) -> bool { matches!(self, Self::Polar | Self::Radial) }
}

/// Reconstruction volume and coverage mask of one back-projection run (or of
/// one thread's share of it).
#[derive(Clone, Debug)]
pub struct Accumulator {
    pub volume: Array3<f32>,
    pub mask  : Array2<f32>,
}

impl Accumulator {

    /// Empty accumulator for an `ncol × ncol` angular plane and `radial`
    /// samples per line.
    pub fn zeros(ncol: usize, radial: usize) -> Self {
        Self {
            volume: Array3::zeros((ncol, ncol, radial)),
            mask  : Array2::zeros((ncol, ncol)),
        }
    }

    pub fn ncol  (&self) -> usize { self.mask.nrows() }
    pub fn radial(&self) -> usize { self.volume.len_of(Axis(2)) }

    /// Element-wise sum of two partial accumulators
    pub fn merge(mut self, other: Self) -> Self {
        self.volume += &other.volume;
        self.mask   += &other.mask;
        self
    }

    /// Add one projection line to the accumulator.
    ///
    /// `line` holds the radial profile of the projection, `polar` and
    /// `azimuth` (radians) give the direction it was taken along. Bins without
    /// contributors are silently skipped.
    pub fn project_line(&mut self, line: ArrayView1<f32>, polar: f64, azimuth: f64, table: &AngularLookupTable) -> Result<()> {
        let ncol = self.ncol();
        let radial = self.radial();
        if table.ncol() != ncol || self.mask.ncols() != ncol || line.len() != radial {
            return Err(RadonError::mismatch("back-projection",
                                            &[table.ncol(), table.ncol(), radial],
                                            &[ncol, self.mask.ncols(), line.len()]));
        }
        let (mut polar, mut azimuth, mut fold) = (polar, azimuth, Fold::None);
        if polar < 0.0 {
            polar = -polar;
            azimuth -= PI;
            fold = fold.flip_polar();
        }
        azimuth = azimuth.rem_euclid(TAU);

        let bins_per_radian = ncol as f64 / PI;
        let eta_fl = azimuth * bins_per_radian;
        let csi_fl = polar   * bins_per_radian;
        let eta0 = eta_fl.floor();
        let index = table.bin_index(eta_fl - eta0, csi_fl);

        let n = ncol as i64;
        for c in table.lookup(index) {
            let mut fold = fold;
            let mut eta = (c.eta as i64 + eta0 as i64).rem_euclid(2 * n);
            let mut csi = c.csi as i64;
            if csi < 0 {
                csi = -csi;
                eta = (eta + n) % (2 * n);
                fold = fold.flip_radial();
            }
            if eta >= n {
                eta -= n;
                if csi == 0 { fold = fold.flip_radial() }
                csi = (n - csi).rem_euclid(n);
            }
            if csi >= n { continue }
            let (csi, eta) = (csi as usize, eta as usize);

            self.mask[[csi, eta]] += c.weight;
            let mut column = self.volume.slice_mut(ndarray::s![csi, eta, ..]);
            column[0] += c.weight * line[0];
            if fold.reverses_column() {
                for k in 1..radial { column[k] += c.weight * line[radial - k] }
            } else {
                for k in 1..radial { column[k] += c.weight * line[k] }
            }
        }
        Ok(())
    }
}

/// Multiply every radial plane of `volume` by `mask`
pub(crate) fn scale_columns(volume: &mut Array3<f32>, mask: &Array2<f32>) {
    Zip::from(volume.lanes_mut(Axis(2)))
        .and(mask)
        .for_each(|mut column, &m| column.map_inplace(|v| *v *= m));
}
