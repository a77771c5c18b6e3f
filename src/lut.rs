//! Precomputed map from a quantized target direction to the projection samples
//! that contribute to it.
//!
//! Directions are parameterized by an azimuth `eta` and an elevation `csi`,
//! both measured in units of the angular step `π/ncol`. The fractional part
//! of `eta` and the whole of `csi` are quantized in steps of `1/size_t`; each
//! such bin lists nearby integer `(eta, csi)` samples together with a
//! sinc × Gaussian weight of their angular separation from the bin centre.

use std::f64::consts::PI;

use rayon::prelude::*;

use geometry::angle_between;

use crate::error::{try_reserve, Result};

/// Width parameter of the Gaussian taper applied to the sinc weights
pub const GAUSS_WIDTH: f64 = 9.2023;

/// One contributing sample: azimuth offset relative to the bin's integer
/// azimuth, absolute elevation index, and weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contributor {
    pub eta   : i32,
    pub csi   : i32,
    pub weight: f32,
}

/// Where a bin's contributors live in the flat weight table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinSpan {
    pub offset: usize,
    pub count : usize,
}

#[derive(Clone, Debug)]
pub struct AngularLookupTable {
    ncol: usize,
    size_t: usize,
    bins: Vec<BinSpan>,
    contributors: Vec<Contributor>,
}

impl AngularLookupTable {

    /// Tabulate contributors for an `ncol × ncol` angular plane with sub-bin
    /// resolution `size_t`.
    pub fn build(ncol: usize, size_t: usize) -> Result<Self> {
        let size_t = size_t.max(1);
        let n_theta = 2 * ncol;
        let quarter = (n_theta / 4) as i64;
        let n_beta  = 2 * quarter as usize * size_t + 1;
        let n_alpha = size_t + 1;
        let fat = 2.0 * PI / n_theta as f64;
        let step = 1.0 / size_t as f64;

        // Each beta row is independent of all others
        let rows: Vec<Vec<Vec<Contributor>>> = (0..n_beta)
            .into_par_iter()
            .map(|ib| {
                let beta = -(quarter as f64) + ib as f64 * step;
                (0..n_alpha)
                    .map(|ia| bin_contributors(ia as f64 * step, beta, n_theta, quarter, fat))
                    .collect()
            })
            .collect();

        let total: usize = rows.iter().flatten().map(Vec::len).sum();
        let mut bins = Vec::new();
        try_reserve(&mut bins, n_alpha * n_beta, "lookup table bin index")?;
        let mut contributors = Vec::new();
        try_reserve(&mut contributors, total, "lookup table weights")?;

        // Bin (ia, ib) lives at ia + ib * n_alpha
        for bin in rows.into_iter().flatten() {
            bins.push(BinSpan { offset: contributors.len(), count: bin.len() });
            contributors.extend(bin);
        }
        Ok(Self { ncol, size_t, bins, contributors })
    }

    pub fn ncol  (&self) -> usize { self.ncol   }
    pub fn size_t(&self) -> usize { self.size_t }
    pub fn bins  (&self) -> &[BinSpan] { &self.bins }
    pub fn contributors(&self) -> &[Contributor] { &self.contributors }

    /// Bin index for a fractional azimuth (`0 ≤ alpha < 1`, in bin units)
    /// and an elevation `csi` (bin units, `≥ 0`).
    pub fn bin_index(&self, alpha: f64, csi: f64) -> usize {
        let t = self.size_t as f64;
        let ia = (alpha * t).round() as usize;
        let ib = (csi   * t).round() as usize;
        ia + ib * (self.size_t + 1)
    }

    /// Contributors of bin `index`; empty for bins outside the table.
    pub fn lookup(&self, index: usize) -> &[Contributor] {
        match self.bins.get(index) {
            Some(&BinSpan { offset, count }) => &self.contributors[offset..offset + count],
            None => &[],
        }
    }
}

/// Samples within one angular step of the direction (`alpha`, `beta`), both
/// in units of `fat`.
fn bin_contributors(alpha: f64, beta: f64, n_theta: usize, quarter: i64, fat: f64) -> Vec<Contributor> {
    let half = (n_theta / 2) as i64;
    let b1 = beta.floor() as i64;
    let mut found = Vec::new();
    for b in [b1, b1 + 1] {
        let (a1, a2) = if b != 0 && b != half {
            let d = (1.0 / (b as f64 * fat).sin()).abs();
            ((alpha - d).floor() as i64, (alpha + d).floor() as i64 + 1)
        } else {
            (0, n_theta as i64 - 1)
        };
        for a in a1..=a2 {
            let ang = angle_between(alpha * fat, beta * fat, a as f64 * fat, b as f64 * fat);
            if ang < fat - 0.001 {
                let arg = ang * half as f64;
                let weight = if arg < 0.001 { 1.0 }
                             else           { arg.sin() / arg * (-arg * arg / GAUSS_WIDTH).exp() };
                found.push(Contributor { eta: a as i32, csi: (b + quarter) as i32, weight: weight as f32 });
            }
        }
    }
    found
}
