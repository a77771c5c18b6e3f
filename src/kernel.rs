//! Tabulated interpolation kernel used by the gridding projector.
//!
//! The kernel is a Dirichlet (periodic sinc) window raised-cosine tapered:
//!
//! `w(d) = sin(πd) / (W·sin(πd/W)) · cos(πd/W)^p`
//!
//! sampled at 512 fractional offsets between neighbouring grid points, so
//! that interpolation never evaluates a trigonometric function.

use std::f64::consts::PI;

use crate::error::{try_reserve, RadonError, Result};

pub const SUBDIVISIONS: usize = 512;

/// Width and exponent of the kernel, as given on the command line
/// (`width,power`). `power == -1` selects linear interpolation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelSpec {
    pub width: usize,
    pub power: i32,
}

impl Default for KernelSpec {
    fn default() -> Self { Self { width: 11, power: 2 } }
}

impl std::str::FromStr for KernelSpec {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let v = crate::utils::parse_list::<i32>(s).map_err(|e| e.to_string())?;
        let (width, power) = match v[..] {
            [w]    => (w, KernelSpec::default().power),
            [w, p] => (w, p),
            _      => return Err(format!("expected `width[,power]`, found `{s}`")),
        };
        if width < 0 { return Err(format!("kernel width must be at least 2, found {width}")) }
        let spec = Self { width: width as usize, power };
        spec.validate().map_err(|e| e.to_string())?;
        Ok(spec)
    }
}

impl KernelSpec {
    /// A kernel needs at least two taps; powers below -1 have no meaning.
    pub fn validate(&self) -> Result<()> {
        let Self { width, power } = *self;
        if width < 2  { return Err(RadonError::InvalidArgument(format!("kernel width must be at least 2, found {width}"))) }
        if power < -1 { return Err(RadonError::InvalidArgument(format!("kernel power must be -1 (linear) or positive, found {power}"))) }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct KernelTable {
    width: usize,
    power: i32,
    /// Taps on either side of the sample lying below it
    below: usize,
    weights: Vec<f32>,
}

impl KernelTable {

    pub fn build(spec: KernelSpec) -> Result<Self> {
        spec.validate()?;
        let KernelSpec { width, power } = spec;
        let len = SUBDIVISIONS * width + width;
        let mut weights = Vec::new();
        try_reserve(&mut weights, len, "interpolation kernel")?;
        weights.resize(len, 0.0);
        let below = if width % 2 == 1 { (width - 1) / 2 } else { width / 2 - 1 };
        let mut table = Self { width, power, below, weights };
        if power < 0 { table.fill_linear() } else { table.fill() }
        Ok(table)
    }

    pub fn width(&self) -> usize { self.width }
    pub fn power(&self) -> i32 { self.power }
    pub fn weights(&self) -> &[f32] { &self.weights }

    /// Weights for subdivision `row` (`0..=SUBDIVISIONS`)
    pub fn row(&self, row: usize) -> &[f32] {
        &self.weights[row * self.width..(row + 1) * self.width]
    }

    /// Grid index of the first tap and the weights of all taps needed to
    /// interpolate at continuous `position`.
    #[inline]
    pub fn taps(&self, position: f64) -> (isize, &[f32]) {
        let floor = position.floor();
        let row = ((position - floor) * SUBDIVISIONS as f64).round() as usize;
        (floor as isize - self.below as isize, self.row(row.min(SUBDIVISIONS)))
    }

    fn fill(&mut self) {
        let w = self.width as f64;
        let p = self.power;
        let below = self.below;
        let kernel = |d: f64| {
            if d.abs() < 1e-9 { return 1.0 }
            let a = PI * d;
            let b = a / w;
            a.sin() / (w * b.sin()) * b.cos().powi(p)
        };
        for row in 1..SUBDIVISIONS {
            let frac = row as f64 / SUBDIVISIONS as f64;
            for tap in 0..self.width {
                let d = tap as f64 - below as f64 - frac;
                self.weights[row * self.width + tap] = kernel(d) as f32;
            }
        }
        self.exact_edges();
    }

    fn fill_linear(&mut self) {
        for row in 1..SUBDIVISIONS {
            let frac = row as f32 / SUBDIVISIONS as f32;
            self.weights[row * self.width + self.below    ] = 1.0 - frac;
            self.weights[row * self.width + self.below + 1] =       frac;
        }
        self.exact_edges();
    }

    // Interpolating exactly on a grid point reproduces that grid point
    fn exact_edges(&mut self) {
        let last = SUBDIVISIONS * self.width;
        self.weights[..self.width].fill(0.0);
        self.weights[last..].fill(0.0);
        self.weights[self.below] = 1.0;
        self.weights[last + self.below + 1] = 1.0;
    }
}
