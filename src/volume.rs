//! Sampled densities, projection stacks and transforms.
//!
//! A `Volume` owns an `Array3<f32>` whose logical axes are `[x, y, z]`. The
//! physical layout is whatever the last `reslice` left behind: reslicing only
//! permutes axes, it never moves data.

use ndarray::{s, Array3, Axis};

use crate::utils::next_power_of_two;

#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    pub data: Array3<f32>,
    /// Physical size of one sample along each logical axis (Å)
    pub sampling: [f32; 3],
    /// Reference point in sample coordinates
    pub origin: [f32; 3],
}

/// New logical axis order, written as the old axes that end up in `x`, `y`
/// and `z`: `"zxy"` makes the old z-axis the new x-axis, and so on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisOrder([usize; 3]);

impl AxisOrder {
    pub const XYZ: Self = Self([0, 1, 2]);
    pub const ZXY: Self = Self([2, 0, 1]);
    pub const XZY: Self = Self([0, 2, 1]);
    pub const YZX: Self = Self([1, 2, 0]);
    pub const ZYX: Self = Self([2, 1, 0]);
    pub const YXZ: Self = Self([1, 0, 2]);

    pub fn axes(self) -> [usize; 3] { self.0 }
}

impl std::str::FromStr for AxisOrder {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut axes = [0; 3];
        let chars: Vec<char> = s.trim().to_ascii_lowercase().chars().collect();
        if chars.len() != 3 { return Err(format!("`{s}` is not a permutation of xyz")) }
        for (i, c) in chars.into_iter().enumerate() {
            axes[i] = match c { 'x' => 0, 'y' => 1, 'z' => 2,
                                _ => return Err(format!("`{s}` is not a permutation of xyz")) };
        }
        let mut seen = axes;
        seen.sort_unstable();
        if seen != [0, 1, 2] { return Err(format!("`{s}` repeats an axis")) }
        Ok(Self(axes))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Statistics {
    pub min : f32,
    pub max : f32,
    pub mean: f32,
    pub std : f32,
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "min {:<12} max {:<12} mean {:<12} std {}", self.min, self.max, self.mean, self.std)
    }
}

impl Volume {

    /// Wrap `data` with unit sampling and the origin at the centre.
    pub fn new(data: Array3<f32>) -> Self {
        let (nx, ny, nz) = data.dim();
        let origin = [(nx / 2) as f32, (ny / 2) as f32, (nz / 2) as f32];
        Self { data, sampling: [1.0; 3], origin }
    }

    pub fn zeros([nx, ny, nz]: [usize; 3]) -> Self { Self::new(Array3::zeros((nx, ny, nz))) }

    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.data.dim();
        [nx, ny, nz]
    }

    /// Change which logical axis plays which role, without copying samples.
    pub fn reslice(self, order: AxisOrder) -> Self {
        let Self { data, sampling, origin } = self;
        let [a, b, c] = order.0;
        Self {
            data: data.permuted_axes([a, b, c]),
            sampling: [sampling[a], sampling[b], sampling[c]],
            origin  : [origin  [a], origin  [b], origin  [c]],
        }
    }

    /// Mean of the samples on the faces of the volume (the edge pixels of a
    /// 2D image), taken as the background level.
    pub fn edge_mean(&self) -> f32 {
        let [nx, ny, nz] = self.shape();
        let on_edge = |n: usize, i: usize| n > 1 && (i == 0 || i == n - 1);
        let (sum, count) = self.data.indexed_iter()
            .filter(|((x, y, z), _)| on_edge(nx, *x) || on_edge(ny, *y) || on_edge(nz, *z))
            .fold((0.0_f64, 0_usize), |(s, c), (_, &v)| (s + v as f64, c + 1));
        if count == 0 { 0.0 } else { (sum / count as f64) as f32 }
    }

    /// Grow every axis longer than one sample to the next power of two,
    /// keeping the content centred and filling the new samples with `fill`.
    pub fn resize_to_next_power2(self, fill: f32) -> Self {
        let old = self.shape();
        let new = old.map(|n| if n > 1 { next_power_of_two(n) } else { n });
        if new == old { return self }
        let shift = [0, 1, 2].map(|i| new[i] / 2 - old[i] / 2);
        let mut data = Array3::from_elem((new[0], new[1], new[2]), fill);
        data.slice_mut(s![shift[0]..shift[0] + old[0],
                          shift[1]..shift[1] + old[1],
                          shift[2]..shift[2] + old[2]])
            .assign(&self.data);
        let origin = [0, 1, 2].map(|i| self.origin[i] + shift[i] as f32);
        Self { data, sampling: self.sampling, origin }
    }

    pub fn statistics(&self) -> Statistics {
        let n = self.data.len().max(1) as f64;
        let (mut min, mut max, mut sum, mut sum2) = (f32::INFINITY, f32::NEG_INFINITY, 0.0_f64, 0.0_f64);
        for &v in self.data.iter() {
            min = min.min(v);
            max = max.max(v);
            sum  += v as f64;
            sum2 += v as f64 * v as f64;
        }
        let mean = sum / n;
        let var = (sum2 / n - mean * mean).max(0.0);
        Statistics { min, max, mean: mean as f32, std: var.sqrt() as f32 }
    }

    /// The `z`-th plane as a volume of depth one
    pub fn plane(&self, z: usize) -> Self {
        let data = self.data.index_axis(Axis(2), z).to_owned().insert_axis(Axis(2));
        Self { data, sampling: self.sampling, origin: [self.origin[0], self.origin[1], 0.0] }
    }
}
