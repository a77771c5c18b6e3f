//! Composition of gridding passes into the four supported transforms.
//!
//! | type | forward input          | forward output                      |
//! |------|------------------------|-------------------------------------|
//! | 1    | structure `[x, y, z]`  | single-axis projection `[s1, y, θ1]`, 360° |
//! | 2    | single-axis projection | quarter transform `[θ2, θ1, s2]`, 180°/180° |
//! | 3    | structure              | full transform `[θ2, θ1, s2]`, 360°/360°    |
//! | 4    | structure              | quarter transform                   |
//!
//! Every intermediate is moved from stage to stage and dropped as soon as the
//! next stage has been computed.

use ndarray::{s, Array3, Axis};

use crate::apodize::{apodize_sphere, remove_dc};
use crate::error::{RadonError, Result};
use crate::gridding::{AngularRange, FourierGridding, Gridding};
use crate::kernel::KernelSpec;
use crate::verbosity::Verbosity;
use crate::volume::{AxisOrder, Volume};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformType {
    SingleAxis = 1,
    QuarterFromSingleAxis = 2,
    Full = 3,
    Quarter = 4,
}

impl TransformType {

    /// Angular range of the first (θ1) projection gallery
    fn first_range(self) -> AngularRange {
        match self {
            Self::SingleAxis | Self::Full => AngularRange::Full,
            Self::QuarterFromSingleAxis | Self::Quarter => AngularRange::Half,
        }
    }

    /// Angular range of the second (θ2) projection gallery
    fn second_range(self) -> AngularRange {
        match self {
            Self::Full => AngularRange::Full,
            _ => AngularRange::Half,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::SingleAxis            => "structure <-> single-axis projection",
            Self::QuarterFromSingleAxis => "single-axis projection <-> quarter transform",
            Self::Full                  => "structure <-> full transform",
            Self::Quarter               => "structure <-> quarter transform",
        }
    }
}

impl TryFrom<u8> for TransformType {
    type Error = RadonError;
    fn try_from(n: u8) -> Result<Self> {
        Ok(match n {
            1 => Self::SingleAxis,
            2 => Self::QuarterFromSingleAxis,
            3 => Self::Full,
            4 => Self::Quarter,
            _ => return Err(RadonError::InvalidArgument(format!("transform type must be 1-4, not {n}"))),
        })
    }
}

impl std::str::FromStr for TransformType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let n: u8 = s.trim().parse().map_err(|e| format!("`{s}`: {e}"))?;
        Self::try_from(n).map_err(|e| e.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct TransformParams {
    /// Angular samples per full turn; twice the volume size when absent
    pub n_theta: Option<usize>,
    pub kernel: KernelSpec,
    pub padding: bool,
    /// Apply the sphere window before forward transforms of structures
    pub apodize: bool,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self { n_theta: None, kernel: KernelSpec::default(), padding: true, apodize: true }
    }
}

pub struct Transformer<G = FourierGridding> {
    gridding: G,
    n_theta: Option<usize>,
    apodize: bool,
    verbosity: Verbosity,
}

impl Transformer<FourierGridding> {
    pub fn new(params: &TransformParams, verbosity: Verbosity) -> Result<Self> {
        let gridding = FourierGridding::new(params.kernel, params.padding)?;
        Ok(Self::with_gridding(gridding, params, verbosity))
    }
}

impl<G: Gridding> Transformer<G> {

    pub fn with_gridding(gridding: G, params: &TransformParams, verbosity: Verbosity) -> Self {
        Self { gridding, n_theta: params.n_theta, apodize: params.apodize, verbosity }
    }

    fn n_theta(&self, size: usize) -> Result<usize> {
        let n_theta = self.n_theta.unwrap_or(2 * size);
        if n_theta < 2 || n_theta % 2 != 0 {
            return Err(RadonError::InvalidArgument(format!("number of angles must be even and positive, not {n_theta}")));
        }
        Ok(n_theta)
    }

    fn project(&self, volume: &Volume, range: AngularRange, n_angles: usize) -> Result<Volume> {
        let data = self.gridding.project(volume.data.view(), range, n_angles, [0.0, 0.0])?;
        Ok(derived(data, volume))
    }

    fn backproject(&self, volume: &Volume, range: AngularRange) -> Result<Volume> {
        let data = self.gridding.backproject(volume.data.view(), range)?;
        Ok(derived(data, volume))
    }

    pub fn forward(&self, mut volume: Volume, kind: TransformType) -> Result<Volume> {
        if self.verbosity.process() {
            println!("Forward transform type {}: {}", kind as u8, kind.describe());
        }
        let single_axis = match kind {
            TransformType::QuarterFromSingleAxis => {
                remove_dc(&mut volume);
                // Only θ1 < π is needed for a 180° gallery
                let half = volume.shape()[2] / 2;
                let data = volume.data.slice(s![.., .., ..half]).to_owned();
                Volume { data, ..volume }
            }
            _ => {
                if self.apodize { apodize_sphere(&mut volume) }
                let n_theta = self.n_theta(volume.shape()[0])?;
                let range = kind.first_range();
                let a = volume.reslice(AxisOrder::ZXY);
                let b = self.project(&a, range, range.angles(n_theta))?;
                drop(a);
                let c = b.reslice(AxisOrder::XZY);
                if kind == TransformType::SingleAxis { return Ok(c) }
                c
            }
        };
        let n_theta = match kind {
            TransformType::QuarterFromSingleAxis => 2 * single_axis.shape()[2],
            _ => self.n_theta(single_axis.shape()[0])?,
        };
        let range = kind.second_range();
        let d = self.project(&single_axis, range, range.angles(n_theta))?;
        drop(single_axis);
        Ok(d.reslice(AxisOrder::YZX))
    }

    pub fn inverse(&self, mut volume: Volume, kind: TransformType) -> Result<Volume> {
        if self.verbosity.process() {
            println!("Inverse transform type {}: {}", kind as u8, kind.describe());
        }
        remove_dc(&mut volume);
        let single_axis = if kind == TransformType::SingleAxis {
            volume
        } else {
            let d = volume.reslice(AxisOrder::ZXY);
            let c = self.backproject(&d, kind.second_range())?;
            drop(d);
            if kind == TransformType::QuarterFromSingleAxis {
                return Ok(full_turn(c));
            }
            c
        };
        let b = single_axis.reslice(AxisOrder::XZY);
        let a = self.backproject(&b, kind.first_range())?;
        drop(b);
        Ok(a.reslice(AxisOrder::YZX))
    }
}

/// New stage computed from `source`, keeping its sampling
fn derived(data: Array3<f32>, source: &Volume) -> Volume {
    let mut volume = Volume::new(data);
    volume.sampling = [source.sampling[0]; 3];
    volume
}

/// Extend a 180° single-axis projection `[s, y, θ]` to 360°: the projection
/// at `θ + π` is the one at `θ` with `s` mirrored about the centre.
fn full_turn(half: Volume) -> Volume {
    let (n, ny, n_angles) = half.data.dim();
    let mut data = Array3::zeros((n, ny, 2 * n_angles));
    data.slice_mut(s![.., .., ..n_angles]).assign(&half.data);
    for (t, mut plane) in data.axis_iter_mut(Axis(2)).skip(n_angles).enumerate() {
        let source = half.data.index_axis(Axis(2), t);
        for ((s, y), v) in plane.indexed_iter_mut() {
            *v = source[[(n - s) % n, y]];
        }
    }
    Volume { data, ..half }
}
