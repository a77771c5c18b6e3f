//! Rotations of directions on the unit sphere.
//!
//! Everything here works in `f64`: the angular lookup table compares
//! directions whose separation is a small fraction of a bin, so single
//! precision loses the distinction near the poles.

use nalgebra::{Rotation3, Vector3};
use units::{Angle, radian_};

pub type Vec3 = Vector3<f64>;

/// Rotate `v` right-handedly by `angle` (radians) about the x-axis.
pub fn rotate_x(v: Vec3, angle: f64) -> Vec3 { Rotation3::from_axis_angle(&Vector3::x_axis(), angle) * v }

/// Rotate `v` right-handedly by `angle` (radians) about the y-axis.
pub fn rotate_y(v: Vec3, angle: f64) -> Vec3 { Rotation3::from_axis_angle(&Vector3::y_axis(), angle) * v }

/// Rotate `v` right-handedly by `angle` (radians) about the z-axis.
pub fn rotate_z(v: Vec3, angle: f64) -> Vec3 { Rotation3::from_axis_angle(&Vector3::z_axis(), angle) * v }

/// Angle between two directions given as (azimuth `a`, polar `b`) pairs, in
/// radians. The result always lies in `[0, π]`.
pub fn angle_between(a1: f64, b1: f64, a2: f64, b2: f64) -> f64 {
    let (sb1, sb2) = (b1.sin(), b2.sin());
    let cosine =
        sb1 * a1.cos() * sb2 * a2.cos() +
        sb1 * a1.sin() * sb2 * a2.sin() +
        b1.cos() * b2.cos();
    cosine.clamp(-1.0, 1.0).acos()
}

/// Convert a unit direction into the `(polar, azimuth)` pair used by the
/// back-projector: polar is the elevation `asin(y)`, azimuth is measured from
/// z towards x.
pub fn polar_azimuth(v: Vec3) -> (f64, f64) {
    (v.y.clamp(-1.0, 1.0).asin(), v.x.atan2(v.z))
}

/// ZYZ Euler angles in radians: rotate by `psi` about z, then `theta` about
/// y, then `phi` about z.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Euler {
    pub phi  : f64,
    pub theta: f64,
    pub psi  : f64,
}

impl Euler {

    pub fn new(phi: f64, theta: f64, psi: f64) -> Self { Self { phi, theta, psi } }

    pub fn from_angles(phi: Angle, theta: Angle, psi: Angle) -> Self {
        Self::new(radian_(phi) as f64, radian_(theta) as f64, radian_(psi) as f64)
    }

    pub fn rotate(&self, v: Vec3) -> Vec3 {
        let v = rotate_z(v, self.psi);
        let v = rotate_y(v, self.theta);
        rotate_z(v, self.phi)
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), self.phi) *
        Rotation3::from_axis_angle(&Vector3::y_axis(), self.theta) *
        Rotation3::from_axis_angle(&Vector3::z_axis(), self.psi)
    }

}
