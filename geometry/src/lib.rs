mod rotation;
mod symmetry;

pub use rotation::{Vec3, Euler, rotate_x, rotate_y, rotate_z, angle_between, polar_azimuth};
pub use symmetry::PointGroup;
