//! Point-group symmetry: the rotations under which a structure is invariant,
//! and the viewing orientations equivalent to a given one.

use std::f64::consts::{PI, TAU};
use std::str::FromStr;

use nalgebra::{Rotation3, Vector3};

use crate::Euler;

/// Cyclic (`Cn`) and dihedral (`Dn`) point groups with the main axis along z
/// and, for `Dn`, a two-fold axis along x.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointGroup {
    Cyclic(u32),
    Dihedral(u32),
}

impl Default for PointGroup {
    fn default() -> Self { Self::Cyclic(1) }
}

impl PointGroup {

    pub fn order(&self) -> usize {
        match *self {
            Self::Cyclic  (n) => n as usize,
            Self::Dihedral(n) => 2 * n as usize,
        }
    }

    /// Every rotation of the group, identity first.
    pub fn operations(&self) -> Vec<Rotation3<f64>> {
        let (n, dihedral) = match *self {
            Self::Cyclic  (n) => (n, false),
            Self::Dihedral(n) => (n, true ),
        };
        let about_z = (0..n)
            .map(|k| Rotation3::from_axis_angle(&Vector3::z_axis(), TAU * k as f64 / n as f64));
        if dihedral {
            let flip = Rotation3::from_axis_angle(&Vector3::x_axis(), PI);
            let about_z: Vec<_> = about_z.collect();
            about_z.iter().copied()
                .chain(about_z.iter().map(|r| r * flip))
                .collect()
        } else {
            about_z.collect()
        }
    }

    /// Orientations from which a structure with this symmetry looks the same
    /// as it does from `base`.
    pub fn equivalent_views(&self, base: &Euler) -> Vec<Rotation3<f64>> {
        let view = base.rotation();
        self.operations()
            .into_iter()
            .map(|op| view * op)
            .collect()
    }
}

impl FromStr for PointGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || format!("unsupported point group `{s}`: expected Cn or Dn");
        let mut chars = s.chars();
        let kind = chars.next().ok_or_else(bad)?;
        let n: u32 = chars.as_str().parse().map_err(|_| bad())?;
        if n == 0 { return Err(bad()) }
        match kind.to_ascii_uppercase() {
            'C' => Ok(Self::Cyclic(n)),
            'D' => Ok(Self::Dihedral(n)),
            _   => Err(bad()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[rstest(/**/ text , expected                   ,
             case("C1" , Ok(PointGroup::Cyclic(1))  ),
             case("c5" , Ok(PointGroup::Cyclic(5))  ),
             case("D7" , Ok(PointGroup::Dihedral(7))),
             case("C0" , Err(())                    ),
             case("T"  , Err(())                    ),
             case(""   , Err(())                    ),
    )]
    fn parse_point_group(text: &str, expected: Result<PointGroup, ()>) {
        assert_eq!(text.parse::<PointGroup>().map_err(|_| ()), expected);
    }

    #[rstest(/**/ group                 , order,
             case(PointGroup::Cyclic(1)  , 1  ),
             case(PointGroup::Cyclic(4)  , 4  ),
             case(PointGroup::Dihedral(3), 6  ),
    )]
    fn operation_count(group: PointGroup, order: usize) {
        assert_eq!(group.operations().len(), order);
        assert_eq!(group.order(), order);
    }

    #[test]
    fn operations_leave_symmetric_object_invariant() {
        // A point on the z-axis is fixed by every Cn operation
        let p = Vector3::new(0.0, 0.0, 1.0);
        for op in PointGroup::Cyclic(6).operations() {
            assert!((op * p - p).norm() < 1e-12);
        }
        // Dihedral groups map it to its mirror image
        let images: Vec<_> = PointGroup::Dihedral(2).operations()
            .into_iter()
            .map(|op| (op * p).z.round() as i32)
            .collect();
        assert_eq!(images, vec![1, 1, -1, -1]);
    }

    #[test]
    fn c1_has_only_the_base_view() {
        let base = Euler::new(0.4, 1.2, -0.3);
        let views = PointGroup::Cyclic(1).equivalent_views(&base);
        assert_eq!(views.len(), 1);
        assert!((views[0].matrix() - base.rotation().matrix()).norm() < 1e-12);
    }
}
