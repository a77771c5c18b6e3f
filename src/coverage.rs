//! Turning accumulated coverage into weights.

use ndarray::{Array2, Array3, Axis};

use crate::backproject::scale_columns;
use crate::error::{RadonError, Result};
use crate::verbosity::Verbosity;

/// Coverage at or below this level marks a direction as incompletely sampled
pub const COMPLETENESS_THRESHOLD: f32 = 0.90;

/// Below this minimum coverage the angular plane has holes
const FILLED_THRESHOLD: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverageReport {
    pub minimum: f32,
    pub filled: bool,
}

/// Divide every column of `volume` by the coverage recorded in `mask`, zeroing
/// columns whose coverage does not reach `COMPLETENESS_THRESHOLD`, and reduce
/// `mask` to 1 (usable) / 0 (hole).
///
/// Must be applied exactly once per accumulation: a second application sees a
/// binary mask and leaves everything unchanged except for the mask's holes.
pub fn normalize(volume: &mut Array3<f32>, mask: &mut Array2<f32>, verbosity: Verbosity) -> Result<CoverageReport> {
    let plane = [volume.len_of(Axis(0)), volume.len_of(Axis(1))];
    if mask.shape() != plane {
        return Err(RadonError::mismatch("coverage mask", &plane, mask.shape()));
    }
    let minimum = mask.iter().copied().fold(f32::INFINITY, f32::min);
    let filled = minimum > FILLED_THRESHOLD;
    if verbosity.process() {
        println!("Minimum weight:                {minimum}");
        println!("Coverage:                      {}", if filled { "filled" } else { "unfilled" });
    }

    mask.mapv_inplace(|m| if m > COMPLETENESS_THRESHOLD { 1.0 / m } else { 0.0 });
    scale_columns(volume, mask);
    mask.mapv_inplace(|m| if m != 0.0 { 1.0 } else { 0.0 });

    Ok(CoverageReport { minimum, filled })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use ndarray::arr2;
    use proptest::prelude::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn single_application_contract() {
        let mut mask = arr2(&[[0.5, 0.9], [0.91, 4.0]]);
        let mut volume = Array3::from_elem((2, 2, 3), 2.0);
        let report = normalize(&mut volume, &mut mask, Verbosity::silent()).unwrap();

        assert_eq!(report, CoverageReport { minimum: 0.5, filled: true });
        assert_eq!(mask, arr2(&[[0.0, 0.0], [1.0, 1.0]]));
        for k in 0..3 {
            assert_eq!(volume[[0, 0, k]], 0.0);
            assert_eq!(volume[[0, 1, k]], 0.0);
            assert_float_eq!(volume[[1, 0, k]], 2.0 / 0.91, ulps <= 2);
            assert_float_eq!(volume[[1, 1, k]], 0.5      , ulps <= 2);
        }
    }

    #[test]
    fn holes_are_reported() {
        let mut mask = arr2(&[[0.0, 3.0], [1.0, 1.0]]);
        let mut volume = Array3::ones((2, 2, 1));
        let report = normalize(&mut volume, &mut mask, Verbosity::silent()).unwrap();
        assert!(!report.filled);
        assert_eq!(report.minimum, 0.0);
    }

    #[test]
    fn second_application_sees_binary_mask() {
        let mut mask = arr2(&[[0.2, 2.0]]);
        let mut volume = Array3::from_elem((1, 2, 2), 4.0);
        normalize(&mut volume, &mut mask, Verbosity::silent()).unwrap();
        let once = volume.clone();
        normalize(&mut volume, &mut mask, Verbosity::silent()).unwrap();
        assert_eq!(volume, once);
        assert_eq!(mask, arr2(&[[0.0, 1.0]]));
    }

    #[test]
    fn mismatched_mask_leaves_everything_alone() {
        let mut mask = Array2::ones((3, 3));
        let mut volume = Array3::ones((2, 2, 2));
        assert!(normalize(&mut volume, &mut mask, Verbosity::silent()).is_err());
        assert_eq!(volume, Array3::ones((2, 2, 2)));
        assert_eq!(mask, Array2::ones((3, 3)));
    }

    proptest! {
        #[test]
        fn each_column_scales_by_reciprocal_or_zero(
            m in 0.0..5.0_f32,
            v in -10.0..10.0_f32,
        ) {
            let mut mask = Array2::from_elem((1, 1), m);
            let mut volume = Array3::from_elem((1, 1, 4), v);
            normalize(&mut volume, &mut mask, Verbosity::silent()).unwrap();
            let expected = if m > COMPLETENESS_THRESHOLD { v / m } else { 0.0 };
            for &x in volume.iter() {
                prop_assert!((x - expected).abs() <= 1e-5 * expected.abs().max(1.0));
            }
            prop_assert_eq!(mask[[0, 0]], if m > COMPLETENESS_THRESHOLD { 1.0 } else { 0.0 });
        }
    }
}
