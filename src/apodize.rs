//! Real-space conditioning of volumes before and during transforms.

use std::f64::consts::PI;

use ndarray::{Axis, Zip};
use ndarray::parallel::prelude::*;

use crate::volume::Volume;

/// Width of the cosine taper at the edge of the sphere, in samples
const TAPER: f64 = 2.0;

/// Subtract the mean density found just inside the largest sphere fitting in
/// the volume, zero everything outside that sphere, and blend smoothly
/// between the two across a narrow band at its surface.
pub fn apodize_sphere(volume: &mut Volume) {
    let [nx, ny, nz] = volume.shape();
    let half = [nx / 2, ny / 2, nz / 2];
    // Planes and lines have no extent along their flat axes
    let radius = half.iter()
        .zip([nx, ny, nz])
        .filter(|(_, n)| *n > 1)
        .map(|(&h, _)| h as f64)
        .fold(f64::INFINITY, f64::min);
    if !radius.is_finite() { return }

    let distance = move |(x, y, z): (usize, usize, usize)| {
        let d = |i: usize, h: usize| i as f64 - h as f64;
        let (dx, dy, dz) = (d(x, half[0]), d(y, half[1]), d(z, half[2]));
        (dx * dx + dy * dy + dz * dz).sqrt()
    };

    let outer = radius - 1.0;
    let inner = radius - 2.0 * TAPER - 1.0;
    let slope = PI / (2.0 * TAPER);

    // Mean of the shell whose (truncated) radius lies in [outer - TAPER, outer)
    let (sum, count) = volume.data.indexed_iter()
        .filter(|&(i, _)| {
            let d = distance(i).trunc();
            d >= outer - TAPER && d < outer
        })
        .fold((0.0_f64, 0_usize), |(s, c), (_, &v)| (s + v as f64, c + 1));
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };

    Zip::indexed(&mut volume.data).par_for_each(|i, v| {
        let r = distance(i);
        *v = if r > outer {
            0.0
        } else if r >= inner {
            let keep   = 0.5 + 0.5 * ((r - inner) * slope).cos();
            let toward = 0.5 + 0.5 * ((outer - r) * slope).cos();
            (*v as f64 * keep + mean * toward - mean) as f32
        } else {
            (*v as f64 - mean) as f32
        };
    });
}

/// Subtract the first sample from every sample.
pub fn remove_dc(volume: &mut Volume) {
    if let Some(&first) = volume.data.iter().next() {
        volume.data.par_mapv_inplace(|v| v - first);
    }
}

/// Taper a transform `[θ, φ, ρ]` towards zero along ρ outside the band
/// `N/2 ± ⌊radius⌋`, enforcing a finite support of that radius on the structure.
pub fn taper_radial(volume: &mut Volume, radius: f32) {
    let n = volume.data.len_of(Axis(2));
    let centre = (n / 2) as i64;
    // Whole samples only
    let radius = radius.trunc() as i64;
    let j1 = centre - radius;
    let j2 = centre + radius;
    if j1 <= 0 { return }
    let slope = PI / (2.0 * j1 as f64);
    volume.data.axis_iter_mut(Axis(2))
        .into_par_iter()
        .enumerate()
        .for_each(|(j, mut plane)| {
            let j = j as i64;
            let weight = if j < j1 {
                (slope * j as f64).sin()
            } else if j > j2 {
                (slope * (n as i64 - j) as f64).sin()
            } else { return };
            plane.mapv_inplace(|v| v * weight as f32);
        });
}
