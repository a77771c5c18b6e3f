//! Reconstruction of a quarter transform from particle images.
//!
//! Every selected particle image is projected into a 180° sinogram; each
//! projection line is then written into the angular volume along the
//! direction it takes once the particle's orientation (and every symmetry
//! equivalent of it) is applied. Coverage is normalized once all particles
//! are in.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, Axis};
use rayon::prelude::*;

use geometry::{polar_azimuth, rotate_z, PointGroup, Vec3};

use crate::backproject::Accumulator;
use crate::coverage::{self, CoverageReport};
use crate::error::{RadonError, Result};
use crate::gridding::{AngularRange, FourierGridding, Gridding};
use crate::io;
use crate::kernel::KernelSpec;
use crate::lut::AngularLookupTable;
use crate::project::SelectedParticle;
use crate::utils::{next_power_of_two, timing::Progress, CancelFlag};
use crate::verbosity::Verbosity;
use crate::volume::Volume;

/// Sub-bin resolution of the angular lookup table
pub const TABLE_SIZE: usize = 8;

/// Source of particle images
pub trait ParticleImages: Sync {
    /// Width and height of the particle's image
    fn shape(&self, particle: &SelectedParticle) -> Result<[usize; 2]>;
    fn load(&self, particle: &SelectedParticle) -> Result<Volume>;
}

/// Particle images stored in stack files, particle `id` being image `id` of
/// the stack (counting from 1).
pub struct FileImages;

impl FileImages {
    fn index(particle: &SelectedParticle) -> Result<usize> {
        particle.id.checked_sub(1).ok_or_else(|| RadonError::MissingInput(
            format!("{}: particle ids count from 1", particle.file.display())))
    }
}

impl ParticleImages for FileImages {
    fn shape(&self, particle: &SelectedParticle) -> Result<[usize; 2]> {
        let [nx, ny, _] = io::read_shape(&particle.file)?;
        Ok([nx, ny])
    }

    fn load(&self, particle: &SelectedParticle) -> Result<Volume> {
        io::read_slice(&particle.file, Self::index(particle)?)
    }
}

#[derive(Clone, Debug)]
pub struct ReconstructionParams {
    /// Reference point of the reconstruction in pixels; components below 1
    /// (or all of them, when absent) select the centre
    pub origin: Option<[f32; 2]>,
    /// Sample size of the output (Å); the particle images' when absent
    pub sampling: Option<[f32; 3]>,
    pub kernel: KernelSpec,
    pub symmetry: PointGroup,
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self { origin: None, sampling: None, kernel: KernelSpec::default(), symmetry: PointGroup::default() }
    }
}

pub struct Reconstruction {
    /// Quarter transform `[θ, φ, ρ]`
    pub volume: Volume,
    /// Coverage of the `[θ, φ]` plane: 1 where usable, 0 in holes
    pub mask: Array2<f32>,
    pub coverage: CoverageReport,
    /// Number of particles that went into the reconstruction
    pub particles: usize,
}

/// Everything shared by the per-particle work
struct Setup<'a, G> {
    rec_size: usize,
    n_theta: usize,
    origin: [f32; 2],
    gridding: G,
    table: AngularLookupTable,
    symmetry: PointGroup,
    cancel: &'a CancelFlag,
    verbosity: Verbosity,
}

impl<G: Gridding + Sync> Setup<'_, G> {

    /// Add one particle's projections to `acc`. Returns whether the particle
    /// was used.
    fn add_particle(&self, acc: &mut Accumulator, particle: &SelectedParticle, images: &impl ParticleImages) -> Result<bool> {
        let mut image = images.load(particle)?;
        if let Some([ox, oy]) = particle.origin {
            image.origin = [ox, oy, 0.0];
        }
        let image = image.resize_to_next_power2(0.0);
        let [nx, ny, _] = image.shape();
        if nx != self.rec_size || ny != self.rec_size {
            eprintln!("Warning: particle {} in {}: image size {nx}x{ny} differs from reconstruction size {}, skipped",
                      particle.id, particle.file.display(), self.rec_size);
            return Ok(false);
        }
        if self.verbosity.full() {
            println!("Particle {:6} of {}", particle.id, particle.file.display());
        }

        // Images without an origin of their own are taken as already centred
        let [ox, oy, _] = image.origin;
        let shift = if ox > 0.0 && oy != 0.0 { [self.origin[0] - ox, self.origin[1] - oy] } else { [0.0, 0.0] };
        let n_angles = AngularRange::Half.angles(self.n_theta);
        let sinogram = self.gridding.project(image.data.view(), AngularRange::Half, n_angles, shift)?;
        let sinogram = sinogram.index_axis(Axis(2), 0);

        let step = 2.0 * std::f64::consts::PI / self.n_theta as f64;
        for view in self.symmetry.equivalent_views(&particle.view) {
            for i in 0..n_angles {
                let direction = view * rotate_z(Vec3::x(), step * i as f64);
                let (polar, azimuth) = polar_azimuth(direction);
                acc.project_line(sinogram.index_axis(Axis(1), i), polar, azimuth, &self.table)?;
            }
        }
        Ok(true)
    }

    /// Back-project every particle into per-thread accumulators and add them up.
    fn accumulate(&self, particles: &[SelectedParticle], images: &impl ParticleImages, bar: &ProgressBar) -> Result<(Accumulator, usize)> {
        let empty = || (Accumulator::zeros(self.rec_size, self.rec_size), 0);
        particles.par_iter()
            .try_fold(empty, |(mut acc, used), particle| -> Result<(Accumulator, usize)> {
                self.cancel.check()?;
                let added = self.add_particle(&mut acc, particle, images)?;
                bar.inc(1);
                Ok((acc, used + added as usize))
            })
            .try_reduce(empty, |(a, n), (b, m)| Ok((a.merge(b), n + m)))
    }
}

fn progress_bar(len: usize, verbosity: Verbosity) -> ProgressBar {
    if !verbosity.label() { return ProgressBar::hidden() }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("Back-projecting particles\n[{elapsed_precise}] {wide_bar} {pos}/{len} ({eta_precise})")
    {
        bar.set_style(style);
    }
    bar
}

/// Reconstruction origin: components below 1 fall back to the centre
fn reference_point(origin: Option<[f32; 2]>, rec_size: usize) -> [f32; 2] {
    let centre = (rec_size / 2) as f32;
    origin.unwrap_or([0.0; 2]).map(|c| if c < 1.0 { centre } else { c })
}

/// Accumulate the selected particles and normalize the result by its
/// coverage.
pub fn reconstruct(
    particles: &[SelectedParticle],
    images   : &impl ParticleImages,
    params   : &ReconstructionParams,
    cancel   : &CancelFlag,
    verbosity: Verbosity,
) -> Result<Reconstruction> {
    let first = particles.first()
        .ok_or_else(|| RadonError::MissingInput("no particles selected".into()))?;
    let [nx, ny] = images.shape(first)?;
    let rec_size = next_power_of_two(nx.max(ny));
    let n_theta = 2 * rec_size;
    let origin = reference_point(params.origin, rec_size);

    if verbosity.process() {
        println!("Reconstruction size:           {rec_size}");
        println!("Number of angles:              {n_theta}");
        println!("Origin:                        {} {}", origin[0], origin[1]);
        println!("Symmetry:                      {:?} (order {})", params.symmetry, params.symmetry.order());
        println!("Particles selected:            {}", particles.len());
    }

    let mut timer = Progress::new(verbosity.time());
    timer.start("Building angular lookup table");
    let table = AngularLookupTable::build(rec_size, TABLE_SIZE)?;
    timer.done();

    let setup = Setup {
        rec_size, n_theta, origin,
        gridding: FourierGridding::new(params.kernel, true)?,
        table,
        symmetry: params.symmetry,
        cancel,
        verbosity,
    };

    timer.startln("Back-projecting");
    let bar = progress_bar(particles.len(), verbosity);
    let (mut acc, used) = setup.accumulate(particles, images, &bar)?;
    bar.finish_and_clear();
    timer.done_with_message("Back-projection");
    if used == 0 {
        return Err(RadonError::MissingInput("none of the selected particles could be used".into()));
    }

    let coverage = coverage::normalize(&mut acc.volume, &mut acc.mask, verbosity)?;
    let sampling = match params.sampling {
        Some(s) => s,
        None => first_sampling(particles, images)?,
    };
    let mut volume = Volume::new(acc.volume);
    volume.sampling = sampling;
    Ok(Reconstruction { volume, mask: acc.mask, coverage, particles: used })
}

fn first_sampling(particles: &[SelectedParticle], images: &impl ParticleImages) -> Result<[f32; 3]> {
    let image = match particles.first() {
        Some(p) => images.load(p)?,
        None => return Ok([1.0; 3]),
    };
    let [sx, sy, _] = image.sampling;
    Ok([sx, sy, sx])
}

/// Stack files referenced by the particles, for reporting
pub fn particle_files(particles: &[SelectedParticle]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = particles.iter().map(|p| p.file.clone()).collect();
    files.sort();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::Euler;
    use ndarray::Array3;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    /// Images held in memory, indexed by particle id
    struct MemoryImages(Vec<Volume>);

    impl ParticleImages for MemoryImages {
        fn shape(&self, particle: &SelectedParticle) -> Result<[usize; 2]> {
            let [nx, ny, _] = self.load(particle)?.shape();
            Ok([nx, ny])
        }
        fn load(&self, particle: &SelectedParticle) -> Result<Volume> {
            self.0.get(particle.id)
                .cloned()
                .ok_or_else(|| RadonError::MissingInput(format!("no image {}", particle.id)))
        }
    }

    fn blob(n: usize) -> Volume {
        let c = (n / 2) as f32;
        Volume::new(Array3::from_shape_fn((n, n, 1), |(x, y, _)| {
            let r2 = (x as f32 - c).powi(2) + (y as f32 - c).powi(2);
            (-r2 / 4.0).exp()
        }))
    }

    fn particle(id: usize, phi: f64, theta: f64) -> SelectedParticle {
        SelectedParticle { file: "memory".into(), id, view: Euler::new(phi, theta, 0.0), origin: None }
    }

    fn setup(cancel: &CancelFlag, symmetry: PointGroup) -> Setup<'_, FourierGridding> {
        Setup {
            rec_size: 8, n_theta: 16, origin: [4.0, 4.0],
            gridding: FourierGridding::new(KernelSpec::default(), true).unwrap(),
            table: AngularLookupTable::build(8, TABLE_SIZE).unwrap(),
            symmetry, cancel, verbosity: Verbosity::silent(),
        }
    }

    #[test]
    fn symmetry_adds_coverage() {
        let images = MemoryImages(vec![blob(8)]);
        let particles = [particle(0, 0.3, 1.1)];
        let cancel = CancelFlag::new();
        let bar = ProgressBar::hidden();
        let (c1, n1) = setup(&cancel, PointGroup::Cyclic(1)).accumulate(&particles, &images, &bar).unwrap();
        let (c2, n2) = setup(&cancel, PointGroup::Cyclic(2)).accumulate(&particles, &images, &bar).unwrap();
        assert_eq!((n1, n2), (1, 1));
        assert!(c2.mask.sum() > c1.mask.sum());
        // The identity is among the equivalent views
        assert!(c1.mask.iter().zip(c2.mask.iter()).all(|(&a, &b)| a <= 0.0 || b > 0.0));
    }

    #[test]
    fn wrongly_sized_particles_are_skipped() {
        let images = MemoryImages(vec![blob(8), blob(16), blob(8)]);
        let particles = [particle(0, 0.0, 0.5), particle(1, 1.0, 0.5), particle(2, 2.0, 1.5)];
        let cancel = CancelFlag::new();
        let (_, used) = setup(&cancel, PointGroup::default())
            .accumulate(&particles, &images, &ProgressBar::hidden()).unwrap();
        assert_eq!(used, 2);
    }

    #[test]
    fn missing_image_aborts() {
        let images = MemoryImages(vec![blob(8)]);
        let particles = [particle(0, 0.0, 0.5), particle(3, 0.0, 0.5)];
        let e = reconstruct(&particles, &images, &ReconstructionParams::default(), &CancelFlag::new(), Verbosity::silent());
        assert!(matches!(e, Err(RadonError::MissingInput(_))));
    }

    #[test]
    fn cancellation_is_honoured() {
        let images = MemoryImages(vec![blob(8)]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let e = reconstruct(&[particle(0, 0.0, 0.0)], &images, &ReconstructionParams::default(), &cancel, Verbosity::silent());
        assert!(matches!(e, Err(RadonError::Cancelled)));
    }

    #[rstest(/**/ n_particles,
             case(1),
             case(12),
    )]
    fn reconstruction_has_binary_mask_and_finite_values(n_particles: usize) {
        let images = MemoryImages(vec![blob(6)]);
        // Odd image sizes are padded up to the next power of two
        let particles: Vec<_> = (0..n_particles)
            .map(|k| particle(0, 0.5 * k as f64, 0.25 * k as f64))
            .collect();
        let params = ReconstructionParams { symmetry: PointGroup::Dihedral(2), ..ReconstructionParams::default() };
        let rec = reconstruct(&particles, &images, &params, &CancelFlag::new(), Verbosity::silent()).unwrap();
        assert_eq!(rec.volume.shape(), [8, 8, 8]);
        assert_eq!(rec.mask.dim(), (8, 8));
        assert_eq!(rec.particles, n_particles);
        assert!(rec.mask.iter().all(|&m| m == 0.0 || m == 1.0));
        assert!(rec.mask.iter().any(|&m| m == 1.0));
        assert!(rec.volume.data.iter().all(|v| v.is_finite()));
        assert_eq!(rec.volume.sampling, [1.0; 3]);
    }

    fn accumulated(image: Volume) -> Accumulator {
        let cancel = CancelFlag::new();
        let (acc, used) = setup(&cancel, PointGroup::default())
            .accumulate(&[particle(0, 0.4, 0.9)], &MemoryImages(vec![image]), &ProgressBar::hidden())
            .unwrap();
        assert_eq!(used, 1);
        acc
    }

    #[test]
    fn images_without_origin_are_not_shifted() {
        let mut unset = blob(8);
        unset.origin = [0.0; 3];
        let mut off_centre = blob(8);
        off_centre.origin = [2.0, 3.0, 0.0];
        let centred = accumulated(blob(8));
        assert_eq!(accumulated(unset).volume, centred.volume);
        assert_ne!(accumulated(off_centre).volume, centred.volume);
    }

    #[rstest(/**/ origin            , expected  ,
             case(None              , [4.0, 4.0]),
             case(Some([0.0, 4.0])  , [4.0, 4.0]),
             case(Some([3.0, 0.5])  , [3.0, 4.0]),
             case(Some([1.0, 6.5])  , [1.0, 6.5]),
    )]
    fn origin_components_below_one_select_the_centre(origin: Option<[f32; 2]>, expected: [f32; 2]) {
        assert_eq!(reference_point(origin, 8), expected);
    }

    #[test]
    fn no_particles_is_missing_input() {
        let e = reconstruct(&[], &MemoryImages(vec![]), &ReconstructionParams::default(), &CancelFlag::new(), Verbosity::silent());
        assert!(matches!(e, Err(RadonError::MissingInput(_))));
    }

    #[test]
    fn files_are_listed_once() {
        let mut a = particle(0, 0.0, 0.0);
        let mut b = a.clone();
        a.file = "b.rdn".into();
        b.file = "a.rdn".into();
        let files = particle_files(&[a.clone(), b, a]);
        assert_eq!(files, vec![PathBuf::from("a.rdn"), PathBuf::from("b.rdn")]);
    }
}
