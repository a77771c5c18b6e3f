use std::path::PathBuf;

use geometry::PointGroup;
use radonrec::kernel::KernelSpec;
use radonrec::utils::parse_triplet;
use radonrec::Verbosity;

/// Command line interface for the `radonrecon` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "radonrecon",
    about = "Reconstruct a quarter Radon transform from oriented particle images",
)]
pub(super) struct Cli {
    /// Project files (TOML) listing the particles
    pub inputs: Vec<PathBuf>,

    /// Reference point of the particles in pixels: x,y,z (default: image centre)
    #[clap(long, value_parser = parse_triplet::<f32>)]
    pub origin: Option<(f32, f32, f32)>,

    /// Sample size of the reconstruction in Å: s or x,y,z (default: pixel size of the micrographs)
    #[clap(long, value_parser = parse_triplet::<f32>)]
    pub sampling: Option<(f32, f32, f32)>,

    /// Interpolation kernel: width,power
    #[clap(long, default_value = "11,2")]
    pub kernel: KernelSpec,

    /// Select particles with a first figure of merit at least this large,
    /// rather than by their selection flags
    #[clap(long, default_value = "0")]
    pub threshold: f32,

    /// Point group symmetry of the particle: Cn or Dn
    #[clap(long, default_value = "C1")]
    pub symmetry: PointGroup,

    /// Write the project back with the selection applied
    #[clap(long)]
    pub output: Option<PathBuf>,

    /// Where to write the reconstructed quarter transform
    #[clap(long)]
    pub reconstruction: Option<PathBuf>,

    /// Where to write the coverage mask of the reconstruction
    #[clap(long)]
    pub mask: Option<PathBuf>,

    /// Maximum number of rayon threads
    #[clap(short = 'j', long, default_value = "4")]
    pub threads: usize,

    /// Sum of 1 result, 2 labels, 4 process, 8 statistics, 16 everything, 32 timing
    #[clap(short, long, default_value = "7")]
    pub verbose: Verbosity,
}
