use std::path::PathBuf;

use radonrec::io::DataType;
use radonrec::kernel::KernelSpec;
use radonrec::pocs::PocsParams;
use radonrec::transform::TransformType;
use radonrec::Verbosity;

/// Command line interface for the `radon` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "radon",
    about = "Radon transforms of 3D volumes, with optional POCS filtering",
)]
pub(super) struct Cli {
    /// Volume to transform
    pub input: PathBuf,

    /// Where to write the result
    pub output: PathBuf,

    /// Forward transform: 1 structure to single-axis projection, 2 single-axis
    /// projection to quarter transform, 3 structure to full transform,
    /// 4 structure to quarter transform
    #[clap(long)]
    pub forward: Option<TransformType>,

    /// Inverse transform, numbered as for `forward`
    #[clap(long)]
    pub backward: Option<TransformType>,

    /// POCS filtering of a quarter transform: out,in[,rad3d[,radplane[,support]]]
    #[clap(long)]
    pub pocs: Option<PocsParams>,

    /// Number of angles per full turn (default: twice the volume size)
    #[clap(long)]
    pub theta: Option<usize>,

    /// Interpolation kernel: width,power
    #[clap(long, default_value = "11,2")]
    pub kernel: KernelSpec,

    /// Grid without 2x zero padding
    #[clap(long)]
    pub nopadding: bool,

    /// Coverage mask of a quarter transform, as written by radonrecon
    #[clap(long)]
    pub mask: Option<PathBuf>,

    /// Data type of the output: u (byte), s (short) or f (float)
    #[clap(long, default_value = "f")]
    pub datatype: DataType,

    /// Sum of 1 result, 2 labels, 4 process, 8 statistics, 16 everything, 32 timing
    #[clap(short, long, default_value = "7")]
    pub verbose: Verbosity,
}
