// ----- Imports -----------------------------------------------------------------------------------------
use clap::Parser;
use ndarray::Axis;

use radonrec::{
    driver::{self, FileImages, ReconstructionParams},
    io::{self, DataType},
    project::{read_projects, write_project},
    utils::{group_digits, long_options, timing::Progress, CancelFlag},
    RadonError, Result, Volume,
};
use units::angstrom_;

mod cli;
use cli::Cli;

fn main() {
    let args = Cli::parse_from(long_options(std::env::args()));
    if let Err(e) = run(&args) {
        eprintln!("radonrecon: {e}");
        std::process::exit(-1);
    }
}

fn run(args: &Cli) -> Result<()> {
    let verbosity = args.verbose;
    let mut timer = Progress::new(verbosity.time());

    timer.start("Reading parameter files");
    let mut project = read_projects(&args.inputs, verbosity)?;
    timer.done();

    let particles = project.select(args.threshold);
    if verbosity.result() {
        println!("Particles selected:            {} of {}",
                 group_digits(particles.len()), group_digits(project.particle_count()));
        if verbosity.process() {
            for file in driver::particle_files(&particles) {
                println!("    {}", file.display());
            }
        }
    }

    let sampling = args.sampling
        .map(|(x, y, z)| [x, y, z])
        .or_else(|| project.micrographs()
                 .find_map(|m| m.pixel_size)
                 .map(|size| [angstrom_(size); 3]));
    let params = ReconstructionParams {
        origin: args.origin.map(|(x, y, _)| [x, y]),
        sampling,
        kernel: args.kernel,
        symmetry: args.symmetry,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
        .map_err(|e| RadonError::InvalidArgument(format!("thread pool: {e}")))?;
    let cancel = CancelFlag::new();
    let reconstruction = pool.install(|| driver::reconstruct(&particles, &FileImages, &params, &cancel, verbosity))?;

    if verbosity.result() {
        println!("Particles used:                {}", group_digits(reconstruction.particles));
        println!("Minimum coverage:              {}", reconstruction.coverage.minimum);
    }
    if verbosity.stats() {
        println!("Reconstruction: {}", reconstruction.volume.statistics());
    }

    if let Some(path) = &args.reconstruction {
        timer.start(&format!("Writing {}", path.display()));
        io::write_volume(&reconstruction.volume, path, DataType::F32)?;
        timer.done();
    }
    if let Some(path) = &args.mask {
        let mut mask = Volume::new(reconstruction.mask.insert_axis(Axis(2)));
        mask.sampling = reconstruction.volume.sampling;
        io::write_volume(&mask, path, DataType::F32)?;
    }
    if let Some(path) = &args.output {
        project.apply_selection(args.threshold);
        write_project(&project, path)?;
    }
    Ok(())
}
