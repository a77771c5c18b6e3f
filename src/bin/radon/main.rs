// ----- Imports -----------------------------------------------------------------------------------------
use std::path::Path;

use clap::Parser;
use ndarray::{Array2, Axis};

use radonrec::{
    io,
    pocs::{self, PocsParams},
    transform::{TransformParams, TransformType, Transformer},
    utils::{long_options, timing::Progress, CancelFlag},
    RadonError, Result, Verbosity, Volume,
};

mod cli;
use cli::Cli;

fn main() {
    let args = Cli::parse_from(long_options(std::env::args()));
    if let Err(e) = run(&args) {
        eprintln!("radon: {e}");
        std::process::exit(-1);
    }
}

fn run(args: &Cli) -> Result<()> {
    let verbosity = args.verbose;
    let pocs = args.pocs.filter(PocsParams::enabled);

    // Fail before reading (or writing) anything large if POCS cannot run
    let mask = args.mask.as_deref().map(read_mask).transpose()?;
    if let Some(params) = &pocs {
        params.check(mask.as_ref())?;
    }

    let mut timer = Progress::new(verbosity.time());
    timer.start(&format!("Reading {}", args.input.display()));
    let mut volume = io::read_volume(&args.input)?;
    timer.done();
    report(verbosity, "Input", &volume);

    // A full transform is already sized by its own construction
    if args.backward != Some(TransformType::Full) {
        let background = volume.edge_mean();
        volume = volume.resize_to_next_power2(background);
    }

    let params = TransformParams {
        n_theta: args.theta,
        kernel: args.kernel,
        padding: !args.nopadding,
        ..TransformParams::default()
    };
    let transformer = Transformer::new(&params, verbosity)?;

    if let Some(kind) = args.forward {
        timer.startln("Forward transform");
        volume = transformer.forward(volume, kind)?;
        timer.done_with_message("Forward transform");
        report(verbosity, "Transform", &volume);
    }

    if let Some(params) = pocs {
        timer.startln("POCS");
        match pocs::run(&mut volume, mask.as_ref(), &params, &CancelFlag::new(), verbosity) {
            Ok(outcome) => {
                if verbosity.result() {
                    if let Some(last) = outcome.residuals.last() {
                        println!("Final POCS residual:           {last}");
                    }
                }
            }
            Err(e) if !e.is_fatal() => eprintln!("Warning: {e}; POCS filtering skipped"),
            Err(e) => return Err(e),
        }
        timer.done_with_message("POCS");
    }

    if let Some(kind) = args.backward {
        timer.startln("Inverse transform");
        volume = transformer.inverse(volume, kind)?;
        timer.done_with_message("Inverse transform");
    }

    report(verbosity, "Output", &volume);
    timer.start(&format!("Writing {}", args.output.display()));
    io::write_volume(&volume, &args.output, args.datatype)?;
    timer.done();
    Ok(())
}

/// The first plane of a mask file
fn read_mask(path: &Path) -> Result<Array2<f32>> {
    let mask = io::read_volume(path)?;
    if mask.shape()[2] == 0 {
        return Err(RadonError::MissingInput(format!("{}: empty mask", path.display())));
    }
    Ok(mask.data.index_axis(Axis(2), 0).to_owned())
}

fn report(verbosity: Verbosity, label: &str, volume: &Volume) {
    if verbosity.stats() {
        let [nx, ny, nz] = volume.shape();
        println!("{label:<10} {nx} x {ny} x {nz}: {}", volume.statistics());
    }
}
