//! polystripe - Synthesize and verify text line polystripes

mod logging;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use vellum_core::error::Result;
use vellum_core::{
    ParseMode, format_points, length, orientation, parse_points, synthesize_stripe, verify_stripe,
};

#[derive(Parser, Debug)]
#[command(name = "polystripe")]
#[command(author, version, about = "Synthesize and verify text line polystripes", long_about = None)]
struct Args {
    /// Use debug logging level
    #[arg(short = 'd', long, global = true, action = ArgAction::SetTrue)]
    debug: bool,

    /// Stop parsing a point list at the first malformed pair instead of failing
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    lenient: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the polystripe coords around a baseline
    Synthesize {
        /// Baseline points, e.g. "10,50 200,52"
        #[arg(short = 'b', long)]
        baseline: String,

        /// Stripe height in pixels
        #[arg(short = 'H', long, default_value = "32.0")]
        height: f64,

        /// Fraction of the height below the baseline (0 to 0.5)
        #[arg(short = 'O', long, default_value = "0.25")]
        offset: f64,

        /// Round the coordinates to integers
        #[arg(short = 'r', long, action = ArgAction::SetTrue)]
        rounded: bool,
    },
    /// Check whether coords are a polystripe of a baseline
    Verify {
        /// Coords points
        #[arg(short = 'c', long)]
        coords: String,

        /// Baseline points
        #[arg(short = 'b', long)]
        baseline: String,
    },
    /// Print the length and orientation of a baseline
    Measure {
        /// Baseline points
        #[arg(short = 'b', long)]
        baseline: String,
    },
}

fn parse_mode(args: &Args) -> ParseMode {
    if args.lenient {
        ParseMode::Lenient
    } else {
        ParseMode::Strict
    }
}

/// Runs the subcommand; `Ok(false)` means a failed verification.
fn run(args: &Args) -> Result<bool> {
    let mode = parse_mode(args);
    match &args.command {
        Command::Synthesize {
            baseline,
            height,
            offset,
            rounded,
        } => {
            let baseline = parse_points(baseline, mode)?;
            let coords = synthesize_stripe(&baseline, *height, *offset)?;
            println!("{}", format_points(&coords, *rounded));
            Ok(true)
        }
        Command::Verify { coords, baseline } => {
            let coords = parse_points(coords, mode)?;
            let baseline = parse_points(baseline, mode)?;
            debug!(coords = coords.len(), baseline = baseline.len(), "verifying");
            match verify_stripe(&coords, &baseline) {
                Some(stripe) => {
                    println!("height={} offset={}", stripe.height, stripe.offset);
                    Ok(true)
                }
                None => {
                    println!("not a polystripe");
                    Ok(false)
                }
            }
        }
        Command::Measure { baseline } => {
            let baseline = parse_points(baseline, mode)?;
            let angle = orientation(&baseline)?;
            match angle {
                Some(a) => println!("length={} orientation={}", length(&baseline), a),
                None => println!("length={} orientation=none", length(&baseline)),
            }
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.debug);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}
