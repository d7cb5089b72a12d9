//! lineorder - Reading order of text lines
//!
//! Reads a JSON list of text lines, joins the segments that continue each
//! other and prints the reading order together with the join groups.
//!
//! Input:
//!
//! ```json
//! {"lines": [{"id": "l1", "baseline": "10,50 200,52", "coords": "10,35 200,37 200,57 10,55"}]}
//! ```
//!
//! `coords` may be omitted, in which case a polystripe of `--height` and
//! `--offset` around the baseline is used.

mod logging;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vellum_core::error::{LayoutError, Result};
use vellum_core::reading_order::{
    LineGeometry, ReadingOrderParams, get_reading_order, test_line_continuation,
};
use vellum_core::{ParseMode, parse_points, synthesize_stripe};

/// Computes the reading order of text lines given as JSON.
#[derive(Parser, Debug)]
#[command(name = "lineorder")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with the lines, "-" for stdin
    #[arg(default_value = "-")]
    input: String,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Stop parsing a point list at the first malformed pair instead of failing
    #[arg(long, action = ArgAction::SetTrue)]
    lenient: bool,

    // === Polystripe for lines without coords ===
    /// Stripe height in pixels
    #[arg(long, default_value = "32.0")]
    height: f64,

    /// Fraction of the stripe height below the baseline (0 to 0.5)
    #[arg(long, default_value = "0.25")]
    offset: f64,

    // === Reading order parameters ===
    /// Maximum baseline angle difference of joined lines, in degrees
    #[arg(short = 'A', long = "max-angle", default_value = "25.0")]
    max_angle: f64,

    /// Maximum overlap (IoU) of joined lines along the text direction
    #[arg(short = 'I', long = "max-horiz-iou", default_value = "0.1")]
    max_horiz_iou: f64,

    /// Minimum prolongation factor of joined lines
    #[arg(short = 'P', long = "min-prolong", default_value = "0.5")]
    min_prolong: f64,

    /// Weight of the baseline factor in the prolongation factor
    #[arg(short = 'W', long = "baseline-weight", default_value = "0.8")]
    baseline_weight: f64,

    /// Scale applied to the limits when re-testing ambiguous groups
    #[arg(short = 'R', long = "recursion-scale", default_value = "0.9")]
    recursion_scale: f64,

    /// Only print the join groups
    #[arg(short = 'j', long = "joins-only", action = ArgAction::SetTrue)]
    joins_only: bool,
}

#[derive(Debug, Deserialize)]
struct LineInput {
    id: String,
    baseline: String,
    #[serde(default)]
    coords: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Input {
    lines: Vec<LineInput>,
}

#[derive(Debug, Serialize)]
struct GroupOutput<'a> {
    lines: Vec<&'a str>,
    score: f64,
}

#[derive(Debug, Serialize)]
struct Output<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<Vec<&'a str>>,
    groups: Vec<GroupOutput<'a>>,
}

/// Build ReadingOrderParams from command line arguments.
fn build_params(args: &Args) -> Result<ReadingOrderParams> {
    let params = ReadingOrderParams {
        max_angle_diff: args.max_angle.to_radians(),
        max_horiz_iou: args.max_horiz_iou,
        min_prolong_factor: args.min_prolong,
        baseline_weight: args.baseline_weight,
        recursion_scale: args.recursion_scale,
    };
    params.validate()?;
    Ok(params)
}

fn read_input(path: &str) -> std::result::Result<Input, Box<dyn std::error::Error>> {
    let input = if path == "-" {
        let mut data = String::new();
        io::stdin().read_to_string(&mut data)?;
        serde_json::from_str(&data)?
    } else {
        let file = File::open(PathBuf::from(path))
            .map_err(|e| format!("Failed to open input file {path}: {e}"))?;
        serde_json::from_reader(BufReader::new(file))?
    };
    Ok(input)
}

fn to_geometry(line: &LineInput, args: &Args) -> Result<LineGeometry> {
    let mode = if args.lenient {
        ParseMode::Lenient
    } else {
        ParseMode::Strict
    };
    let baseline = parse_points(&line.baseline, mode)?;
    if baseline.len() != 2 {
        return Err(LayoutError::Validation(format!(
            "line {}: expected a 2-point baseline, got {} points",
            line.id,
            baseline.len()
        )));
    }
    let coords = match &line.coords {
        Some(raw) => parse_points(raw, mode)?,
        None => {
            debug!(id = %line.id, "synthesizing polystripe");
            synthesize_stripe(&baseline, args.height, args.offset)?
        }
    };
    LineGeometry::new(&baseline, &coords)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.debug);

    let params = build_params(&args)?;
    let input = read_input(&args.input)?;
    let lines = input
        .lines
        .iter()
        .map(|l| to_geometry(l, &args))
        .collect::<Result<Vec<_>>>()?;
    info!(lines = lines.len(), "read lines");

    let ids: Vec<&str> = input.lines.iter().map(|l| l.id.as_str()).collect();
    let groups = test_line_continuation(&lines, &params)?;
    let order = if args.joins_only {
        None
    } else {
        Some(
            get_reading_order(&lines, &params)?
                .into_iter()
                .map(|i| ids[i])
                .collect(),
        )
    };
    let output = Output {
        order,
        groups: groups
            .iter()
            .map(|g| GroupOutput {
                lines: g.lines.iter().map(|&i| ids[i]).collect(),
                score: g.score,
            })
            .collect(),
    };

    let mut writer: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .map_err(|e| format!("Failed to create output file {}: {}", args.outfile, e))?;
        Box::new(BufWriter::new(file))
    };
    serde_json::to_writer_pretty(&mut writer, &output)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}
