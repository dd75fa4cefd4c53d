mod cli;
mod error;
mod model;
mod output;
mod reader;
mod stats;
mod table;

use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;
use chrono::Local;
use clap::{ArgAction, Parser};
use miette::IntoDiagnostic;

/// Join NimbleGen tiling array intensities to their design and draw QC plots.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Tab-separated sample key: .pair file, sample type ('e' or 'i') and group.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    sample_key: PathBuf,

    /// Number of colours in the array experiment. Only the PM channel of
    /// each .pair file is read, whatever the value.
    #[arg(
        short,
        long,
        default_value_t = 2,
        value_parser = clap::value_parser!(u8).range(1..=2)
    )]
    colors: u8,

    /// Array design (.ndf) file. Looked up next to the sample key if omitted.
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    design: Option<PathBuf>,

    /// Output directory.
    #[arg(
        short,
        long,
        value_hint = clap::ValueHint::DirPath,
        default_value_t = format!("nimbleqc_output_{}", Local::now().format("%Y%m%d_%H%M%S"))
    )]
    output_directory: String,

    /// Write the probe table as .npz instead of .csv.
    #[arg(long)]
    npz: bool,

    /// Number of threads for the statistics.
    #[arg(short, long)]
    threads: Option<usize>,

    /// Verbosity. Repeat to increase.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress warnings.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_logger(verbose: u8, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    if let Err(e) = env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let level = record.level().as_str().to_lowercase();
            writeln!(buf, "[nimbleqc {level:>5}] {}", record.args())
        })
        .try_init()
    {
        eprintln!("failed to setup logger: {e}");
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose, args.quiet);
    std::fs::create_dir_all(&args.output_directory)
        .map_err(|e| error::CustomError::OutputDir { source: e })?;

    let run_spec = cli::build_run_spec(&args)?;
    run_spec.log_paths();
    cli::run(&run_spec)
}

fn main() -> miette::Result<()> {
    try_main().into_diagnostic()
}
