use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use udffsck::{check, RunConfig, RunMode};

/// A consistency checker and repair tool for UDF filesystems.
#[derive(Parser)]
#[command(name = "udffsck", version, about)]
struct Args {
    /// Block device or regular file holding the UDF volume.
    input: PathBuf,

    /// Force the logical sector size instead of probing for one.
    #[arg(short = 'b', long = "blocksize")]
    blocksize: Option<u32>,

    /// Prompt before applying each fix.
    #[arg(short = 'i')]
    interactive: bool,

    /// Apply every fix without prompting.
    #[arg(short = 'p')]
    autofix: bool,

    /// Increase logging verbosity (repeatable).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .expect("logger can only be initialized once");

    let mode = if args.autofix {
        RunMode::Autofix
    } else if args.interactive {
        RunMode::Interactive
    } else {
        RunMode::CheckOnly
    };

    let mut config = RunConfig::new(mode);
    config.forced_sector_size = args.blocksize;
    config.verbosity = args.verbose;

    let file = match OpenOptions::new().read(true).write(!config.is_readonly()).open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("udffsck: cannot open {}: {e}", args.input.display());
            return ExitCode::from(udffsck::ExitStatus::USAGE.code() as u8);
        }
    };

    let report = match check(file, &config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("udffsck: {e}");
            return ExitCode::from(udffsck::ExitStatus::OPERATIONAL_ERROR.code() as u8);
        }
    };

    for line in &report.listing {
        println!("{line}");
    }
    for finding in &report.findings {
        let tag = if finding.corrected { "CORRECTED" } else { "UNCORRECTED" };
        match &finding.path {
            Some(path) => eprintln!("udffsck: [{tag}] {path}: {}", finding.message),
            None => eprintln!("udffsck: [{tag}] {}", finding.message),
        }
    }

    ExitCode::from(report.status().code() as u8)
}
