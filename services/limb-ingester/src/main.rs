//! OMPS limb profile ingester.
//!
//! Inspects Level-2 limb ozone granules or converts them to NetCDF.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use limb_ingester::{
    collect_inputs, format_record, init_tracing, IngesterConfig, IngestionPipeline, LogFormat,
};
use omps_limb_parser::silence_hdf5_errors;

#[derive(Parser, Debug)]
#[command(name = "limb-ingester")]
#[command(about = "Inspect and convert OMPS limb profile ozone granules")]
struct Args {
    /// Configuration file path (YAML). Without it, LIMB_* variables are used.
    #[arg(short, long, global = true, env = "LIMB_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Worker threads (0 = one per core)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of each granule
    Inspect {
        /// Granule files or directories to search
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Emit one JSON object per granule
        #[arg(long)]
        json: bool,
    },

    /// Write each granule as a NetCDF file
    Convert {
        /// Granule files or directories to search
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Directory for NetCDF output
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Replace existing output files
        #[arg(long)]
        overwrite: bool,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = IngesterConfig::load(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }

    init_tracing(&config.logging)?;

    // Must run before worker threads open any file
    silence_hdf5_errors();

    info!("Starting OMPS limb ingester");

    match args.command {
        Command::Inspect { paths, json } => {
            let files = collect_inputs(&paths)?;
            if files.is_empty() {
                warn!("No granules found");
            }

            let pipeline = IngestionPipeline::new(&config)?;
            let report = pipeline.inspect(&files);

            for outcome in &report.outcomes {
                if let Ok(record) = &outcome.result {
                    if json {
                        println!("{}", serde_json::to_string(record)?);
                    } else {
                        print!("{}", format_record(record));
                    }
                }
            }
            Ok(report.is_success())
        }
        Command::Convert {
            paths,
            output_dir,
            overwrite,
        } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            config.overwrite |= overwrite;

            let files = collect_inputs(&paths)?;
            if files.is_empty() {
                warn!("No granules found");
            }

            let pipeline = IngestionPipeline::new(&config)?;
            let report = pipeline.convert(&files)?;

            info!(
                output_dir = %pipeline.config().output_dir.display(),
                converted = report.succeeded(),
                failed = report.failed(),
                "Conversion finished"
            );
            Ok(report.is_success())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_convert_arguments() {
        let args = Args::try_parse_from([
            "limb-ingester",
            "--jobs",
            "3",
            "convert",
            "granules",
            "--output-dir",
            "nc",
            "--overwrite",
        ])
        .unwrap();
        assert_eq!(args.jobs, Some(3));
        match args.command {
            Command::Convert {
                paths,
                output_dir,
                overwrite,
            } => {
                assert_eq!(paths, vec![PathBuf::from("granules")]);
                assert_eq!(output_dir, Some(PathBuf::from("nc")));
                assert!(overwrite);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_config_path_from_env() {
        std::env::set_var("LIMB_CONFIG", "/etc/limb/ingester.yaml");
        let args = Args::try_parse_from(["limb-ingester", "inspect", "a.h5", "--json"]).unwrap();
        std::env::remove_var("LIMB_CONFIG");
        assert_eq!(args.config, Some(PathBuf::from("/etc/limb/ingester.yaml")));
    }
}
