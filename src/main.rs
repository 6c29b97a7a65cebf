use clap::Parser;

use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use glas_prep::{process_dataset, Args};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let dirname = PathBuf::from(&args.dataset_path);
    if !dirname.is_dir() {
        error!("The specified dataset_path does not exist: {}", args.dataset_path);
        return ExitCode::FAILURE;
    }

    info!("Starting the preparation process...");

    match process_dataset(&args) {
        Ok(_) => {
            info!("Dataset written to {}", args.output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to prepare dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}
