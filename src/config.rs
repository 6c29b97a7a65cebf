use clap::Parser;
use std::str::FromStr;

pub use crate::patches::BoundaryPolicy;

/// Command-line arguments for generating the GlaS training dataset.
#[derive(Parser, Debug, Clone)]
#[command(version, about = "Dataset generator for GlaS challenge.", long_about = None)]
pub struct Args {
    /// Path to original MICCAI 2015 GlaS dataset
    pub dataset_path: String,

    /// Validation size (between 0 and 1)
    #[arg(long = "val-size", default_value_t = 0.1, value_parser = validate_size)]
    pub val_size: f64,

    /// Path to output dataset
    #[arg(short = 'o', long = "output", default_value = "data")]
    pub output: String,

    /// Seed for the train/validation split; a new split is drawn every run if omitted
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Edge length of the square validation patches
    #[arg(long = "patch-size", default_value_t = 256, value_parser = validate_patch_size)]
    pub patch_size: usize,

    /// What to do with image borders that do not fill a whole patch
    #[arg(long = "boundary", value_enum, default_value = "drop")]
    pub boundary: BoundaryPolicy,

    /// Manifest column holding the grade (defaults to the last column)
    #[arg(long = "grade-column")]
    pub grade_column: Option<String>,
}

// Validate that the size lies strictly between 0.0 and 1.0
pub(crate) fn validate_size(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if val > 0.0 && val < 1.0 => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0 (exclusive)".to_string()),
    }
}

fn validate_patch_size(s: &str) -> Result<usize, String> {
    match usize::from_str(s) {
        Ok(val) if val > 0 => Ok(val),
        _ => Err("PATCH_SIZE must be a positive integer".to_string()),
    }
}
