//! GlaS dataset generator
//!
//! This library turns the MICCAI 2015 GlaS gland segmentation dataset into the
//! layout a segmentation trainer reads: whole images with binary masks for the
//! training and test sets, and aligned patch arrays for the validation set.

pub mod config;
pub mod corpus;
pub mod dataset;
pub mod error;
pub mod glas_dataset;
pub mod io;
pub mod manifest;
pub mod patches;
pub mod raw_images;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use config::Args;
pub use corpus::{PatchAssembler, PatchCorpus};
pub use dataset::split_samples;
pub use error::{PrepError, Result};
pub use glas_dataset::process_dataset;
pub use manifest::read_manifest;
pub use patches::{binarize, BoundaryPolicy, PatchGrid};
pub use raw_images::prepare_raw_images;
pub use types::{ManifestRow, OutputDirs, PrepareSummary, SampleGroups};
