use std::path::PathBuf;

/// Identifier prefix of the training pool.
pub const TRAIN_PREFIX: &str = "train_";
/// Identifier prefix of the first held-out test set.
pub const TEST_A_PREFIX: &str = "testA_";
/// Identifier prefix of the second held-out test set.
pub const TEST_B_PREFIX: &str = "testB_";

// One row of Grade.csv
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub name: String,
    pub grade: String,
}

impl ManifestRow {
    pub fn new(name: impl Into<String>, grade: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grade: grade.into(),
        }
    }
}

// The four disjoint identifier groups produced by the splitter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleGroups {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test_a: Vec<String>,
    pub test_b: Vec<String>,
}

// Struct to hold the paths to the output directories of each group
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub train_dir: PathBuf,
    pub val_dir: PathBuf,
    pub test_a_dir: PathBuf,
    pub test_b_dir: PathBuf,
}

// Counters reported at the end of a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrepareSummary {
    pub train_samples: usize,
    pub val_samples: usize,
    pub val_patches: usize,
    pub test_a_samples: usize,
    pub test_b_samples: usize,
}

impl PrepareSummary {
    pub fn print_summary(&self) {
        log::info!("=== Preparation Summary ===");
        log::info!("Training images: {}", self.train_samples);
        log::info!(
            "Validation images: {} ({} patches)",
            self.val_samples,
            self.val_patches
        );
        log::info!("TestA images: {}", self.test_a_samples);
        log::info!("TestB images: {}", self.test_b_samples);
    }
}
