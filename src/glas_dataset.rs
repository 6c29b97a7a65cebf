use log::info;
use std::path::Path;

use crate::config::Args;
use crate::corpus::PatchAssembler;
use crate::dataset::split_samples;
use crate::error::Result;
use crate::io::setup_output_directories;
use crate::manifest::read_manifest;
use crate::raw_images::prepare_raw_images;
use crate::types::PrepareSummary;

/// Name of the manifest inside the original dataset.
pub const MANIFEST_FILE: &str = "Grade.csv";

/// Main dataset preparation pipeline
///
/// Training and test images are copied whole with binarized masks, while the
/// validation images are cut into patch arrays. Output directories are
/// recreated, so a failed run is recovered by running again.
pub fn process_dataset(args: &Args) -> Result<PrepareSummary> {
    let dataset_path = Path::new(&args.dataset_path);
    let output = Path::new(&args.output);

    let rows = read_manifest(
        &dataset_path.join(MANIFEST_FILE),
        args.grade_column.as_deref(),
    )?;
    if args.seed.is_none() {
        info!("No --seed given; the train/validation split will differ between runs.");
    }
    let groups = split_samples(&rows, args.val_size, args.seed)?;
    let assembler = PatchAssembler::new(args.patch_size, args.boundary)?;

    let output_dirs = setup_output_directories(output)?;
    let mut summary = PrepareSummary::default();

    summary.train_samples =
        prepare_raw_images(dataset_path, &output_dirs.train_dir, &groups.train, "Train")?;
    info!("Training data is done.");

    summary.val_samples = groups.val.len();
    summary.val_patches = assembler.assemble(dataset_path, &output_dirs.val_dir, &groups.val)?;
    info!("Validation data is done.");

    summary.test_a_samples =
        prepare_raw_images(dataset_path, &output_dirs.test_a_dir, &groups.test_a, "TestA")?;
    info!("TestA data is done.");

    summary.test_b_samples =
        prepare_raw_images(dataset_path, &output_dirs.test_b_dir, &groups.test_b, "TestB")?;
    info!("TestB data is done.");

    summary.print_summary();
    Ok(summary)
}
