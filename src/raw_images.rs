use log::debug;
use std::fs;
use std::path::Path;

use crate::error::{io_err, PrepError, Result};
use crate::io::{copy_sample, image_dimensions, load_mask, save_mask};
use crate::utils::{annotation_file_name, create_progress_bar, image_file_name};

/// Copy whole images of `names` into `dst_dir/images` and write their
/// binarized annotations into `dst_dir/masks` under the image file name.
///
/// An annotation whose size differs from its image aborts the run.
/// Returns the number of samples written.
pub fn prepare_raw_images(
    src_dir: &Path,
    dst_dir: &Path,
    names: &[String],
    label: &str,
) -> Result<usize> {
    let images_dir = dst_dir.join("images");
    let masks_dir = dst_dir.join("masks");
    fs::create_dir_all(&images_dir).map_err(io_err(&images_dir))?;
    fs::create_dir_all(&masks_dir).map_err(io_err(&masks_dir))?;

    let pb = create_progress_bar(names.len() as u64, label);
    for name in names {
        let img_name = image_file_name(name);

        let src_image = src_dir.join(&img_name);
        let (height, width) = image_dimensions(&src_image)?;
        let mask = load_mask(&src_dir.join(annotation_file_name(name)))?;
        if mask.dim() != (height, width) {
            return Err(PrepError::DimensionMismatch {
                name: name.to_string(),
                image: (height, width),
                mask: mask.dim(),
            });
        }

        copy_sample(&src_image, &images_dir.join(&img_name))?;
        save_mask(&masks_dir.join(&img_name), mask.view())?;

        debug!("{} -> {}", name, dst_dir.display());
        pb.inc(1);
    }
    pb.finish_with_message(format!("{} processing complete", label));

    Ok(names.len())
}
