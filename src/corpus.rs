//! Validation patch corpus.
//!
//! Every sample is cut into a grid of square patches and the patches of all
//! samples are stacked into one image array and one mask array. Patch `i` of
//! the mask array is the ground truth of patch `i` of the image array; patches
//! are ordered by sample, then row-major by grid cell.

use log::{debug, info, warn};
use ndarray::{concatenate, Array3, Array4, ArrayView3, ArrayView4, Axis};
use std::fs;
use std::path::Path;

use crate::error::{io_err, PrepError, Result};
use crate::io::{load_image, load_mask, write_array};
use crate::patches::{BoundaryPolicy, PatchGrid};
use crate::utils::{annotation_file_name, create_progress_bar, image_file_name};

pub const IMAGES_CORPUS: &str = "images.npy";
pub const MASKS_CORPUS: &str = "masks.npy";

/// Channel count assumed for a corpus built from no samples.
const DEFAULT_CHANNELS: usize = 3;

/// Index-aligned image and mask patch stacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchCorpus {
    /// `(N, P, P, C)`
    pub images: Array4<u8>,
    /// `(N, P, P)`
    pub masks: Array3<u8>,
}

impl PatchCorpus {
    pub fn len(&self) -> usize {
        self.masks.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write `images.npy` and `masks.npy` into `dst_dir`, overwriting both.
    ///
    /// Single-channel image stacks are stored as `(N, P, P)`.
    pub fn write(&self, dst_dir: &Path) -> Result<()> {
        let images_path = dst_dir.join(IMAGES_CORPUS);
        if self.images.len_of(Axis(3)) == 1 {
            write_array(&images_path, &self.images.index_axis(Axis(3), 0))?;
        } else {
            write_array(&images_path, &self.images)?;
        }
        write_array(&dst_dir.join(MASKS_CORPUS), &self.masks)
    }
}

/// Cuts samples into patches of one fixed size and stacks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchAssembler {
    patch_size: usize,
    policy: BoundaryPolicy,
}

impl PatchAssembler {
    pub fn new(patch_size: usize, policy: BoundaryPolicy) -> Result<Self> {
        if patch_size == 0 {
            return Err(PrepError::InvalidPatchSize);
        }
        Ok(Self { patch_size, policy })
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    /// Patches of one sample: `<name>.bmp` and its binarized `<name>_anno.bmp`.
    pub fn sample_patches(&self, src_dir: &Path, name: &str) -> Result<(Array4<u8>, Array3<u8>)> {
        let image = load_image(&src_dir.join(image_file_name(name)))?;
        let mask = load_mask(&src_dir.join(annotation_file_name(name)))?;

        let (height, width, _) = image.dim();
        if mask.dim() != (height, width) {
            return Err(PrepError::DimensionMismatch {
                name: name.to_string(),
                image: (height, width),
                mask: mask.dim(),
            });
        }

        let grid = PatchGrid::new(height, width, self.patch_size, self.policy)?;
        if grid.is_empty() {
            warn!(
                "`{}` ({}x{}) is smaller than one {}px patch; it contributes no patches",
                name, height, width, self.patch_size
            );
        }
        debug!("`{}`: {}x{} grid", name, grid.rows(), grid.cols());
        Ok((grid.extract(image.view()), grid.extract_mask(mask.view())))
    }

    /// Build the corpus of `names` in the given order.
    pub fn build_corpus(&self, src_dir: &Path, names: &[String]) -> Result<PatchCorpus> {
        let pb = create_progress_bar(names.len() as u64, "Val");
        let mut images = Vec::with_capacity(names.len());
        let mut masks = Vec::with_capacity(names.len());
        let mut channels = None;

        for name in names {
            let (image_patches, mask_patches) = self.sample_patches(src_dir, name)?;

            let found = image_patches.len_of(Axis(3));
            let expected = *channels.get_or_insert(found);
            if found != expected {
                return Err(PrepError::ChannelMismatch {
                    name: name.clone(),
                    expected,
                    found,
                });
            }

            images.push(image_patches);
            masks.push(mask_patches);
            pb.inc(1);
        }
        pb.finish_with_message("Patch extraction complete");

        let p = self.patch_size;
        if images.is_empty() {
            let channels = channels.unwrap_or(DEFAULT_CHANNELS);
            return Ok(PatchCorpus {
                images: Array4::zeros((0, p, p, channels)),
                masks: Array3::zeros((0, p, p)),
            });
        }

        let image_views: Vec<ArrayView4<'_, u8>> = images.iter().map(|a| a.view()).collect();
        let mask_views: Vec<ArrayView3<'_, u8>> = masks.iter().map(|a| a.view()).collect();
        Ok(PatchCorpus {
            images: concatenate(Axis(0), &image_views)?,
            masks: concatenate(Axis(0), &mask_views)?,
        })
    }

    /// Build the corpus of `names` and write it into `dst_dir`.
    ///
    /// Creates `dst_dir` if needed. Existing corpus files are replaced.
    /// Returns the number of patches written.
    pub fn assemble(&self, src_dir: &Path, dst_dir: &Path, names: &[String]) -> Result<usize> {
        fs::create_dir_all(dst_dir).map_err(io_err(dst_dir))?;

        let corpus = self.build_corpus(src_dir, names)?;
        corpus.write(dst_dir)?;

        info!(
            "Wrote {} patches of {}px from {} images to {}",
            corpus.len(),
            self.patch_size,
            names.len(),
            dst_dir.display()
        );
        Ok(corpus.len())
    }
}
