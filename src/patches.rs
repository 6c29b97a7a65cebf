//! Patch grid geometry and mask binarization.

use ndarray::{s, Array, Array3, Array4, ArrayBase, ArrayView2, ArrayView3, ArrayView4, Axis, Data, Dimension};

use clap::ValueEnum;

use crate::error::{PrepError, Result};

/// Remainder handling when an image side is not a multiple of the patch size.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum BoundaryPolicy {
    /// Discard the partial border patches
    #[default]
    Drop,
    /// Zero-pad the border up to a whole patch
    Pad,
    /// Shift the last patch back so it ends on the border
    Overlap,
}

/// A row-major grid of square patches laid over an image of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchGrid {
    height: usize,
    width: usize,
    patch_size: usize,
    policy: BoundaryPolicy,
    rows: usize,
    cols: usize,
}

impl PatchGrid {
    pub fn new(
        height: usize,
        width: usize,
        patch_size: usize,
        policy: BoundaryPolicy,
    ) -> Result<Self> {
        if patch_size == 0 {
            return Err(PrepError::InvalidPatchSize);
        }
        let (rows, cols) = match policy {
            BoundaryPolicy::Drop => (height / patch_size, width / patch_size),
            BoundaryPolicy::Pad => (
                height.div_ceil(patch_size),
                width.div_ceil(patch_size),
            ),
            BoundaryPolicy::Overlap => {
                if height < patch_size || width < patch_size {
                    return Err(PrepError::PatchLargerThanImage {
                        patch_size,
                        height,
                        width,
                    });
                }
                (height.div_ceil(patch_size), width.div_ceil(patch_size))
            }
        };
        Ok(Self {
            height,
            width,
            patch_size,
            policy,
            rows,
            cols,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// Number of patches in the grid.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn anchor(&self, index: usize, extent: usize) -> usize {
        let start = index * self.patch_size;
        match self.policy {
            BoundaryPolicy::Overlap => start.min(extent - self.patch_size),
            BoundaryPolicy::Drop | BoundaryPolicy::Pad => start,
        }
    }

    /// Top-left `(y, x)` of every patch, rows outer and columns inner.
    pub fn origins(&self) -> Vec<(usize, usize)> {
        (0..self.rows)
            .flat_map(|r| (0..self.cols).map(move |c| (r, c)))
            .map(|(r, c)| (self.anchor(r, self.height), self.anchor(c, self.width)))
            .collect()
    }

    /// Cut an `(H, W, C)` image into an `(N, P, P, C)` patch stack.
    ///
    /// # Panics
    ///
    /// Panics if the image size differs from the grid's.
    pub fn extract(&self, image: ArrayView3<'_, u8>) -> Array4<u8> {
        let (h, w, c) = image.dim();
        assert_eq!((h, w), (self.height, self.width), "image does not fit the grid");

        let p = self.patch_size;
        let mut patches = Array4::zeros((self.len(), p, p, c));
        for (k, (y, x)) in self.origins().into_iter().enumerate() {
            let y_end = (y + p).min(h);
            let x_end = (x + p).min(w);
            patches
                .slice_mut(s![k, ..y_end - y, ..x_end - x, ..])
                .assign(&image.slice(s![y..y_end, x..x_end, ..]));
        }
        patches
    }

    /// Cut an `(H, W)` mask into an `(N, P, P)` patch stack with the same
    /// geometry as [`PatchGrid::extract`].
    pub fn extract_mask(&self, mask: ArrayView2<'_, u8>) -> Array3<u8> {
        self.extract(mask.insert_axis(Axis(2)))
            .index_axis_move(Axis(3), 0)
    }

    /// Put a row-major `(N, P, P, C)` stack back together.
    ///
    /// With [`BoundaryPolicy::Drop`] the result covers only the tiled
    /// `rows * P` by `cols * P` region; otherwise it has the full image size.
    ///
    /// # Panics
    ///
    /// Panics if the stack does not hold `len()` patches of this grid's size.
    pub fn assemble(&self, patches: ArrayView4<'_, u8>) -> Array3<u8> {
        let (n, ph, pw, c) = patches.dim();
        let p = self.patch_size;
        assert_eq!((n, ph, pw), (self.len(), p, p), "patch stack does not fit the grid");

        let (out_h, out_w) = match self.policy {
            BoundaryPolicy::Drop => (self.rows * p, self.cols * p),
            BoundaryPolicy::Pad | BoundaryPolicy::Overlap => (self.height, self.width),
        };
        let mut image = Array3::zeros((out_h, out_w, c));
        for (k, (y, x)) in self.origins().into_iter().enumerate() {
            let y_end = (y + p).min(out_h);
            let x_end = (x + p).min(out_w);
            image
                .slice_mut(s![y..y_end, x..x_end, ..])
                .assign(&patches.slice(s![k, ..y_end - y, ..x_end - x, ..]));
        }
        image
    }
}

/// Map every strictly positive value to 1 and everything else to 0.
pub fn binarize<A, S, D>(mask: &ArrayBase<S, D>) -> Array<u8, D>
where
    A: PartialOrd + Default + Copy,
    S: Data<Elem = A>,
    D: Dimension,
{
    let zero = A::default();
    mask.mapv(|v| u8::from(v > zero))
}
