use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing the dataset. Every variant is fatal.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("manifest not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("failed to read manifest {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("manifest {} has no `{column}` column", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("manifest row {row} has an empty identifier")]
    EmptyIdentifier { row: usize },

    #[error("identifier `{name}` appears more than once in the manifest")]
    DuplicateIdentifier { name: String },

    #[error("identifier `{name}` is not usable as a file name")]
    UnsafeIdentifier { name: String },

    #[error("no `train_` identifiers in the manifest")]
    EmptyTrainPool,

    #[error(
        "the least populated grade `{grade}` has only {count} member(s); \
         stratification needs at least 2"
    )]
    ClassTooSmall { grade: String, count: usize },

    #[error("{side} split of {size} sample(s) is smaller than the {classes} grade(s)")]
    SplitTooSmall {
        side: &'static str,
        size: usize,
        classes: usize,
    },

    #[error("validation fraction {0} is not strictly between 0 and 1")]
    InvalidFraction(f64),

    #[error("patch size must be positive")]
    InvalidPatchSize,

    #[error("missing sample file: {}", path.display())]
    MissingSample { path: PathBuf },

    #[error("failed to decode or encode {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image and mask of `{name}` disagree: image {image:?}, mask {mask:?}")]
    DimensionMismatch {
        name: String,
        image: (usize, usize),
        mask: (usize, usize),
    },

    #[error("`{name}` has {found} channel(s) but earlier samples have {expected}")]
    ChannelMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("patch size {patch_size} exceeds image size {height}x{width}")]
    PatchLargerThanImage {
        patch_size: usize,
        height: usize,
        width: usize,
    },

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write array {}: {source}", path.display())]
    Npy {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },
}

pub type Result<T> = std::result::Result<T, PrepError>;

/// Attach a path to an `std::io::Error`.
pub(crate) fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> PrepError {
    let path = path.into();
    move |source| PrepError::Io { path, source }
}
