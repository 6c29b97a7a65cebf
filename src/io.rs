use image::codecs::bmp::BmpDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use log::warn;
use ndarray::{Array2, Array3, ArrayBase, ArrayView2, Axis, Data, Dimension};
use ndarray_npy::WritableElement;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use crate::error::{io_err, PrepError, Result};
use crate::patches::binarize;
use crate::types::OutputDirs;
use crate::utils::create_output_directory;

/// Set up the `train`, `val`, `testA` and `testB` directories under `output`
pub fn setup_output_directories(output: &Path) -> Result<OutputDirs> {
    fs::create_dir_all(output).map_err(io_err(output))?;

    Ok(OutputDirs {
        train_dir: create_output_directory(&output.join("train"))?,
        val_dir: create_output_directory(&output.join("val"))?,
        test_a_dir: create_output_directory(&output.join("testA"))?,
        test_b_dir: create_output_directory(&output.join("testB"))?,
    })
}

/// A decoded image and whether its BMP palette holds only greys.
struct Decoded {
    image: DynamicImage,
    grey_palette: bool,
}

fn open_image(path: &Path) -> Result<Decoded> {
    if !path.is_file() {
        return Err(PrepError::MissingSample {
            path: path.to_path_buf(),
        });
    }
    let image_err = |source| PrepError::Image {
        path: path.to_path_buf(),
        source,
    };

    if ImageFormat::from_path(path).ok() != Some(ImageFormat::Bmp) {
        let image = image::open(path).map_err(image_err)?;
        return Ok(Decoded {
            image,
            grey_palette: false,
        });
    }

    // The BMP decoder expands palettes to RGB, so the palette is inspected
    // here to tell greyscale sources apart.
    let file = File::open(path).map_err(io_err(path))?;
    let decoder = BmpDecoder::new(BufReader::new(file)).map_err(image_err)?;
    let grey_palette = decoder
        .get_palette()
        .is_some_and(|palette| palette.iter().all(|&[r, g, b]| r == g && g == b));
    let image = DynamicImage::from_decoder(decoder).map_err(image_err)?;
    Ok(Decoded {
        image,
        grey_palette,
    })
}

/// Height and width of an image, read from its header.
pub fn image_dimensions(path: &Path) -> Result<(usize, usize)> {
    if !path.is_file() {
        return Err(PrepError::MissingSample {
            path: path.to_path_buf(),
        });
    }
    let (width, height) = image::image_dimensions(path).map_err(|source| PrepError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((height as usize, width as usize))
}

/// Decode an image as an `(H, W, C)` array of 8-bit samples.
///
/// Greyscale images, including BMPs with an all-grey palette, keep a single
/// channel. Images with alpha keep four and everything else is read as RGB.
/// Sources deeper than 8 bits per sample are scaled down to 8 bits.
pub fn load_image(path: &Path) -> Result<Array3<u8>> {
    let Decoded {
        image: img,
        grey_palette,
    } = open_image(path)?;
    let color = img.color();
    let (height, width) = (img.height() as usize, img.width() as usize);
    if color.bits_per_pixel() / u16::from(color.channel_count()) > 8 {
        warn!("{} has {:?} samples; reducing to 8 bits", path.display(), color);
    }

    let (channels, raw) = if color.has_alpha() {
        (4, img.into_rgba8().into_raw())
    } else if grey_palette {
        // every pixel is (v, v, v)
        (1, img.into_rgb8().into_raw().into_iter().step_by(3).collect())
    } else if color.has_color() {
        (3, img.into_rgb8().into_raw())
    } else {
        (1, img.into_luma8().into_raw())
    };
    Ok(Array3::from_shape_vec((height, width, channels), raw)?)
}

/// Decode an annotation and binarize it.
///
/// A pixel is foreground when any of its colour channels is non-zero at the
/// source bit depth, so instance labels of any value map to 1.
pub fn load_mask(path: &Path) -> Result<Array2<u8>> {
    let img = open_image(path)?.image;
    let (height, width) = (img.height() as usize, img.width() as usize);

    let samples = Array3::from_shape_vec((height, width, 3), img.into_rgb16().into_raw())?;
    Ok(binarize(&samples).fold_axis(Axis(2), 0u8, |&acc, &v| acc | v))
}

/// Write a binary mask as an 8-bit greyscale BMP.
pub fn save_mask(path: &Path, mask: ArrayView2<'_, u8>) -> Result<()> {
    let (height, width) = mask.dim();
    let img = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([mask[[y as usize, x as usize]]])
    });
    img.save_with_format(path, ImageFormat::Bmp)
        .map_err(|source| PrepError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Copy a file byte for byte.
pub fn copy_sample(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_file() {
        return Err(PrepError::MissingSample {
            path: src.to_path_buf(),
        });
    }
    fs::copy(src, dst).map_err(io_err(src))?;
    Ok(())
}

/// Save an array as `.npy`, replacing any existing file.
pub fn write_array<A, S, D>(path: &Path, array: &ArrayBase<S, D>) -> Result<()>
where
    A: WritableElement,
    S: Data<Elem = A>,
    D: Dimension,
{
    ndarray_npy::write_npy(path, array).map_err(|source| PrepError::Npy {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage, Rgba, RgbaImage};
    use ndarray::Array3;

    #[test]
    fn test_setup_output_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output = temp_dir.path().join("data");

        let dirs = setup_output_directories(&output).unwrap();

        assert_eq!(dirs.train_dir, output.join("train"));
        assert_eq!(dirs.val_dir, output.join("val"));
        assert_eq!(dirs.test_a_dir, output.join("testA"));
        assert_eq!(dirs.test_b_dir, output.join("testB"));
        assert!(dirs.test_b_dir.is_dir());
    }

    #[test]
    fn test_load_rgb_image() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train_1.bmp");
        RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 200]))
            .save_with_format(&path, ImageFormat::Bmp)
            .unwrap();

        let image = load_image(&path).unwrap();

        assert_eq!(image.dim(), (2, 3, 3));
        assert_eq!(image[[1, 2, 0]], 2);
        assert_eq!(image[[1, 2, 1]], 1);
        assert_eq!(image[[1, 2, 2]], 200);
    }

    #[test]
    fn test_load_image_with_alpha() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train_1.png");
        RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let image = load_image(&path).unwrap();

        assert_eq!(image.dim(), (2, 2, 4));
        assert_eq!(image[[0, 0, 3]], 4);
    }

    #[test]
    fn test_load_greyscale_image() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train_1.png");
        GrayImage::from_fn(4, 2, |x, _| Luma([x as u8 * 10]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let image = load_image(&path).unwrap();

        assert_eq!(image.dim(), (2, 4, 1));
        assert_eq!(image[[0, 3, 0]], 30);
    }

    #[test]
    fn test_load_greyscale_bmp_keeps_one_channel() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train_1.bmp");
        GrayImage::from_fn(5, 3, |x, y| Luma([(x * 40 + y) as u8]))
            .save_with_format(&path, ImageFormat::Bmp)
            .unwrap();

        let image = load_image(&path).unwrap();

        assert_eq!(image.dim(), (3, 5, 1));
        assert_eq!(image[[0, 4, 0]], 160);
        assert_eq!(image[[2, 1, 0]], 42);
    }

    #[test]
    fn test_load_16_bit_image_scales_to_8_bits() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train_1.png");
        ImageBuffer::<Luma<u16>, Vec<u16>>::from_fn(2, 1, |x, _| Luma([[65535, 257][x as usize]]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let image = load_image(&path).unwrap();

        assert_eq!(image.dim(), (1, 2, 1));
        assert_eq!(image[[0, 0, 0]], 255);
        assert_eq!(image[[0, 1, 0]], 1);
    }

    #[test]
    fn test_corrupt_image() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train_1.bmp");
        fs::write(&path, b"not a bitmap at all").unwrap();

        assert!(matches!(load_image(&path), Err(PrepError::Image { .. })));
        assert!(matches!(load_mask(&path), Err(PrepError::Image { .. })));
    }

    #[test]
    fn test_image_dimensions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train_1.bmp");
        RgbImage::new(7, 3)
            .save_with_format(&path, ImageFormat::Bmp)
            .unwrap();

        assert_eq!(image_dimensions(&path).unwrap(), (3, 7));
        assert!(matches!(
            image_dimensions(&temp_dir.path().join("train_2.bmp")),
            Err(PrepError::MissingSample { .. })
        ));
    }

    #[test]
    fn test_load_mask_binarizes_labels() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train_1_anno.png");
        GrayImage::from_fn(3, 1, |x, _| Luma([[0, 1, 7][x as usize]]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let mask = load_mask(&path).unwrap();

        assert_eq!(mask, ndarray::arr2(&[[0u8, 1, 1]]));
    }

    #[test]
    fn test_save_mask_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train_1.bmp");
        let mask = ndarray::arr2(&[[0u8, 1, 0], [1, 1, 0]]);

        save_mask(&path, mask.view()).unwrap();

        assert_eq!(load_mask(&path).unwrap(), mask);
        let stored = image::open(&path).unwrap().into_rgb8();
        assert_eq!(stored.get_pixel(1, 0)[0], 1);
    }

    #[test]
    fn test_missing_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("train_9.bmp");

        assert!(matches!(load_image(&missing), Err(PrepError::MissingSample { .. })));
        assert!(matches!(load_mask(&missing), Err(PrepError::MissingSample { .. })));
        assert!(matches!(
            copy_sample(&missing, &temp_dir.path().join("out.bmp")),
            Err(PrepError::MissingSample { .. })
        ));
    }

    #[test]
    fn test_write_array() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("masks.npy");
        let array = Array3::<u8>::ones((2, 4, 4));

        write_array(&path, &array).unwrap();

        let restored: Array3<u8> = ndarray_npy::read_npy(&path).unwrap();
        assert_eq!(restored, array);
    }
}
