//! Grayscale conversion, smoothing and binarization

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::error::ImageError;
use image::{DynamicImage, GrayImage, ImageReader, Limits, Luma};
use serde::{Deserialize, Serialize};

use super::BinaryImage;

/// Largest image (in pixels) the preprocessor accepts.
///
/// Bounds the integer arithmetic in [`otsu_threshold`]. Real fingerprint scans
/// are several orders of magnitude smaller.
pub const MAX_PIXELS: u64 = 1 << 26;
/// Longest side the decoder accepts
const MAX_DIMENSION: u32 = 1 << 16;
/// Decoder allocation cap, enough for [`MAX_PIXELS`] of 16-bit RGBA
const MAX_DECODE_ALLOC: u64 = MAX_PIXELS * 8;

/// Binomial approximation of the 5-tap Gaussian, applied once per axis.
const KERNEL: [u32; 5] = [1, 4, 6, 4, 1];
/// Sum of the 2D kernel weights (16 * 16)
const KERNEL_NORM_SHIFT: u32 = 8;

/// Errors raised while reading fingerprint input
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("image not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image is {width}x{height}, more than {MAX_PIXELS} pixels")]
    TooLarge { width: u32, height: u32 },
    #[error("no fingerprint image for id {0}")]
    UnknownId(String),
    #[error("fingerprint id {id} matches more than one image: {candidates:?}")]
    AmbiguousId { id: String, candidates: Vec<PathBuf> },
    #[error("failed to read corpus directory {path}: {source}")]
    Corpus {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which side of the Otsu threshold holds the ridges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RidgePolarity {
    /// Pixels brighter than the threshold are ridge
    #[default]
    Bright,
    /// Pixels at or below the threshold are ridge (dark ink on light paper)
    Dark,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    #[serde(default)]
    pub polarity: RidgePolarity,
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// Decode an image file. The format is sniffed from the content, not the extension.
///
/// The header is read first and oversized images are rejected with
/// [`InputError::TooLarge`] before any pixel buffer is allocated.
pub fn load_image(path: &Path) -> Result<DynamicImage, InputError> {
    let io_error = |source: std::io::Error| match source.kind() {
        std::io::ErrorKind::NotFound => InputError::NotFound(path.to_path_buf()),
        _ => InputError::Io {
            path: path.to_path_buf(),
            source,
        },
    };
    let decode_error = |source| InputError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let bytes = std::fs::read(path).map_err(io_error)?;
    let reader = || ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format();

    let (width, height) = reader()
        .map_err(io_error)?
        .into_dimensions()
        .map_err(decode_error)?;
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(InputError::TooLarge { width, height });
    }

    let mut reader = reader().map_err(io_error)?;
    reader.limits(decode_limits());
    reader.decode().map_err(|source| match source {
        ImageError::Limits(_) => InputError::TooLarge { width, height },
        source => decode_error(source),
    })
}

/// Integer luma, `(299 R + 587 G + 114 B) / 1000` rounded half up
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000) as u8
}

/// Collapse any channel layout to a single 8-bit channel
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge
/// pixel (`gfedcb|abcdefgh|gfedcba`).
fn reflect101(index: i64, len: usize) -> usize {
    let n = len as i64;
    if n == 1 {
        return 0;
    }
    let mut i = index;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
    }
    i as usize
}

/// Fixed 5x5 Gaussian smoothing.
///
/// Separable `[1, 4, 6, 4, 1]` kernel on both axes, accumulated in integers
/// and rounded half up. The radius is part of the key derivation contract,
/// which is why it takes no parameters.
pub fn smooth(gray: &GrayImage) -> GrayImage {
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let src = gray.as_raw();

    let mut horizontal = vec![0u32; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            horizontal[y * width + x] = KERNEL
                .iter()
                .enumerate()
                .map(|(k, w)| w * row[reflect101(x as i64 + k as i64 - 2, width)] as u32)
                .sum();
        }
    }

    let mut out = GrayImage::new(gray.width(), gray.height());
    for y in 0..height {
        for x in 0..width {
            let sum: u32 = KERNEL
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    w * horizontal[reflect101(y as i64 + k as i64 - 2, height) * width + x]
                })
                .sum();
            let value = (sum + (1 << (KERNEL_NORM_SHIFT - 1))) >> KERNEL_NORM_SHIFT;
            out.put_pixel(x as u32, y as u32, Luma([value as u8]));
        }
    }
    out
}

/// `a * b` as a 192-bit value `(high, low)`, for exact comparisons
fn widening_mul(a: u128, b: u64) -> (u128, u64) {
    let low = (a as u64) as u128 * b as u128;
    let high = (a >> 64) * b as u128 + (low >> 64);
    (high, low as u64)
}

/// Otsu's threshold: the level that maximizes between-class variance.
///
/// For a split at `t` with `w0` pixels at or below it (intensity sum `s0`)
/// out of `n` pixels with intensity sum `total`, the between-class variance
/// scaled by `n^2` is `(total * w0 - s0 * n)^2 / (w0 * w1)`. Candidates are
/// compared by cross multiplication, so the result is exact. Ties keep the
/// lowest level. A histogram with a single populated bin yields 0.
///
/// # Panics
///
/// Panics if the image has more than [`MAX_PIXELS`] pixels.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let n = gray.as_raw().len() as u64;
    assert!(n <= MAX_PIXELS, "image exceeds MAX_PIXELS");

    let mut histogram = [0u64; 256];
    for value in gray.as_raw() {
        histogram[*value as usize] += 1;
    }
    let total: u64 = histogram
        .iter()
        .enumerate()
        .map(|(level, count)| level as u64 * count)
        .sum();

    // best numerator and denominator
    let mut best: Option<(u128, u64)> = None;
    let mut threshold = 0u8;
    let (mut w0, mut s0) = (0u64, 0u64);
    for (level, count) in histogram.iter().enumerate() {
        w0 += count;
        s0 += level as u64 * count;
        let w1 = n - w0;
        if w0 == 0 || w1 == 0 {
            continue;
        }
        let diff = (total as i128 * w0 as i128 - s0 as i128 * n as i128).unsigned_abs();
        let numerator = diff * diff;
        let denominator = w0 * w1;
        let better = match best {
            None => true,
            Some((best_num, best_den)) => {
                widening_mul(numerator, best_den) > widening_mul(best_num, denominator)
            }
        };
        if better {
            best = Some((numerator, denominator));
            threshold = level as u8;
        }
    }
    threshold
}

/// Split a grayscale image into ridge and background around `threshold`
pub fn binarize(gray: &GrayImage, threshold: u8, polarity: RidgePolarity) -> BinaryImage {
    let pixels = gray
        .as_raw()
        .iter()
        .map(|v| match polarity {
            RidgePolarity::Bright => *v > threshold,
            RidgePolarity::Dark => *v <= threshold,
        })
        .collect();
    BinaryImage {
        width: gray.width(),
        height: gray.height(),
        pixels,
    }
}

/// Grayscale, smooth and binarize a decoded scan
pub fn preprocess(
    image: &DynamicImage,
    options: &PreprocessOptions,
) -> Result<BinaryImage, InputError> {
    let (width, height) = (image.width(), image.height());
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(InputError::TooLarge { width, height });
    }

    let smoothed = smooth(&to_grayscale(image));
    let threshold = otsu_threshold(&smoothed);
    let binary = binarize(&smoothed, threshold, options.polarity);
    tracing::debug!(
        width,
        height,
        threshold,
        ridge_pixels = binary.count_foreground(),
        "binarized fingerprint"
    );
    Ok(binary)
}
