//! Raster stages of the pipeline
//!
//! Turns a decoded fingerprint scan into a one pixel wide ridge skeleton:
//!
//! - **[`preprocess`]**: grayscale conversion, fixed 5x5 smoothing and Otsu binarization
//! - **[`thinning`]**: Guo-Hall thinning run until a full pass removes nothing
//!
//! Every stage works on integers only. Floating point never touches pixel
//! values, so the same scan produces the same skeleton on every machine.
//!
//! The `image` crate is only used to decode inputs and encode debug
//! artifacts. Thresholding and thinning live here.

pub mod preprocess;
pub mod thinning;

use crate::minutiae::ExtractionError;

pub use preprocess::{
    binarize, load_image, otsu_threshold, preprocess, smooth, to_grayscale, InputError,
    PreprocessOptions, RidgePolarity, MAX_PIXELS,
};
pub use thinning::skeletonize;

/// Two-level pixel grid. `true` is ridge (foreground).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl BinaryImage {
    /// All-background image of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width as usize * height as usize],
        }
    }

    /// Wrap a row-major pixel buffer
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::DimensionMismatch`] if the buffer length
    /// is not `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<bool>) -> Result<Self, ExtractionError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or(ExtractionError::DimensionOverflow { width, height })?;
        if pixels.len() != expected {
            return Err(ExtractionError::DimensionMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build an image from text rows, `#` marks ridge pixels and anything else
    /// is background. Handy for small hand-drawn fixtures.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::RaggedRows`] if the rows differ in length.
    pub fn from_pattern(rows: &[&str]) -> Result<Self, ExtractionError> {
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        let mut pixels = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(ExtractionError::RaggedRows { row: y });
            }
            pixels.extend(row.chars().map(|c| c == '#'));
        }
        Self::from_pixels(width as u32, rows.len() as u32, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at `(x, y)`. Coordinates outside the image read as background.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the image.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        self.pixels[y as usize * self.width as usize + x as usize] = value;
    }

    /// Number of ridge pixels
    pub fn count_foreground(&self) -> usize {
        self.pixels.iter().filter(|p| **p).count()
    }

    /// The eight neighbors of `(x, y)` in clockwise order starting north:
    /// N, NE, E, SE, S, SW, W, NW.
    pub fn neighbors(&self, x: u32, y: u32) -> [bool; 8] {
        let (x, y) = (x as i64, y as i64);
        [
            self.get(x, y - 1),
            self.get(x + 1, y - 1),
            self.get(x + 1, y),
            self.get(x + 1, y + 1),
            self.get(x, y + 1),
            self.get(x - 1, y + 1),
            self.get(x - 1, y),
            self.get(x - 1, y - 1),
        ]
    }

    /// Render as an 8-bit image, ridge white on black
    pub fn to_luma(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(x as i64, y as i64) { 255 } else { 0 }])
        })
    }
}

/// One pixel wide ridge skeleton, same dimensions as the binary image it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonImage(BinaryImage);

impl SkeletonImage {
    /// Treat `image` as already thinned, without running the thinning pass.
    ///
    /// Minutiae extraction is defined for any binary image, so this is how
    /// hand-built skeletons reach the extractor.
    pub fn assume_thin(image: BinaryImage) -> Self {
        Self(image)
    }

    /// Run thinning again. A skeleton is a fixed point of thinning, so this
    /// returns an equal image.
    pub fn rethin(&self) -> Self {
        skeletonize(&self.0)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn get(&self, x: i64, y: i64) -> bool {
        self.0.get(x, y)
    }

    pub fn as_binary(&self) -> &BinaryImage {
        &self.0
    }

    pub fn into_binary(self) -> BinaryImage {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_pixels_rejects_wrong_length() {
        let err = BinaryImage::from_pixels(3, 3, vec![false; 8]).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::DimensionMismatch { len: 8, .. }
        ));
    }

    #[test]
    fn test_from_pattern_rejects_ragged_rows() {
        let err = BinaryImage::from_pattern(&["...", "..", "..."]).unwrap_err();
        assert!(matches!(err, ExtractionError::RaggedRows { row: 1 }));
    }

    #[test]
    fn test_out_of_bounds_reads_background() {
        let img = BinaryImage::from_pattern(&["##", "##"]).unwrap();
        assert!(img.get(0, 0));
        assert!(!img.get(-1, 0));
        assert!(!img.get(0, 2));
        assert!(!img.get(2, 1));
    }

    #[test]
    fn test_neighbors_clockwise_from_north() {
        let img = BinaryImage::from_pattern(&[
            "#..", //
            "..#", //
            ".#.",
        ])
        .unwrap();
        // N, NE, E, SE, S, SW, W, NW
        assert_eq!(
            img.neighbors(1, 1),
            [false, false, true, false, true, false, false, true]
        );
    }

    #[test]
    fn test_to_luma() {
        let img = BinaryImage::from_pattern(&["#.", ".#"]).unwrap();
        let luma = img.to_luma();
        assert_eq!(luma.get_pixel(0, 0).0, [255]);
        assert_eq!(luma.get_pixel(1, 0).0, [0]);
        assert_eq!(luma.get_pixel(1, 1).0, [255]);
    }
}
