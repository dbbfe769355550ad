//! Shared fixtures for pipeline integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use tempfile::TempDir;

pub const TEE_WIDTH: u32 = 40;
pub const TEE_HEIGHT: u32 = 24;
/// Canonical minutiae of [`tee`], whatever its polarity or color
pub const TEE_CANONICAL: &str = "E:7,8;20,17;32,8|B:20,10";

/// Whether `(x, y)` is on the thick T-shaped ridge
pub fn on_tee(x: u32, y: u32) -> bool {
    ((6..=10).contains(&y) && (5..=34).contains(&x))
        || ((18..=22).contains(&x) && (6..=19).contains(&y))
}

/// A bright T-shaped ridge on a dark background
pub fn tee() -> GrayImage {
    GrayImage::from_fn(TEE_WIDTH, TEE_HEIGHT, |x, y| {
        Luma([if on_tee(x, y) { 255 } else { 0 }])
    })
}

/// The same ridge as dark ink on light paper
pub fn inverted_tee() -> GrayImage {
    let mut image = tee();
    image::imageops::invert(&mut image);
    image
}

pub fn colored_tee() -> RgbImage {
    RgbImage::from_fn(TEE_WIDTH, TEE_HEIGHT, |x, y| {
        if on_tee(x, y) {
            Rgb([200, 180, 160])
        } else {
            Rgb([10, 20, 30])
        }
    })
}

pub fn save_png(dir: &Path, name: &str, image: DynamicImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

/// A corpus directory with one tee image per id
pub fn tee_corpus(ids: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for id in ids {
        save_png(
            dir.path(),
            &format!("{}.png", id),
            DynamicImage::ImageLuma8(tee()),
        );
    }
    dir
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
