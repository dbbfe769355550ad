//! Debug images of the intermediate pipeline stages
//!
//! - `prep_<id>.png`: the binarized scan, ridge white on black
//! - `min_<id>.png`: the skeleton with endings as red discs and
//!   bifurcations as blue discs
//!
//! Artifacts are only written when a directory is configured. They are
//! outputs only and never read back by the pipeline.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::imaging::{BinaryImage, SkeletonImage};
use crate::minutiae::{MinutiaKind, MinutiaeSet};
use crate::store::{validate_id, write_atomic, PersistenceError};

/// Radius of the filled disc drawn over each minutia
pub const MARKER_RADIUS: i64 = 3;

const RIDGE: Rgb<u8> = Rgb([255, 255, 255]);
const ENDING: Rgb<u8> = Rgb([255, 0, 0]);
const BIFURCATION: Rgb<u8> = Rgb([0, 0, 255]);

/// Paths of the artifacts written for one fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub preprocessed: PathBuf,
    pub minutiae: PathBuf,
}

/// Skeleton in white with a disc over every minutia
pub fn render_minutiae(skeleton: &SkeletonImage, minutiae: &MinutiaeSet) -> RgbImage {
    let mut canvas = RgbImage::from_fn(skeleton.width(), skeleton.height(), |x, y| {
        if skeleton.get(x as i64, y as i64) {
            RIDGE
        } else {
            Rgb([0, 0, 0])
        }
    });
    for minutia in minutiae.iter() {
        let color = match minutia.kind {
            MinutiaKind::Ending => ENDING,
            MinutiaKind::Bifurcation => BIFURCATION,
        };
        fill_disc(&mut canvas, minutia.x as i64, minutia.y as i64, color);
    }
    canvas
}

fn fill_disc(canvas: &mut RgbImage, cx: i64, cy: i64, color: Rgb<u8>) {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    for dy in -MARKER_RADIUS..=MARKER_RADIUS {
        for dx in -MARKER_RADIUS..=MARKER_RADIUS {
            if dx * dx + dy * dy > MARKER_RADIUS * MARKER_RADIUS {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if (0..width).contains(&x) && (0..height).contains(&y) {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

fn write_png(path: &Path, image: DynamicImage) -> Result<(), PersistenceError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| PersistenceError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    write_atomic(path, &bytes)
}

/// Write both artifacts for `id` into `dir`
pub fn write_artifacts(
    dir: &Path,
    id: &str,
    binary: &BinaryImage,
    skeleton: &SkeletonImage,
    minutiae: &MinutiaeSet,
) -> Result<ArtifactPaths, PersistenceError> {
    validate_id(id)?;
    let paths = ArtifactPaths {
        preprocessed: dir.join(format!("prep_{}.png", id)),
        minutiae: dir.join(format!("min_{}.png", id)),
    };
    write_png(&paths.preprocessed, DynamicImage::ImageLuma8(binary.to_luma()))?;
    write_png(
        &paths.minutiae,
        DynamicImage::ImageRgb8(render_minutiae(skeleton, minutiae)),
    )?;
    tracing::debug!(dir = %dir.display(), id, "wrote debug artifacts");
    Ok(paths)
}
