//! Crossing-number minutiae extraction
//!
//! For a ridge pixel with neighbors `P1..P8` (N, NE, E, SE, S, SW, W, NW):
//!
//! ```text
//! CN = 1/2 * sum(|P_i - P_(i mod 8)+1|)
//! ```
//!
//! `CN == 1` is a ridge ending, `CN == 3` a bifurcation. Every other value is
//! ignored. Raw points are reported as found: no deduplication and no
//! filtering of spurious minutiae near borders or short spurs.

use crate::imaging::SkeletonImage;

use super::{Minutia, MinutiaKind, MinutiaeSet};

/// Crossing number of a neighborhood given as N, NE, E, SE, S, SW, W, NW
pub fn crossing_number(neighbors: &[bool; 8]) -> u8 {
    let changes = (0..8)
        .filter(|i| neighbors[*i] != neighbors[(i + 1) % 8])
        .count();
    (changes / 2) as u8
}

pub fn classify(crossing_number: u8) -> Option<MinutiaKind> {
    match crossing_number {
        1 => Some(MinutiaKind::Ending),
        3 => Some(MinutiaKind::Bifurcation),
        _ => None,
    }
}

/// Scan the interior of a skeleton row by row and collect its minutiae.
///
/// The outermost pixel ring is never inspected, so neighbor reads never leave
/// the image. Skeletons narrower or shorter than three pixels have no
/// interior and yield an empty set.
pub fn extract_minutiae(skeleton: &SkeletonImage) -> MinutiaeSet {
    let binary = skeleton.as_binary();
    let mut set = MinutiaeSet::new();
    for y in 1..skeleton.height().saturating_sub(1) {
        for x in 1..skeleton.width().saturating_sub(1) {
            if !binary.get(x as i64, y as i64) {
                continue;
            }
            let cn = crossing_number(&binary.neighbors(x, y));
            if let Some(kind) = classify(cn) {
                set.push(Minutia { x, y, kind });
            }
        }
    }
    tracing::debug!(
        endings = set.endings.len(),
        bifurcations = set.bifurcations.len(),
        "extracted minutiae"
    );
    set
}
