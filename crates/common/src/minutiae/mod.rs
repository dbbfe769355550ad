//! Minutiae extraction and canonical serialization
//!
//! - **[`crossing`]**: crossing-number classification of skeleton pixels
//! - **[`canonical`]**: the byte string that gets hashed into a key seed
//!
//! A [`MinutiaeSet`] keeps points in the order they were discovered. Nothing
//! downstream may depend on that order; [`MinutiaeSet::canonicalize`] sorts
//! before serializing.

pub mod canonical;
pub mod crossing;

use serde::{Deserialize, Serialize};

pub use canonical::CanonicalMinutiae;
pub use crossing::{classify, crossing_number, extract_minutiae};

/// Reserved for skeleton geometry that cannot exist
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("pixel buffer of length {len} does not fit {width}x{height}")]
    DimensionMismatch { width: u32, height: u32, len: usize },
    #[error("{width}x{height} overflows the address space")]
    DimensionOverflow { width: u32, height: u32 },
    #[error("pattern row {row} has a different length than row 0")]
    RaggedRows { row: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinutiaKind {
    /// Crossing number 1
    Ending,
    /// Crossing number 3
    Bifurcation,
}

/// A classified skeleton pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Minutia {
    pub x: u32,
    pub y: u32,
    pub kind: MinutiaKind,
}

/// Endings and bifurcations as two coordinate lists, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinutiaeSet {
    pub endings: Vec<(u32, u32)>,
    pub bifurcations: Vec<(u32, u32)>,
}

impl MinutiaeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, minutia: Minutia) {
        let point = (minutia.x, minutia.y);
        match minutia.kind {
            MinutiaKind::Ending => self.endings.push(point),
            MinutiaKind::Bifurcation => self.bifurcations.push(point),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.endings.is_empty() && self.bifurcations.is_empty()
    }

    pub fn count(&self) -> MinutiaeCount {
        MinutiaeCount {
            endings: self.endings.len(),
            bifurcations: self.bifurcations.len(),
        }
    }

    /// Every point with its kind, endings first
    pub fn iter(&self) -> impl Iterator<Item = Minutia> + '_ {
        let endings = self.endings.iter().map(|(x, y)| Minutia {
            x: *x,
            y: *y,
            kind: MinutiaKind::Ending,
        });
        let bifurcations = self.bifurcations.iter().map(|(x, y)| Minutia {
            x: *x,
            y: *y,
            kind: MinutiaKind::Bifurcation,
        });
        endings.chain(bifurcations)
    }

    /// Serialize into the canonical string, see [`CanonicalMinutiae`]
    pub fn canonicalize(&self) -> CanonicalMinutiae {
        CanonicalMinutiae::from_set(self)
    }
}

impl FromIterator<Minutia> for MinutiaeSet {
    fn from_iter<T: IntoIterator<Item = Minutia>>(iter: T) -> Self {
        let mut set = Self::new();
        for minutia in iter {
            set.push(minutia);
        }
        set
    }
}

/// Number of minutiae of each kind, as stored in key records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinutiaeCount {
    pub endings: usize,
    pub bifurcations: usize,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_push_splits_by_kind() {
        let set: MinutiaeSet = [
            Minutia {
                x: 3,
                y: 4,
                kind: MinutiaKind::Ending,
            },
            Minutia {
                x: 1,
                y: 1,
                kind: MinutiaKind::Bifurcation,
            },
            Minutia {
                x: 0,
                y: 9,
                kind: MinutiaKind::Ending,
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(set.endings, vec![(3, 4), (0, 9)]);
        assert_eq!(set.bifurcations, vec![(1, 1)]);
        assert_eq!(
            set.count(),
            MinutiaeCount {
                endings: 2,
                bifurcations: 1
            }
        );
        assert_eq!(set.iter().count(), 3);
        assert!(!set.is_empty());
        assert!(MinutiaeSet::new().is_empty());
    }
}
