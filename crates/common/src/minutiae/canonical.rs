//! Canonical serialization of a minutiae set
//!
//! Layout: `E:<endings>|B:<bifurcations>`, where each list is sorted by
//! `(x, y)` as integers, rendered as decimal `x,y` and joined with `;`.
//! Both sets empty serializes as `E:|B:`.
//!
//! Every key ever derived depends on this exact byte layout. Changing the
//! prefixes, separators, number formatting or ordering changes every key.

use std::fmt;
use std::fmt::Write;

use super::MinutiaeSet;

const ENDINGS_PREFIX: &str = "E:";
const BIFURCATIONS_PREFIX: &str = "B:";
const SET_SEPARATOR: char = '|';
const POINT_SEPARATOR: char = ';';

/// The canonical string of a minutiae set, the only input to key derivation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalMinutiae(String);

impl CanonicalMinutiae {
    pub fn from_set(set: &MinutiaeSet) -> Self {
        let mut out = String::new();
        out.push_str(ENDINGS_PREFIX);
        write_points(&mut out, &set.endings);
        out.push(SET_SEPARATOR);
        out.push_str(BIFURCATIONS_PREFIX);
        write_points(&mut out, &set.bifurcations);
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

fn write_points(out: &mut String, points: &[(u32, u32)]) {
    let mut sorted = points.to_vec();
    sorted.sort_unstable();
    for (i, (x, y)) in sorted.iter().enumerate() {
        if i > 0 {
            out.push(POINT_SEPARATOR);
        }
        // writing to a String cannot fail
        let _ = write!(out, "{},{}", x, y);
    }
}

impl fmt::Display for CanonicalMinutiae {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<[u8]> for CanonicalMinutiae {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
