//! Guo-Hall thinning
//!
//! Each pass runs two subiterations. A ridge pixel is peeled when it joins
//! exactly one ridge component of its 8-neighborhood, its neighbor count is
//! two or three (taken as the smaller of the two ways of pairing adjacent
//! neighbors), and it sits on the side of the ridge the subiteration targets.
//! The pairing keeps one pixel of every 2x2 block and one line of every two
//! pixel wide diagonal, so ridges never break apart or vanish.
//!
//! Deletions are collected against a snapshot and applied together, so the
//! scan order never influences the result. Thinning stops after the first
//! pass that removes nothing, which makes the output a fixed point.

use super::{BinaryImage, SkeletonImage};

#[derive(Debug, Clone, Copy)]
enum Subiteration {
    First,
    Second,
}

/// Thin ridges down to one pixel wide while preserving connectivity
pub fn skeletonize(binary: &BinaryImage) -> SkeletonImage {
    let mut image = binary.clone();
    let mut passes = 0usize;
    loop {
        let first = peel(&mut image, Subiteration::First);
        let second = peel(&mut image, Subiteration::Second);
        passes += 1;
        if first + second == 0 {
            break;
        }
    }
    tracing::trace!(
        passes,
        remaining = image.count_foreground(),
        "thinning converged"
    );
    SkeletonImage(image)
}

/// Remove every deletable pixel for one subiteration, returning how many went
fn peel(image: &mut BinaryImage, step: Subiteration) -> usize {
    let mut doomed = Vec::new();
    for y in 0..image.height() {
        for x in 0..image.width() {
            if image.get(x as i64, y as i64) && deletable(&image.neighbors(x, y), step) {
                doomed.push((x, y));
            }
        }
    }
    for (x, y) in &doomed {
        image.set(*x, *y, false);
    }
    doomed.len()
}

fn count(flags: &[bool]) -> usize {
    flags.iter().filter(|f| **f).count()
}

/// `p` is N, NE, E, SE, S, SW, W, NW
fn deletable(p: &[bool; 8], step: Subiteration) -> bool {
    let [n, ne, e, se, s, sw, w, nw] = *p;

    // ridge components touching the pixel
    let components = count(&[
        !n && (ne || e),
        !e && (se || s),
        !s && (sw || w),
        !w && (nw || n),
    ]);
    if components != 1 {
        return false;
    }

    let clockwise = count(&[nw || n, ne || e, se || s, sw || w]);
    let counter = count(&[n || ne, e || se, s || sw, w || nw]);
    if !(2..=3).contains(&clockwise.min(counter)) {
        return false;
    }

    match step {
        Subiteration::First => !((s || sw || !nw) && w),
        Subiteration::Second => !((n || ne || !se) && e),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_stays_empty() {
        let empty = BinaryImage::new(8, 6);
        assert_eq!(skeletonize(&empty).into_binary(), empty);
    }

    #[test]
    fn test_thin_line_is_unchanged() {
        let line = BinaryImage::from_pattern(&[
            ".........",
            ".#######.",
            ".........",
        ])
        .unwrap();
        assert_eq!(skeletonize(&line).into_binary(), line);
    }

    #[test]
    fn test_thin_junction_is_unchanged() {
        let tee = BinaryImage::from_pattern(&[
            ".............",
            "..#########..",
            "......#......",
            "......#......",
            "......#......",
            ".............",
        ])
        .unwrap();
        assert_eq!(skeletonize(&tee).into_binary(), tee);
    }

    #[test]
    fn test_thick_bar_thins_to_center_line() {
        let mut bar = BinaryImage::new(24, 11);
        for y in 3..=7 {
            for x in 2..=21 {
                bar.set(x, y, true);
            }
        }
        let skeleton = skeletonize(&bar);

        let mut expected = BinaryImage::new(24, 11);
        for x in 4..=19 {
            expected.set(x, 5, true);
        }
        assert_eq!(skeleton.as_binary(), &expected);
    }

    #[test]
    fn test_square_collapses_to_a_point() {
        let mut square = BinaryImage::new(9, 9);
        for y in 1..=7 {
            for x in 1..=7 {
                square.set(x, y, true);
            }
        }
        let skeleton = skeletonize(&square);
        assert_eq!(skeleton.as_binary().count_foreground(), 1);
        assert!(skeleton.get(4, 4));
    }

    #[test]
    fn test_skeleton_is_fixed_point() {
        let blob = BinaryImage::from_pattern(&[
            "..............",
            ".######.......",
            ".#######......",
            ".########.....",
            "...######.###.",
            "....#########.",
            ".....#######..",
            "..............",
        ])
        .unwrap();
        let once = skeletonize(&blob);
        assert_eq!(once.rethin(), once);
    }

    #[test]
    fn test_deletable_requires_single_transition() {
        // a pixel bridging two ridges must stay
        let bridge = [true, false, false, false, true, false, false, false];
        assert!(!deletable(&bridge, Subiteration::First));
        assert!(!deletable(&bridge, Subiteration::Second));
        // an end point must stay
        let end = [false, false, true, false, false, false, false, false];
        assert!(!deletable(&end, Subiteration::First));
        // a south-east corner of a thick ridge goes in the first step
        let edge = [true, false, false, false, false, false, true, true];
        assert!(deletable(&edge, Subiteration::First));
    }

    /// Number of 8-connected ridge components
    fn components(image: &BinaryImage) -> usize {
        let mut seen = BinaryImage::new(image.width(), image.height());
        let mut count = 0;
        for y in 0..image.height() {
            for x in 0..image.width() {
                if !image.get(x as i64, y as i64) || seen.get(x as i64, y as i64) {
                    continue;
                }
                count += 1;
                seen.set(x, y, true);
                let mut stack = vec![(x as i64, y as i64)];
                while let Some((cx, cy)) = stack.pop() {
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            let (nx, ny) = (cx + dx, cy + dy);
                            if image.get(nx, ny) && !seen.get(nx, ny) {
                                seen.set(nx as u32, ny as u32, true);
                                stack.push((nx, ny));
                            }
                        }
                    }
                }
            }
        }
        count
    }

    fn assert_connectivity_kept(image: &BinaryImage) -> SkeletonImage {
        let skeleton = skeletonize(image);
        assert!(skeleton.as_binary().count_foreground() > 0);
        assert_eq!(components(skeleton.as_binary()), components(image));
        assert_eq!(skeleton.rethin(), skeleton);
        skeleton
    }

    #[test]
    fn test_two_by_two_block_keeps_a_pixel() {
        let block = BinaryImage::from_pattern(&[
            "......",
            "......",
            "..##..",
            "..##..",
            "......",
            "......",
        ])
        .unwrap();
        let skeleton = assert_connectivity_kept(&block);
        assert_eq!(skeleton.as_binary().count_foreground(), 1);
        assert!(skeleton.get(3, 2));
    }

    #[test]
    fn test_wide_diagonal_thins_to_a_line() {
        let diagonal = BinaryImage::from_pattern(&[
            "............",
            ".##.........",
            "..##........",
            "...##.......",
            "....##......",
            ".....##.....",
            "......##....",
            ".......##...",
            "............",
        ])
        .unwrap();
        assert_eq!(diagonal.count_foreground(), 14);

        let skeleton = assert_connectivity_kept(&diagonal);
        let expected = BinaryImage::from_pattern(&[
            "............",
            ".##.........",
            "...#........",
            "....#.......",
            ".....#......",
            "......#.....",
            ".......#....",
            "........#...",
            "............",
        ])
        .unwrap();
        assert_eq!(skeleton.as_binary(), &expected);
    }

    #[test]
    fn test_separate_ridges_stay_separate() {
        let ridges = BinaryImage::from_pattern(&[
            "................",
            ".##.....####....",
            "..##....####....",
            "...##...........",
            "....##.....##...",
            ".....##....##...",
            "..........####..",
            "..........####..",
            "................",
        ])
        .unwrap();
        assert_eq!(components(&ridges), 3);
        assert_connectivity_kept(&ridges);
    }

    #[test]
    fn test_ring_keeps_its_hole() {
        let ring = BinaryImage::from_pattern(&[
            "..........",
            ".########.",
            ".########.",
            ".##....##.",
            ".##....##.",
            ".########.",
            ".########.",
            "..........",
        ])
        .unwrap();
        let skeleton = assert_connectivity_kept(&ring);
        let expected = BinaryImage::from_pattern(&[
            "..........",
            "...####...",
            "..#....#..",
            "..#.....#.",
            "..#.....#.",
            "...#####..",
            "..........",
            "..........",
        ])
        .unwrap();
        assert_eq!(skeleton.as_binary(), &expected);
    }
}
