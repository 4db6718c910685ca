//! Stone classification at detected intersections.
//!
//! Black stones are found on a thresholded image by measuring two diagonal
//! chords through the dark blob at an intersection: a round stone gives two
//! chords of similar, non-trivial length. Any stone, black or white, shows up
//! as an edge-free disk in the Canny image. White is what remains after
//! removing the black stones from the "any" set.

use image::GrayImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::filters::{Ellipse, RowCounts, dilate, erode_at, threshold_binary};
use super::grid::GridMapping;
use crate::board::{BoardCoordinate, StoneConfiguration, Stones};
use crate::constants::{
    ANY_STONE_LEVEL, BLACK_BINARY_THRESHOLD, BLACK_CHORD_LEVEL, BLACK_SEED_LEVEL, CHORD_AGREEMENT_PX,
    DILATE_DIAMETER_FRACTION, ERODE_DIAMETER_FRACTION, MIN_CHORD_PX,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoneParams {
    pub binary_threshold: u8,
    pub seed_level: u8,
    pub chord_level: u8,
    pub chord_agreement_px: i32,
    pub min_chord_px: i32,
    pub dilate_fraction: f32,
    pub erode_fraction: f32,
    pub any_stone_level: u8,
}

impl Default for StoneParams {
    fn default() -> Self {
        Self {
            binary_threshold: BLACK_BINARY_THRESHOLD,
            seed_level: BLACK_SEED_LEVEL,
            chord_level: BLACK_CHORD_LEVEL,
            chord_agreement_px: CHORD_AGREEMENT_PX,
            min_chord_px: MIN_CHORD_PX,
            dilate_fraction: DILATE_DIAMETER_FRACTION,
            erode_fraction: ERODE_DIAMETER_FRACTION,
            any_stone_level: ANY_STONE_LEVEL,
        }
    }
}

/// Diagonal along which a chord is measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heading {
    /// Top-left to bottom-right.
    Left,
    /// Bottom-left to top-right.
    Right,
}

impl Heading {
    fn steps(self) -> [(i64, i64); 2] {
        match self {
            Heading::Left => [(-1, -1), (1, 1)],
            Heading::Right => [(-1, 1), (1, -1)],
        }
    }
}

/// A measured chord: its length in steps and its midpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chord {
    pub length: i32,
    pub midpoint: Point2<f32>,
}

/// Walk from `(x, y)` in both directions of `heading` while pixels are darker
/// than `level` and strictly inside the image.
///
/// The starting pixel is counted once per direction. The midpoint lies
/// halfway between the two positions where the walks stopped.
pub fn chord(img: &GrayImage, x: i64, y: i64, heading: Heading, level: u8) -> Chord {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let mut length = 0;
    let mut ends = [(x, y); 2];
    for (end, (dx, dy)) in ends.iter_mut().zip(heading.steps()) {
        let (mut cx, mut cy) = (x, y);
        while cx > 0 && cx < w && cy > 0 && cy < h && img.get_pixel(cx as u32, cy as u32).0[0] < level {
            cx += dx;
            cy += dy;
            length += 1;
        }
        *end = (cx, cy);
    }
    Chord {
        length,
        midpoint: Point2::new((ends[0].0 + ends[1].0) as f32 / 2.0, (ends[0].1 + ends[1].1) as f32 / 2.0),
    }
}

/// A black stone found by the chord test, with the circle used for drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlackStone {
    pub coord: BoardCoordinate,
    pub center: Point2<f32>,
    pub radius: f32,
}

/// Smallest distance between any two intersections, roughly one stone diameter.
pub fn estimate_diameter(mapping: &GridMapping) -> f32 {
    let pts = &mapping.points;
    let mut best = f32::INFINITY;
    for (i, a) in pts.iter().enumerate() {
        for b in &pts[i + 1..] {
            best = best.min((a.pixel - b.pixel).norm());
        }
    }
    if best.is_finite() { best } else { 0.0 }
}

pub fn detect_black(gray: &GrayImage, mapping: &GridMapping, params: &StoneParams) -> Vec<BlackStone> {
    let binary = threshold_binary(gray, params.binary_threshold);
    let (w, h) = (binary.width() as i64, binary.height() as i64);
    let mut found = Vec::new();

    for p in &mapping.points {
        let (x, y) = (p.pixel.x as i64, p.pixel.y as i64);
        if x < 0 || y < 0 || x >= w || y >= h {
            continue;
        }
        if binary.get_pixel(x as u32, y as u32).0[0] >= params.seed_level {
            continue;
        }

        let guide = chord(&binary, x, y, Heading::Left, params.chord_level);
        let d135 = chord(
            &binary,
            guide.midpoint.x as i64,
            guide.midpoint.y as i64,
            Heading::Right,
            params.chord_level,
        );
        let d45 = chord(
            &binary,
            d135.midpoint.x as i64,
            d135.midpoint.y as i64,
            Heading::Left,
            params.chord_level,
        );

        let agree = (d135.length - d45.length).abs() <= params.chord_agreement_px;
        let big_enough = d45.length >= params.min_chord_px && d135.length >= params.min_chord_px;
        log::trace!(
            "black test {} at ({x},{y}): chords {} / {}",
            p.coord,
            d135.length,
            d45.length
        );
        if agree && big_enough {
            found.push(BlackStone {
                coord: p.coord,
                center: d135.midpoint,
                radius: d135.length as f32 / 2.0,
            });
        }
    }
    found
}

/// Intersections sitting in an edge-free disk of roughly one stone radius.
pub fn detect_any(edges: &GrayImage, mapping: &GridMapping, diameter: f32, params: &StoneParams) -> Stones {
    let grow = Ellipse::new((diameter * params.dilate_fraction).round() as u32);
    let shrink = Ellipse::new((diameter * params.erode_fraction).round() as u32);
    let grown = dilate(edges, &grow);
    let counts = RowCounts::new(&grown);

    mapping
        .points
        .iter()
        .filter(|p| {
            let x = (p.pixel.x + 0.5) as i64;
            let y = (p.pixel.y + 0.5) as i64;
            if x < 0 || y < 0 || x >= grown.width() as i64 || y >= grown.height() as i64 {
                return false;
            }
            erode_at(&counts, &shrink, x as u32, y as u32) < params.any_stone_level
        })
        .map(|p| p.coord)
        .collect()
}

/// Result of classifying every intersection of a grid.
#[derive(Clone, Debug)]
pub struct StoneDetections {
    pub configuration: StoneConfiguration,
    pub black: Vec<BlackStone>,
    pub diameter: f32,
}

/// Classify every intersection; `edges` is the unclosed Canny image of `gray`.
pub fn classify_stones(gray: &GrayImage, edges: &GrayImage, mapping: &GridMapping, params: &StoneParams) -> StoneDetections {
    let diameter = estimate_diameter(mapping);
    let any = detect_any(edges, mapping, diameter, params);
    let black = detect_black(gray, mapping, params);
    let black_set: Stones = black.iter().map(|s| s.coord).collect();
    let white: Stones = any.difference(&black_set).copied().collect();
    log::debug!(
        "stones: diameter {diameter:.1}px, {} black, {} white",
        black_set.len(),
        white.len()
    );

    StoneDetections {
        configuration: StoneConfiguration::from_stones(mapping.size, black_set, white),
        black,
        diameter,
    }
}
