//! Synthetic camera frames of a Go board seen in mild perspective.

#![allow(dead_code)]

use augmented_go::board::{BoardCoordinate, Color, StoneConfiguration};
use augmented_go::vision::BoardContour;
use augmented_go::vision::geometry::homography_from_4pt;
use image::{Rgb, RgbImage};
use nalgebra::Point2;

pub const FRAME_SIDE: u32 = 640;

/// Outer grid corners in the frame: top-left, top-right, bottom-right, bottom-left.
pub const QUAD: [(f32, f32); 4] = [(120.0, 100.0), (520.0, 110.0), (560.0, 540.0), (90.0, 520.0)];

const TABLE: Rgb<u8> = Rgb([50, 50, 60]);
const WOOD: Rgb<u8> = Rgb([200, 160, 100]);
const LINE: Rgb<u8> = Rgb([40, 30, 20]);
const BLACK: Rgb<u8> = Rgb([25, 25, 25]);
const WHITE: Rgb<u8> = Rgb([240, 240, 235]);

/// Stone radius and line half-width, in grid cells.
const STONE_RADIUS: f32 = 0.47;
const LINE_HALF_WIDTH: f32 = 0.035;
/// Wood visible beyond the outermost lines, in grid cells.
const WOOD_BORDER: f32 = 1.5;

/// Render `stones` on a board photographed through [`QUAD`].
pub fn render(stones: &StoneConfiguration) -> RgbImage {
    let n = stones.size();
    let last = (n - 1) as f32;
    let frame = QUAD.map(|(x, y)| Point2::new(x, y));
    let board = [
        Point2::new(0.0, 0.0),
        Point2::new(last, 0.0),
        Point2::new(last, last),
        Point2::new(0.0, last),
    ];
    let to_board = homography_from_4pt(&frame, &board).expect("quad is not degenerate");

    RgbImage::from_fn(FRAME_SIDE, FRAME_SIDE, |x, y| {
        let p = to_board.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
        // u grows to the right, v downwards; row 1 is the bottom line.
        let (u, v) = (p.x, p.y);
        if u < -WOOD_BORDER || v < -WOOD_BORDER || u > last + WOOD_BORDER || v > last + WOOD_BORDER {
            return TABLE;
        }

        let (cu, cv) = (u.round(), v.round());
        if (0.0..=last).contains(&cu) && (0.0..=last).contains(&cv) {
            let coord = BoardCoordinate::new(cu as usize + 1, n - cv as usize);
            let inside = (u - cu).hypot(v - cv) <= STONE_RADIUS;
            match stones.get(coord) {
                Some(Color::Black) if inside => return BLACK,
                Some(Color::White) if inside => return WHITE,
                _ => {}
            }
        }

        let span = -LINE_HALF_WIDTH..=last + LINE_HALF_WIDTH;
        let on_vertical = (u - cu).abs() <= LINE_HALF_WIDTH && (0.0..=last).contains(&cu) && span.contains(&v);
        let on_horizontal = (v - cv).abs() <= LINE_HALF_WIDTH && (0.0..=last).contains(&cv) && span.contains(&u);
        if on_vertical || on_horizontal { LINE } else { WOOD }
    })
}

/// [`QUAD`] with each corner nudged by up to one pixel; `variant` picks the nudges.
pub fn contour(variant: usize) -> BoardContour {
    let mut corners = QUAD;
    for (i, (x, y)) in corners.iter_mut().enumerate() {
        let sx = if (i + variant) % 2 == 0 { 1.0 } else { -1.0 };
        let sy = if (i + variant / 2) % 2 == 0 { 1.0 } else { -1.0 };
        *x += sx;
        *y += sy;
    }
    BoardContour::new(corners).expect("contour is not degenerate")
}

/// The exact contour of [`QUAD`].
pub fn exact_contour() -> BoardContour {
    BoardContour::new(QUAD).expect("contour is not degenerate")
}

pub fn c(col: usize, row: usize) -> BoardCoordinate {
    BoardCoordinate::new(col, row)
}
