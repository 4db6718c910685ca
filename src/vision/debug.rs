//! Annotated copy of the rectified image for the presentation layer.

use image::{Rgb, RgbImage};
use nalgebra::Point2;

use super::geometry::Segment;
use super::grid::Grid;
use super::stones::StoneDetections;
use crate::board::Color;

const LINE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const POINT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const BLACK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const WHITE_COLOR: Rgb<u8> = Rgb([238, 238, 176]);

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < img.width() as i64 && y < img.height() as i64 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Sample a segment at unit steps along its longer axis.
fn draw_segment(img: &mut RgbImage, s: &Segment, color: Rgb<u8>) {
    let d = s.direction();
    let steps = d.x.abs().max(d.y.abs()).ceil().max(1.0) as i64;
    for i in 0..=steps {
        let p = s.start + d * (i as f32 / steps as f32);
        put(img, p.x.round() as i64, p.y.round() as i64, color);
    }
}

fn draw_circle(img: &mut RgbImage, center: Point2<f32>, radius: f32, color: Rgb<u8>) {
    let n = ((radius * std::f32::consts::TAU).ceil() as usize).max(8);
    for i in 0..n {
        let t = i as f32 / n as f32 * std::f32::consts::TAU;
        let x = center.x + radius * t.cos();
        let y = center.y + radius * t.sin();
        put(img, x.round() as i64, y.round() as i64, color);
    }
}

fn draw_dot(img: &mut RgbImage, center: Point2<f32>, color: Rgb<u8>) {
    let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
    for dy in -1..=1 {
        for dx in -1..=1 {
            put(img, cx + dx, cy + dy, color);
        }
    }
}

/// Draw the representative lines, intersections and classified stones.
pub fn annotate(rectified: &RgbImage, grid: &Grid, stones: &StoneDetections) -> RgbImage {
    let mut img = rectified.clone();
    for line in grid.horizontal.iter().chain(&grid.vertical) {
        draw_segment(&mut img, line, LINE_COLOR);
    }
    for p in &grid.mapping.points {
        draw_dot(&mut img, p.pixel, POINT_COLOR);
    }
    for b in &stones.black {
        draw_circle(&mut img, b.center, b.radius, BLACK_COLOR);
    }
    for p in &grid.mapping.points {
        if stones.configuration.get(p.coord) == Some(Color::White) {
            draw_circle(&mut img, p.pixel, stones.diameter / 2.0, WHITE_COLOR);
        }
    }
    img
}
