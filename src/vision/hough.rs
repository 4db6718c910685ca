//! Probabilistic Hough transform for line segments.
//!
//! Edge points are visited in a seeded random order. Each point votes into a
//! (rho, theta) accumulator; as soon as a bin reaches the threshold, the line
//! is traced through the edge mask in both directions (bridging small gaps),
//! the traced pixels are removed from the mask and their votes withdrawn.

use image::GrayImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::geometry::Segment;
use crate::constants::{
    HOUGH_MAX_LINE_GAP, HOUGH_MIN_LINE_LENGTH, HOUGH_SEED, HOUGH_THETA_BINS, HOUGH_THRESHOLD,
};

/// Fixed-point shift used while stepping along a traced line.
const SHIFT: u32 = 16;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Votes a (rho, theta) bin needs before a line is traced.
    pub threshold: u32,
    /// Shorter segments are dropped (measured along the dominant axis).
    pub min_line_length: u32,
    /// Largest run of missing edge pixels bridged while tracing.
    pub max_line_gap: u32,
    pub theta_bins: usize,
    pub seed: u64,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            threshold: HOUGH_THRESHOLD,
            min_line_length: HOUGH_MIN_LINE_LENGTH,
            max_line_gap: HOUGH_MAX_LINE_GAP,
            theta_bins: HOUGH_THETA_BINS,
            seed: HOUGH_SEED,
        }
    }
}

struct Accumulator {
    num_rho: usize,
    cos: Vec<f32>,
    sin: Vec<f32>,
    votes: Vec<i32>,
}

impl Accumulator {
    fn new(width: usize, height: usize, theta_bins: usize) -> Self {
        let num_rho = (width + height) * 2 + 1;
        let step = std::f32::consts::PI / theta_bins as f32;
        let cos = (0..theta_bins).map(|n| (n as f32 * step).cos()).collect();
        let sin = (0..theta_bins).map(|n| (n as f32 * step).sin()).collect();
        Self {
            num_rho,
            cos,
            sin,
            votes: vec![0; theta_bins * num_rho],
        }
    }

    #[inline]
    fn bin(&self, n: usize, x: usize, y: usize) -> usize {
        let r = (x as f32 * self.cos[n] + y as f32 * self.sin[n]).round() as i64;
        let r = (r + (self.num_rho as i64 - 1) / 2).clamp(0, self.num_rho as i64 - 1);
        n * self.num_rho + r as usize
    }

    /// Add the votes of one point; returns the strongest angle bin and its count.
    fn vote(&mut self, x: usize, y: usize) -> (usize, i32) {
        let mut best = (0, i32::MIN);
        for n in 0..self.cos.len() {
            let b = self.bin(n, x, y);
            self.votes[b] += 1;
            if self.votes[b] > best.1 {
                best = (n, self.votes[b]);
            }
        }
        best
    }

    fn withdraw(&mut self, x: usize, y: usize) {
        for n in 0..self.cos.len() {
            let b = self.bin(n, x, y);
            self.votes[b] -= 1;
        }
    }
}

/// Fixed-point walker along the direction of one accumulator angle.
#[derive(Clone, Copy)]
struct Walker {
    x: i64,
    y: i64,
    dx: i64,
    dy: i64,
    /// Step one whole pixel along x (true) or along y (false).
    along_x: bool,
}

impl Walker {
    fn new(px: usize, py: usize, cos: f32, sin: f32) -> Self {
        let a = -sin;
        let b = cos;
        let one = 1i64 << SHIFT;
        let half = 1i64 << (SHIFT - 1);
        if a.abs() > b.abs() {
            Self {
                x: px as i64,
                y: ((py as i64) << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one as f32 / a.abs()).round() as i64,
                along_x: true,
            }
        } else {
            Self {
                x: ((px as i64) << SHIFT) + half,
                y: py as i64,
                dx: (a * one as f32 / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                along_x: false,
            }
        }
    }

    fn reversed(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
            ..self
        }
    }

    #[inline]
    fn pixel(&self) -> (i64, i64) {
        if self.along_x {
            (self.x, self.y >> SHIFT)
        } else {
            (self.x >> SHIFT, self.y)
        }
    }

    #[inline]
    fn step(&mut self) {
        self.x += self.dx;
        self.y += self.dy;
    }
}

/// Detect line segments in a binary edge image (non-zero pixels are edges).
pub fn detect_segments(edges: &GrayImage, params: &HoughParams) -> Vec<Segment> {
    let width = edges.width() as usize;
    let height = edges.height() as usize;
    if width == 0 || height == 0 || params.theta_bins == 0 {
        return Vec::new();
    }

    let mut mask: Vec<bool> = edges.as_raw().iter().map(|&v| v > 0).collect();
    let mut points: Vec<(usize, usize)> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter(|&(x, y)| mask[y * width + x])
        .collect();

    let mut acc = Accumulator::new(width, height, params.theta_bins);
    let mut rng = fastrand::Rng::with_seed(params.seed);
    let threshold = params.threshold as i32;
    let min_len = params.min_line_length as i64;
    let in_bounds = |(x, y): (i64, i64)| x >= 0 && y >= 0 && x < width as i64 && y < height as i64;

    let mut segments = Vec::new();
    while !points.is_empty() {
        let (px, py) = points.swap_remove(rng.usize(..points.len()));
        if !mask[py * width + px] {
            continue;
        }

        let (n, votes) = acc.vote(px, py);
        if votes < threshold {
            continue;
        }

        let start = Walker::new(px, py, acc.cos[n], acc.sin[n]);
        let mut ends = [(px as i64, py as i64); 2];
        for (k, end) in ends.iter_mut().enumerate() {
            let mut w = if k == 0 { start } else { start.reversed() };
            let mut gap = 0;
            loop {
                let p = w.pixel();
                if !in_bounds(p) {
                    break;
                }
                if mask[p.1 as usize * width + p.0 as usize] {
                    gap = 0;
                    *end = p;
                } else {
                    gap += 1;
                    if gap > params.max_line_gap {
                        break;
                    }
                }
                w.step();
            }
        }

        let good = (ends[1].0 - ends[0].0).abs() >= min_len || (ends[1].1 - ends[0].1).abs() >= min_len;

        for (k, end) in ends.iter().enumerate() {
            let mut w = if k == 0 { start } else { start.reversed() };
            loop {
                let p = w.pixel();
                if !in_bounds(p) {
                    break;
                }
                let i = p.1 as usize * width + p.0 as usize;
                if mask[i] {
                    if good {
                        acc.withdraw(p.0 as usize, p.1 as usize);
                    }
                    mask[i] = false;
                }
                if p == *end {
                    break;
                }
                w.step();
            }
        }

        if good {
            segments.push(Segment::new(
                Point2::new(ends[0].0 as f32, ends[0].1 as f32),
                Point2::new(ends[1].0 as f32, ends[1].1 as f32),
            ));
        }
    }

    log::debug!("hough: {} segments from {}x{} edge image", segments.len(), width, height);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn canvas() -> GrayImage {
        GrayImage::new(200, 200)
    }

    #[test]
    fn finds_horizontal_line() {
        let mut img = canvas();
        for x in 50..150 {
            img.put_pixel(x, 60, Luma([255]));
        }
        let segments = detect_segments(&img, &HoughParams::default());
        assert_eq!(segments.len(), 1, "{segments:?}");
        let s = segments[0];
        assert!((s.start.y - 60.0).abs() < 1.0 && (s.end.y - 60.0).abs() < 1.0);
        assert!(s.length() >= 95.0, "{s:?}");
    }

    #[test]
    fn finds_vertical_line_across_small_gap() {
        let mut img = canvas();
        for y in 20..180 {
            if !(100..103).contains(&y) {
                img.put_pixel(40, y, Luma([255]));
            }
        }
        let segments = detect_segments(&img, &HoughParams::default());
        assert_eq!(segments.len(), 1, "{segments:?}");
        assert!(segments[0].angle_to_horizontal() > 89.0);
        assert!(segments[0].length() >= 150.0);
    }

    #[test]
    fn short_lines_are_ignored() {
        let mut img = canvas();
        for x in 10..40 {
            img.put_pixel(x, 10, Luma([255]));
        }
        assert!(detect_segments(&img, &HoughParams::default()).is_empty());
    }

    #[test]
    fn same_seed_same_segments() {
        let mut img = canvas();
        for i in 10..190 {
            img.put_pixel(i, 30, Luma([255]));
            img.put_pixel(120, i, Luma([255]));
        }
        let params = HoughParams::default();
        assert_eq!(detect_segments(&img, &params), detect_segments(&img, &params));
    }
}
