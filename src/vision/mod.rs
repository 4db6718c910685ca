//! Vision pipeline: camera frame + board contour → stone configuration.
//!
//! The frame is rectified so that the contour becomes an axis-aligned square
//! (with a margin, so the outermost grid lines stay clear of the image border),
//! the grid is detected on the closed Canny edges, and every intersection is
//! classified as empty, black or white.

pub mod debug;
pub mod filters;
pub mod geometry;
pub mod grid;
pub mod hough;
pub mod stones;

use std::fs;
use std::path::Path;

use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::board::StoneConfiguration;
use crate::constants::{CANNY_HIGH, CANNY_LOW, EDGE_CLOSE_KERNEL, RECTIFIED_MARGIN, RECTIFIED_SIDE};
use geometry::{homography_from_4pt, triangle_area2, warp_perspective_rgb};
use grid::{GridMapping, GridParams};
use hough::HoughParams;
use stones::StoneParams;

/// Why a scan produced no configuration. None of these are fatal: the caller
/// skips the cycle and tries again on the next frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanFailure {
    #[error("no board contour selected yet")]
    NoContour,
    #[error("board contour is degenerate")]
    InvalidContour,
    #[error("no consistent grid found")]
    GridNotFound,
    #[error("{count} intersections is not a square number")]
    BadIntersectionCount { count: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The board's four corners in the camera frame: top-left, top-right,
/// bottom-right, bottom-left. The order is taken as given.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardContour {
    corners: [[f32; 2]; 4],
}

impl BoardContour {
    /// Rejects contours where any three corners are (nearly) collinear.
    pub fn new(corners: [(f32, f32); 4]) -> Result<Self, ScanFailure> {
        let pts = corners.map(|(x, y)| Point2::new(x, y));
        for i in 0..4 {
            let area = triangle_area2(pts[i], pts[(i + 1) % 4], pts[(i + 2) % 4]);
            if area.abs() < 1.0 {
                return Err(ScanFailure::InvalidContour);
            }
        }
        Ok(Self {
            corners: corners.map(|(x, y)| [x, y]),
        })
    }

    pub fn points(&self) -> [Point2<f32>; 4] {
        self.corners.map(|[x, y]| Point2::new(x, y))
    }
}

/// Runtime tuning of the pipeline. Missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    pub rectified_side: u32,
    /// Distance from the rectified image border to the contour corners.
    pub rectified_margin: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub close_kernel: u32,
    pub hough: HoughParams,
    pub grid: GridParams,
    pub stones: StoneParams,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            rectified_side: RECTIFIED_SIDE,
            rectified_margin: RECTIFIED_MARGIN,
            canny_low: CANNY_LOW,
            canny_high: CANNY_HIGH,
            close_kernel: EDGE_CLOSE_KERNEL,
            hough: HoughParams::default(),
            grid: GridParams::default(),
            stones: StoneParams::default(),
        }
    }
}

impl ScanParams {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// A successful scan.
#[derive(Clone, Debug)]
pub struct ScanOutput {
    pub configuration: StoneConfiguration,
    /// Rectified frame with lines, intersections and stones drawn on it.
    pub debug_image: RgbImage,
    pub grid: GridMapping,
}

/// Rectify the contour region of `frame` into a square image.
///
/// The contour corners land `params.rectified_margin` pixels inside the output
/// corners (at most a quarter of the side), so the outer grid lines stay clear
/// of the image border.
pub fn rectify(frame: &RgbImage, contour: &BoardContour, params: &ScanParams) -> Result<RgbImage, ScanFailure> {
    let side = params.rectified_side as f32;
    let m = (params.rectified_margin as f32).min(side / 4.0);
    let rect = [
        Point2::new(m, m),
        Point2::new(side - m, m),
        Point2::new(side - m, side - m),
        Point2::new(m, side - m),
    ];
    let h = homography_from_4pt(&rect, &contour.points()).ok_or(ScanFailure::InvalidContour)?;
    Ok(warp_perspective_rgb(frame, &h, params.rectified_side))
}

/// Run the whole pipeline on one frame.
pub fn scan(frame: &RgbImage, contour: Option<&BoardContour>, params: &ScanParams) -> Result<ScanOutput, ScanFailure> {
    let contour = contour.ok_or(ScanFailure::NoContour)?;
    let rectified = rectify(frame, contour, params)?;

    let gray = filters::grayscale(&rectified);
    let edges = filters::canny(&gray, params.canny_low, params.canny_high);
    let closed = filters::close(&edges, &filters::Ellipse::new(params.close_kernel));
    let segments = hough::detect_segments(&closed, &params.hough);

    let grid = grid::detect_grid(&segments, rectified.width(), rectified.height(), &params.grid)?;
    let found = stones::classify_stones(&gray, &edges, &grid.mapping, &params.stones);
    let debug_image = debug::annotate(&rectified, &grid, &found);

    Ok(ScanOutput {
        configuration: found.configuration,
        debug_image,
        grid: grid.mapping,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collinear_contour_is_rejected() {
        let bad = BoardContour::new([(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (0.0, 30.0)]);
        assert_eq!(bad, Err(ScanFailure::InvalidContour));
        assert!(BoardContour::new([(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]).is_ok());
    }

    #[test]
    fn scan_without_contour_is_not_ready() {
        let frame = RgbImage::new(32, 32);
        assert_eq!(
            scan(&frame, None, &ScanParams::default()).unwrap_err(),
            ScanFailure::NoContour
        );
    }

    #[test]
    fn blank_frame_has_no_grid() {
        let frame = RgbImage::from_pixel(200, 200, image::Rgb([120, 100, 80]));
        let contour = BoardContour::new([(70.0, 70.0), (130.0, 70.0), (130.0, 130.0), (70.0, 130.0)]).unwrap();
        let params = ScanParams {
            rectified_side: 128,
            ..ScanParams::default()
        };
        assert_eq!(scan(&frame, Some(&contour), &params).unwrap_err(), ScanFailure::GridNotFound);
    }

    #[test]
    fn rectified_contour_is_inset_by_the_margin() {
        let dark = image::Rgb([10, 10, 10]);
        let bright = image::Rgb([250, 250, 250]);
        let frame = RgbImage::from_fn(200, 200, |x, y| {
            if (60..140).contains(&x) && (60..140).contains(&y) { bright } else { dark }
        });
        let contour = BoardContour::new([(60.0, 60.0), (140.0, 60.0), (140.0, 140.0), (60.0, 140.0)]).unwrap();

        let params = ScanParams {
            rectified_side: 128,
            rectified_margin: 16,
            ..ScanParams::default()
        };
        let out = rectify(&frame, &contour, &params).unwrap();
        assert_eq!(out.dimensions(), (128, 128));
        assert!(out.get_pixel(8, 8)[0] < 50);
        assert!(out.get_pixel(120, 64)[0] < 50);
        assert!(out.get_pixel(24, 24)[0] > 200);
        assert!(out.get_pixel(104, 104)[0] > 200);

        // Oversized margins are capped at a quarter of the side.
        let capped = rectify(&frame, &contour, &ScanParams { rectified_margin: 100, ..params }).unwrap();
        assert!(capped.get_pixel(24, 24)[0] < 50);
        assert!(capped.get_pixel(40, 40)[0] > 200);
    }

    #[test]
    fn params_fill_missing_fields() {
        let params: ScanParams = serde_json::from_str(r#"{ "canny_low": 80.0, "hough": { "threshold": 60 } }"#).unwrap();
        assert_eq!(params.canny_low, 80.0);
        assert_eq!(params.hough.threshold, 60);
        assert_eq!(params.hough.min_line_length, HoughParams::default().min_line_length);
        assert_eq!(params.rectified_side, RECTIFIED_SIDE);
    }
}
