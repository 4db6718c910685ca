//! Grid detection: from raw segments to a pixel → board-coordinate mapping.
//!
//! Segments are split into horizontal and vertical families by their angle to
//! the x axis, extended across the whole image, clustered by where they enter
//! the image and averaged into one representative line per cluster. Every
//! horizontal line is then intersected with every vertical one; the number of
//! intersections decides the board size.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::ScanFailure;
use super::geometry::{Segment, intersect_lines};
use crate::board::BoardCoordinate;
use crate::constants::{
    CLUSTER_CELL_FRACTION, HORIZONTAL_TOLERANCE_DEG, MAX_BOARD_SIZE, MAX_CELLS, MIN_BOARD_SIZE,
    PARALLEL_EPSILON, VERTICAL_TOLERANCE_DEG,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    pub horizontal_tolerance_deg: f32,
    pub vertical_tolerance_deg: f32,
    /// Clustering tolerance in units of one grid cell of a 19x19 board.
    pub cluster_cell_fraction: f32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            horizontal_tolerance_deg: HORIZONTAL_TOLERANCE_DEG,
            vertical_tolerance_deg: VERTICAL_TOLERANCE_DEG,
            cluster_cell_fraction: CLUSTER_CELL_FRACTION,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// One intersection and the board coordinate assigned to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPoint {
    pub pixel: Point2<f32>,
    pub coord: BoardCoordinate,
}

/// Bijection between detected intersections and the coordinates of an N×N board.
#[derive(Clone, Debug, PartialEq)]
pub struct GridMapping {
    pub size: usize,
    pub points: Vec<GridPoint>,
}

impl GridMapping {
    pub fn pixel_of(&self, coord: BoardCoordinate) -> Option<Point2<f32>> {
        self.points.iter().find(|p| p.coord == coord).map(|p| p.pixel)
    }
}

/// Detected grid: representative lines plus the coordinate mapping.
#[derive(Clone, Debug)]
pub struct Grid {
    pub horizontal: Vec<Segment>,
    pub vertical: Vec<Segment>,
    pub mapping: GridMapping,
}

pub fn classify(segment: &Segment, params: &GridParams) -> Option<Orientation> {
    let angle = segment.angle_to_horizontal();
    if angle <= params.horizontal_tolerance_deg {
        Some(Orientation::Horizontal)
    } else if angle >= 90.0 - params.vertical_tolerance_deg {
        Some(Orientation::Vertical)
    } else {
        None
    }
}

/// Stretch a near-horizontal segment from `x = 0` to `x = width`.
pub fn extend_horizontal(s: &Segment, width: f32) -> Segment {
    let d = s.direction();
    let slope = if d.x == 0.0 { 0.0 } else { d.y / d.x };
    let y_at = |x: f32| s.start.y + slope * (x - s.start.x);
    Segment::new(Point2::new(0.0, y_at(0.0)), Point2::new(width, y_at(width)))
}

/// Stretch a near-vertical segment from `y = 0` to `y = height`.
///
/// A segment without horizontal extent keeps its x coordinate; no line
/// equation is fitted for it.
pub fn extend_vertical(s: &Segment, height: f32) -> Segment {
    let d = s.direction();
    if d.x == 0.0 {
        return Segment::new(Point2::new(s.start.x, 0.0), Point2::new(s.end.x, height));
    }
    let inv_slope = d.x / d.y;
    let x_at = |y: f32| s.start.x + inv_slope * (y - s.start.y);
    Segment::new(Point2::new(x_at(0.0), 0.0), Point2::new(x_at(height), height))
}

/// Group values whose sorted neighbours differ by less than `tolerance`.
/// Returns clusters of indices into `keys`, in ascending key order.
pub fn cluster_indices(keys: &[f32], tolerance: f32) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut last = f32::NEG_INFINITY;
    for i in order {
        match clusters.last_mut() {
            Some(c) if keys[i] - last < tolerance => c.push(i),
            _ => clusters.push(vec![i]),
        }
        last = keys[i];
    }
    clusters
}

/// Average full-span lines of one orientation into representatives.
fn representatives(lines: &[Segment], orientation: Orientation, tolerance: f32) -> Vec<Segment> {
    let key = |s: &Segment| match orientation {
        Orientation::Horizontal => s.start.y,
        Orientation::Vertical => s.start.x,
    };
    let keys: Vec<f32> = lines.iter().map(key).collect();

    cluster_indices(&keys, tolerance)
        .into_iter()
        .map(|members| {
            let n = members.len() as f32;
            let mut start = Point2::new(0.0, 0.0);
            let mut end = Point2::new(0.0, 0.0);
            for &i in &members {
                start += lines[i].start.coords / n;
                end += lines[i].end.coords / n;
            }
            Segment::new(start, end)
        })
        .collect()
}

/// Intersections of every horizontal with every vertical line that fall
/// inside `[0, width) × [0, height)`.
pub fn intersections(horizontal: &[Segment], vertical: &[Segment], width: f32, height: f32) -> Vec<Point2<f32>> {
    let mut points = Vec::with_capacity(horizontal.len() * vertical.len());
    for h in horizontal {
        for v in vertical {
            let Some(p) = intersect_lines(h, v, PARALLEL_EPSILON) else {
                continue;
            };
            if (0.0..width).contains(&p.x) && (0.0..height).contains(&p.y) {
                points.push(p);
            }
        }
    }
    points
}

/// Board size from the number of intersections, which must be a perfect square.
pub fn infer_size(count: usize) -> Result<usize, ScanFailure> {
    let n = (count as f64).sqrt().round() as usize;
    if n * n == count {
        Ok(n)
    } else {
        Err(ScanFailure::BadIntersectionCount { count })
    }
}

/// Assign coordinates: rows by descending y (row 1 at the bottom), then
/// columns by ascending x within each row.
///
/// `points.len()` must equal `size * size`.
pub fn map_coordinates(mut points: Vec<Point2<f32>>, size: usize) -> GridMapping {
    points.sort_by(|a, b| b.y.total_cmp(&a.y));
    let mut mapped = Vec::with_capacity(points.len());
    for (r, row) in points.chunks_mut(size.max(1)).enumerate() {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
        for (c, p) in row.iter().enumerate() {
            mapped.push(GridPoint {
                pixel: *p,
                coord: BoardCoordinate::new(c + 1, r + 1),
            });
        }
    }
    GridMapping { size, points: mapped }
}

/// Build the grid from detected segments inside a `width × height` image.
pub fn detect_grid(segments: &[Segment], width: u32, height: u32, params: &GridParams) -> Result<Grid, ScanFailure> {
    let (w, h) = (width as f32, height as f32);
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for s in segments {
        match classify(s, params) {
            Some(Orientation::Horizontal) => horizontal.push(extend_horizontal(s, w)),
            Some(Orientation::Vertical) => vertical.push(extend_vertical(s, h)),
            None => {}
        }
    }
    log::debug!(
        "grid: {} horizontal, {} vertical of {} segments",
        horizontal.len(),
        vertical.len(),
        segments.len()
    );

    let horizontal = representatives(&horizontal, Orientation::Horizontal, h / MAX_CELLS * params.cluster_cell_fraction);
    let vertical = representatives(&vertical, Orientation::Vertical, w / MAX_CELLS * params.cluster_cell_fraction);
    if horizontal.is_empty() || vertical.is_empty() {
        return Err(ScanFailure::GridNotFound);
    }

    let points = intersections(&horizontal, &vertical, w, h);
    let size = infer_size(points.len())?;
    log::debug!(
        "grid: {} x {} lines, {} intersections, size {size}",
        horizontal.len(),
        vertical.len(),
        points.len()
    );
    if horizontal.len() != size || vertical.len() != size || !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
        return Err(ScanFailure::GridNotFound);
    }

    Ok(Grid {
        horizontal,
        vertical,
        mapping: map_coordinates(points, size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x0: f32, y0: f32, x1: f32, y1: f32) -> Segment {
        Segment::new(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    fn synthetic_segments(n: usize, side: f32, margin: f32) -> Vec<Segment> {
        let step = (side - 2.0 * margin) / (n - 1) as f32;
        let mut out = Vec::new();
        for i in 0..n {
            let c = margin + i as f32 * step;
            // two slightly different detections per line
            out.push(seg(40.0, c, 200.0, c + 0.5));
            out.push(seg(250.0, c + 1.0, 450.0, c + 1.0));
            out.push(seg(c, 30.0, c, 300.0));
            out.push(seg(c + 1.0, 310.0, c + 1.5, 480.0));
        }
        out
    }

    #[test]
    fn classify_by_angle() {
        let p = GridParams::default();
        assert_eq!(classify(&seg(0.0, 0.0, 100.0, 1.0), &p), Some(Orientation::Horizontal));
        assert_eq!(classify(&seg(0.0, 0.0, 3.0, 100.0), &p), Some(Orientation::Vertical));
        assert_eq!(classify(&seg(0.0, 100.0, 0.0, 0.0), &p), Some(Orientation::Vertical));
        assert_eq!(classify(&seg(0.0, 0.0, 100.0, 30.0), &p), None);
    }

    #[test]
    fn extension_handles_vertical_without_slope() {
        let v = extend_vertical(&seg(42.0, 100.0, 42.0, 200.0), 512.0);
        assert_eq!(v, seg(42.0, 0.0, 42.0, 512.0));
        let h = extend_horizontal(&seg(10.0, 20.0, 110.0, 21.0), 512.0);
        assert!((h.start.y - 19.9).abs() < 1e-3);
        assert_eq!(h.end.x, 512.0);
    }

    #[test]
    fn clustering_chains_close_values() {
        let clusters = cluster_indices(&[10.0, 50.0, 11.5, 12.0, 48.0], 3.0);
        assert_eq!(clusters, vec![vec![0, 2, 3], vec![4, 1]]);
    }

    #[test]
    fn size_must_be_a_perfect_square() {
        assert_eq!(infer_size(81).unwrap(), 9);
        assert_eq!(infer_size(80), Err(ScanFailure::BadIntersectionCount { count: 80 }));
    }

    #[test]
    fn detects_nine_by_nine() {
        let grid = detect_grid(&synthetic_segments(9, 512.0, 32.0), 512, 512, &GridParams::default()).unwrap();
        assert_eq!(grid.mapping.size, 9);
        assert_eq!(grid.mapping.points.len(), 81);
        let a1 = grid.mapping.pixel_of(BoardCoordinate::new(1, 1)).unwrap();
        let j9 = grid.mapping.pixel_of(BoardCoordinate::new(9, 9)).unwrap();
        assert!(a1.x < 40.0 && a1.y > 470.0, "{a1:?}");
        assert!(j9.x > 470.0 && j9.y < 40.0, "{j9:?}");
    }

    #[test]
    fn unequal_line_counts_are_rejected() {
        let mut segments = synthetic_segments(4, 512.0, 32.0);
        segments.retain(|s| classify(s, &GridParams::default()) == Some(Orientation::Horizontal));
        for x in [
            20.0, 60.0, 100.0, 120.0, 150.0, 200.0, 230.0, 250.0, 300.0, 330.0, 350.0, 380.0, 400.0, 445.0, 480.0,
            490.0,
        ] {
            segments.push(seg(x, 0.0, x, 500.0));
        }
        // 4 horizontal x 16 vertical = 64 intersections, a perfect square
        assert_eq!(
            detect_grid(&segments, 512, 512, &GridParams::default()).unwrap_err(),
            ScanFailure::GridNotFound
        );
    }
}
