//! Perspective rectification and line primitives.
//!
//! The homography solver follows the usual normalized 4-point DLT: both point
//! sets are Hartley-normalized, an 8×8 system is solved with LU, and the result
//! is denormalized and scaled so that `h[2][2] == 1`.

use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector2, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points4(pts: &[Point2<f32>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let cx = pts.iter().map(|p| p.x as f64).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y as f64).sum::<f64>() / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / 4.0;

    let t = hartley_normalization(cx, cy, mean_dist);

    let mut out = [Point2::new(0.0_f64, 0.0_f64); 4];
    for (i, p) in pts.iter().enumerate() {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        out[i] = Point2::new(v[0], v[1]);
    }
    (out, t)
}

/// Compute H such that `dst ~ H * src` from 4 point correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Returns `None` when
/// the system is singular.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
    let (src_n, t_src) = normalize_points4(src);
    let (dst_n, t_dst) = normalize_points4(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    // H = T_dst^-1 * Hn * T_src
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Homography::new(h / s))
}

#[inline]
fn get_rgb(src: &RgbImage, x: i64, y: i64) -> [f32; 3] {
    if x < 0 || y < 0 || x >= src.width() as i64 || y >= src.height() as i64 {
        return [0.0; 3];
    }
    let p = src.get_pixel(x as u32, y as u32).0;
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

#[inline]
fn sample_bilinear_rgb(src: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Warp into a `side`×`side` rectified image: each output pixel center is
/// mapped into the source through `h_img_from_rect` and sampled bilinearly.
/// Samples falling outside the source are black.
pub fn warp_perspective_rgb(src: &RgbImage, h_img_from_rect: &Homography, side: u32) -> RgbImage {
    RgbImage::from_fn(side, side, |x, y| {
        let pi = h_img_from_rect.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
        sample_bilinear_rgb(src, pi.x - 0.5, pi.y - 0.5)
    })
}

/// A line segment in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: Point2<f32>,
    pub end: Point2<f32>,
}

impl Segment {
    pub fn new(start: Point2<f32>, end: Point2<f32>) -> Self {
        Self { start, end }
    }

    pub fn direction(&self) -> Vector2<f32> {
        self.end - self.start
    }

    pub fn length(&self) -> f32 {
        self.direction().norm()
    }

    /// Undirected angle to the horizontal axis in degrees, in `[0, 90]`.
    pub fn angle_to_horizontal(&self) -> f32 {
        let angle = angle_between(Vector2::new(1.0, 0.0), self.direction());
        angle.min(180.0 - angle)
    }
}

/// Angle between two vectors in degrees, in `[0, 180]`.
pub fn angle_between(v1: Vector2<f32>, v2: Vector2<f32>) -> f32 {
    let denom = v1.norm() * v2.norm();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    (v1.dot(&v2) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Intersection of the infinite lines through two segments.
///
/// Returns `None` when the cross product of the directions is below
/// `parallel_eps` in magnitude.
pub fn intersect_lines(a: &Segment, b: &Segment, parallel_eps: f32) -> Option<Point2<f32>> {
    let d1 = a.direction();
    let d2 = b.direction();
    let cross = d1.x * d2.y - d1.y * d2.x;
    if cross.abs() < parallel_eps {
        return None;
    }
    let x = b.start - a.start;
    let t1 = (x.x * d2.y - x.y * d2.x) / cross;
    Some(a.start + d1 * t1)
}

/// Twice the signed area of the triangle `a, b, c`.
pub fn triangle_area2(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> f32 {
    (b - a).perp(&(c - a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.4},{:.4}) ~ ({:.4},{:.4})",
            a.x,
            a.y,
            b.x,
            b.y
        );
    }

    #[test]
    fn four_point_homography_maps_corners() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(100.0, 100.0),
            Point2::new(0.0, 100.0),
        ];
        let dst = [
            Point2::new(12.0, 20.0),
            Point2::new(410.0, 35.0),
            Point2::new(380.0, 300.0),
            Point2::new(40.0, 330.0),
        ];
        let h = homography_from_4pt(&src, &dst).expect("homography");
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(h.apply(*s), *d, 1e-2);
        }
        let inv = h.inverse().expect("invertible");
        assert_close(inv.apply(dst[2]), src[2], 1e-2);
    }

    #[test]
    fn identity_warp_preserves_pixels() {
        let src = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 7]));
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(8.0, 0.0),
            Point2::new(8.0, 8.0),
            Point2::new(0.0, 8.0),
        ];
        let h = homography_from_4pt(&corners, &corners).unwrap();
        let out = warp_perspective_rgb(&src, &h, 8);
        assert_eq!(out.get_pixel(3, 5), src.get_pixel(3, 5));
    }

    #[test]
    fn segment_angles_are_undirected() {
        let right = Segment::new(Point2::new(0.0, 5.0), Point2::new(10.0, 5.0));
        let left = Segment::new(Point2::new(10.0, 5.0), Point2::new(0.0, 5.0));
        let up = Segment::new(Point2::new(3.0, 10.0), Point2::new(3.0, 0.0));
        assert!(right.angle_to_horizontal().abs() < 1e-4);
        assert!(left.angle_to_horizontal().abs() < 1e-4);
        assert!((up.angle_to_horizontal() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn perpendicular_lines_intersect() {
        let h = Segment::new(Point2::new(0.0, 40.0), Point2::new(100.0, 40.0));
        let v = Segment::new(Point2::new(25.0, 0.0), Point2::new(25.0, 100.0));
        let p = intersect_lines(&h, &v, 1e-8).unwrap();
        assert_close(p, Point2::new(25.0, 40.0), 1e-4);
        let h2 = Segment::new(Point2::new(0.0, 60.0), Point2::new(100.0, 60.0));
        assert!(intersect_lines(&h, &h2, 1e-8).is_none());
    }
}
