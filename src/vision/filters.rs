//! Pixel filters: edges, thresholds and binary morphology.
//!
//! Binary images use 0 for background and 255 for set pixels. Morphology
//! treats pixels outside the image as absent, so borders neither grow nor
//! shrink the result.

use image::{GrayImage, Luma, RgbImage};

const SOBEL_GX: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_GY: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

const SET: u8 = 255;

pub fn grayscale(rgb: &RgbImage) -> GrayImage {
    image::imageops::grayscale(rgb)
}

/// Sobel gradients; border pixels are left at zero.
struct Gradients {
    width: usize,
    height: usize,
    gx: Vec<i32>,
    gy: Vec<i32>,
}

impl Gradients {
    fn compute(gray: &GrayImage) -> Self {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let raw = gray.as_raw();
        let mut gx = vec![0i32; width * height];
        let mut gy = vec![0i32; width * height];

        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                let mut sx = 0;
                let mut sy = 0;
                for ky in 0..3 {
                    for kx in 0..3 {
                        let v = raw[(y + ky - 1) * width + (x + kx - 1)] as i32;
                        sx += v * SOBEL_GX[ky][kx];
                        sy += v * SOBEL_GY[ky][kx];
                    }
                }
                gx[y * width + x] = sx;
                gy[y * width + x] = sy;
            }
        }
        Self {
            width,
            height,
            gx,
            gy,
        }
    }

    /// L1 gradient magnitude.
    #[inline]
    fn magnitude(&self, i: usize) -> f32 {
        (self.gx[i].abs() + self.gy[i].abs()) as f32
    }
}

/// Canny edge detector with L1 gradient magnitude, non-maximum suppression
/// along the quantized gradient direction, and hysteresis between `low` and `high`.
pub fn canny(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    let g = Gradients::compute(gray);
    let (w, h) = (g.width, g.height);
    let mag: Vec<f32> = (0..w * h).map(|i| g.magnitude(i)).collect();

    // 0 = suppressed, 1 = weak, 2 = strong
    let mut class = vec![0u8; w * h];
    let mut stack = Vec::new();
    // tan(22.5°) and tan(67.5°)
    const TAN_22: f32 = 0.414_213_57;
    const TAN_67: f32 = 2.414_213_6;

    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let i = y * w + x;
            let m = mag[i];
            if m <= low {
                continue;
            }
            let ax = g.gx[i].abs() as f32;
            let ay = g.gy[i].abs() as f32;
            let (n1, n2) = if ay <= ax * TAN_22 {
                (i - 1, i + 1)
            } else if ay >= ax * TAN_67 {
                (i - w, i + w)
            } else if (g.gx[i] > 0) == (g.gy[i] > 0) {
                (i - w - 1, i + w + 1)
            } else {
                (i - w + 1, i + w - 1)
            };
            // Ties break toward the earlier pixel so plateaus yield one-pixel ridges.
            if m > mag[n1] && m >= mag[n2] {
                if m > high {
                    class[i] = 2;
                    stack.push(i);
                } else {
                    class[i] = 1;
                }
            }
        }
    }

    while let Some(i) = stack.pop() {
        let (x, y) = (i % w, i / w);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if class[j] == 1 {
                    class[j] = 2;
                    stack.push(j);
                }
            }
        }
    }

    let data = class.into_iter().map(|c| if c == 2 { SET } else { 0 }).collect();
    GrayImage::from_raw(w as u32, h as u32, data).unwrap_or_else(|| GrayImage::new(w as u32, h as u32))
}

/// Pixels strictly above `level` become 255, all others 0.
pub fn threshold_binary(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if gray.get_pixel(x, y).0[0] > level { SET } else { 0 }])
    })
}

/// Elliptical structuring element of the given diameter, stored as one
/// horizontal half-width per row offset.
#[derive(Clone, Debug)]
pub struct Ellipse {
    rows: Vec<(i64, i64)>,
}

impl Ellipse {
    pub fn new(diameter: u32) -> Self {
        let d = diameter.max(1) as i64;
        let r = (d - 1) as f64 / 2.0;
        let c = d / 2;
        let mut rows = Vec::with_capacity(d as usize);
        for i in 0..d {
            let dy = (i - c) as f64;
            let half = if r <= 0.0 {
                0
            } else {
                let t = 1.0 - (dy * dy) / (r * r);
                if t < 0.0 {
                    continue;
                }
                (r * t.sqrt()).round() as i64
            };
            rows.push((i - c, half));
        }
        Self { rows }
    }

    /// Row offsets with their horizontal half-widths.
    pub fn rows(&self) -> &[(i64, i64)] {
        &self.rows
    }
}

/// Per-row prefix sums of set pixels, used to count set pixels in a span in O(1).
pub struct RowCounts {
    width: usize,
    height: usize,
    prefix: Vec<u32>,
}

impl RowCounts {
    pub fn new(img: &GrayImage) -> Self {
        let width = img.width() as usize;
        let height = img.height() as usize;
        let raw = img.as_raw();
        let mut prefix = vec![0u32; (width + 1) * height];
        for y in 0..height {
            let base = y * (width + 1);
            for x in 0..width {
                prefix[base + x + 1] = prefix[base + x] + u32::from(raw[y * width + x] > 0);
            }
        }
        Self {
            width,
            height,
            prefix,
        }
    }

    /// Set pixels and in-image pixels in row `y`, columns `x0..=x1` (clipped).
    fn span(&self, y: i64, x0: i64, x1: i64) -> (u32, u32) {
        if y < 0 || y >= self.height as i64 {
            return (0, 0);
        }
        let a = x0.max(0);
        let b = x1.min(self.width as i64 - 1);
        if a > b {
            return (0, 0);
        }
        let base = y as usize * (self.width + 1);
        let set = self.prefix[base + b as usize + 1] - self.prefix[base + a as usize];
        (set, (b - a + 1) as u32)
    }
}

/// Binary dilation: a pixel is set if any pixel under the kernel is set.
pub fn dilate(img: &GrayImage, kernel: &Ellipse) -> GrayImage {
    let counts = RowCounts::new(img);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let hit = kernel.rows().iter().any(|&(dy, half)| {
            let (set, _) = counts.span(y as i64 + dy, x as i64 - half, x as i64 + half);
            set > 0
        });
        Luma([if hit { SET } else { 0 }])
    })
}

/// Value of a binary erosion at a single pixel, for when only a few pixels matter.
pub fn erode_at(counts: &RowCounts, kernel: &Ellipse, x: u32, y: u32) -> u8 {
    erode_pixel(counts, kernel, x as i64, y as i64)
}

fn erode_pixel(counts: &RowCounts, kernel: &Ellipse, x: i64, y: i64) -> u8 {
    let all = kernel.rows().iter().all(|&(dy, half)| {
        let (set, total) = counts.span(y + dy, x - half, x + half);
        set == total
    });
    if all { SET } else { 0 }
}

/// Binary erosion: a pixel stays set only if every in-image pixel under the kernel is set.
pub fn erode(img: &GrayImage, kernel: &Ellipse) -> GrayImage {
    let counts = RowCounts::new(img);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([erode_pixel(&counts, kernel, x as i64, y as i64)])
    })
}

/// Morphological closing (dilate, then erode) with the same kernel.
pub fn close(img: &GrayImage, kernel: &Ellipse) -> GrayImage {
    erode(&dilate(img, kernel), kernel)
}
