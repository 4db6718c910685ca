//! Constants for board geometry, rules, and the vision pipeline.
//!
//! Numeric tuning values for scanning live here so that `ScanParams::default()`
//! and the tests agree on them. Runtime overrides go through
//! [`crate::vision::ScanParams`].

// =============================================================================
// Board Geometry
// =============================================================================

/// Smallest supported board size.
pub const MIN_BOARD_SIZE: usize = 2;

/// Largest supported board size (standard 19x19).
pub const MAX_BOARD_SIZE: usize = 19;

/// Number of cells between the outermost lines on the largest board.
/// The clustering tolerance is derived from this, not from the detected size.
pub const MAX_CELLS: f32 = (MAX_BOARD_SIZE - 1) as f32;

// =============================================================================
// Rules
// =============================================================================

/// Default komi (compensation points for White).
pub const DEFAULT_KOMI: f32 = 6.5;

/// Result written when the final position cannot be scored.
pub const UNSCORABLE_RESULT: &str = "Couldn't score the board.";

// =============================================================================
// Rectification
// =============================================================================

/// Side length in pixels of the square rectified image.
pub const RECTIFIED_SIDE: u32 = 512;

/// Distance in pixels from the rectified border to the contour corners, so the
/// outermost grid lines do not sit on the image edge.
pub const RECTIFIED_MARGIN: u32 = 32;

// =============================================================================
// Edge and Line Extraction
// =============================================================================

/// Canny hysteresis thresholds on the Sobel gradient magnitude.
pub const CANNY_LOW: f32 = 100.0;
pub const CANNY_HIGH: f32 = 150.0;

/// Diameter of the elliptical kernel used to close gaps in the edge image.
pub const EDGE_CLOSE_KERNEL: u32 = 7;

/// Minimum number of votes for a Hough line.
pub const HOUGH_THRESHOLD: u32 = 80;

/// Minimum accepted segment length in pixels.
pub const HOUGH_MIN_LINE_LENGTH: u32 = 10;

/// Maximum gap in pixels bridged while walking along a segment.
pub const HOUGH_MAX_LINE_GAP: u32 = 5;

/// Angular resolution of the Hough accumulator (one bin per degree).
pub const HOUGH_THETA_BINS: usize = 180;

/// Seed for the randomised edge-point order.
pub const HOUGH_SEED: u64 = 0x5eed_0f_90;

// =============================================================================
// Orientation Classification
// =============================================================================

/// Horizontal segments must lie within this many degrees of 0.
pub const HORIZONTAL_TOLERANCE_DEG: f32 = 1.0;

/// Vertical segments must lie within this many degrees of 90.
pub const VERTICAL_TOLERANCE_DEG: f32 = 2.0;

/// Fraction of one grid cell used as the clustering tolerance.
pub const CLUSTER_CELL_FRACTION: f32 = 1.0 / 3.0;

/// Cross products below this are treated as parallel lines.
pub const PARALLEL_EPSILON: f32 = 1e-8;

// =============================================================================
// Stone Classification
// =============================================================================

/// Grayscale level separating "dark" from "light" before the black-stone test.
pub const BLACK_BINARY_THRESHOLD: u8 = 85;

/// An intersection pixel darker than this is a black-stone candidate.
pub const BLACK_SEED_LEVEL: u8 = 20;

/// Pixels darker than this count as inside a black stone while walking a chord.
pub const BLACK_CHORD_LEVEL: u8 = 50;

/// Maximum difference in pixels between the 45 and 135 degree chords.
pub const CHORD_AGREEMENT_PX: i32 = 5;

/// Minimum chord length in pixels for a black stone.
pub const MIN_CHORD_PX: i32 = 10;

/// Dilation kernel diameter as a fraction of the stone diameter.
pub const DILATE_DIAMETER_FRACTION: f32 = 0.8;

/// Erosion kernel diameter as a fraction of the stone diameter.
pub const ERODE_DIAMETER_FRACTION: f32 = 0.6;

/// After dilate-then-erode, a pixel below this level marks a stone.
pub const ANY_STONE_LEVEL: u8 = 50;
