//! End-to-end scans of synthetic board photos.

mod common;

use augmented_go::board::{Color, StoneConfiguration, all_coordinates};
use augmented_go::vision::{self, ScanFailure, ScanParams};
use common::{c, contour, exact_contour, render};

fn assert_grid_is_stable(size: usize) {
    let frame = render(&StoneConfiguration::empty(size));
    let params = ScanParams::default();

    let scans: Vec<_> = (0..4)
        .map(|variant| {
            vision::scan(&frame, Some(&contour(variant)), &params)
                .unwrap_or_else(|e| panic!("variant {variant} on {size}x{size}: {e}"))
        })
        .collect();

    for (variant, out) in scans.iter().enumerate() {
        assert_eq!(out.grid.size, size, "variant {variant}");
        assert_eq!(out.grid.points.len(), size * size);
        assert!(out.configuration.is_empty(), "variant {variant}:\n{}", out.configuration);
    }

    let reference = &scans[0].grid;
    for out in &scans[1..] {
        for coord in all_coordinates(size) {
            let a = reference.pixel_of(coord).unwrap();
            let b = out.grid.pixel_of(coord).unwrap();
            assert!((a - b).norm() < 6.0, "{coord}: {a} vs {b}");
        }
    }
}

// ============================================================================
// Grid detection
// ============================================================================

#[test]
fn nine_by_nine_grid_is_stable_under_contour_rounding() {
    assert_grid_is_stable(9);
}

#[test]
fn thirteen_by_thirteen_grid_is_stable_under_contour_rounding() {
    assert_grid_is_stable(13);
}

#[test]
fn row_one_is_at_the_bottom() {
    let out = vision::scan(&render(&StoneConfiguration::empty(9)), Some(&exact_contour()), &ScanParams::default()).unwrap();
    let a1 = out.grid.pixel_of(c(1, 1)).unwrap();
    let j9 = out.grid.pixel_of(c(9, 9)).unwrap();
    assert!(a1.x < j9.x);
    assert!(a1.y > j9.y);
}

// ============================================================================
// Stones and failures
// ============================================================================

#[test]
fn detects_black_and_white_stones() {
    let stones = StoneConfiguration::empty(9)
        .with_stone(c(3, 7), Color::Black)
        .with_stone(c(7, 3), Color::Black)
        .with_stone(c(5, 5), Color::White)
        .with_stone(c(2, 2), Color::White);

    let out = vision::scan(&render(&stones), Some(&exact_contour()), &ScanParams::default()).unwrap();
    assert_eq!(out.configuration, stones, "\n{}", out.configuration);
    assert_eq!(out.debug_image.dimensions(), (ScanParams::default().rectified_side, ScanParams::default().rectified_side));
}

#[test]
fn frame_without_board_has_no_grid() {
    let frame = image::RgbImage::from_pixel(common::FRAME_SIDE, common::FRAME_SIDE, image::Rgb([200, 160, 100]));
    let err = vision::scan(&frame, Some(&exact_contour()), &ScanParams::default()).unwrap_err();
    assert_eq!(err, ScanFailure::GridNotFound);
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn params_round_trip_through_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.json");
    let mut params = ScanParams::default();
    params.hough.threshold = 70;
    params.stones.min_chord_px = 12;
    params.write_json(&path).unwrap();
    assert_eq!(ScanParams::load_json(&path).unwrap(), params);
}
