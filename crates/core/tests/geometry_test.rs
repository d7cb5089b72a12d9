//! Tests for point lists, segments and baseline polystripes.

use std::f64::consts::PI;

use vellum_core::geometry::points::{bbox_points, is_bbox, limits};
use vellum_core::geometry::segment::{SegmentPosition, segment_intersection, within_segment};
use vellum_core::utils::angle_diff;
use vellum_core::{
    ErrorKind, LayoutError, ParseMode, format_points, length, orientation, parse_points,
    synthesize_stripe, verify_stripe,
};

// ============================================================================
// Point lists
// ============================================================================

#[test]
fn test_parse_format_keeps_points() {
    let s = "10,20 110.5,20 110.5,40.25 10,40.25";
    let points = parse_points(s, ParseMode::Strict).unwrap();
    assert_eq!(points.len(), 4);
    assert_eq!(format_points(&points, false), s);
    assert_eq!(parse_points(&format_points(&points, false), ParseMode::Strict).unwrap(), points);
}

#[test]
fn test_parse_tolerates_extra_whitespace() {
    let points = parse_points("  1,2\t3,4\n 5,6 ", ParseMode::Strict).unwrap();
    assert_eq!(points, vec![(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]);
}

#[test]
fn test_strict_parse_names_bad_token() {
    let err = parse_points("1,2 3;4 5,6", ParseMode::Strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    match err {
        LayoutError::MalformedPoints { index, token } => {
            assert_eq!(index, 1);
            assert_eq!(token, "3;4");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_lenient_parse_truncates() {
    let points = parse_points("1,2 3,4 oops 5,6", ParseMode::Lenient).unwrap();
    assert_eq!(points, vec![(1.0, 2.0), (3.0, 4.0)]);
}

#[test]
fn test_rounded_format() {
    assert_eq!(format_points(&[(1.4, 2.6), (-0.4, 7.5)], true), "1,3 0,8");
}

#[test]
fn test_limits_and_corners() {
    let pts = [(5.0, 1.0), (2.0, 9.0), (7.0, 4.0)];
    let b = limits(&pts).unwrap();
    assert_eq!((b.xmin, b.xmax, b.ymin, b.ymax), (2.0, 7.0, 1.0, 9.0));
    assert_eq!(
        bbox_points(&pts),
        vec![(2.0, 1.0), (7.0, 1.0), (7.0, 9.0), (2.0, 9.0)]
    );
    assert!(limits(&[]).is_none());
}

#[test]
fn test_is_bbox_matches_corner_reconstruction() {
    let rect = [(2.0, 1.0), (7.0, 1.0), (7.0, 9.0), (2.0, 9.0)];
    assert!(is_bbox(&rect));
    assert_eq!(bbox_points(&rect), rect.to_vec());

    // same corners, different order
    let rotated = [(7.0, 1.0), (7.0, 9.0), (2.0, 9.0), (2.0, 1.0)];
    assert!(!is_bbox(&rotated));
    assert!(!is_bbox(&rect[..3]));
}

// ============================================================================
// Segments
// ============================================================================

#[test]
fn test_segment_intersection_extends_lines() {
    let p = segment_intersection((0.0, 0.0), (1.0, 0.0), (5.0, -1.0), (5.0, 1.0)).unwrap();
    assert!((p.0 - 5.0).abs() < 1e-12 && p.1.abs() < 1e-12);
    assert!(segment_intersection((0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)).is_none());
}

#[test]
fn test_within_segment_positions() {
    let (a, b) = ((0.0, 0.0), (10.0, 0.0));
    assert_eq!(within_segment(a, b, (5.0, 0.0)).unwrap(), SegmentPosition::OnSegment);
    assert_eq!(within_segment(a, b, (10.0, 0.0)).unwrap(), SegmentPosition::OnSegment);
    assert_eq!(within_segment(a, b, (15.0, 0.0)).unwrap(), SegmentPosition::RightOf);
    assert_eq!(within_segment(a, b, (-3.0, 0.0)).unwrap(), SegmentPosition::LeftOf);
    assert_eq!(within_segment(a, b, (5.0, 4.0)).unwrap(), SegmentPosition::NotCollinear);
    let err = within_segment(a, a, (1.0, 1.0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Degenerate);
}

#[test]
fn test_angle_diff_range() {
    assert!((angle_diff(PI, -PI)).abs() < 1e-12);
    assert!((angle_diff(0.1, -0.1) - 0.2).abs() < 1e-12);
    let d = angle_diff(-PI + 0.1, PI - 0.1);
    assert!((d - 0.2).abs() < 1e-12);
}

// ============================================================================
// Baselines
// ============================================================================

#[test]
fn test_length_of_polyline() {
    assert_eq!(length(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]), 11.0);
    assert_eq!(length(&[(1.0, 1.0)]), 0.0);
}

#[test]
fn test_orientation_reversal_is_half_turn() {
    let baselines: [&[(f64, f64)]; 3] = [
        &[(0.0, 0.0), (100.0, 5.0)],
        &[(0.0, 50.0), (80.0, 40.0), (200.0, 45.0)],
        &[(10.0, 10.0), (10.0, 90.0), (12.0, 180.0)],
    ];
    for b in baselines {
        let forward = orientation(b).unwrap().unwrap();
        let reversed: Vec<_> = b.iter().rev().copied().collect();
        let backward = orientation(&reversed).unwrap().unwrap();
        assert!(
            angle_diff(backward, forward + PI).abs() < 1e-9,
            "{b:?}: {forward} vs {backward}"
        );
    }
}

#[test]
fn test_orientation_edge_cases() {
    assert_eq!(orientation(&[(1.0, 1.0)]).unwrap(), None);
    let err = orientation(&[(1.0, 1.0), (1.0, 1.0)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Degenerate);
}

#[test]
fn test_stripe_round_trip() {
    let baselines: [&[(f64, f64)]; 3] = [
        &[(0.0, 50.0), (100.0, 50.0)],
        &[(0.0, 50.0), (100.0, 50.0), (200.0, 70.0)],
        &[(10.0, 100.0), (60.0, 90.0), (140.0, 95.0), (220.0, 80.0)],
    ];
    for b in baselines {
        for (h, o) in [(20.0, 0.25), (32.0, 0.0), (12.0, 0.5)] {
            let coords = synthesize_stripe(b, h, o).unwrap();
            assert_eq!(coords.len(), 2 * b.len());
            let stripe = verify_stripe(&coords, b).unwrap_or_else(|| panic!("{b:?} h={h} o={o}"));
            assert!((stripe.height - h).abs() < 1e-6);
            assert!((stripe.offset - o).abs() < 1e-6);
        }
    }
}

#[test]
fn test_verify_rejects_other_polygons() {
    let baseline = [(0.0, 50.0), (100.0, 50.0)];
    // skewed end edge
    let skewed = [(10.0, 40.0), (100.0, 40.0), (100.0, 60.0), (0.0, 60.0)];
    assert!(verify_stripe(&skewed, &baseline).is_none());
    // offset above one half
    let low = synthesize_stripe(&baseline, 20.0, 0.5).unwrap();
    let flipped: Vec<_> = low.iter().map(|&(x, y)| (x, y + 8.0)).collect();
    assert!(verify_stripe(&flipped, &baseline).is_none());
    // wrong point count
    assert!(verify_stripe(&low[..3], &baseline).is_none());
}

#[test]
fn test_synthesize_rejects_bad_parameters() {
    let baseline = [(0.0, 0.0), (10.0, 0.0)];
    assert_eq!(
        synthesize_stripe(&baseline, 0.0, 0.2).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        synthesize_stripe(&baseline, 10.0, 0.7).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        synthesize_stripe(&baseline[..1], 10.0, 0.2).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        synthesize_stripe(&[(0.0, 0.0), (0.0, 0.0)], 10.0, 0.2)
            .unwrap_err()
            .kind(),
        ErrorKind::Degenerate
    );
}
