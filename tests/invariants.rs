//! Contract Invariant Tests
//!
//! End-to-end capture and verification through the public API.

use std::collections::HashSet;

use pixelstrand_core::{
    capture_record, extract, orientation::normalize, plan_seeded, CandidateImage, Comparison,
    ComparisonMode, FingerprintRecord, ImageId, ImageMetadata, Orientation, PixelGrid, Rgb,
    SampleSpec, VerificationSession, Verdict, VerifierConfig, VerifyError,
};
use serde_json::json;

fn photo(w: u32, h: u32) -> PixelGrid {
    PixelGrid::from_fn(w, h, |x, y| {
        Rgb::new((x * 7 + y) as u8, (y * 11 + x / 3) as u8, ((x * y) % 251) as u8)
    })
    .unwrap()
}

fn metadata(id: i64, w: u32, h: u32) -> ImageMetadata {
    ImageMetadata::new(ImageId::Number(id), w, h)
}

fn session_for(record: FingerprintRecord) -> VerificationSession {
    VerificationSession::new(record, VerifierConfig::default()).unwrap()
}

fn upright(grid: PixelGrid) -> CandidateImage {
    CandidateImage { grid, orientation: None }
}

/// A pixel on `row` that no other seeded strand or edge band samples.
fn pixel_only_on_row(grid: &PixelGrid, seed: i64, row: u32) -> (u32, u32) {
    let plan = plan_seeded(seed, grid.width(), grid.height());
    let mut elsewhere = HashSet::new();
    for strand in plan.strands.iter().filter(|s| s.spec != SampleSpec::Horizontal { row }) {
        for p in extract(grid, &strand.spec).pixels {
            elsewhere.insert((p.x, p.y));
        }
    }
    for spec in &plan.edges {
        for p in extract(grid, spec).pixels {
            elsewhere.insert((p.x, p.y));
        }
    }
    let x = (0..grid.width())
        .find(|&x| !elsewhere.contains(&(x, row)))
        .expect("row has an exclusive pixel");
    (x, row)
}

#[test]
fn invariant_unmodified_image_scores_100() {
    let grid = photo(100, 60);
    let record = capture_record(&grid, metadata(12345, 100, 60), ComparisonMode::ExactHash).unwrap();

    let report = session_for(record).verify(&upright(grid)).unwrap();

    assert_eq!(report.score, 100.0);
    assert_eq!(report.assessment.verdict, Verdict::Authentic);
    assert_eq!(report.assessment.title, "Authentic & Unmodified");
    match &report.comparison {
        Comparison::ExactHash(h) => assert_eq!((h.matched_checks, h.total_checks), (10, 10)),
        other => panic!("expected hash comparison, got {:?}", other),
    }
}

#[test]
fn invariant_one_pixel_on_strand_one_costs_one_check() {
    let grid = photo(100, 60);
    let record = capture_record(&grid, metadata(12345, 100, 60), ComparisonMode::ExactHash).unwrap();

    // strand 1 samples row 7 for this seed and size
    let (x, y) = pixel_only_on_row(&grid, 12345, 7);
    let mut tampered = grid.clone();
    let original = tampered.pixel(x, y);
    tampered.set_pixel(x, y, Rgb::new(original.r.wrapping_add(1), original.g, original.b));

    let report = session_for(record).verify(&upright(tampered)).unwrap();

    assert_eq!(report.score, 90.0);
    assert_eq!(report.assessment.verdict, Verdict::MinorModification);
    assert_eq!(report.assessment.title, "Likely Authentic");
    match &report.comparison {
        Comparison::ExactHash(h) => {
            assert!(!h.strands[0].matched);
            assert!(h.strands[1..].iter().all(|s| s.matched));
            assert_eq!(h.edges.matched(), 4);
        }
        other => panic!("expected hash comparison, got {:?}", other),
    }
}

#[test]
fn invariant_record_round_trips_through_json() {
    let grid = photo(80, 50);
    let record = capture_record(&grid, metadata(-42, 80, 50), ComparisonMode::ExactHash).unwrap();
    let json = serde_json::to_string(&record).unwrap();

    let session = VerificationSession::from_json(&json, VerifierConfig::default()).unwrap();
    let report = session.verify(&upright(grid)).unwrap();
    assert_eq!(report.score, 100.0);
}

#[test]
fn invariant_uppercase_record_digests_still_match() {
    let grid = photo(64, 64);
    let record = capture_record(&grid, metadata(9, 64, 64), ComparisonMode::ExactHash).unwrap();
    let upper = serde_json::to_string(&record).unwrap();
    let upper = upper
        .split('"')
        .map(|part| {
            if part.len() == 64 && part.chars().all(|c| c.is_ascii_hexdigit()) {
                part.to_uppercase()
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\"");

    let session = VerificationSession::from_json(&upper, VerifierConfig::default()).unwrap();
    assert_eq!(session.verify(&upright(grid)).unwrap().score, 100.0);
}

#[test]
fn invariant_dimension_mismatch_is_fatal() {
    let grid = photo(100, 60);
    let record = capture_record(&grid, metadata(1, 100, 60), ComparisonMode::ExactHash).unwrap();

    let cropped = photo(99, 60);
    let err = session_for(record).verify(&upright(cropped)).unwrap_err();
    assert!(matches!(err, VerifyError::DimensionMismatch { .. }));
    assert!(err.to_string().contains("Expected 100x60, got 99x60"));
}

#[test]
fn invariant_rotated_storage_verifies_after_normalization() {
    let grid = photo(90, 40);
    let record = capture_record(&grid, metadata(555, 90, 40), ComparisonMode::ExactHash).unwrap();

    // Stored sideways with orientation 6: applying the clockwise fix yields
    // the upright capture.
    let stored = normalize(&grid, Orientation::Rotate270Cw);
    assert_eq!((stored.width(), stored.height()), (40, 90));

    let session = session_for(record);
    let report = session
        .verify(&CandidateImage { grid: stored.clone(), orientation: Some(6) })
        .unwrap();
    assert_eq!(report.score, 100.0);
    assert_eq!(report.orientation, Orientation::Rotate90Cw);

    // Without the orientation code the swapped size is rejected.
    let err = session.verify(&upright(stored)).unwrap_err();
    match err {
        VerifyError::DimensionMismatch { swapped, .. } => assert!(swapped),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn invariant_tolerance_mode_survives_small_noise() {
    let grid = photo(120, 90);
    let record = capture_record(&grid, metadata(3, 120, 90), ComparisonMode::Tolerance).unwrap();

    // lossy re-encode: every channel nudged by up to 3
    let noisy = PixelGrid::from_fn(120, 90, |x, y| {
        let p = grid.pixel(x, y);
        let d = ((x + y) % 4) as u8;
        Rgb::new(p.r.saturating_sub(d), p.g.saturating_add(d), p.b)
    })
    .unwrap();

    let report = session_for(record).verify(&upright(noisy)).unwrap();
    assert_eq!(report.mode, ComparisonMode::Tolerance);
    assert_eq!(report.score, 100.0);
    assert_eq!(report.assessment.verdict, Verdict::Authentic);
    match &report.comparison {
        Comparison::Tolerance(t) => {
            assert_eq!(t.strands.len(), 3);
            assert!(t.overall_match);
            assert!(t.dimension_match);
        }
        other => panic!("expected tolerance comparison, got {:?}", other),
    }
}

#[test]
fn invariant_tolerance_mode_flags_edits() {
    let grid = photo(120, 90);
    let record = capture_record(&grid, metadata(3, 120, 90), ComparisonMode::Tolerance).unwrap();

    // paint over the whole left half
    let edited = PixelGrid::from_fn(120, 90, |x, y| {
        if x <= 60 {
            Rgb::new(255, 0, 255)
        } else {
            grid.pixel(x, y)
        }
    })
    .unwrap();

    let report = session_for(record).verify(&upright(edited)).unwrap();
    match &report.comparison {
        Comparison::Tolerance(t) => {
            // the 15% and 50% columns are painted, the 80% one is not
            assert!(!t.strands[0].is_match);
            assert!(!t.strands[1].is_match);
            assert!(t.strands[2].is_match);
            assert!(!t.strands[0].sample_mismatches.is_empty());
        }
        other => panic!("expected tolerance comparison, got {:?}", other),
    }
    assert_eq!(report.assessment.verdict, Verdict::Failed);
}

#[test]
fn invariant_malformed_record_stops_before_sampling() {
    let err = VerificationSession::from_json(
        &json!({"imageId": 1, "height": 10, "strands": []}).to_string(),
        VerifierConfig::default(),
    )
    .err()
    .expect("record without width is rejected");
    assert!(matches!(err, VerifyError::MalformedRecord(_)));
}

#[test]
fn invariant_forged_positions_do_not_verify() {
    let grid = photo(100, 60);
    let record = capture_record(&grid, metadata(12345, 100, 60), ComparisonMode::ExactHash).unwrap();
    let mut value = serde_json::to_value(&record).unwrap();
    value["strands"][0]["yPosition"] = json!(8);

    let session =
        VerificationSession::from_json(&value.to_string(), VerifierConfig::default()).unwrap();
    let report = session.verify(&upright(grid)).unwrap();
    assert_eq!(report.score, 90.0);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, pixelstrand_core::compare::ReportWarning::GeometryMismatch { id: 1 })));
}

#[test]
fn invariant_relocated_tolerance_strand_does_not_verify() {
    let grid = photo(120, 90);
    let record = capture_record(&grid, metadata(3, 120, 90), ComparisonMode::Tolerance).unwrap();
    let mut value = serde_json::to_value(&record).unwrap();
    value["strands"][0]["xPosition"] = json!(77);
    value["strands"][0]["startX"] = json!(77);
    value["strands"][0]["startY"] = json!(1);

    let session =
        VerificationSession::from_json(&value.to_string(), VerifierConfig::default()).unwrap();
    let report = session.verify(&upright(grid)).unwrap();
    assert!(report.score < 100.0);
    assert_eq!(report.assessment.verdict, Verdict::Failed);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, pixelstrand_core::compare::ReportWarning::GeometryMismatch { id: 1 })));
}

#[test]
fn invariant_free_text_capture_time_does_not_block_verification() {
    let grid = photo(100, 60);
    let record = capture_record(&grid, metadata(12345, 100, 60), ComparisonMode::ExactHash).unwrap();
    let mut value = serde_json::to_value(&record).unwrap();
    value["capturedAt"] = json!("2025-01-15 10:22:03");

    let session =
        VerificationSession::from_json(&value.to_string(), VerifierConfig::default()).unwrap();
    assert_eq!(session.verify(&upright(grid)).unwrap().score, 100.0);
}

#[test]
fn invariant_sessions_are_independent() {
    // Two sessions built from the same record produce identical scores and
    // share nothing.
    let grid = photo(70, 70);
    let record = capture_record(&grid, metadata(11, 70, 70), ComparisonMode::ExactHash).unwrap();
    let a = session_for(record.clone()).verify(&upright(grid.clone())).unwrap();
    let b = session_for(record).verify(&upright(grid)).unwrap();
    assert_eq!(a.score, b.score);
    assert_eq!(a.record_hash, b.record_hash);
    assert_ne!(a.id, b.id);
}
