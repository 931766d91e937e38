//! Capture - sample a canonical grid into a fingerprint
//!
//! Used on the capture side to produce a record, and on the verification
//! side to resample the candidate image with the same geometry.

use crate::extract::{extract, PixelSample};
use crate::geometry::{plan_fixed, plan_seeded, SampleSpec, StrandKind};
use crate::grid::PixelGrid;
use crate::hashing::{digest_pixels, pixel_string, sha256_hex};
use crate::record::{
    EdgeDigests, HashFingerprint, HashedStrand, SampledFingerprint, SampledStrand, StrandPixel,
};

/// Resample the six seeded strands and the four edge bands.
pub fn capture_hash_fingerprint(grid: &PixelGrid, seed: i64) -> HashFingerprint {
    let plan = plan_seeded(seed, grid.width(), grid.height());

    let strands = plan
        .strands
        .iter()
        .map(|planned| {
            let sample = extract(grid, &planned.spec);
            let digest = digest_pixels(sample.colors());
            log::debug!("strand {} ({:?}) digest {}", planned.id, planned.kind, &digest[..16]);
            hashed_strand(planned.id, planned.kind, &sample, digest)
        })
        .collect();

    let bands: Vec<String> = plan
        .edges
        .iter()
        .map(|spec| pixel_string(extract(grid, spec).colors()))
        .collect();

    let edges = EdgeDigests {
        top_hash: sha256_hex(bands[0].as_bytes()),
        bottom_hash: sha256_hex(bands[1].as_bytes()),
        left_hash: sha256_hex(bands[2].as_bytes()),
        right_hash: sha256_hex(bands[3].as_bytes()),
        edge_hash: Some(sha256_hex(bands.concat().as_bytes())),
    };

    HashFingerprint { strands, edges }
}

fn hashed_strand(
    id: u32,
    kind: StrandKind,
    sample: &PixelSample,
    sha256: String,
) -> HashedStrand {
    let mut strand = HashedStrand {
        id,
        kind,
        y_position: None,
        x_position: None,
        start_x: None,
        start_y: None,
        pixel_count: None,
        sha256,
    };
    match sample.spec {
        SampleSpec::Horizontal { row } => strand.y_position = Some(row),
        SampleSpec::Vertical { col } => strand.x_position = Some(col),
        SampleSpec::Diagonal { start_x, start_y, .. } => {
            strand.start_x = Some(start_x);
            strand.start_y = Some(start_y);
            strand.pixel_count = Some(sample.len());
        }
        _ => {}
    }
    strand
}

/// Read the three fixed-proportion column spans with their raw pixels.
pub fn capture_sampled_fingerprint(grid: &PixelGrid) -> SampledFingerprint {
    let strands = plan_fixed(grid.width(), grid.height())
        .iter()
        .map(|planned| {
            let sample = extract(grid, &planned.spec);
            let (col, start_row) = match planned.spec {
                SampleSpec::ColumnSpan { col, start_row, .. } => (Some(col), Some(start_row)),
                _ => (None, None),
            };
            SampledStrand {
                id: planned.id,
                name: Some(planned.name.as_str().to_string()),
                x_position: col,
                start_x: col,
                start_y: start_row,
                pixels: sample
                    .pixels
                    .iter()
                    .map(|p| StrandPixel::new(p.x, p.y, p.rgb))
                    .collect(),
            }
        })
        .collect();

    SampledFingerprint { strands }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Rgb;
    use crate::hashing::rgb_hex;

    fn gradient(w: u32, h: u32) -> PixelGrid {
        PixelGrid::from_fn(w, h, |x, y| Rgb::new((x * 3) as u8, (y * 5) as u8, (x ^ y) as u8))
            .unwrap()
    }

    #[test]
    fn test_hash_capture_records_positions() {
        let fp = capture_hash_fingerprint(&gradient(100, 60), 12345);
        assert_eq!(fp.strands.len(), 6);
        assert_eq!(fp.strands[0].y_position, Some(7));
        assert_eq!(fp.strands[1].y_position, Some(40));
        assert_eq!(fp.strands[2].x_position, Some(31));
        assert_eq!(fp.strands[3].x_position, Some(80));
        assert_eq!(fp.strands[4].kind, StrandKind::DiagonalTlBr);
        assert_eq!((fp.strands[4].start_x, fp.strands[4].start_y), (Some(20), Some(0)));
        assert_eq!(fp.strands[4].pixel_count, Some(60));
        assert_eq!(fp.strands[5].pixel_count, Some(59));
    }

    #[test]
    fn test_hash_capture_is_deterministic() {
        let grid = gradient(64, 48);
        assert_eq!(capture_hash_fingerprint(&grid, 99), capture_hash_fingerprint(&grid, 99));
    }

    #[test]
    fn test_combined_edge_digest_concatenates_sides() {
        let grid = gradient(120, 110);
        let fp = capture_hash_fingerprint(&grid, 1);
        let sides: String = crate::geometry::EdgeSide::ALL
            .iter()
            .map(|&side| pixel_string(extract(&grid, &SampleSpec::EdgeBand { side }).colors()))
            .collect();
        assert_eq!(fp.edges.edge_hash, Some(sha256_hex(sides.as_bytes())));
    }

    #[test]
    fn test_sampled_capture_names_and_lengths() {
        let fp = capture_sampled_fingerprint(&gradient(100, 90));
        let names: Vec<_> = fp.strands.iter().map(|s| s.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["Bottom", "Middle", "Top"]);
        assert!(fp.strands.iter().all(|s| s.pixels.len() == 30));
        assert_eq!(fp.strands[0].start_y, Some(60));
        assert_eq!(fp.strands[0].pixels[0].y, 60);
        assert_eq!(fp.strands[2].x_position, Some(80));
        let first = &fp.strands[0].pixels[0];
        assert_eq!(first.hex, Some(format!("#{}", rgb_hex(first.rgb()))));
    }
}
