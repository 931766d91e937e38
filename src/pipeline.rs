//! Verification Pipeline - single entry point
//!
//! A session owns one fingerprint record and the comparator settings for
//! exactly one run: normalize the candidate, check its dimensions, regenerate
//! the geometry from scratch, resample, compare.
//!
//! CRITICAL: the dimension check always runs before any sampling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::capture::{capture_hash_fingerprint, capture_sampled_fingerprint};
use crate::compare::{Comparator, Comparison, ReportWarning};
use crate::config::VerifierConfig;
use crate::grid::PixelGrid;
use crate::hashing::compute_record_hash;
use crate::orientation::{normalize, resolve, Orientation};
use crate::record::{Fingerprint, FingerprintRecord, ImageId, ImageMetadata};
use crate::verdict::{Assessment, ComparisonMode};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Malformed fingerprint record: {0}")]
    MalformedRecord(String),

    #[error(
        "Dimension mismatch! Expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}{}",
        rotation_hint(.swapped)
    )]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
        /// The candidate is the recorded size with width and height exchanged.
        swapped: bool,
    },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn rotation_hint(swapped: &bool) -> &'static str {
    if *swapped {
        " (swapped; the image appears rotated 90 degrees)"
    } else {
        ""
    }
}

impl VerifyError {
    fn dimension_mismatch(expected: (u32, u32), actual: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
            swapped: expected != actual && expected == (actual.1, actual.0),
        }
    }
}

/// The image presented for verification, as stored.
#[derive(Debug, Clone)]
pub struct CandidateImage {
    pub grid: PixelGrid,
    /// Container orientation code; absent means upright.
    pub orientation: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub image_id: ImageId,
    pub width: u32,
    pub height: u32,
    pub record_hash: String,
    pub mode: ComparisonMode,
    pub orientation: Orientation,
    pub score: f64,
    pub assessment: Assessment,
    pub comparison: Comparison,
    pub warnings: Vec<ReportWarning>,
}

impl VerificationReport {
    pub fn is_authentic(&self) -> bool {
        self.assessment.verdict == crate::verdict::Verdict::Authentic
    }
}

/// Rotate the candidate upright and require the recorded dimensions.
pub fn canonicalize(
    candidate: &CandidateImage,
    metadata: &ImageMetadata,
) -> Result<(PixelGrid, Orientation, Option<u16>), VerifyError> {
    let resolved = resolve(candidate.orientation);
    let grid = normalize(&candidate.grid, resolved.orientation);

    let expected = (metadata.width, metadata.height);
    let actual = (grid.width(), grid.height());
    if expected != actual {
        return Err(VerifyError::dimension_mismatch(expected, actual));
    }

    Ok((grid, resolved.orientation, resolved.unknown_code))
}

/// One verification run. Holds no state beyond the record and settings it
/// was built with.
pub struct VerificationSession {
    record: FingerprintRecord,
    reference: Fingerprint,
    config: VerifierConfig,
}

impl VerificationSession {
    /// Validates the record up front; a malformed record never reaches
    /// sampling.
    pub fn new(record: FingerprintRecord, config: VerifierConfig) -> Result<Self, VerifyError> {
        let reference = record.fingerprint()?;
        Ok(Self {
            record,
            reference,
            config,
        })
    }

    pub fn from_json(json: &str, config: VerifierConfig) -> Result<Self, VerifyError> {
        Self::new(FingerprintRecord::from_json(json)?, config)
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.record.metadata
    }

    pub fn mode(&self) -> ComparisonMode {
        match self.reference {
            Fingerprint::Hashed(_) => ComparisonMode::ExactHash,
            Fingerprint::Sampled(_) => ComparisonMode::Tolerance,
        }
    }

    pub fn verify(&self, candidate: &CandidateImage) -> Result<VerificationReport, VerifyError> {
        let metadata = &self.record.metadata;
        log::info!(
            "verifying image {} ({}x{}, {:?})",
            metadata.image_id,
            metadata.width,
            metadata.height,
            self.mode()
        );

        let (grid, orientation, unknown_code) = canonicalize(candidate, metadata)?;

        let resampled = match &self.reference {
            Fingerprint::Hashed(_) => {
                let seed = metadata.image_id.seed()?;
                Fingerprint::Hashed(capture_hash_fingerprint(&grid, seed))
            }
            Fingerprint::Sampled(_) => Fingerprint::Sampled(capture_sampled_fingerprint(&grid)),
        };

        let comparator = Comparator::for_fingerprint(&self.reference, &self.config);
        let comparison = comparator.compare(&self.reference, &resampled)?;

        let mut warnings = Vec::new();
        if let Some(code) = unknown_code {
            warnings.push(ReportWarning::OrientationUnknown { code });
        }
        warnings.extend_from_slice(comparison.warnings());

        let score = comparison.score();
        let assessment = comparison.assessment();
        log::info!("image {}: {}% - {}", metadata.image_id, score, assessment.title);

        Ok(VerificationReport {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            image_id: metadata.image_id.clone(),
            width: metadata.width,
            height: metadata.height,
            record_hash: compute_record_hash(&self.record)?,
            mode: comparison.mode(),
            orientation,
            score,
            assessment,
            comparison,
            warnings,
        })
    }
}

/// Produce a record for an upright image on the capture side.
pub fn capture_record(
    grid: &PixelGrid,
    metadata: ImageMetadata,
    mode: ComparisonMode,
) -> Result<FingerprintRecord, VerifyError> {
    if (metadata.width, metadata.height) != (grid.width(), grid.height()) {
        return Err(VerifyError::dimension_mismatch(
            (metadata.width, metadata.height),
            (grid.width(), grid.height()),
        ));
    }
    let record = match mode {
        ComparisonMode::ExactHash => {
            let seed = metadata.image_id.seed()?;
            FingerprintRecord::hashed(metadata, capture_hash_fingerprint(grid, seed))
        }
        ComparisonMode::Tolerance => {
            FingerprintRecord::sampled(metadata, capture_sampled_fingerprint(grid))
        }
    };
    log::info!("captured {:?} fingerprint for image {}", mode, record.metadata.image_id);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Rgb;

    fn image(w: u32, h: u32) -> PixelGrid {
        PixelGrid::from_fn(w, h, |x, y| Rgb::new(x as u8, y as u8, (x * y) as u8)).unwrap()
    }

    #[test]
    fn test_dimension_mismatch_aborts() {
        let metadata = ImageMetadata::new(ImageId::Number(1), 40, 30);
        let candidate = CandidateImage { grid: image(41, 30), orientation: None };
        let err = canonicalize(&candidate, &metadata).unwrap_err();
        match err {
            VerifyError::DimensionMismatch { swapped, .. } => assert!(!swapped),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_swapped_dimensions_hint_rotation() {
        let metadata = ImageMetadata::new(ImageId::Number(1), 40, 30);
        let candidate = CandidateImage { grid: image(30, 40), orientation: Some(1) };
        let err = canonicalize(&candidate, &metadata).unwrap_err();
        assert!(err.to_string().contains("rotated"));
        assert!(err.to_string().contains("Expected 40x30, got 30x40"));
    }

    #[test]
    fn test_rotated_candidate_is_normalized() {
        let upright = image(40, 30);
        let metadata = ImageMetadata::new(ImageId::Number(1), 40, 30);
        // stored rotated 90 degrees counter-clockwise, tagged for a clockwise fix
        let stored = normalize(&upright, Orientation::Rotate270Cw);
        let candidate = CandidateImage { grid: stored, orientation: Some(6) };
        let (grid, orientation, unknown) = canonicalize(&candidate, &metadata).unwrap();
        assert_eq!(grid, upright);
        assert_eq!(orientation, Orientation::Rotate90Cw);
        assert_eq!(unknown, None);
    }

    #[test]
    fn test_unknown_orientation_recorded_in_report() {
        let grid = image(60, 40);
        let metadata = ImageMetadata::new(ImageId::Number(77), 60, 40);
        let record = capture_record(&grid, metadata, ComparisonMode::ExactHash).unwrap();
        let session = VerificationSession::new(record, VerifierConfig::default()).unwrap();
        let report = session
            .verify(&CandidateImage { grid, orientation: Some(2) })
            .unwrap();
        assert_eq!(report.score, 100.0);
        assert_eq!(report.orientation, Orientation::Upright);
        assert!(report.warnings.contains(&ReportWarning::OrientationUnknown { code: 2 }));
    }

    #[test]
    fn test_report_lists_each_warning_once() {
        let grid = image(60, 40);
        let metadata = ImageMetadata::new(ImageId::Number(77), 60, 40);
        let mut record = capture_record(&grid, metadata, ComparisonMode::ExactHash).unwrap();
        if let crate::record::StrandSet::Hashed(strands) = &mut record.strands {
            strands[0].y_position = strands[0].y_position.map(|y| y + 1);
        }
        let session = VerificationSession::new(record, VerifierConfig::default()).unwrap();
        let report = session
            .verify(&CandidateImage { grid, orientation: Some(2) })
            .unwrap();
        assert_eq!(report.warnings.len(), 2);

        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json.matches("geometry_mismatch").count(), 1);
        assert_eq!(json.matches("orientation_unknown").count(), 1);
    }

    #[test]
    fn test_capture_rejects_wrong_metadata() {
        let metadata = ImageMetadata::new(ImageId::Number(1), 10, 10);
        assert!(capture_record(&image(12, 10), metadata, ComparisonMode::Tolerance).is_err());
    }
}
