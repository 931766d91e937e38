//! Authenticity banding
//!
//! Maps an aggregate score to a discrete verdict and the labels shown to the
//! user. Bands are advisory: they never alter the stored score.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Per-channel pixel difference within a tolerance
    Tolerance,
    /// Digest equality per sampled unit
    ExactHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Authentic,
    MinorModification,
    PartiallyModified,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub verdict: Verdict,
    pub title: String,
    pub subtitle: String,
}

impl Assessment {
    fn new(verdict: Verdict, title: &str, subtitle: &str) -> Self {
        Self {
            verdict,
            title: title.to_string(),
            subtitle: subtitle.to_string(),
        }
    }

    pub fn for_score(mode: ComparisonMode, score: f64) -> Self {
        match mode {
            ComparisonMode::Tolerance => Self::tolerance(score),
            ComparisonMode::ExactHash => Self::exact_hash(score),
        }
    }

    fn tolerance(score: f64) -> Self {
        if score >= 95.0 {
            Self::new(Verdict::Authentic, "Image Authentic", "Sampled pixels match within tolerance")
        } else if score >= 80.0 {
            Self::new(Verdict::MinorModification, "Image Modified", "Minor changes")
        } else {
            Self::new(Verdict::Failed, "Image Verification Failed", "Sampled pixels do not match")
        }
    }

    fn exact_hash(score: f64) -> Self {
        if score >= 100.0 {
            Self::new(Verdict::Authentic, "Authentic & Unmodified", "Perfect match")
        } else if score >= 70.0 {
            Self::new(Verdict::MinorModification, "Likely Authentic", "Minor discrepancies")
        } else if score >= 40.0 {
            Self::new(Verdict::PartiallyModified, "Partially Modified", "Altered or cropped")
        } else {
            Self::new(Verdict::Failed, "Verification Failed", "Does not match")
        }
    }
}
