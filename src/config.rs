//! Comparator tunables
//!
//! Sampling geometry is deliberately absent here: proportions, draw order
//! and edge stride are part of the fingerprint format and cannot vary
//! between capture and verification.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pipeline::VerifyError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    /// Maximum per-channel difference for a pixel to count as matching.
    #[serde(default = "default_tolerance")]
    pub tolerance: u8,
    /// A strand matches only when its percentage is strictly above this.
    #[serde(default = "default_strand_match_threshold")]
    pub strand_match_threshold: f64,
    /// Pixel-count difference tolerated before flagging a dimension mismatch.
    #[serde(default = "default_length_slack")]
    pub length_slack: usize,
    #[serde(default = "default_max_sample_mismatches")]
    pub max_sample_mismatches: usize,
    /// Count strands whose declared position disagrees with the regenerated
    /// geometry as mismatches.
    #[serde(default = "default_true")]
    pub enforce_geometry: bool,
}

fn default_tolerance() -> u8 { 5 }
fn default_strand_match_threshold() -> f64 { 90.0 }
fn default_length_slack() -> usize { 10 }
fn default_max_sample_mismatches() -> usize { 5 }
fn default_true() -> bool { true }

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            strand_match_threshold: default_strand_match_threshold(),
            length_slack: default_length_slack(),
            max_sample_mismatches: default_max_sample_mismatches(),
            enforce_geometry: default_true(),
        }
    }
}

impl VerifierConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, VerifyError> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| VerifyError::Config(format!("{}: {}", path.display(), e)))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), VerifyError> {
        if !(0.0..=100.0).contains(&self.strand_match_threshold) {
            return Err(VerifyError::Config(format!(
                "strandMatchThreshold must be within 0..=100, got {}",
                self.strand_match_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = VerifierConfig::default();
        assert_eq!(c.tolerance, 5);
        assert_eq!(c.strand_match_threshold, 90.0);
        assert_eq!(c.length_slack, 10);
        assert_eq!(c.max_sample_mismatches, 5);
        assert!(c.enforce_geometry);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verifier.json");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, r#"{{"tolerance": 8, "enforceGeometry": false}}"#).unwrap();

        let c = VerifierConfig::load(&path).unwrap();
        assert_eq!(c.tolerance, 8);
        assert!(!c.enforce_geometry);
        assert_eq!(c.length_slack, 10);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let c = VerifierConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(c, VerifierConfig::default());
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"strandMatchThreshold": 150}"#).unwrap();
        let err = VerifierConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("strandMatchThreshold"));
    }
}
