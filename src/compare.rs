//! Fingerprint Comparator - two scoring strategies behind one interface
//!
//! Strategies produce structured per-unit results and warnings.
//! [`Comparator`] picks the strategy from the fingerprint shape.

use serde::{Deserialize, Serialize};

use crate::config::VerifierConfig;
use crate::geometry::{StrandKind, SEEDED_STRAND_IDS};
use crate::grid::Rgb;
use crate::hashing::digests_match;
use crate::pipeline::VerifyError;
use crate::record::{Fingerprint, HashFingerprint, HashedStrand, SampledStrand};
use crate::verdict::{Assessment, ComparisonMode};

/// Strand count each mode expects a complete record to carry.
pub const EXPECTED_HASHED_STRANDS: usize = 6;
pub const EXPECTED_SAMPLED_STRANDS: usize = 3;

/// Recoverable conditions noticed while verifying. None of these stop a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportWarning {
    /// Unrecognised orientation code; the image was treated as upright.
    OrientationUnknown { code: u16 },
    /// Fewer strand records than the mode expects. Missing strands count as
    /// mismatches.
    IncompleteStrand { expected: usize, found: usize },
    /// A record's declared position disagrees with regenerated geometry.
    GeometryMismatch { id: u32 },
    /// A record whose id has no counterpart in the regenerated geometry.
    UnknownStrand { id: u32 },
}

/// Interface every comparison policy implements.
pub trait ComparisonStrategy {
    type Reference: ?Sized;
    type Candidate: ?Sized;

    fn mode(&self) -> ComparisonMode;
    fn compare(&self, reference: &Self::Reference, candidate: &Self::Candidate) -> Comparison;
}

/// Result of either strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Comparison {
    Tolerance(ToleranceComparison),
    ExactHash(HashComparison),
}

impl Comparison {
    pub fn mode(&self) -> ComparisonMode {
        match self {
            Self::Tolerance(_) => ComparisonMode::Tolerance,
            Self::ExactHash(_) => ComparisonMode::ExactHash,
        }
    }

    /// Aggregate score in `[0, 100]`.
    pub fn score(&self) -> f64 {
        match self {
            Self::Tolerance(t) => t.match_percentage,
            Self::ExactHash(h) => h.score,
        }
    }

    pub fn assessment(&self) -> Assessment {
        Assessment::for_score(self.mode(), self.score())
    }

    pub fn warnings(&self) -> &[ReportWarning] {
        match self {
            Self::Tolerance(t) => &t.warnings,
            Self::ExactHash(h) => &h.warnings,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// --- Tolerance policy ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDelta {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ChannelDelta {
    pub fn between(a: Rgb, b: Rgb) -> Self {
        Self {
            r: a.r.abs_diff(b.r),
            g: a.g.abs_diff(b.g),
            b: a.b.abs_diff(b.b),
        }
    }

    pub fn within(&self, tolerance: u8) -> bool {
        self.r <= tolerance && self.g <= tolerance && self.b <= tolerance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleMismatch {
    /// Index within the strand.
    pub position: usize,
    pub x: u32,
    pub y: u32,
    pub original: Rgb,
    pub extracted: Rgb,
    pub diff: ChannelDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToleranceStrandResult {
    pub id: u32,
    pub name: String,
    /// Whether the reference record carried this strand.
    pub present: bool,
    /// Reference pixel count; the percentage denominator.
    pub total_pixels: usize,
    pub compared_pixels: usize,
    pub matching_pixels: usize,
    pub mismatching_pixels: usize,
    pub match_percentage: f64,
    pub is_match: bool,
    pub geometry: GeometryCheck,
    pub sample_mismatches: Vec<SampleMismatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToleranceComparison {
    pub strands: Vec<ToleranceStrandResult>,
    pub matching_pixels: usize,
    pub total_pixels: usize,
    pub match_percentage: f64,
    /// Every strand individually matched.
    pub overall_match: bool,
    /// False when any strand pair's lengths differ by more than the slack.
    pub dimension_match: bool,
    /// Carried into the report's top-level warnings, not serialized here.
    #[serde(skip)]
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug, Clone)]
pub struct ToleranceStrategy {
    pub tolerance: u8,
    pub strand_match_threshold: f64,
    pub length_slack: usize,
    pub max_sample_mismatches: usize,
    pub enforce_geometry: bool,
}

impl ToleranceStrategy {
    pub fn new(config: &VerifierConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            strand_match_threshold: config.strand_match_threshold,
            length_slack: config.length_slack,
            max_sample_mismatches: config.max_sample_mismatches,
            enforce_geometry: config.enforce_geometry,
        }
    }

    fn compare_pair(&self, original: &SampledStrand, extracted: &SampledStrand) -> ToleranceStrandResult {
        let compared = original.pixels.len().min(extracted.pixels.len());
        let mut matching = 0;
        let mut samples = Vec::new();

        for (position, (orig, extr)) in original.pixels.iter().zip(&extracted.pixels).enumerate() {
            let diff = ChannelDelta::between(orig.rgb(), extr.rgb());
            if diff.within(self.tolerance) {
                matching += 1;
            } else if samples.len() < self.max_sample_mismatches {
                samples.push(SampleMismatch {
                    position,
                    x: extr.x,
                    y: extr.y,
                    original: orig.rgb(),
                    extracted: extr.rgb(),
                    diff,
                });
            }
        }

        let total = original.pixels.len();
        let match_percentage = if total > 0 {
            round2(matching as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        let geometry = check_span_geometry(original, extracted);
        if geometry == GeometryCheck::Mismatch && self.enforce_geometry {
            // under enforcement a relocated strand scores zero
            return ToleranceStrandResult {
                id: original.id,
                name: strand_name(extracted),
                present: true,
                total_pixels: total,
                compared_pixels: compared,
                matching_pixels: 0,
                mismatching_pixels: compared,
                match_percentage: 0.0,
                is_match: false,
                geometry,
                sample_mismatches: samples,
            };
        }

        ToleranceStrandResult {
            id: original.id,
            name: strand_name(extracted),
            present: true,
            total_pixels: total,
            compared_pixels: compared,
            matching_pixels: matching,
            mismatching_pixels: compared - matching,
            match_percentage,
            is_match: match_percentage > self.strand_match_threshold,
            geometry,
            sample_mismatches: samples,
        }
    }
}

/// The record's declared column, start row and per-pixel coordinates must
/// equal those of the span resampled at the same index.
fn check_span_geometry(declared: &SampledStrand, expected: &SampledStrand) -> GeometryCheck {
    fn agrees(declared: Option<u32>, expected: Option<u32>) -> bool {
        declared.is_none() || declared == expected
    }

    let fields_agree = agrees(declared.x_position, expected.x_position)
        && agrees(declared.start_x, expected.start_x)
        && agrees(declared.start_y, expected.start_y);
    let pixels_agree = declared
        .pixels
        .iter()
        .zip(&expected.pixels)
        .all(|(d, e)| (d.x, d.y) == (e.x, e.y));

    if !(fields_agree && pixels_agree) {
        GeometryCheck::Mismatch
    } else if declared.x_position.is_none()
        && declared.start_x.is_none()
        && declared.start_y.is_none()
        && declared.pixels.is_empty()
    {
        GeometryCheck::Undeclared
    } else {
        GeometryCheck::Verified
    }
}

fn strand_name(strand: &SampledStrand) -> String {
    strand
        .name
        .clone()
        .unwrap_or_else(|| format!("Strand {}", strand.id))
}

impl ComparisonStrategy for ToleranceStrategy {
    type Reference = [SampledStrand];
    type Candidate = [SampledStrand];

    fn mode(&self) -> ComparisonMode {
        ComparisonMode::Tolerance
    }

    /// Pairs strands by position. Reference strands beyond the candidate's
    /// are ignored; candidate strands without a reference count their whole
    /// length as unmatched.
    fn compare(&self, reference: &[SampledStrand], candidate: &[SampledStrand]) -> Comparison {
        let mut warnings = Vec::new();
        let mut strands = Vec::with_capacity(candidate.len());
        let mut matching_pixels = 0;
        let mut total_pixels = 0;
        let mut dimension_match = true;

        if reference.len() < EXPECTED_SAMPLED_STRANDS {
            log::warn!(
                "record carries {} of {} pixel strands",
                reference.len(),
                EXPECTED_SAMPLED_STRANDS
            );
            warnings.push(ReportWarning::IncompleteStrand {
                expected: EXPECTED_SAMPLED_STRANDS,
                found: reference.len(),
            });
        }

        for (i, extracted) in candidate.iter().enumerate() {
            let Some(original) = reference.get(i) else {
                total_pixels += extracted.pixels.len();
                strands.push(ToleranceStrandResult {
                    id: extracted.id,
                    name: strand_name(extracted),
                    present: false,
                    total_pixels: extracted.pixels.len(),
                    compared_pixels: 0,
                    matching_pixels: 0,
                    mismatching_pixels: extracted.pixels.len(),
                    match_percentage: 0.0,
                    is_match: false,
                    geometry: GeometryCheck::Undeclared,
                    sample_mismatches: vec![],
                });
                continue;
            };

            if original.pixels.len().abs_diff(extracted.pixels.len()) > self.length_slack {
                log::warn!(
                    "strand {} length {} vs extracted {}",
                    original.id,
                    original.pixels.len(),
                    extracted.pixels.len()
                );
                dimension_match = false;
            }

            let result = self.compare_pair(original, extracted);
            if result.geometry == GeometryCheck::Mismatch {
                log::warn!(
                    "pixel strand {} declares a position that does not match its regenerated span",
                    original.id
                );
                warnings.push(ReportWarning::GeometryMismatch { id: original.id });
            }
            log::debug!("strand {} ({}): {:.2}%", result.id, result.name, result.match_percentage);
            matching_pixels += result.matching_pixels;
            total_pixels += result.compared_pixels;
            strands.push(result);
        }

        for extra in reference.iter().skip(candidate.len()) {
            log::warn!("ignoring pixel strand {} with no sampled counterpart", extra.id);
            warnings.push(ReportWarning::UnknownStrand { id: extra.id });
        }

        let match_percentage = if total_pixels > 0 {
            round2(matching_pixels as f64 / total_pixels as f64 * 100.0)
        } else {
            0.0
        };

        Comparison::Tolerance(ToleranceComparison {
            overall_match: strands.iter().all(|s| s.is_match),
            strands,
            matching_pixels,
            total_pixels,
            match_percentage,
            dimension_match,
            warnings,
        })
    }
}

// --- Exact-hash policy ---

/// Outcome of checking a record's declared position against regenerated
/// geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryCheck {
    Verified,
    /// The record declared no position fields.
    Undeclared,
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashStrandResult {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: StrandKind,
    pub present: bool,
    pub digest_match: bool,
    pub geometry: GeometryCheck,
    /// Counted towards the score.
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeResults {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
    /// Informational only; not part of the score.
    pub combined: Option<bool>,
}

impl EdgeResults {
    pub fn matched(&self) -> usize {
        [self.top, self.bottom, self.left, self.right]
            .iter()
            .filter(|&&m| m)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCount {
    pub matched: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub horizontal: MatchCount,
    pub vertical: MatchCount,
    pub diagonal: MatchCount,
    pub edges: MatchCount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashComparison {
    pub strands: Vec<HashStrandResult>,
    pub edges: EdgeResults,
    pub summary: CategorySummary,
    pub matched_checks: usize,
    pub total_checks: usize,
    /// Rounded to the nearest integer.
    pub score: f64,
    /// Carried into the report's top-level warnings, not serialized here.
    #[serde(skip)]
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug, Clone)]
pub struct ExactHashStrategy {
    pub enforce_geometry: bool,
}

impl ExactHashStrategy {
    pub fn new(config: &VerifierConfig) -> Self {
        Self {
            enforce_geometry: config.enforce_geometry,
        }
    }
}

/// Every position field the record declares must equal the regenerated one.
fn check_geometry(declared: &HashedStrand, expected: &HashedStrand) -> GeometryCheck {
    if !declared.declares_position() {
        return if declared.kind == expected.kind {
            GeometryCheck::Undeclared
        } else {
            GeometryCheck::Mismatch
        };
    }

    fn agrees<T: PartialEq>(declared: Option<T>, expected: Option<T>) -> bool {
        declared.is_none() || declared == expected
    }

    let consistent = declared.kind == expected.kind
        && agrees(declared.y_position, expected.y_position)
        && agrees(declared.x_position, expected.x_position)
        && agrees(declared.start_x, expected.start_x)
        && agrees(declared.start_y, expected.start_y)
        && agrees(declared.pixel_count, expected.pixel_count);

    if consistent {
        GeometryCheck::Verified
    } else {
        GeometryCheck::Mismatch
    }
}

fn count_kind(results: &[HashStrandResult], pred: impl Fn(StrandKind) -> bool) -> MatchCount {
    let of_kind: Vec<_> = results.iter().filter(|r| pred(r.kind)).collect();
    MatchCount {
        matched: of_kind.iter().filter(|r| r.matched).count(),
        total: of_kind.len(),
    }
}

impl ComparisonStrategy for ExactHashStrategy {
    type Reference = HashFingerprint;
    type Candidate = HashFingerprint;

    fn mode(&self) -> ComparisonMode {
        ComparisonMode::ExactHash
    }

    /// `candidate` is the freshly resampled fingerprint; its strand list
    /// defines the checks. Reference strands are looked up by id.
    fn compare(&self, reference: &HashFingerprint, candidate: &HashFingerprint) -> Comparison {
        let mut warnings = Vec::new();
        let mut strands = Vec::with_capacity(candidate.strands.len());

        for extracted in &candidate.strands {
            let Some(original) = reference.strands.iter().find(|s| s.id == extracted.id) else {
                log::warn!("strand {} missing from record", extracted.id);
                strands.push(HashStrandResult {
                    id: extracted.id,
                    kind: extracted.kind,
                    present: false,
                    digest_match: false,
                    geometry: GeometryCheck::Undeclared,
                    matched: false,
                });
                continue;
            };

            let digest_match = digests_match(&original.sha256, &extracted.sha256);
            let geometry = check_geometry(original, extracted);
            if geometry == GeometryCheck::Mismatch {
                log::warn!(
                    "strand {} declares geometry that does not match its regenerated position",
                    extracted.id
                );
                warnings.push(ReportWarning::GeometryMismatch { id: extracted.id });
            }
            let matched = digest_match && !(self.enforce_geometry && geometry == GeometryCheck::Mismatch);
            log::debug!(
                "strand {} ({:?}): {}",
                extracted.id,
                extracted.kind,
                if matched { "match" } else { "mismatch" }
            );

            strands.push(HashStrandResult {
                id: extracted.id,
                kind: extracted.kind,
                present: true,
                digest_match,
                geometry,
                matched,
            });
        }

        let present = strands.iter().filter(|s| s.present).count();
        if present < EXPECTED_HASHED_STRANDS {
            warnings.push(ReportWarning::IncompleteStrand {
                expected: EXPECTED_HASHED_STRANDS,
                found: present,
            });
        }
        for original in &reference.strands {
            if !SEEDED_STRAND_IDS.contains(&original.id) {
                log::warn!("ignoring strand {} with no regenerable geometry", original.id);
                warnings.push(ReportWarning::UnknownStrand { id: original.id });
            }
        }

        let (re, ce) = (&reference.edges, &candidate.edges);
        let edges = EdgeResults {
            top: digests_match(&re.top_hash, &ce.top_hash),
            bottom: digests_match(&re.bottom_hash, &ce.bottom_hash),
            left: digests_match(&re.left_hash, &ce.left_hash),
            right: digests_match(&re.right_hash, &ce.right_hash),
            combined: match (&re.edge_hash, &ce.edge_hash) {
                (Some(a), Some(b)) => Some(digests_match(a, b)),
                _ => None,
            },
        };

        let matched_checks = strands.iter().filter(|s| s.matched).count() + edges.matched();
        let total_checks = strands.len() + 4;
        let score = (matched_checks as f64 / total_checks as f64 * 100.0).round();

        let summary = CategorySummary {
            horizontal: count_kind(&strands, |k| k == StrandKind::Horizontal),
            vertical: count_kind(&strands, |k| k == StrandKind::Vertical),
            diagonal: count_kind(&strands, |k| k.is_diagonal()),
            edges: MatchCount {
                matched: edges.matched(),
                total: 4,
            },
        };

        log::info!("hash comparison: {}/{} checks ({}%)", matched_checks, total_checks, score);

        Comparison::ExactHash(HashComparison {
            strands,
            edges,
            summary,
            matched_checks,
            total_checks,
            score,
            warnings,
        })
    }
}

/// Strategy selected by the shape of the reference fingerprint.
#[derive(Debug, Clone)]
pub enum Comparator {
    Tolerance(ToleranceStrategy),
    ExactHash(ExactHashStrategy),
}

impl Comparator {
    pub fn for_fingerprint(reference: &Fingerprint, config: &VerifierConfig) -> Self {
        match reference {
            Fingerprint::Hashed(_) => Self::ExactHash(ExactHashStrategy::new(config)),
            Fingerprint::Sampled(_) => Self::Tolerance(ToleranceStrategy::new(config)),
        }
    }

    pub fn mode(&self) -> ComparisonMode {
        match self {
            Self::Tolerance(s) => s.mode(),
            Self::ExactHash(s) => s.mode(),
        }
    }

    pub fn compare(&self, reference: &Fingerprint, candidate: &Fingerprint) -> Result<Comparison, VerifyError> {
        match (self, reference, candidate) {
            (Self::Tolerance(s), Fingerprint::Sampled(r), Fingerprint::Sampled(c)) => {
                Ok(s.compare(&r.strands, &c.strands))
            }
            (Self::ExactHash(s), Fingerprint::Hashed(r), Fingerprint::Hashed(c)) => Ok(s.compare(r, c)),
            _ => Err(VerifyError::MalformedRecord(format!(
                "{:?} comparison needs reference and candidate of the same shape",
                self.mode()
            ))),
        }
    }
}
