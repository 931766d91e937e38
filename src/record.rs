//! Fingerprint records - the persisted/transmitted shape of a fingerprint
//!
//! A record carries the image metadata plus one of two strand sets:
//! - hash mode: six digested strands and the edge digests
//! - tolerance mode: named strands holding full pixel runs
//!
//! The two never mix within one record.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::geometry::StrandKind;
use crate::grid::Rgb;
use crate::hashing::{decode_rgb_hex, rgb_hex};
use crate::pipeline::VerifyError;

/// Image identifier; doubles as the generator seed in hash mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ImageId {
    Number(i64),
    Text(String),
}

/// JSON numbers may arrive in float notation (`1.7e12`); integral ones
/// are accepted as numeric ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawImageId {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for ImageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawImageId::deserialize(deserializer)
            .map_err(|_| <D::Error as de::Error>::custom("imageId must be an integer or a string"))?
        {
            RawImageId::Integer(n) => Ok(Self::Number(n)),
            RawImageId::Float(f)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                Ok(Self::Number(f as i64))
            }
            RawImageId::Float(f) => Err(de::Error::custom(format!(
                "imageId {} is not an integral number",
                f
            ))),
            RawImageId::Text(s) => Ok(Self::Text(s)),
        }
    }
}

impl ImageId {
    pub fn seed(&self) -> Result<i64, VerifyError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                VerifyError::MalformedRecord(format!(
                    "imageId {:?} is not an integer seed",
                    s
                ))
            }),
        }
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub image_id: ImageId,
    pub width: u32,
    pub height: u32,
    /// Free text; RFC 3339 when written by this crate, anything otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl ImageMetadata {
    pub fn new(image_id: ImageId, width: u32, height: u32) -> Self {
        Self {
            image_id,
            width,
            height,
            captured_at: None,
            captured_by: None,
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashedStrand {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: StrandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_count: Option<usize>,
    pub sha256: String,
}

impl HashedStrand {
    pub fn declares_position(&self) -> bool {
        self.y_position.is_some()
            || self.x_position.is_some()
            || self.start_x.is_some()
            || self.start_y.is_some()
            || self.pixel_count.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDigests {
    pub top_hash: String,
    pub bottom_hash: String,
    pub left_hash: String,
    pub right_hash: String,
    /// Digest over top + bottom + left + right pixel strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashFingerprint {
    pub strands: Vec<HashedStrand>,
    pub edges: EdgeDigests,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandPixel {
    pub x: u32,
    pub y: u32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// `#RRGGBB`; must agree with the channels when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
}

impl StrandPixel {
    pub fn new(x: u32, y: u32, rgb: Rgb) -> Self {
        Self {
            x,
            y,
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
            hex: Some(format!("#{}", rgb_hex(rgb))),
        }
    }

    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }

    fn check_hex(&self, strand_id: u32) -> Result<(), VerifyError> {
        let Some(hex) = &self.hex else {
            return Ok(());
        };
        if decode_rgb_hex(hex) == Some(self.rgb()) {
            Ok(())
        } else {
            Err(VerifyError::MalformedRecord(format!(
                "strand {} pixel ({}, {}) hex {} disagrees with rgb({}, {}, {})",
                strand_id, self.x, self.y, hex, self.r, self.g, self.b
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampledStrand {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_x: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_y: Option<u32>,
    pub pixels: Vec<StrandPixel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledFingerprint {
    pub strands: Vec<SampledStrand>,
}

/// Validated in-memory fingerprint; the comparator dispatches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    Hashed(HashFingerprint),
    Sampled(SampledFingerprint),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrandSet {
    Hashed(Vec<HashedStrand>),
    Sampled(Vec<SampledStrand>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    #[serde(flatten)]
    pub metadata: ImageMetadata,
    pub strands: StrandSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<EdgeDigests>,
}

impl FingerprintRecord {
    pub fn from_json(json: &str) -> Result<Self, VerifyError> {
        serde_json::from_str(json)
            .map_err(|e| VerifyError::MalformedRecord(format!("unparseable record: {}", e)))
    }

    pub fn hashed(metadata: ImageMetadata, fingerprint: HashFingerprint) -> Self {
        Self {
            metadata,
            strands: StrandSet::Hashed(fingerprint.strands),
            edges: Some(fingerprint.edges),
        }
    }

    pub fn sampled(metadata: ImageMetadata, fingerprint: SampledFingerprint) -> Self {
        Self {
            metadata,
            strands: StrandSet::Sampled(fingerprint.strands),
            edges: None,
        }
    }

    /// Check required fields and resolve which fingerprint shape this is.
    pub fn fingerprint(&self) -> Result<Fingerprint, VerifyError> {
        if self.metadata.width == 0 || self.metadata.height == 0 {
            return Err(VerifyError::MalformedRecord(format!(
                "dimensions must be positive, got {}x{}",
                self.metadata.width, self.metadata.height
            )));
        }

        match (&self.strands, &self.edges) {
            (StrandSet::Hashed(strands), Some(edges)) => {
                self.metadata.image_id.seed()?;
                for strand in strands {
                    check_digest(&format!("strand {}", strand.id), &strand.sha256)?;
                }
                check_digest("top edge", &edges.top_hash)?;
                check_digest("bottom edge", &edges.bottom_hash)?;
                check_digest("left edge", &edges.left_hash)?;
                check_digest("right edge", &edges.right_hash)?;
                if let Some(combined) = &edges.edge_hash {
                    check_digest("combined edge", combined)?;
                }
                Ok(Fingerprint::Hashed(HashFingerprint {
                    strands: strands.clone(),
                    edges: edges.clone(),
                }))
            }
            // An empty list deserialises as the first variant.
            (StrandSet::Hashed(strands), None) if strands.is_empty() => {
                Ok(Fingerprint::Sampled(SampledFingerprint { strands: vec![] }))
            }
            (StrandSet::Hashed(_), None) => Err(VerifyError::MalformedRecord(
                "hash-mode record is missing edge digests".to_string(),
            )),
            (StrandSet::Sampled(strands), None) => {
                for strand in strands {
                    for pixel in &strand.pixels {
                        pixel.check_hex(strand.id)?;
                    }
                }
                Ok(Fingerprint::Sampled(SampledFingerprint {
                    strands: strands.clone(),
                }))
            }
            (StrandSet::Sampled(_), Some(_)) => Err(VerifyError::MalformedRecord(
                "record mixes pixel strands with edge digests".to_string(),
            )),
        }
    }
}

fn check_digest(what: &str, digest: &str) -> Result<(), VerifyError> {
    if digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(VerifyError::MalformedRecord(format!(
            "{} digest is not a SHA-256 hex string",
            what
        )))
    }
}
