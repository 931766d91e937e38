//! Fingerprint Encoder - hex pixel strings and SHA-256 digests
//!
//! Each RGB triple becomes six uppercase hex characters; a strand's pixel
//! string is those characters concatenated in sample order with no
//! separators, and its digest is the lowercase hex SHA-256 of that string.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::grid::Rgb;

/// Compute SHA-256 hash of bytes, return lowercase hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// `RGB(10, 255, 0)` -> `"0AFF00"`
pub fn rgb_hex(rgb: Rgb) -> String {
    hex::encode_upper(rgb.channels())
}

/// Inverse of [`rgb_hex`]. Accepts an optional leading `#` and either case.
pub fn decode_rgb_hex(s: &str) -> Option<Rgb> {
    let s = s.strip_prefix('#').unwrap_or(s);
    if s.len() != 6 {
        return None;
    }
    let mut bytes = [0u8; 3];
    hex::decode_to_slice(s, &mut bytes).ok()?;
    Some(Rgb::new(bytes[0], bytes[1], bytes[2]))
}

pub fn pixel_string<I>(pixels: I) -> String
where
    I: IntoIterator<Item = Rgb>,
{
    let iter = pixels.into_iter();
    let mut out = String::with_capacity(iter.size_hint().0 * 6);
    for rgb in iter {
        out.push_str(&rgb_hex(rgb));
    }
    out
}

/// Digest of an ordered pixel sequence.
pub fn digest_pixels<I>(pixels: I) -> String
where
    I: IntoIterator<Item = Rgb>,
{
    sha256_hex(pixel_string(pixels).as_bytes())
}

/// Digests compare case-insensitively; capture devices differ on hex case.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Stable hash of a fingerprint record, used to tie a report to the exact
/// record it was checked against.
pub fn compute_record_hash<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(record)?;
    Ok(sha256_hex(canonical.as_bytes()))
}
