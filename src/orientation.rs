//! Orientation Normalizer
//!
//! Rotates a stored pixel grid into the upright grid the capture side
//! sampled. Only the four pure rotations are recognised; anything else is
//! treated as identity.

use image::imageops;
use serde::{Deserialize, Serialize};

use crate::grid::PixelGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Code 1
    Upright,
    /// Code 3
    Rotate180,
    /// Code 6
    Rotate90Cw,
    /// Code 8
    Rotate270Cw,
}

impl Orientation {
    /// Recognised codes only. `None` means the caller should fall back to
    /// identity and record the unknown code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Upright),
            3 => Some(Self::Rotate180),
            6 => Some(Self::Rotate90Cw),
            8 => Some(Self::Rotate270Cw),
            _ => None,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Upright => 1,
            Self::Rotate180 => 3,
            Self::Rotate90Cw => 6,
            Self::Rotate270Cw => 8,
        }
    }

    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Self::Rotate90Cw | Self::Rotate270Cw)
    }
}

/// Outcome of resolving an optional raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOrientation {
    pub orientation: Orientation,
    /// Set when a code was present but not recognised.
    pub unknown_code: Option<u16>,
}

pub fn resolve(code: Option<u16>) -> ResolvedOrientation {
    match code {
        None => ResolvedOrientation {
            orientation: Orientation::Upright,
            unknown_code: None,
        },
        Some(c) => match Orientation::from_code(c) {
            Some(orientation) => ResolvedOrientation {
                orientation,
                unknown_code: None,
            },
            None => {
                log::warn!("unrecognised orientation code {}, treating as upright", c);
                ResolvedOrientation {
                    orientation: Orientation::Upright,
                    unknown_code: Some(c),
                }
            }
        },
    }
}

/// Produce the canonical grid. Width and height swap for the 90/270 cases.
pub fn normalize(raw: &PixelGrid, orientation: Orientation) -> PixelGrid {
    let image = raw.as_image();
    match orientation {
        Orientation::Upright => raw.clone(),
        Orientation::Rotate180 => PixelGrid::wrap(imageops::rotate180(image)),
        Orientation::Rotate90Cw => PixelGrid::wrap(imageops::rotate90(image)),
        Orientation::Rotate270Cw => PixelGrid::wrap(imageops::rotate270(image)),
    }
}
