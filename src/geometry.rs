//! Sampling Geometry Planner
//!
//! Two policies:
//! - seeded: six strands drawn from [`StrandRng`] seeded by the image id
//!   (hash mode), plus fixed-stride edge bands
//! - fixed-proportion: three column spans at 15% / 50% / 80% of the width
//!   (tolerance mode), independent of any seed
//!
//! The draw order in [`plan_seeded`] is part of the fingerprint format.
//! Reordering it produces different geometry than the capture side.

use serde::{Deserialize, Serialize};

use crate::rng::StrandRng;

/// Edge bands sample every 50th pixel along each border.
pub const EDGE_STRIDE: u32 = 50;

/// Strand ids in hash mode, in capture order.
pub const SEEDED_STRAND_IDS: [u32; 6] = [1, 2, 3, 4, 5, 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrandKind {
    Horizontal,
    Vertical,
    DiagonalTlBr,
    DiagonalTrBl,
}

impl StrandKind {
    pub fn is_diagonal(&self) -> bool {
        matches!(self, Self::DiagonalTlBr | Self::DiagonalTrBl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagonalDirection {
    TopLeftToBottomRight,
    TopRightToBottomLeft,
}

impl DiagonalDirection {
    pub fn step_x(&self) -> i64 {
        match self {
            Self::TopLeftToBottomRight => 1,
            Self::TopRightToBottomLeft => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl EdgeSide {
    /// Concatenation order for the combined edge digest.
    pub const ALL: [EdgeSide; 4] = [Self::Top, Self::Bottom, Self::Left, Self::Right];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleSpec {
    Horizontal {
        row: u32,
    },
    Vertical {
        col: u32,
    },
    /// A vertical run of `length` pixels starting at `start_row`.
    ColumnSpan {
        col: u32,
        start_row: u32,
        length: u32,
    },
    /// Diagonal start may lie outside the image for degenerate sizes; the
    /// walk then yields no pixels.
    Diagonal {
        start_x: i64,
        start_y: i64,
        direction: DiagonalDirection,
    },
    EdgeBand {
        side: EdgeSide,
    },
}

/// A seeded strand: its id, kind and where it samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStrand {
    pub id: u32,
    pub kind: StrandKind,
    pub spec: SampleSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeededPlan {
    pub width: u32,
    pub height: u32,
    pub strands: Vec<PlannedStrand>,
    pub edges: Vec<SampleSpec>,
}

impl SeededPlan {
    pub fn strand(&self, id: u32) -> Option<&PlannedStrand> {
        self.strands.iter().find(|s| s.id == id)
    }
}

fn floor_u32(v: f64) -> u32 {
    v.floor() as u32
}

/// Regenerate hash-mode geometry. Pure in `(seed, width, height)`; every call
/// starts a fresh generator.
pub fn plan_seeded(seed: i64, width: u32, height: u32) -> SeededPlan {
    let mut rng = StrandRng::new(seed);
    let w = width as f64;
    let h = height as f64;

    let row1 = floor_u32(rng.next_draw() * (h / 3.0));
    let row2 = floor_u32(h / 2.0 + rng.next_draw() * (h / 3.0));
    let col1 = floor_u32(rng.next_draw() * (w / 3.0));
    let col2 = floor_u32(w / 2.0 + rng.next_draw() * (w / 3.0));

    let d1_x = (rng.next_draw() * (w / 4.0)).floor() as i64;
    let d1_y = (rng.next_draw() * (h / 4.0)).floor() as i64;
    let d2_x = (w - rng.next_draw() * (w / 4.0) - 1.0).floor() as i64;
    let d2_y = (rng.next_draw() * (h / 4.0)).floor() as i64;

    log::debug!(
        "seeded plan {}x{} seed {}: rows {} {}, cols {} {}, diagonals ({},{}) ({},{})",
        width, height, seed, row1, row2, col1, col2, d1_x, d1_y, d2_x, d2_y
    );

    let strands = vec![
        PlannedStrand {
            id: 1,
            kind: StrandKind::Horizontal,
            spec: SampleSpec::Horizontal { row: row1 },
        },
        PlannedStrand {
            id: 2,
            kind: StrandKind::Horizontal,
            spec: SampleSpec::Horizontal { row: row2 },
        },
        PlannedStrand {
            id: 3,
            kind: StrandKind::Vertical,
            spec: SampleSpec::Vertical { col: col1 },
        },
        PlannedStrand {
            id: 4,
            kind: StrandKind::Vertical,
            spec: SampleSpec::Vertical { col: col2 },
        },
        PlannedStrand {
            id: 5,
            kind: StrandKind::DiagonalTlBr,
            spec: SampleSpec::Diagonal {
                start_x: d1_x,
                start_y: d1_y,
                direction: DiagonalDirection::TopLeftToBottomRight,
            },
        },
        PlannedStrand {
            id: 6,
            kind: StrandKind::DiagonalTrBl,
            spec: SampleSpec::Diagonal {
                start_x: d2_x,
                start_y: d2_y,
                direction: DiagonalDirection::TopRightToBottomLeft,
            },
        },
    ];

    SeededPlan {
        width,
        height,
        strands,
        edges: EdgeSide::ALL
            .iter()
            .map(|&side| SampleSpec::EdgeBand { side })
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanName {
    Bottom,
    Middle,
    Top,
}

impl SpanName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bottom => "Bottom",
            Self::Middle => "Middle",
            Self::Top => "Top",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSpan {
    pub id: u32,
    pub name: SpanName,
    pub spec: SampleSpec,
}

/// Tolerance-mode geometry: three column spans, each one third of the height.
pub fn plan_fixed(width: u32, height: u32) -> [PlannedSpan; 3] {
    let w = width as f64;
    let span = height / 3;

    let layout = [
        (1, SpanName::Bottom, floor_u32(w * 0.15), height - span),
        (2, SpanName::Middle, floor_u32(w * 0.50), (height - span) / 2),
        (3, SpanName::Top, floor_u32(w * 0.80), 0),
    ];

    layout.map(|(id, name, col, start_row)| PlannedSpan {
        id,
        name,
        spec: SampleSpec::ColumnSpan {
            col,
            start_row,
            length: span,
        },
    })
}
