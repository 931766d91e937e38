//! Pixel Extractor - reads RGB runs described by a [`SampleSpec`]

use serde::{Deserialize, Serialize};

use crate::geometry::{EdgeSide, SampleSpec, EDGE_STRIDE};
use crate::grid::{PixelGrid, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledPixel {
    pub x: u32,
    pub y: u32,
    pub rgb: Rgb,
}

/// Pixels read along one spec, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSample {
    pub spec: SampleSpec,
    pub pixels: Vec<SampledPixel>,
}

impl PixelSample {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn colors(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.pixels.iter().map(|p| p.rgb)
    }
}

/// Read the pixels `spec` describes.
///
/// # Panics
/// Rows and columns outside the grid are a planner bug and panic. Diagonal
/// walks stop at the first out-of-bounds step instead.
pub fn extract(grid: &PixelGrid, spec: &SampleSpec) -> PixelSample {
    let (w, h) = (grid.width(), grid.height());
    let at = |x: u32, y: u32| SampledPixel { x, y, rgb: grid.pixel(x, y) };

    let pixels = match *spec {
        SampleSpec::Horizontal { row } => (0..w).map(|x| at(x, row)).collect(),
        SampleSpec::Vertical { col } => (0..h).map(|y| at(col, y)).collect(),
        SampleSpec::ColumnSpan { col, start_row, length } => {
            let end = start_row.saturating_add(length).min(h);
            (start_row..end).map(|y| at(col, y)).collect()
        }
        SampleSpec::Diagonal { start_x, start_y, direction } => {
            let mut out = Vec::new();
            let (mut x, mut y) = (start_x, start_y);
            while x >= 0 && x < w as i64 && y >= 0 && y < h as i64 {
                out.push(at(x as u32, y as u32));
                x += direction.step_x();
                y += 1;
            }
            out
        }
        SampleSpec::EdgeBand { side } => match side {
            EdgeSide::Top => strided(w).map(|x| at(x, 0)).collect(),
            EdgeSide::Bottom => strided(w).map(|x| at(x, h - 1)).collect(),
            EdgeSide::Left => strided(h).map(|y| at(0, y)).collect(),
            EdgeSide::Right => strided(h).map(|y| at(w - 1, y)).collect(),
        },
    };

    PixelSample { spec: *spec, pixels }
}

fn strided(limit: u32) -> impl Iterator<Item = u32> {
    (0..limit).step_by(EDGE_STRIDE as usize)
}
