//! Deterministic Number Generator
//!
//! A 48-bit linear congruential generator that reproduces the capture
//! device's sequence bit-for-bit. Both sides seed it with the image id and
//! draw the sampling geometry from it, so the geometry never has to be
//! transmitted.

const MULTIPLIER: u64 = 0x5DEECE66D;
const ADDEND: u64 = 0xB;
const MASK: u64 = (1 << 48) - 1;

/// Draws are 31-bit and normalised by 2^31 - 1, not 2^31.
const DRAW_SCALE: f64 = 0x7FFF_FFFF as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrandRng {
    state: u64,
}

impl StrandRng {
    pub fn new(seed: i64) -> Self {
        Self {
            state: (seed as u64 ^ MULTIPLIER) & MASK,
        }
    }

    /// Advance the state and return its top `bits` bits.
    fn next_bits(&mut self, bits: u32) -> u32 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(ADDEND) & MASK;
        (self.state >> (48 - bits)) as u32
    }

    /// Raw 31-bit draw.
    pub fn next_raw(&mut self) -> u32 {
        self.next_bits(31)
    }

    /// Draw in `[0, 1]`. The upper bound is reachable when the raw draw is
    /// `2^31 - 1`.
    pub fn next_draw(&mut self) -> f64 {
        self.next_raw() as f64 / DRAW_SCALE
    }
}
