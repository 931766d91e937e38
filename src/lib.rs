//! PixelStrand Core - image authenticity from sampled pixel strands
//!
//! # Guarantees
//! 1. Geometry is a pure function of (image id, width, height, mode)
//! 2. Every run reseeds the generator; nothing carries across runs
//! 3. Dimensions are checked before any sampling
//! 4. Hash mode and tolerance mode are scored separately, never blended

pub mod rng;
pub mod geometry;
pub mod grid;
pub mod orientation;
pub mod extract;
pub mod hashing;
pub mod record;
pub mod capture;
pub mod compare;
pub mod verdict;
pub mod config;
pub mod pipeline;

pub use rng::StrandRng;
pub use geometry::{plan_fixed, plan_seeded, SampleSpec, SeededPlan, StrandKind};
pub use grid::{PixelGrid, Rgb};
pub use orientation::Orientation;
pub use extract::{extract, PixelSample};
pub use hashing::{digest_pixels, digests_match, rgb_hex};
pub use record::{Fingerprint, FingerprintRecord, ImageId, ImageMetadata};
pub use compare::{Comparator, Comparison, ExactHashStrategy, ToleranceStrategy};
pub use verdict::{Assessment, ComparisonMode, Verdict};
pub use config::VerifierConfig;
pub use pipeline::{capture_record, CandidateImage, VerificationReport, VerificationSession, VerifyError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
