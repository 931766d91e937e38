//! PixelStrand CLI - capture and verify fingerprints
//!
//! Commands: capture, verify, plan
//! Outputs JSON to stdout, logs to stderr
//! Exit codes: 0 authentic, 2 not authentic, 1 precondition failure

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pixelstrand_core::{
    capture_record, orientation, plan_fixed, plan_seeded, CandidateImage, ComparisonMode,
    ImageId, ImageMetadata, PixelGrid, VerificationSession, VerifierConfig, VerifyError,
};

#[derive(Parser)]
#[command(name = "pixelstrand-cli")]
#[command(about = "PixelStrand CLI - image authenticity from sampled pixel strands")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to comparator settings (JSON); defaults apply when absent
    #[arg(short, long, default_value = "pixelstrand.json")]
    config: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Hash,
    Tolerance,
}

impl From<Mode> for ComparisonMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Hash => ComparisonMode::ExactHash,
            Mode::Tolerance => ComparisonMode::Tolerance,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a fingerprint record from an image
    Capture {
        /// Image file (PNG or JPEG)
        #[arg(short, long)]
        image: PathBuf,

        /// Image id; an integer seeds hash-mode geometry
        #[arg(long)]
        image_id: String,

        #[arg(short, long, value_enum, default_value = "hash")]
        mode: Mode,

        /// Orientation code of the stored image (1, 3, 6, 8)
        #[arg(short, long)]
        orientation: Option<u16>,

        #[arg(long)]
        captured_by: Option<String>,
    },

    /// Verify an image against a fingerprint record
    Verify {
        /// Image file (PNG or JPEG)
        #[arg(short, long)]
        image: PathBuf,

        /// Fingerprint record (JSON)
        #[arg(short, long)]
        record: PathBuf,

        /// Orientation code of the stored image (1, 3, 6, 8)
        #[arg(short, long)]
        orientation: Option<u16>,
    },

    /// Print the sampling geometry regenerated for an image
    Plan {
        #[arg(long, allow_hyphen_values = true)]
        image_id: i64,

        #[arg(long)]
        width: u32,

        #[arg(long)]
        height: u32,
    },
}

fn load_grid(path: &Path) -> Result<PixelGrid, VerifyError> {
    let decoded = image::open(path)
        .map_err(|e| VerifyError::InvalidImage(format!("{}: {}", path.display(), e)))?
        .to_rgb8();
    PixelGrid::from_image(decoded)
}

fn parse_image_id(raw: &str) -> ImageId {
    raw.parse::<i64>()
        .map(ImageId::Number)
        .unwrap_or_else(|_| ImageId::Text(raw.to_string()))
}

fn emit<T: Serialize>(value: &T) -> Result<(), VerifyError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode, VerifyError> {
    let config = VerifierConfig::load(&cli.config)?;

    match cli.command {
        Commands::Capture {
            image,
            image_id,
            mode,
            orientation: code,
            captured_by,
        } => {
            let stored = load_grid(&image)?;
            let upright = orientation::normalize(&stored, orientation::resolve(code).orientation);
            let mut metadata =
                ImageMetadata::new(parse_image_id(&image_id), upright.width(), upright.height());
            metadata.captured_at = Some(chrono::Utc::now().to_rfc3339());
            metadata.captured_by = captured_by;
            metadata.file_name = image.file_name().map(|n| n.to_string_lossy().into_owned());

            let record = capture_record(&upright, metadata, mode.into())?;
            emit(&record)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Verify {
            image,
            record,
            orientation,
        } => {
            let json = fs::read_to_string(&record)?;
            let session = VerificationSession::from_json(&json, config)?;
            if let Some(name) = &session.metadata().file_name {
                log::info!("record captured from {}", name);
            }
            let candidate = CandidateImage {
                grid: load_grid(&image)?,
                orientation,
            };
            let report = session.verify(&candidate)?;
            emit(&report)?;
            if report.is_authentic() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(2))
            }
        }

        Commands::Plan {
            image_id,
            width,
            height,
        } => {
            if width == 0 || height == 0 {
                return Err(VerifyError::MalformedRecord(
                    "width and height must be positive".to_string(),
                ));
            }
            let output = serde_json::json!({
                "seeded": plan_seeded(image_id, width, height),
                "fixed": plan_fixed(width, height),
            });
            emit(&output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            let output = serde_json::json!({
                "success": false,
                "error": e.to_string(),
            });
            println!("{}", output);
            ExitCode::FAILURE
        }
    }
}
