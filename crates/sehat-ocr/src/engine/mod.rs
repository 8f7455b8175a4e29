use anyhow::Result;
use async_trait::async_trait;
use sehat_config::{Config, EngineKind, OcrConfig};
use std::path::Path;
use tracing::info;

pub use sehat_config::RecognitionLevel;

pub mod mock;
pub mod tesseract;
pub mod vision;

/// One transcription the engine proposes for a region
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    /// Engine confidence in `0.0..=1.0`
    pub confidence: f32,
}

impl Candidate {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A region of recognized text with its ranked candidates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observation {
    pub candidates: Vec<Candidate>,
}

impl Observation {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn single(text: impl Into<String>, confidence: f32) -> Self {
        Self::new(vec![Candidate::new(text, confidence)])
    }

    /// Highest-confidence candidate. Ties keep the earlier-ranked one.
    pub fn top_candidate(&self) -> Option<&Candidate> {
        self.candidates.iter().fold(None, |best, candidate| match best {
            Some(current) if current.confidence >= candidate.confidence => Some(current),
            _ => Some(candidate),
        })
    }
}

/// Join the top candidate of each observation with `\n`, in engine order.
/// Observations without candidates contribute no line.
pub fn aggregate_lines(observations: &[Observation]) -> String {
    observations
        .iter()
        .filter_map(Observation::top_candidate)
        .map(|candidate| candidate.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Knobs handed to the engine for a single recognition pass
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    pub level: RecognitionLevel,
    pub language_correction: bool,
    pub languages: Vec<String>,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            language_correction: true,
            languages: Vec::new(),
        }
    }
}

impl From<&OcrConfig> for RecognitionOptions {
    fn from(config: &OcrConfig) -> Self {
        Self {
            level: config.recognition_level,
            language_correction: config.language_correction,
            languages: config.languages.clone(),
        }
    }
}

/// Text recognition engine, one implementation per host platform
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Recognize text in the image at `path`, returning observations in reading order
    async fn recognize(&self, path: &Path, options: &RecognitionOptions) -> Result<Vec<Observation>>;

    /// Get the name of the engine
    fn name(&self) -> &str;
}

/// Engine for hosts without a usable recognizer
pub struct UnsupportedEngine;

#[async_trait]
impl RecognitionEngine for UnsupportedEngine {
    async fn recognize(&self, _path: &Path, _options: &RecognitionOptions) -> Result<Vec<Observation>> {
        anyhow::bail!("OCR not implemented for this platform")
    }

    fn name(&self) -> &str {
        "unsupported"
    }
}

/// Resolve `auto` to the native engine for the build target
pub fn resolve_engine_kind(kind: EngineKind) -> EngineKind {
    match kind {
        EngineKind::Auto => {
            if cfg!(any(target_os = "macos", target_os = "ios")) {
                EngineKind::Vision
            } else {
                EngineKind::Tesseract
            }
        }
        other => other,
    }
}

// Platform-specific constructor
pub fn create_engine(config: &Config) -> Result<Box<dyn RecognitionEngine>> {
    let engine: Box<dyn RecognitionEngine> = match resolve_engine_kind(config.ocr.engine) {
        EngineKind::Vision => Box::new(vision::AppleVisionEngine::new(&config.vision)),
        EngineKind::Unsupported => Box::new(UnsupportedEngine),
        EngineKind::Tesseract | EngineKind::Auto => {
            Box::new(tesseract::TesseractEngine::new(&config.tesseract))
        }
    };
    info!(engine = engine.name(), "Selected OCR engine");
    Ok(engine)
}
