//! Apple Vision text recognition via the bundled Swift script.
//!
//! The script wraps `VNRecognizeTextRequest` and prints observations as
//! JSON, each carrying its ranked candidates. It is written to the user
//! cache directory on first use unless `vision.script_path` points elsewhere.
//! Installation writes a sibling temp file and renames it into place, so a
//! concurrent reader sees either the previous script or the complete new one.

use super::{Candidate, Observation, RecognitionEngine, RecognitionLevel, RecognitionOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sehat_config::VisionConfig;
use serde::Deserialize;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::OnceCell;
use tracing::{debug, error};

const BUNDLED_SCRIPT: &str = include_str!("../../resources/recognize_text.swift");
const SCRIPT_FILE_NAME: &str = "recognize_text.swift";
const MAX_CANDIDATES: u32 = 3;

#[derive(Debug, Deserialize)]
struct ScriptOutput {
    #[serde(default)]
    observations: Vec<ScriptObservation>,
}

#[derive(Debug, Deserialize)]
struct ScriptObservation {
    #[serde(default)]
    candidates: Vec<ScriptCandidate>,
}

#[derive(Debug, Deserialize)]
struct ScriptCandidate {
    text: String,
    #[serde(default)]
    confidence: f32,
}

/// Apple Vision Framework OCR engine
pub struct AppleVisionEngine {
    swift_binary: String,
    script_path: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    installed: OnceCell<PathBuf>,
}

impl AppleVisionEngine {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            swift_binary: config.swift_binary.clone(),
            script_path: config.script_path.as_deref().map(PathBuf::from),
            install_dir: None,
            installed: OnceCell::new(),
        }
    }

    /// Install the bundled script under `dir` instead of the user cache directory
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    /// Locate the recognition script, installing the bundled copy once per engine
    async fn script_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.script_path {
            return Ok(path.clone());
        }

        self.installed
            .get_or_try_init(|| async move {
                let dir = match &self.install_dir {
                    Some(dir) => dir.clone(),
                    None => dirs::cache_dir()
                        .context("No cache directory available for the Vision script")?
                        .join("sehat"),
                };
                tokio::task::spawn_blocking(move || install_script(&dir))
                    .await
                    .context("Vision script installation task failed")?
            })
            .await
            .cloned()
    }

    fn build_args(script: &Path, image: &Path, options: &RecognitionOptions) -> Vec<OsString> {
        let level = match options.level {
            RecognitionLevel::Accurate => "accurate",
            RecognitionLevel::Fast => "fast",
        };
        let correction = if options.language_correction { "on" } else { "off" };

        let mut args: Vec<OsString> = vec![
            script.into(),
            image.into(),
            "--level".into(),
            level.into(),
            "--correction".into(),
            correction.into(),
            "--candidates".into(),
            MAX_CANDIDATES.to_string().into(),
        ];

        if !options.languages.is_empty() {
            args.push("--languages".into());
            args.push(options.languages.join(",").into());
        }

        args
    }
}

#[async_trait]
impl RecognitionEngine for AppleVisionEngine {
    async fn recognize(&self, path: &Path, options: &RecognitionOptions) -> Result<Vec<Observation>> {
        let script = self.script_path().await?;

        let output = tokio::process::Command::new(&self.swift_binary)
            .args(Self::build_args(&script, path, options))
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to execute swift command: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                code = output.status.code().unwrap_or(-1),
                stderr = %stderr.trim(),
                "Vision recognition failed"
            );
            anyhow::bail!("{}", stderr.trim());
        }

        parse_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &str {
        "apple-vision"
    }
}

/// Write the bundled script into `dir` unless an identical copy is already there
fn install_script(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(SCRIPT_FILE_NAME);

    if let Ok(existing) = std::fs::read_to_string(&path) {
        if existing == BUNDLED_SCRIPT {
            return Ok(path);
        }
    }

    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to stage Vision script in {}", dir.display()))?;
    staged.write_all(BUNDLED_SCRIPT.as_bytes())?;
    staged.flush()?;
    staged
        .persist(&path)
        .with_context(|| format!("Failed to install Vision script at {}", path.display()))?;

    debug!(path = %path.display(), "Installed Vision script");
    Ok(path)
}

/// Parse the script's JSON into observations, keeping candidate rank order
pub fn parse_output(json: &str) -> Result<Vec<Observation>> {
    let output: ScriptOutput = serde_json::from_str(json).map_err(|e| {
        let preview = json.chars().take(200).collect::<String>();
        anyhow::anyhow!("Failed to parse Vision output: {}. Preview: {}", e, preview)
    })?;

    Ok(output
        .observations
        .into_iter()
        .map(|observation| {
            Observation::new(
                observation
                    .candidates
                    .into_iter()
                    .map(|c| Candidate::new(c.text, c.confidence))
                    .collect(),
            )
        })
        .collect())
}
