use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Service name the OCR method channel is registered under
pub const DEFAULT_CHANNEL_NAME: &str = "com.sehatlocker/apple_vision_ocr";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub tesseract: TesseractConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// Which recognition engine backs the service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Pick the native engine for the build target
    #[default]
    Auto,
    Vision,
    Tesseract,
    Unsupported,
}

impl FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "vision" => Ok(Self::Vision),
            "tesseract" => Ok(Self::Tesseract),
            "unsupported" => Ok(Self::Unsupported),
            other => anyhow::bail!(
                "Unknown OCR engine '{}'. Valid engines: auto, vision, tesseract, unsupported",
                other
            ),
        }
    }
}

/// Accuracy/latency trade-off requested from the engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionLevel {
    #[default]
    Accurate,
    Fast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default)]
    pub engine: EngineKind,
    #[serde(default)]
    pub recognition_level: RecognitionLevel,
    #[serde(default = "default_true")]
    pub language_correction: bool,
    /// Recognition languages (empty means the engine default)
    #[serde(default)]
    pub languages: Vec<String>,
    /// Wrap file reads in a security-scoped access grant (sandboxed macOS builds)
    #[serde(default = "default_security_scoped_access")]
    pub security_scoped_access: bool,
}

fn default_true() -> bool {
    true
}

fn default_security_scoped_access() -> bool {
    cfg!(target_os = "macos")
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Auto,
            recognition_level: RecognitionLevel::Accurate,
            language_correction: true,
            languages: Vec::new(),
            security_scoped_access: default_security_scoped_access(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesseractConfig {
    #[serde(default = "default_tesseract_binary")]
    pub binary: String,
    /// Page segmentation mode passed as `--psm`
    #[serde(default)]
    pub psm: Option<u8>,
}

fn default_tesseract_binary() -> String {
    "tesseract".to_string()
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: default_tesseract_binary(),
            psm: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_swift_binary")]
    pub swift_binary: String,
    /// Override for the recognition script; the bundled one is used when unset
    #[serde(default)]
    pub script_path: Option<String>,
}

fn default_swift_binary() -> String {
    "swift".to_string()
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            swift_binary: default_swift_binary(),
            script_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_channel_name")]
    pub name: String,
}

fn default_channel_name() -> String {
    DEFAULT_CHANNEL_NAME.to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: default_channel_name(),
        }
    }
}

const DEFAULT_CONFIG_PATHS: [&str; 3] = ["./sehat.toml", "~/.config/sehat/config.toml", "~/.sehat.toml"];

impl Config {
    /// Load configuration from `config_path`, or from the first default
    /// location that exists. Falls back to defaults when nothing is found.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path_to_load = match config_path {
            Some(path) => {
                let expanded = shellexpand::tilde(path).to_string();
                if !Path::new(&expanded).exists() {
                    anyhow::bail!("Config file not found: {}", expanded);
                }
                Some(PathBuf::from(expanded))
            }
            None => Self::find_default_path(),
        };

        let Some(path) = path_to_load else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    fn find_default_path() -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = DEFAULT_CONFIG_PATHS
            .iter()
            .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
            .collect();

        // Platform-native location (e.g. ~/Library/Application Support on macOS)
        if let Some(mut dir) = dirs::config_dir() {
            dir.push("sehat");
            dir.push("config.toml");
            candidates.push(dir);
        }

        candidates.into_iter().find(|path| path.exists())
    }

    /// Reject values that would only fail later, on the first request
    pub fn validate(&self) -> Result<()> {
        if self.tesseract.binary.trim().is_empty() {
            anyhow::bail!("tesseract.binary must not be empty");
        }
        if self.vision.swift_binary.trim().is_empty() {
            anyhow::bail!("vision.swift_binary must not be empty");
        }
        if self.channel.name.trim().is_empty() {
            anyhow::bail!("channel.name must not be empty");
        }
        if let Some(psm) = self.tesseract.psm {
            if psm > 13 {
                anyhow::bail!("tesseract.psm must be between 0 and 13, got {}", psm);
            }
        }
        if self.ocr.languages.iter().any(|lang| lang.trim().is_empty()) {
            anyhow::bail!("ocr.languages must not contain empty entries");
        }
        Ok(())
    }

    pub fn load_with_overrides(
        config_path: Option<&str>,
        engine_override: Option<EngineKind>,
        fast: bool,
    ) -> Result<Self> {
        let mut config = Self::load(config_path)?;

        if let Some(engine) = engine_override {
            config.ocr.engine = engine;
        }

        if fast {
            config.ocr.recognition_level = RecognitionLevel::Fast;
        }

        Ok(config)
    }
}
