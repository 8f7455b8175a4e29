use super::{Candidate, Observation, RecognitionEngine, RecognitionLevel, RecognitionOptions};
use anyhow::Result;
use async_trait::async_trait;
use sehat_config::TesseractConfig;
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// TSV row level for a single word
const WORD_LEVEL: u32 = 5;

/// Tesseract OCR engine (fallback/cross-platform)
pub struct TesseractEngine {
    binary: String,
    psm: Option<u8>,
}

impl TesseractEngine {
    pub fn new(config: &TesseractConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            psm: config.psm,
        }
    }

    fn build_args(&self, path: &Path, options: &RecognitionOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![path.into(), "stdout".into()];

        if !options.languages.is_empty() {
            args.push("-l".into());
            args.push(options.languages.join("+").into());
        }

        if let Some(psm) = self.psm {
            args.push("--psm".into());
            args.push(psm.to_string().into());
        }

        // Dictionary lookups are tesseract's form of language correction
        if !options.language_correction {
            for var in ["load_system_dawg=0", "load_freq_dawg=0"] {
                args.push("-c".into());
                args.push(var.into());
            }
        }

        args.push("tsv".into());
        args
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn recognize(&self, path: &Path, options: &RecognitionOptions) -> Result<Vec<Observation>> {
        if options.level == RecognitionLevel::Fast {
            debug!("tesseract has no fast mode, running default recognition");
        }

        let output = tokio::process::Command::new(&self.binary)
            .args(self.build_args(path, options))
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run tesseract: {}", e))?;

        if !output.status.success() {
            anyhow::bail!(
                "Tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let observations = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        debug!(observations = observations.len(), "tesseract recognition finished");
        Ok(observations)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Group word rows of tesseract TSV output into one observation per text line.
///
/// TSV format: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. The line confidence is the mean
/// word confidence scaled to `0.0..=1.0`.
pub fn parse_tsv(tsv: &str) -> Vec<Observation> {
    let mut lines: Vec<((u32, u32, u32, u32), Vec<String>, f32)> = Vec::new();

    // Skip header line
    for row in tsv.lines().skip(1) {
        let parts: Vec<&str> = row.split('\t').collect();
        if parts.len() < 12 {
            continue;
        }

        let (Ok(level), Ok(page), Ok(block), Ok(par), Ok(line), Ok(conf)) = (
            parts[0].parse::<u32>(),
            parts[1].parse::<u32>(),
            parts[2].parse::<u32>(),
            parts[3].parse::<u32>(),
            parts[4].parse::<u32>(),
            parts[10].parse::<f32>(),
        ) else {
            continue;
        };

        let word = parts[11].trim();
        if level != WORD_LEVEL || word.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (page, block, par, line);
        match lines.last_mut() {
            Some((last_key, words, total)) if *last_key == key => {
                words.push(word.to_string());
                *total += conf;
            }
            _ => lines.push((key, vec![word.to_string()], conf)),
        }
    }

    lines
        .into_iter()
        .map(|(_, words, total)| {
            let confidence = (total / words.len() as f32 / 100.0).clamp(0.0, 1.0);
            Observation::new(vec![Candidate::new(words.join(" "), confidence)])
        })
        .collect()
}
