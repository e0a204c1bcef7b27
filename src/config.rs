use crate::error::SpeechError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MIN_RATE: f64 = 0.25;
pub const MAX_RATE: f64 = 4.0;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_input_file")]
    pub input_file: String,

    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_rate")]
    pub rate: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            model: default_model(),
            rate: default_rate(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAiConfig {
    // Falls back to the OPENAI_API_KEY environment variable when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
        }
    }
}

fn default_input_file() -> String {
    "input.txt".to_string()
}
fn default_output() -> String {
    "narration".to_string()
}
fn default_voice() -> String {
    "nova".to_string()
}
fn default_model() -> String {
    "tts-1".to_string()
}
fn default_rate() -> f64 {
    1.0
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.yml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SpeechError::Configuration(format!(
                "{} not found. Please create one.",
                path.display()
            ))
            .into());
        }

        let content = fs::read_to_string(path).context("Failed to read config.yml")?;
        let config: Config =
            serde_yaml_ng::from_str(&content).context("Failed to parse config.yml")?;
        Ok(config)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.output_folder)?;
        Ok(())
    }

    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.openai.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(SpeechError::Configuration(
                "No API key: set openai.api_key in config.yml or OPENAI_API_KEY".to_string(),
            )
            .into()),
        }
    }

    pub fn playback_rate(&self) -> Result<f64> {
        let rate = self.audio.rate;
        if !(MIN_RATE..=MAX_RATE).contains(&rate) {
            return Err(SpeechError::Configuration(format!(
                "Invalid rate {}. Must be between {} and {}",
                rate, MIN_RATE, MAX_RATE
            ))
            .into());
        }
        Ok(rate)
    }
}
