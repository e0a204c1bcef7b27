use crate::config::Config;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;

/// Remote text-to-speech capability. One call per paragraph; the returned
/// bytes are the complete audio artifact.
#[async_trait]
pub trait SpeechClient: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str, model: &str) -> Result<Vec<u8>>;
}

/// Fails before any chunk work begins when no credential is available.
pub fn create_speech_client(config: &Config) -> Result<Box<dyn SpeechClient>> {
    let api_key = config.resolve_api_key()?;
    Ok(Box::new(OpenAiSpeechClient::new(
        &api_key,
        &config.openai.base_url,
    )))
}

pub struct OpenAiSpeechClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiSpeechClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

#[async_trait]
impl SpeechClient for OpenAiSpeechClient {
    async fn synthesize(&self, text: &str, voice: &str, model: &str) -> Result<Vec<u8>> {
        let url = format!("{}/audio/speech", self.base_url);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&SpeechRequest {
                model,
                voice,
                input: text,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("TTS API error ({}): {}", status, error_text));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
