//! Client for the external speech-synthesis provider.
//!
//! Talks to an OpenAI-compatible `audio/speech` endpoint. The `Synthesizer`
//! trait is the seam between the pipeline and the provider, so tests and
//! alternative backends can swap in their own implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

use crate::{ParrotError, Result};

/// Configuration for the synthesis provider client loaded from environment
/// variables
#[derive(Clone, Debug)]
pub struct SynthesisConfig {
    pub base_url: String, // e.g., https://api.openai.com/v1
    pub api_key: Option<String>,
    pub default_voice: String,
    pub default_model: String,
    pub request_timeout_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("TTS_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("TTS_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|s| !s.is_empty()),
            default_voice: std::env::var("TTS_VOICE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "alloy".to_string()),
            default_model: std::env::var("TTS_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "tts-1".to_string()),
            request_timeout_ms: std::env::var("TTS_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30_000),
        }
    }
}

/// Seam between the pipeline and the external provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Convert `text` into encoded audio bytes using the given selectors.
    async fn synthesize(&self, text: &str, voice: &str, model: &str) -> Result<Vec<u8>>;
}

/// HTTP client for an OpenAI-compatible speech endpoint
pub struct SpeechClient {
    http: Client,
    cfg: SynthesisConfig,
}

impl SpeechClient {
    pub fn new(cfg: SynthesisConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| ParrotError::Provider(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SynthesisConfig::default())
    }
}

#[async_trait]
impl Synthesizer for SpeechClient {
    async fn synthesize(&self, text: &str, voice: &str, model: &str) -> Result<Vec<u8>> {
        let url = format!("{}/audio/speech", self.cfg.base_url.trim_end_matches('/'));
        debug!(target: "synth", url = %url, voice = %voice, model = %model, "POST audio/speech");

        let mut req = self
            .http
            .post(&url)
            .header("content-type", "application/json");
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        }

        let body = json!({
            "model": model,
            "voice": voice,
            "input": text,
        });

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| ParrotError::Provider(format!("Speech synthesis request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(target: "synth", %status, body = %body, "Speech synthesis error");
            return Err(ParrotError::Provider(format!(
                "Speech synthesis error: status={} body={}",
                status, body
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ParrotError::Provider(format!("Failed to read synthesis response: {e}")))?;
        Ok(bytes.to_vec())
    }
}
