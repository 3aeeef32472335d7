//! Voice parameter resolution against an external store.
//!
//! Maps an opaque identifier to a voice (and possibly model) selection. The
//! store's response shape is not under our control, so the body handling is
//! deliberately lenient: structured JSON or a bare voice-name string both
//! work. A single failed call surfaces immediately; there is no retry.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ParrotError, Result};

/// Endpoint value that disables resolution entirely
const DISABLED_SENTINEL: &str = "disabled";

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Parameter store endpoint; `None` turns `resolve` into a no-op
    pub endpoint: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("VOICE_PARAMS_URL")
                .ok()
                .filter(|s| !s.is_empty() && s != DISABLED_SENTINEL),
            request_timeout_ms: std::env::var("VOICE_PARAMS_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10_000),
        }
    }
}

/// Voice selection fetched from the external store. Transient, per request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResolvedParams {
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

pub struct ParamResolver {
    http: Client,
    cfg: ResolverConfig,
}

impl ParamResolver {
    pub fn new(cfg: ResolverConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| ParrotError::Resolver(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ResolverConfig::default())
    }

    /// Look up voice parameters for `id`.
    ///
    /// Without a configured endpoint this is a no-op returning empty
    /// parameters, so local/offline deployments skip the network entirely.
    pub async fn resolve(&self, id: &str) -> Result<ResolvedParams> {
        let endpoint = match &self.cfg.endpoint {
            Some(e) => e,
            None => {
                debug!(target: "resolver", "No parameter store configured; returning empty parameters");
                return Ok(ResolvedParams::default());
            }
        };

        let url = format!("{}/{}", endpoint.trim_end_matches('/'), id);
        debug!(target: "resolver", url = %url, "Fetching voice parameters");

        let resp = self.http.get(&url).send().await.map_err(|e| {
            warn!(target: "resolver", error = %e, "Parameter store request failed");
            ParrotError::Resolver(format!("Parameter store request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(target: "resolver", status = %status, "Parameter store returned error");
            return Err(ParrotError::Resolver(format!(
                "Parameter store returned status: {status}"
            )));
        }

        let body = resp.text().await.map_err(|e| {
            ParrotError::Resolver(format!("Failed to read parameter store response: {e}"))
        })?;
        Ok(parse_params(&body))
    }
}

/// Lenient payload handling: a JSON object is taken as-is (unknown fields
/// ignored); anything else is treated as a bare voice name.
pub fn parse_params(body: &str) -> ResolvedParams {
    if let Ok(params) = serde_json::from_str::<ResolvedParams>(body) {
        return params;
    }
    let voice = body.trim().trim_matches('"');
    ResolvedParams {
        voice: (!voice.is_empty()).then(|| voice.to_string()),
        model: None,
    }
}
