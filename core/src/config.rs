//! Service configuration.
//!
//! Explicit configuration objects handed to each component at construction;
//! nothing here lives in global state. Defaults read environment variables.

use crate::probe::ProbeConfig;
use crate::resolver::ResolverConfig;
use crate::store::StoreConfig;
use crate::synth::SynthesisConfig;

/// Top-level configuration assembled from the per-component configs
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub synthesis: SynthesisConfig,
    pub resolver: ResolverConfig,
    pub store: StoreConfig,
    pub probe: ProbeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("PARROT_HOST")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: std::env::var("PARROT_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8000),
            synthesis: SynthesisConfig::default(),
            resolver: ResolverConfig::default(),
            store: StoreConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}
