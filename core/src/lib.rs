// Parrot Core Library
// Text-to-speech relay: synthesis pipeline, playability probe, expiring store

pub mod api;
pub mod config;
pub mod pipeline;
pub mod probe;
pub mod resolver;
pub mod store;
pub mod synth;

// Export core types
pub use config::AppConfig;
pub use pipeline::{SynthesisPipeline, SynthesisRequest};
pub use probe::AudioProbe;
pub use resolver::{ParamResolver, ResolvedParams};
pub use store::{AudioStore, GeneratedAudio};
pub use synth::{SpeechClient, Synthesizer};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParrotError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Audio not found: {0}")]
    NotFound(String),

    #[error("Parameter lookup failed: {0}")]
    Resolver(String),

    #[error("Synthesis provider error: {0}")]
    Provider(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, ParrotError>;
