//! Request lifecycle for speech generation.
//!
//! Linear flow per request: validate → resolve parameters → synthesize →
//! persist → probe → return. No retries and no partial-result caching; a
//! failed request is retried whole by the caller. Each request operates on
//! its own generated file, so there is no shared mutable state here.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::probe::AudioProbe;
use crate::resolver::ParamResolver;
use crate::store::{AudioStore, GeneratedAudio};
use crate::synth::Synthesizer;
use crate::{ParrotError, Result};

/// Inbound synthesis request
#[derive(Clone, Debug, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Opaque identifier for the external parameter store
    #[serde(default)]
    pub storage_id: Option<String>,
}

pub struct SynthesisPipeline {
    synthesizer: Arc<dyn Synthesizer>,
    resolver: ParamResolver,
    store: Arc<AudioStore>,
    probe: AudioProbe,
    default_voice: String,
    default_model: String,
}

impl SynthesisPipeline {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        resolver: ParamResolver,
        store: Arc<AudioStore>,
        probe: AudioProbe,
        default_voice: String,
        default_model: String,
    ) -> Self {
        Self {
            synthesizer,
            resolver,
            store,
            probe,
            default_voice,
            default_model,
        }
    }

    /// Run one request through to a validated on-disk artifact.
    pub async fn synthesize(&self, req: &SynthesisRequest) -> Result<GeneratedAudio> {
        let text = req.text.trim();
        if text.is_empty() {
            return Err(ParrotError::InvalidRequest(
                "Text cannot be empty".to_string(),
            ));
        }
        if let Some(id) = &req.storage_id {
            if id.trim().is_empty() {
                return Err(ParrotError::InvalidRequest(
                    "storage_id cannot be empty".to_string(),
                ));
            }
        }

        let params = match &req.storage_id {
            Some(id) => self.resolver.resolve(id.trim()).await?,
            None => Default::default(),
        };

        // Explicit request fields win over resolved parameters, which win
        // over configured defaults
        let voice = req
            .voice
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or(params.voice)
            .unwrap_or_else(|| self.default_voice.clone());
        let model = req
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or(params.model)
            .unwrap_or_else(|| self.default_model.clone());

        let bytes = self.synthesizer.synthesize(text, &voice, &model).await?;
        let audio = self.store.put(&bytes)?;

        if !self.probe.is_playable(&audio.path).await {
            warn!(target: "pipeline", id = %audio.id, "Generated audio failed the playability probe; discarding");
            self.store.remove(&audio.path);
            return Err(ParrotError::Provider(
                "Synthesis produced unusable audio".to_string(),
            ));
        }

        info!(
            target: "pipeline",
            id = %audio.id,
            voice = %voice,
            model = %model,
            bytes = bytes.len(),
            "Generated speech audio"
        );
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeConfig;
    use crate::resolver::ResolverConfig;
    use crate::store::StoreConfig;
    use crate::synth::MockSynthesizer;
    use std::time::Duration;

    fn heuristic_probe() -> AudioProbe {
        AudioProbe::new(ProbeConfig {
            ffprobe_bin: None,
            timeout_ms: 1_000,
            min_plausible_bytes: 1024,
        })
    }

    fn noop_resolver() -> ParamResolver {
        ParamResolver::new(ResolverConfig {
            endpoint: None,
            request_timeout_ms: 1_000,
        })
        .unwrap()
    }

    fn test_store(dir: &tempfile::TempDir) -> Arc<AudioStore> {
        Arc::new(
            AudioStore::open(StoreConfig {
                root: dir.path().to_path_buf(),
                cleanup_delay: Duration::from_secs(5),
            })
            .unwrap(),
        )
    }

    fn pipeline_with(mock: MockSynthesizer, store: Arc<AudioStore>) -> SynthesisPipeline {
        SynthesisPipeline::new(
            Arc::new(mock),
            noop_resolver(),
            store,
            heuristic_probe(),
            "alloy".to_string(),
            "tts-1".to_string(),
        )
    }

    fn mp3_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        bytes[0] = 0xFF;
        bytes[1] = 0xFB;
        bytes
    }

    fn dir_is_empty(dir: &tempfile::TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn whitespace_text_is_rejected_before_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize().times(0);
        let pipeline = pipeline_with(mock, test_store(&dir));

        let req = SynthesisRequest {
            text: "   \n\t".to_string(),
            voice: None,
            model: None,
            storage_id: None,
        };
        let err = pipeline.synthesize(&req).await.unwrap_err();
        assert!(matches!(err, ParrotError::InvalidRequest(_)));
        assert!(dir_is_empty(&dir), "no file may be written for bad input");
    }

    #[tokio::test]
    async fn blank_storage_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize().times(0);
        let pipeline = pipeline_with(mock, test_store(&dir));

        let req = SynthesisRequest {
            text: "hello".to_string(),
            voice: None,
            model: None,
            storage_id: Some("  ".to_string()),
        };
        let err = pipeline.synthesize(&req).await.unwrap_err();
        assert!(matches!(err, ParrotError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn provider_failure_propagates_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize()
            .returning(|_, _, _| Err(ParrotError::Provider("boom".to_string())));
        let pipeline = pipeline_with(mock, test_store(&dir));

        let req = SynthesisRequest {
            text: "hello".to_string(),
            voice: None,
            model: None,
            storage_id: None,
        };
        let err = pipeline.synthesize(&req).await.unwrap_err();
        assert!(matches!(err, ParrotError::Provider(_)));
        assert!(dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn unusable_audio_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSynthesizer::new();
        // Tiny headerless payload: written, probed, rejected, deleted
        mock.expect_synthesize().returning(|_, _, _| Ok(b"oops".to_vec()));
        let pipeline = pipeline_with(mock, test_store(&dir));

        let req = SynthesisRequest {
            text: "hello".to_string(),
            voice: None,
            model: None,
            storage_id: None,
        };
        let err = pipeline.synthesize(&req).await.unwrap_err();
        assert!(matches!(err, ParrotError::Provider(_)));
        assert!(dir_is_empty(&dir), "invalid output must be deleted");
    }

    #[tokio::test]
    async fn good_audio_lands_on_disk_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize()
            .withf(|text, voice, model| text == "hello" && voice == "alloy" && model == "tts-1")
            .returning(|_, _, _| Ok(mp3_bytes(4096)));
        let store = test_store(&dir);
        let pipeline = pipeline_with(mock, Arc::clone(&store));

        let req = SynthesisRequest {
            text: "hello".to_string(),
            voice: None,
            model: None,
            storage_id: None,
        };
        let audio = pipeline.synthesize(&req).await.unwrap();
        assert!(audio.path.exists());
        assert_eq!(audio.media_type, "audio/mpeg");
        assert!(heuristic_probe().is_playable(&audio.path).await);
        assert_eq!(store.get(&audio.id).unwrap(), audio.path);
    }

    #[tokio::test]
    async fn explicit_selectors_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize()
            .withf(|_, voice, model| voice == "echo" && model == "tts-1-hd")
            .returning(|_, _, _| Ok(mp3_bytes(2048)));
        let pipeline = pipeline_with(mock, test_store(&dir));

        let req = SynthesisRequest {
            text: "hello".to_string(),
            voice: Some("echo".to_string()),
            model: Some("tts-1-hd".to_string()),
            storage_id: None,
        };
        pipeline.synthesize(&req).await.unwrap();
    }
}
