pub mod asr;
pub mod audio;
pub mod config;
pub mod event;
pub mod pipeline;
pub mod storage;
pub mod summarize;
pub mod transcription;
pub mod utils;
pub mod web;

use std::sync::Arc;
use anyhow::Result;
use tracing::info;

use asr::{AsrEngine, OpenAiAsr};
use config::{AsrEngineKind, Settings};
use pipeline::Pipeline;
use storage::object::{LocalObjectStore, ObjectStore};
use summarize::OpenAiSummarizer;
use transcription::LocalTranscriptionService;

/// Collaborator handles shared by the HTTP surface.
pub struct AppContext {
    pub pipeline: Arc<Pipeline>,
    pub transcriber: Arc<LocalTranscriptionService>,
}

pub fn init_env() {
    dotenv::dotenv().ok();
}

impl AppContext {
    /// Build every collaborator once from startup settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        std::fs::create_dir_all(&settings.storage_root)?;
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&settings.storage_root));
        info!("Object store rooted at {}", settings.storage_root.display());

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let engine = build_engine(settings, http.clone())?;
        let transcriber = Arc::new(
            LocalTranscriptionService::new(store.clone(), engine)
                .with_retention(settings.job_retention)
                .with_speaker_diarization(settings.speaker_diarization),
        );
        let summarizer = Arc::new(OpenAiSummarizer::new(
            http,
            settings.openai_api_key.clone(),
            settings.openai_base_url.clone(),
        ));

        let pipeline = Pipeline::new(store, transcriber.clone(), summarizer, settings.pipeline.clone());
        Ok(Self {
            pipeline: Arc::new(pipeline),
            transcriber,
        })
    }
}

fn build_engine(settings: &Settings, http: reqwest::Client) -> Result<Arc<dyn AsrEngine>> {
    match settings.asr_engine {
        AsrEngineKind::OpenAi => {
            info!("Using hosted transcription model {}", settings.transcribe_model);
            Ok(Arc::new(OpenAiAsr::new(
                http,
                settings.openai_api_key.clone(),
                settings.openai_base_url.clone(),
                settings.transcribe_model.clone(),
            )))
        }
        #[cfg(feature = "whisper")]
        AsrEngineKind::Whisper => {
            info!("Loading whisper model {}", settings.whisper_model);
            Ok(Arc::new(asr::whisper::WhisperAsr::new(&settings.whisper_model)?))
        }
        #[cfg(not(feature = "whisper"))]
        AsrEngineKind::Whisper => Err(anyhow::anyhow!(
            "RECAP_ASR_ENGINE=whisper requires building with the `whisper` feature"
        )),
    }
}
