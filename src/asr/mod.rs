use anyhow::Result;
use serde::{Serialize, Deserialize};
use async_trait::async_trait;

use crate::transcription::MediaFormat;

pub mod openai;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use openai::OpenAiAsr;

/// Raw recording bytes plus their container format.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub format: MediaFormat,
}

#[derive(Debug, Clone, Default)]
pub struct AsrParams {
    /// BCP-47 code such as `en-US`.
    pub language: Option<String>,
    pub speaker_diarization: bool,
}

impl AsrParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_language(&mut self, language: Option<String>) -> &mut Self {
        self.language = language;
        self
    }

    pub fn set_speaker_diarization(&mut self, speaker_diarization: bool) -> &mut Self {
        self.speaker_diarization = speaker_diarization;
        self
    }

    /// Primary language subtag (`en-US` -> `en`), which is what the engines expect.
    pub fn language_tag(&self) -> Option<String> {
        self.language
            .as_deref()
            .and_then(|code| code.split(['-', '_']).next())
            .filter(|tag| !tag.is_empty())
            .map(|tag| tag.to_lowercase())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeSegment {
    pub text: String,
    pub speaker_id: usize,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResult {
    pub segments: Vec<TranscribeSegment>,
    pub full_text: String,
}

#[async_trait]
pub trait AsrEngine: Send + Sync {
    async fn transcribe(&self, audio: AudioClip, params: AsrParams) -> Result<TranscribeResult>;
}
