//! Upload-to-summary sequence.
//!
//! decode event -> start transcription -> poll -> fetch transcript ->
//! summarize -> write summary. Any stage error aborts the run and becomes the
//! error record; only the final write is durable.

use std::path::Path;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub mod error;
pub mod poll;
pub mod transcript;

pub use error::PipelineError;
pub use poll::{wait_for_job, PollOutcome, PollPolicy};
pub use transcript::{extract_transcript, fetch_transcript};

use crate::event;
use crate::storage::object::{ObjectLocation, ObjectStore};
use crate::summarize::{Summarizer, SummaryRequest};
use crate::transcription::{
    new_job_id, transcript_key, MediaFormat, TranscriptionJobRequest, TranscriptionService,
};

pub const DEFAULT_LANGUAGE_CODE: &str = "en-US";
pub const DEFAULT_JOB_PREFIX: &str = "twilio";
pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SYSTEM_PROMPT: &str = "Summarize medical consultations clearly and concisely.";
pub const DEFAULT_MAX_SUMMARY_TOKENS: u32 = 300;
pub const SUMMARY_CONTENT_TYPE: &str = "text/plain";

const TRANSCRIPT_SAMPLE_CHARS: usize = 150;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub language_code: String,
    pub job_prefix: String,
    pub model: String,
    pub system_prompt: String,
    pub max_output_tokens: u32,
    pub poll: PollPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            job_prefix: DEFAULT_JOB_PREFIX.to_string(),
            model: DEFAULT_SUMMARY_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_output_tokens: DEFAULT_MAX_SUMMARY_TOKENS,
            poll: PollPolicy::default(),
        }
    }
}

/// What the trigger gets back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvocationResult {
    Success { status: String, summary_file: String },
    Error { error: String },
}

impl InvocationResult {
    pub fn success(location: &ObjectLocation) -> Self {
        Self::Success {
            status: "success".to_string(),
            summary_file: location.uri(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { error: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Key the summary for `job_id` is stored under.
pub fn summary_key(job_id: &str) -> String {
    format!("summaries/{}_summary.txt", job_id)
}

pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn TranscriptionService>,
    summarizer: Arc<dyn Summarizer>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn TranscriptionService>,
        summarizer: Arc<dyn Summarizer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            transcriber,
            summarizer,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Failure boundary: run everything and fold any error into the result record.
    pub async fn handle_event(&self, payload: &serde_json::Value) -> InvocationResult {
        match self.run(payload).await {
            Ok(location) => InvocationResult::success(&location),
            Err(e) => {
                error!("Error: {}", e);
                InvocationResult::error(e.to_string())
            }
        }
    }

    /// Local run mode: read a notification from a JSON file and handle it.
    /// Only reading or parsing the file is an `Err`; pipeline failures come
    /// back as the error record.
    pub async fn handle_event_file(&self, path: &Path) -> anyhow::Result<InvocationResult> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read event file {}: {}", path.display(), e))?;
        let payload: serde_json::Value = serde_json::from_slice(&raw)
            .map_err(|e| anyhow::anyhow!("Event file {} is not JSON: {}", path.display(), e))?;
        Ok(self.handle_event(&payload).await)
    }

    pub async fn run(&self, payload: &serde_json::Value) -> Result<ObjectLocation, PipelineError> {
        let audio = event::decode_event(payload)?;
        info!("Received audio file: {}", audio);

        let job_id = new_job_id(&self.config.job_prefix);
        self.process(&audio, &job_id).await
    }

    /// Stages after decoding, with a caller-chosen job id.
    pub async fn process(&self, audio: &ObjectLocation, job_id: &str) -> Result<ObjectLocation, PipelineError> {
        let transcript_location = self.start_transcription(audio, job_id).await?;
        self.await_transcription(job_id).await?;

        let transcript = fetch_transcript(self.store.as_ref(), &transcript_location).await?;
        let sample: String = transcript.chars().take(TRANSCRIPT_SAMPLE_CHARS).collect();
        info!("Transcript extracted. Sample: {}", sample);

        let summary = self.summarize(transcript).await?;
        self.write_summary(&audio.container, job_id, summary).await
    }

    async fn start_transcription(&self, audio: &ObjectLocation, job_id: &str) -> Result<ObjectLocation, PipelineError> {
        let media_format = media_format_of(audio)?;
        let output = ObjectLocation::new(&audio.container, transcript_key(job_id));

        let request = TranscriptionJobRequest {
            job_id: job_id.to_string(),
            source_uri: audio.uri(),
            media_format,
            language_code: self.config.language_code.clone(),
            output: output.clone(),
        };

        self.transcriber
            .start_job(request)
            .await
            .map_err(PipelineError::TranscriptionService)?;
        info!("Started transcription job: {}", job_id);

        Ok(output)
    }

    async fn await_transcription(&self, job_id: &str) -> Result<(), PipelineError> {
        match wait_for_job(self.transcriber.as_ref(), job_id, &self.config.poll).await? {
            PollOutcome::Completed { .. } => Ok(()),
            PollOutcome::Failed { reason, .. } => Err(PipelineError::TranscriptionFailed { reason }),
            PollOutcome::TimedOut { attempts, last_status } => {
                Err(PipelineError::TranscriptionTimedOut { attempts, last_status })
            }
        }
    }

    async fn summarize(&self, transcript: String) -> Result<String, PipelineError> {
        let request = SummaryRequest {
            model: self.config.model.clone(),
            system_prompt: self.config.system_prompt.clone(),
            user_text: transcript,
            max_output_tokens: self.config.max_output_tokens,
        };
        self.summarizer
            .complete(request)
            .await
            .map_err(PipelineError::Summarization)
    }

    async fn write_summary(&self, container: &str, job_id: &str, summary: String) -> Result<ObjectLocation, PipelineError> {
        let location = ObjectLocation::new(container, summary_key(job_id));
        self.store
            .put(&location.container, &location.key, summary.into_bytes(), SUMMARY_CONTENT_TYPE)
            .await
            .map_err(PipelineError::Storage)?;

        info!("Summary saved: {}", location);
        Ok(location)
    }
}

fn media_format_of(audio: &ObjectLocation) -> Result<MediaFormat, PipelineError> {
    let ext = audio
        .extension()
        .ok_or_else(|| PipelineError::UnsupportedMediaFormat(format!("{} has no file extension", audio.key)))?;
    MediaFormat::from_extension(&ext)
        .ok_or_else(|| PipelineError::UnsupportedMediaFormat(format!("{} ({})", ext, audio.key)))
}

#[cfg(test)]
mod tests;
