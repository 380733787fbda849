use crate::transcription::JobStatus;

/// Every way an invocation can fail. Each one aborts the whole sequence.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Unsupported media format: {0}")]
    UnsupportedMediaFormat(String),

    #[error("Transcription service error: {0}")]
    TranscriptionService(anyhow::Error),

    #[error("Transcription failed")]
    TranscriptionFailed { reason: String },

    #[error("Transcription timed out after {attempts} status checks (last status {last_status})")]
    TranscriptionTimedOut { attempts: u32, last_status: JobStatus },

    #[error("Transcript not found: {0}")]
    TranscriptMissing(String),

    #[error("Malformed transcript: {0}")]
    TranscriptMalformed(String),

    #[error("Summarization failed: {0}")]
    Summarization(anyhow::Error),

    #[error("Failed to store summary: {0}")]
    Storage(anyhow::Error),
}
