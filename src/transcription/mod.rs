use async_trait::async_trait;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

use crate::storage::object::ObjectLocation;

pub mod local;

pub use local::LocalTranscriptionService;

/// Status of a transcription job as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    InProgress,
    Completed,
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed(_) => "FAILED",
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Media formats the transcription service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Mp3,
    Mp4,
    Wav,
    Flac,
    Ogg,
    Amr,
    Webm,
    M4a,
}

impl MediaFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "mp4" => Some(Self::Mp4),
            "wav" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "ogg" => Some(Self::Ogg),
            "amr" => Some(Self::Amr),
            "webm" => Some(Self::Webm),
            "m4a" => Some(Self::M4a),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Mp4 => "mp4",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Amr => "amr",
            Self::Webm => "webm",
            Self::M4a => "m4a",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Mp4 => "audio/mp4",
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
            Self::Ogg => "audio/ogg",
            Self::Amr => "audio/amr",
            Self::Webm => "audio/webm",
            Self::M4a => "audio/m4a",
        }
    }
}

impl Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Everything needed to start one transcription job.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionJobRequest {
    pub job_id: String,
    pub source_uri: String,
    pub media_format: MediaFormat,
    pub language_code: String,
    pub output: ObjectLocation,
}

/// Output document written by the service at the job's output key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptDocument {
    pub job_name: String,
    pub status: String,
    pub results: TranscriptResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResults {
    pub transcripts: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub transcript: String,
}

impl TranscriptDocument {
    pub fn completed(job_name: &str, transcript: String) -> Self {
        Self {
            job_name: job_name.to_string(),
            status: JobStatus::Completed.to_string(),
            results: TranscriptResults {
                transcripts: vec![TranscriptEntry { transcript }],
            },
        }
    }
}

#[async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn start_job(&self, request: TranscriptionJobRequest) -> Result<()>;
    async fn get_job_status(&self, job_id: &str) -> Result<JobStatus>;
}

/// `{prefix}-{8 hex chars}`, fresh per invocation.
pub fn new_job_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..8])
}

/// Output key the service writes the transcript document to.
pub fn transcript_key(job_id: &str) -> String {
    format!("transcripts/{}.json", job_id)
}
