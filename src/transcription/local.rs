use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::asr::{AsrEngine, AsrParams, AudioClip};
use crate::storage::object::{ObjectLocation, ObjectStore};
use super::{JobStatus, TranscriptDocument, TranscriptionJobRequest, TranscriptionService};

/// How long a finished job stays visible to status checks.
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(3600);

/// In-process transcription jobs backed by an [`AsrEngine`].
///
/// Jobs run on the tokio runtime and write their transcript document into the
/// shared object store, so callers observe them exactly like a hosted service:
/// submit, poll status, then read the output key.
///
/// Finished jobs are dropped once they are older than the retention window;
/// the sweep runs whenever a new job is accepted.
pub struct LocalTranscriptionService {
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn AsrEngine>,
    jobs: Arc<Mutex<HashMap<String, JobRecord>>>,
    retention: Duration,
    speaker_diarization: bool,
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub output: ObjectLocation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LocalTranscriptionService {
    pub fn new(store: Arc<dyn ObjectStore>, engine: Arc<dyn AsrEngine>) -> Self {
        Self {
            store,
            engine,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            retention: DEFAULT_JOB_RETENTION,
            speaker_diarization: false,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_speaker_diarization(mut self, enabled: bool) -> Self {
        self.speaker_diarization = enabled;
        self
    }

    /// Remove finished jobs whose completion is older than the retention window.
    /// Returns how many records were dropped.
    pub async fn prune_finished(&self) -> usize {
        let now = Utc::now();
        let retention = self.retention;
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|_, record| match record.completed_at {
            Some(done) => (now - done).to_std().map(|age| age < retention).unwrap_or(true),
            None => true,
        });
        let pruned = before - jobs.len();
        if pruned > 0 {
            debug!("Pruned {} finished transcription jobs", pruned);
        }
        pruned
    }

    pub async fn job(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.lock().await.get(job_id).cloned()
    }

    async fn set_status(jobs: &Mutex<HashMap<String, JobRecord>>, job_id: &str, status: JobStatus) {
        let mut jobs = jobs.lock().await;
        if let Some(record) = jobs.get_mut(job_id) {
            let now = Utc::now();
            if status.is_terminal() {
                record.completed_at = Some(now);
            }
            record.status = status;
            record.updated_at = now;
        }
    }

    async fn run_job(
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn AsrEngine>,
        request: TranscriptionJobRequest,
        speaker_diarization: bool,
    ) -> Result<()> {
        let source = ObjectLocation::parse_uri(&request.source_uri)?;
        let data = store.get(&source.container, &source.key).await?;

        let mut params = AsrParams::new();
        params
            .set_language(Some(request.language_code.clone()))
            .set_speaker_diarization(speaker_diarization);

        let clip = AudioClip {
            data,
            format: request.media_format,
        };
        let result = engine.transcribe(clip, params).await?;

        let document = TranscriptDocument::completed(&request.job_id, result.full_text);
        let body = serde_json::to_vec(&document)?;
        store
            .put(&request.output.container, &request.output.key, body, "application/json")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TranscriptionService for LocalTranscriptionService {
    async fn start_job(&self, request: TranscriptionJobRequest) -> Result<()> {
        self.prune_finished().await;
        {
            let mut jobs = self.jobs.lock().await;
            if jobs.contains_key(&request.job_id) {
                return Err(anyhow::anyhow!("Job already exists: {}", request.job_id));
            }
            let now = Utc::now();
            jobs.insert(request.job_id.clone(), JobRecord {
                job_id: request.job_id.clone(),
                status: JobStatus::Submitted,
                output: request.output.clone(),
                created_at: now,
                updated_at: now,
                completed_at: None,
            });
        }

        info!("Accepted transcription job {} for {}", request.job_id, request.source_uri);

        let store = self.store.clone();
        let engine = self.engine.clone();
        let jobs = self.jobs.clone();
        let speaker_diarization = self.speaker_diarization;
        tokio::spawn(async move {
            let job_id = request.job_id.clone();
            Self::set_status(&jobs, &job_id, JobStatus::InProgress).await;

            match Self::run_job(store, engine, request, speaker_diarization).await {
                Ok(()) => {
                    info!("Transcription job {} completed", job_id);
                    Self::set_status(&jobs, &job_id, JobStatus::Completed).await;
                }
                Err(e) => {
                    error!("Transcription job {} failed: {}", job_id, e);
                    Self::set_status(&jobs, &job_id, JobStatus::Failed(e.to_string())).await;
                }
            }
        });

        Ok(())
    }

    async fn get_job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.jobs
            .lock()
            .await
            .get(job_id)
            .map(|record| record.status.clone())
            .ok_or_else(|| anyhow::anyhow!("Transcription job not found: {}", job_id))
    }
}
