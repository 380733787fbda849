use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::storage::object::InMemoryObjectStore;
use crate::transcription::{JobStatus, TranscriptDocument};

/// Replays a fixed status sequence; the last status repeats once the script runs out.
struct ScriptedTranscriber {
    store: Arc<InMemoryObjectStore>,
    statuses: Mutex<VecDeque<JobStatus>>,
    transcript: Option<String>,
    requests: Mutex<Vec<TranscriptionJobRequest>>,
    polls: Mutex<u32>,
}

impl ScriptedTranscriber {
    fn new(store: Arc<InMemoryObjectStore>, statuses: Vec<JobStatus>, transcript: Option<&str>) -> Self {
        Self {
            store,
            statuses: Mutex::new(statuses.into()),
            transcript: transcript.map(str::to_string),
            requests: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
        }
    }

    fn polls(&self) -> u32 {
        *self.polls.lock().unwrap()
    }

    fn requests(&self) -> Vec<TranscriptionJobRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptionService for ScriptedTranscriber {
    async fn start_job(&self, request: TranscriptionJobRequest) -> Result<()> {
        if let Some(text) = &self.transcript {
            let doc = TranscriptDocument::completed(&request.job_id, text.clone());
            self.store
                .put(&request.output.container, &request.output.key, serde_json::to_vec(&doc)?, "application/json")
                .await?;
        }
        self.requests.lock().unwrap().push(request);
        Ok(())
    }

    async fn get_job_status(&self, _job_id: &str) -> Result<JobStatus> {
        *self.polls.lock().unwrap() += 1;
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap())
        } else {
            statuses
                .front()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no scripted status"))
        }
    }
}

struct RecordingSummarizer {
    reply: Result<String, String>,
    requests: Mutex<Vec<SummaryRequest>>,
}

impl RecordingSummarizer {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    async fn complete(&self, request: SummaryRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.reply.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

/// Accepts reads, refuses writes.
struct ReadOnlyStore(Arc<InMemoryObjectStore>);

#[async_trait]
impl ObjectStore for ReadOnlyStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        self.0.get(container, key).await
    }

    async fn put(&self, _container: &str, _key: &str, _body: Vec<u8>, _content_type: &str) -> Result<()> {
        Err(anyhow::anyhow!("access denied"))
    }
}

fn notification(bucket: &str, key: &str) -> serde_json::Value {
    json!({
        "Records": [
            { "s3": { "bucket": { "name": bucket }, "object": { "key": key } } }
        ]
    })
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        poll: PollPolicy::new(Duration::from_millis(1), 30),
        ..PipelineConfig::default()
    }
}

struct Harness {
    store: Arc<InMemoryObjectStore>,
    transcriber: Arc<ScriptedTranscriber>,
    summarizer: Arc<RecordingSummarizer>,
    pipeline: Pipeline,
}

fn harness(statuses: Vec<JobStatus>, transcript: Option<&str>, summarizer: RecordingSummarizer) -> Harness {
    let store = Arc::new(InMemoryObjectStore::new());
    let transcriber = Arc::new(ScriptedTranscriber::new(store.clone(), statuses, transcript));
    let summarizer = Arc::new(summarizer);
    let pipeline = Pipeline::new(store.clone(), transcriber.clone(), summarizer.clone(), fast_config());
    Harness {
        store,
        transcriber,
        summarizer,
        pipeline,
    }
}

#[tokio::test]
async fn test_completed_job_produces_summary() -> Result<()> {
    let h = harness(
        vec![JobStatus::InProgress, JobStatus::InProgress, JobStatus::Completed],
        Some("Patient reports mild fever."),
        RecordingSummarizer::replying("Patient has a mild fever."),
    );

    let result = h.pipeline.handle_event(&notification("medrecs", "calls/visit1.wav")).await;

    let requests = h.transcriber.requests();
    assert_eq!(requests.len(), 1);
    let job_id = requests[0].job_id.clone();
    assert_eq!(
        result,
        InvocationResult::Success {
            status: "success".to_string(),
            summary_file: format!("s3://medrecs/summaries/{}_summary.txt", job_id),
        }
    );

    let stored = h.store.object("medrecs", &summary_key(&job_id)).unwrap();
    assert_eq!(stored.body, b"Patient has a mild fever.");
    assert_eq!(stored.content_type, "text/plain");
    assert_eq!(h.transcriber.polls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_job_request_is_derived_from_the_upload() -> Result<()> {
    let h = harness(
        vec![JobStatus::Completed],
        Some("hello"),
        RecordingSummarizer::replying("hi"),
    );

    h.pipeline.run(&notification("medrecs", "calls/Visit%2B2.MP3")).await?;

    let request = &h.transcriber.requests()[0];
    assert!(request.job_id.starts_with("twilio-"));
    assert_eq!(request.source_uri, "s3://medrecs/calls/Visit+2.MP3");
    assert_eq!(request.media_format, MediaFormat::Mp3);
    assert_eq!(request.language_code, "en-US");
    assert_eq!(request.output, ObjectLocation::new("medrecs", format!("transcripts/{}.json", request.job_id)));

    let sent = h.summarizer.requests.lock().unwrap().clone();
    assert_eq!(sent, vec![SummaryRequest {
        model: "gpt-4o-mini".to_string(),
        system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        user_text: "hello".to_string(),
        max_output_tokens: 300,
    }]);
    Ok(())
}

#[tokio::test]
async fn test_polling_stops_at_first_completed() -> Result<()> {
    let h = harness(
        vec![JobStatus::Submitted, JobStatus::Completed, JobStatus::Failed("late".into()), JobStatus::InProgress],
        Some("text"),
        RecordingSummarizer::replying("summary"),
    );

    let result = h.pipeline.handle_event(&notification("medrecs", "a.wav")).await;

    assert!(result.is_success());
    assert_eq!(h.transcriber.polls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_failed_job_aborts_without_summary() -> Result<()> {
    let h = harness(
        vec![JobStatus::Failed("unsupported codec".into())],
        None,
        RecordingSummarizer::replying("never"),
    );

    let result = h.pipeline.handle_event(&notification("medrecs", "calls/visit1.wav")).await;

    assert_eq!(result, InvocationResult::error("Transcription failed"));
    assert_eq!(h.transcriber.polls(), 1);
    assert_eq!(h.summarizer.calls(), 0);
    assert!(h.store.keys_with_prefix("medrecs", "summaries/").is_empty());
    Ok(())
}

#[tokio::test]
async fn test_exhausted_budget_is_a_timeout() -> Result<()> {
    let h = harness(vec![JobStatus::InProgress], None, RecordingSummarizer::replying("never"));

    let audio = ObjectLocation::new("medrecs", "calls/visit1.wav");
    let err = h.pipeline.process(&audio, "twilio-slow").await.unwrap_err();

    match err {
        PipelineError::TranscriptionTimedOut { attempts, last_status } => {
            assert_eq!(attempts, 30);
            assert_eq!(last_status, JobStatus::InProgress);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(h.transcriber.polls(), 30);
    assert_eq!(h.summarizer.calls(), 0);
    assert!(h.store.keys_with_prefix("medrecs", "summaries/").is_empty());

    let result = h.pipeline.handle_event(&notification("medrecs", "calls/visit1.wav")).await;
    assert_eq!(
        result,
        InvocationResult::error("Transcription timed out after 30 status checks (last status IN_PROGRESS)")
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_transcript_field_is_an_error() -> Result<()> {
    let h = harness(vec![JobStatus::Completed], None, RecordingSummarizer::replying("never"));
    h.store
        .put("medrecs", "transcripts/twilio-x.json", serde_json::to_vec(&json!({ "results": { "transcripts": [] } }))?, "application/json")
        .await?;

    let err = h
        .pipeline
        .process(&ObjectLocation::new("medrecs", "a.wav"), "twilio-x")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::TranscriptMalformed(_)));
    assert_eq!(h.summarizer.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_absent_transcript_object_is_an_error() -> Result<()> {
    let h = harness(vec![JobStatus::Completed], None, RecordingSummarizer::replying("never"));

    let result = h.pipeline.handle_event(&notification("medrecs", "a.wav")).await;

    match result {
        InvocationResult::Error { error } => assert!(error.starts_with("Transcript not found")),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_summarizer_failure_writes_nothing() -> Result<()> {
    let h = harness(
        vec![JobStatus::Completed],
        Some("text"),
        RecordingSummarizer::failing("quota exceeded"),
    );

    let result = h.pipeline.handle_event(&notification("medrecs", "a.wav")).await;

    assert_eq!(result, InvocationResult::error("Summarization failed: quota exceeded"));
    assert!(h.store.keys_with_prefix("medrecs", "summaries/").is_empty());
    Ok(())
}

#[tokio::test]
async fn test_write_failure_is_reported() -> Result<()> {
    let inner = Arc::new(InMemoryObjectStore::new());
    let transcriber = Arc::new(ScriptedTranscriber::new(inner.clone(), vec![JobStatus::Completed], Some("text")));
    let pipeline = Pipeline::new(
        Arc::new(ReadOnlyStore(inner)),
        transcriber,
        Arc::new(RecordingSummarizer::replying("summary")),
        fast_config(),
    );

    let result = pipeline.handle_event(&notification("medrecs", "a.wav")).await;

    assert_eq!(result, InvocationResult::error("Failed to store summary: access denied"));
    Ok(())
}

#[tokio::test]
async fn test_bad_event_or_format_never_starts_a_job() -> Result<()> {
    let h = harness(vec![JobStatus::Completed], Some("text"), RecordingSummarizer::replying("s"));

    let result = h.pipeline.handle_event(&json!({ "Records": [] })).await;
    assert!(matches!(result, InvocationResult::Error { ref error } if error.starts_with("Invalid event")));

    let result = h.pipeline.handle_event(&notification("medrecs", "notes/visit.txt")).await;
    assert!(matches!(result, InvocationResult::Error { ref error } if error.starts_with("Unsupported media format")));

    let result = h.pipeline.handle_event(&notification("medrecs", "calls/visit")).await;
    assert!(matches!(result, InvocationResult::Error { ref error } if error.contains("no file extension")));

    assert!(h.transcriber.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_summary_reads_back_byte_identical() -> Result<()> {
    let summary = "Résumé: patient fébrile, 38.5°C. 患者发烧。\nFollow-up in 2 days.";
    let h = harness(vec![JobStatus::Completed], Some("text"), RecordingSummarizer::replying(summary));

    let location = h.pipeline.run(&notification("medrecs", "a.flac")).await?;

    let body = h.store.get(&location.container, &location.key).await?;
    assert_eq!(body, summary.as_bytes());
    Ok(())
}

#[test]
fn test_result_json_shapes() {
    let ok = InvocationResult::success(&ObjectLocation::new("medrecs", "summaries/j_summary.txt"));
    assert_eq!(
        serde_json::to_value(&ok).unwrap(),
        json!({ "status": "success", "summary_file": "s3://medrecs/summaries/j_summary.txt" })
    );

    let err = InvocationResult::error("Transcription failed");
    assert_eq!(serde_json::to_value(&err).unwrap(), json!({ "error": "Transcription failed" }));
}

#[test]
fn test_poll_ceiling() {
    assert_eq!(PollPolicy::default().ceiling(), Duration::from_secs(290));
}

#[tokio::test]
async fn test_event_file_runs_the_pipeline() -> Result<()> {
    let h = harness(
        vec![JobStatus::Completed],
        Some("Patient reports mild fever."),
        RecordingSummarizer::replying("Mild fever."),
    );
    let dir = tempfile::tempdir()?;

    let event_path = dir.path().join("upload.json");
    std::fs::write(&event_path, notification("medrecs", "calls/visit1.wav").to_string())?;
    let result = h.pipeline.handle_event_file(&event_path).await?;
    assert!(result.is_success());
    let job_id = h.transcriber.requests()[0].job_id.clone();
    assert_eq!(h.store.object("medrecs", &summary_key(&job_id)).unwrap().body, b"Mild fever.");

    let bad_event = dir.path().join("empty.json");
    std::fs::write(&bad_event, r#"{"Records": []}"#)?;
    assert_eq!(
        h.pipeline.handle_event_file(&bad_event).await?,
        InvocationResult::error("Invalid event: notification has no records")
    );

    let not_json = dir.path().join("notes.txt");
    std::fs::write(&not_json, "not an event")?;
    assert!(h.pipeline.handle_event_file(&not_json).await.is_err());
    assert!(h.pipeline.handle_event_file(&dir.path().join("missing.json")).await.is_err());
    Ok(())
}
