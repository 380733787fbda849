use serde_json::Value;

use crate::storage::object::{ObjectLocation, ObjectStore};
use super::PipelineError;

const TRANSCRIPT_PATH: &str = "results.transcripts[0].transcript";

/// Read the transcription output object and pull out the plain text.
pub async fn fetch_transcript(
    store: &dyn ObjectStore,
    location: &ObjectLocation,
) -> Result<String, PipelineError> {
    let body = store
        .get(&location.container, &location.key)
        .await
        .map_err(|e| PipelineError::TranscriptMissing(format!("{}: {}", location, e)))?;
    extract_transcript(&body)
}

pub fn extract_transcript(body: &[u8]) -> Result<String, PipelineError> {
    let json: Value = serde_json::from_slice(body)
        .map_err(|e| PipelineError::TranscriptMalformed(format!("not valid JSON: {}", e)))?;

    let transcripts = json
        .get("results")
        .and_then(|results| results.get("transcripts"))
        .and_then(Value::as_array)
        .ok_or_else(|| missing("results.transcripts"))?;

    let first = transcripts
        .first()
        .ok_or_else(|| PipelineError::TranscriptMalformed("results.transcripts is empty".to_string()))?;

    first
        .get("transcript")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing(TRANSCRIPT_PATH))
}

fn missing(path: &str) -> PipelineError {
    PipelineError::TranscriptMalformed(format!("missing {}", path))
}
