//! Decoding of object-store upload notifications.
//!
//! Only the first record of a notification is consulted. Keys arrive
//! form-encoded (`+` for space, `%XX` escapes) and are decoded to their
//! literal form.

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineError;
use crate::storage::object::ObjectLocation;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3EventRecord {
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Entity {
    pub bucket: Option<S3Bucket>,
    pub object: Option<S3Object>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Bucket {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Object {
    pub key: Option<String>,
}

/// Extract the audio location from a raw notification payload.
pub fn decode_event(payload: &serde_json::Value) -> Result<ObjectLocation, PipelineError> {
    let event: S3Event = serde_json::from_value(payload.clone())
        .map_err(|e| PipelineError::InvalidEvent(format!("malformed notification: {}", e)))?;
    audio_location(&event)
}

pub fn audio_location(event: &S3Event) -> Result<ObjectLocation, PipelineError> {
    let record = event
        .records
        .first()
        .ok_or_else(|| PipelineError::InvalidEvent("notification has no records".to_string()))?;

    let entity = record
        .s3
        .as_ref()
        .ok_or_else(|| PipelineError::InvalidEvent("record has no s3 entity".to_string()))?;

    let container = entity
        .bucket
        .as_ref()
        .and_then(|b| b.name.as_deref())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PipelineError::InvalidEvent("record has no bucket name".to_string()))?;

    let raw_key = entity
        .object
        .as_ref()
        .and_then(|o| o.key.as_deref())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| PipelineError::InvalidEvent("record has no object key".to_string()))?;

    let key = decode_key(raw_key)?;
    Ok(ObjectLocation::new(container, key))
}

/// Form-decode an object key: `+` becomes a space, then `%XX` escapes are resolved.
pub fn decode_key(raw: &str) -> Result<String, PipelineError> {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced)
        .map_err(|e| PipelineError::InvalidEvent(format!("object key is not valid utf-8: {}", e)))?;
    if decoded.is_empty() {
        return Err(PipelineError::InvalidEvent("object key decodes to nothing".to_string()));
    }
    Ok(decoded.into_owned())
}
