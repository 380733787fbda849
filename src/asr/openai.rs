use async_trait::async_trait;
use anyhow::Result;
use reqwest::multipart;
use serde::Deserialize;
use tracing::{debug, info};

use super::{AsrEngine, AsrParams, AudioClip, TranscribeResult};

/// Speech-to-text through the hosted `/audio/transcriptions` endpoint.
pub struct OpenAiAsr {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiAsr {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl AsrEngine for OpenAiAsr {
    async fn transcribe(&self, audio: AudioClip, params: AsrParams) -> Result<TranscribeResult> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let file_part = multipart::Part::bytes(audio.data)
            .file_name(format!("audio.{}", audio.format.extension()))
            .mime_str(audio.format.mime_type())
            .map_err(|e| anyhow::anyhow!("Invalid audio mime type: {}", e))?;

        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", file_part);
        if let Some(language) = params.language_tag() {
            form = form.text("language", language);
        }

        debug!("Sending {} audio to {}", audio.format, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Transcription request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(anyhow::anyhow!("Transcription API error ({}): {}", status, body));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse transcription response: {}", e))?;

        info!("Transcription completed ({} chars)", body.text.len());

        Ok(TranscribeResult {
            segments: Vec::new(),
            full_text: body.text.trim().to_string(),
        })
    }
}
