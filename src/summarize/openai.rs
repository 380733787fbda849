use async_trait::async_trait;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Summarizer, SummaryRequest};

pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiSummarizer {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn chat_body(request: &SummaryRequest) -> ChatRequest<'_> {
    ChatRequest {
        model: &request.model,
        messages: vec![
            ChatMessage { role: "system", content: &request.system_prompt },
            ChatMessage { role: "user", content: &request.user_text },
        ],
        max_tokens: request.max_output_tokens,
    }
}

fn first_reply(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow::anyhow!("Completion response has no message content"))
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn complete(&self, request: SummaryRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Requesting summary from {} with model {}", url, request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&chat_body(&request))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Completion request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error body".to_string());
            return Err(anyhow::anyhow!("Completion API error ({}): {}", status, body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse completion response: {}", e))?;
        let summary = first_reply(parsed)?;

        info!("Summary generated ({} chars)", summary.len());
        Ok(summary)
    }
}
