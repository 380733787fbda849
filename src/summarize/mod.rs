use async_trait::async_trait;
use anyhow::Result;

pub mod openai;

pub use openai::OpenAiSummarizer;

/// One summarization call: fixed instruction, the transcript, and an output budget.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_text: String,
    pub max_output_tokens: u32,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn complete(&self, request: SummaryRequest) -> Result<String>;
}
