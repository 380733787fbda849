use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use anyhow::Result;

use crate::pipeline::{
    PipelineConfig, PollPolicy, DEFAULT_JOB_PREFIX, DEFAULT_LANGUAGE_CODE,
    DEFAULT_MAX_SUMMARY_TOKENS, DEFAULT_SUMMARY_MODEL, DEFAULT_SYSTEM_PROMPT,
};
use crate::transcription::local::DEFAULT_JOB_RETENTION;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_STORAGE_ROOT: &str = "./recap_data/buckets";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_WHISPER_MODEL: &str = "./models/ggml-large-v3.bin";
const DEFAULT_TRANSCRIBE_MODEL: &str = "whisper-1";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7200";

#[derive(Debug, Clone, PartialEq)]
pub enum AsrEngineKind {
    OpenAi,
    Whisper,
}

impl FromStr for AsrEngineKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "whisper" => Ok(Self::Whisper),
            _ => Err(anyhow::anyhow!("Unknown ASR engine: {}", s)),
        }
    }
}

/// Startup settings, read once from the process environment and `.env`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub pipeline: PipelineConfig,
    pub storage_root: PathBuf,
    pub log_dir: String,
    pub asr_engine: AsrEngineKind,
    pub whisper_model: String,
    pub transcribe_model: String,
    pub listen_addr: SocketAddr,
    pub job_retention: Duration,
    pub speaker_diarization: bool,
}

/// Process environment first, then `.env`.
fn lookup(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) => Some(value),
        Err(_) => dotenv::var(key).ok(),
    }
}

fn string_or(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key).filter(|value| !value.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", key, raw, e)),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(lookup)
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let openai_api_key = get("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;

        let max_attempts: u32 = parse_or(&get, "RECAP_POLL_MAX_ATTEMPTS", 30)?;
        if max_attempts == 0 {
            return Err(anyhow::anyhow!("RECAP_POLL_MAX_ATTEMPTS must be at least 1"));
        }
        let interval_secs: u64 = parse_or(&get, "RECAP_POLL_INTERVAL_SECS", 10)?;
        if interval_secs == 0 {
            return Err(anyhow::anyhow!("RECAP_POLL_INTERVAL_SECS must be at least 1"));
        }
        // A finished job has to outlive the gap until the next status check.
        let retention_secs: u64 = parse_or(&get, "RECAP_JOB_RETENTION_SECS", DEFAULT_JOB_RETENTION.as_secs())?;
        if retention_secs < interval_secs {
            return Err(anyhow::anyhow!(
                "RECAP_JOB_RETENTION_SECS ({}) must not be shorter than RECAP_POLL_INTERVAL_SECS ({})",
                retention_secs,
                interval_secs
            ));
        }

        let pipeline = PipelineConfig {
            language_code: string_or(&get, "RECAP_LANGUAGE_CODE", DEFAULT_LANGUAGE_CODE),
            job_prefix: string_or(&get, "RECAP_JOB_PREFIX", DEFAULT_JOB_PREFIX),
            model: string_or(&get, "RECAP_SUMMARY_MODEL", DEFAULT_SUMMARY_MODEL),
            system_prompt: string_or(&get, "RECAP_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            max_output_tokens: parse_or(&get, "RECAP_MAX_SUMMARY_TOKENS", DEFAULT_MAX_SUMMARY_TOKENS)?,
            poll: PollPolicy::new(Duration::from_secs(interval_secs), max_attempts),
        };

        Ok(Self {
            openai_api_key,
            openai_base_url: string_or(&get, "OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            pipeline,
            storage_root: PathBuf::from(string_or(&get, "RECAP_STORAGE_ROOT", DEFAULT_STORAGE_ROOT)),
            log_dir: string_or(&get, "RECAP_LOG_DIR", DEFAULT_LOG_DIR),
            asr_engine: parse_or(&get, "RECAP_ASR_ENGINE", AsrEngineKind::OpenAi)?,
            whisper_model: string_or(&get, "RECAP_WHISPER_MODEL", DEFAULT_WHISPER_MODEL),
            transcribe_model: string_or(&get, "RECAP_TRANSCRIBE_MODEL", DEFAULT_TRANSCRIBE_MODEL),
            listen_addr: parse_or(&get, "RECAP_LISTEN_ADDR", DEFAULT_LISTEN_ADDR.parse::<SocketAddr>()?)?,
            job_retention: Duration::from_secs(retention_secs),
            speaker_diarization: parse_or(&get, "RECAP_SPEAKER_DIARIZATION", false)?,
        })
    }
}
