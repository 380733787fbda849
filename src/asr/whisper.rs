use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::asr::{AsrEngine, AsrParams, AudioClip, TranscribeResult, TranscribeSegment};
use crate::audio;

/// Local whisper.cpp model.
pub struct WhisperAsr {
    whisper_ctx: Arc<WhisperContext>,
}

impl WhisperAsr {
    pub fn new(model_path: &str) -> Result<Self> {
        match WhisperContext::new_with_params(model_path, WhisperContextParameters::default()) {
            Ok(whisper_ctx) => Ok(Self { whisper_ctx: Arc::new(whisper_ctx) }),
            Err(e) => Err(anyhow::anyhow!("failed to open whisper model: {}", e)),
        }
    }

    fn build_params<'a>(ap: &AsrParams, language: &'a str) -> FullParams<'a, 'a> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_language(Some(language));
        params.set_tdrz_enable(ap.speaker_diarization);
        // lower temperature keeps call transcripts deterministic
        params.set_temperature(0.3);
        params.set_n_threads(8);
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_no_context(false);
        params.set_single_segment(false);
        params.set_suppress_blank(true);
        params.set_suppress_non_speech_tokens(true);
        params.set_duration_ms(0);
        params.set_max_initial_ts(1.0);

        params
    }

    fn run(ctx: &WhisperContext, samples: &[f32], params: &AsrParams) -> Result<TranscribeResult> {
        let mut state = ctx.create_state()?;
        let language = params.language_tag().unwrap_or_else(|| "en".to_string());
        let full_params = Self::build_params(params, &language);

        state.full(full_params, samples)?;
        let num_segments = state.full_n_segments()?;

        let mut segments = Vec::new();
        let mut full_text = String::new();
        let mut current_speaker = 0;

        for i in 0..num_segments {
            let text = state.full_get_segment_text(i)?;
            let start = state.full_get_segment_t0(i)?;
            let end = state.full_get_segment_t1(i)?;

            if i > 0 && state.full_get_segment_speaker_turn_next(i - 1) {
                current_speaker += 1;
            }

            full_text.push_str(&text);
            segments.push(TranscribeSegment {
                text,
                speaker_id: current_speaker,
                // whisper timestamps are in 10ms units
                start: start as f64 / 100.0,
                end: end as f64 / 100.0,
            });
        }

        Ok(TranscribeResult {
            segments,
            full_text: full_text.trim().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl AsrEngine for WhisperAsr {
    async fn transcribe(&self, audio: AudioClip, params: AsrParams) -> Result<TranscribeResult> {
        let ctx = self.whisper_ctx.clone();
        let result = tokio::task::spawn_blocking(move || {
            let samples = audio::decode_to_pcm(&audio.data, audio.format)?;
            info!("Decoded {} samples at {} Hz", samples.len(), audio::TARGET_SAMPLE_RATE);
            Self::run(&ctx, &samples, &params)
        })
        .await??;
        Ok(result)
    }
}
