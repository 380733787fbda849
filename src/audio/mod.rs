use rubato::{SincFixedIn, SincInterpolationParameters, WindowFunction, Resampler};
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::Command;
use anyhow::Result;
use tracing::info;

use crate::transcription::MediaFormat;

pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Decode a recording into mono 16 kHz samples in `[-1, 1]`.
///
/// Wav input is read straight from memory. Every other container is first
/// converted to 16-bit pcm wav with ffmpeg through a temporary file.
pub fn decode_to_pcm(data: &[u8], format: MediaFormat) -> Result<Vec<f32>> {
    let (samples, num_channels, sample_rate) = match format {
        MediaFormat::Wav => read_wav(data)?,
        other => {
            let wav = convert_with_ffmpeg(data, other)?;
            read_wav(&wav)?
        }
    };

    let mono = convert_to_mono(&samples, num_channels);
    let normalized = normalize_audio(&mono);

    if sample_rate != TARGET_SAMPLE_RATE {
        resample_audio(&normalized, sample_rate)
    } else {
        Ok(normalized)
    }
}

fn convert_with_ffmpeg(data: &[u8], format: MediaFormat) -> Result<Vec<u8>> {
    let mut input = tempfile::Builder::new()
        .suffix(&format!(".{}", format.extension()))
        .tempfile()?;
    input.write_all(data)?;
    input.flush()?;

    let output = tempfile::Builder::new().suffix(".wav").tempfile()?;
    info!("Converting {} audio to wav with ffmpeg", format);
    run_ffmpeg(input.path(), output.path())?;

    Ok(std::fs::read(output.path())?)
}

fn run_ffmpeg(input: &Path, output: &Path) -> Result<()> {
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(input)
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg(TARGET_SAMPLE_RATE.to_string())
        .arg(output)
        .status()
        .map_err(|e| anyhow::anyhow!("Failed to execute ffmpeg: {}", e))?;

    if !status.success() {
        return Err(anyhow::anyhow!("FFmpeg conversion failed with status: {}", status));
    }
    Ok(())
}

/// Samples, channel count and sample rate of a 16-bit integer wav.
fn read_wav(data: &[u8]) -> Result<(Vec<f32>, usize, u32)> {
    let reader = WavReader::new(Cursor::new(data))
        .map_err(|e| anyhow::anyhow!("Failed to read WAV data: {}", e))?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(anyhow::anyhow!(
            "Unsupported wav encoding: {:?} {} bits, expected 16-bit integer",
            spec.sample_format,
            spec.bits_per_sample
        ));
    }

    let samples = reader
        .into_samples::<i16>()
        .map(|s| s.map(|val| val as f32))
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| anyhow::anyhow!("Failed to read samples: {}", e))?;

    Ok((samples, spec.channels.max(1) as usize, spec.sample_rate))
}

fn convert_to_mono(samples: &[f32], num_channels: usize) -> Vec<f32> {
    if num_channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(num_channels)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

fn normalize_audio(samples: &[f32]) -> Vec<f32> {
    let max_abs = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if max_abs == 0.0 {
        return samples.to_vec();
    }
    samples.iter().map(|&s| s / max_abs).collect()
}

fn resample_audio(samples: &[f32], original_sample_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    info!("Resampling from {} Hz to {} Hz", original_sample_rate, TARGET_SAMPLE_RATE);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: rubato::SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        TARGET_SAMPLE_RATE as f64 / original_sample_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create resampler: {}", e))?;

    let mut resampled = resampler
        .process(&[samples.to_vec()], None)
        .map_err(|e| anyhow::anyhow!("Resampling failed: {}", e))?;

    Ok(resampled.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn wav_bytes(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_stereo_is_mixed_down_and_normalized() -> Result<()> {
        let data = wav_bytes(2, TARGET_SAMPLE_RATE, &[1000, 3000, -4000, -4000, 0, 0]);
        let pcm = decode_to_pcm(&data, MediaFormat::Wav)?;

        assert_eq!(pcm.len(), 3);
        assert!((pcm[0] - 0.5).abs() < 1e-6);
        assert!((pcm[1] + 1.0).abs() < 1e-6);
        assert_eq!(pcm[2], 0.0);
        Ok(())
    }

    #[test]
    fn test_silence_stays_silent() -> Result<()> {
        let data = wav_bytes(1, TARGET_SAMPLE_RATE, &[0; 16]);
        let pcm = decode_to_pcm(&data, MediaFormat::Wav)?;
        assert!(pcm.iter().all(|&s| s == 0.0));
        Ok(())
    }

    #[test]
    fn test_resamples_to_target_rate() -> Result<()> {
        let tone: Vec<i16> = (0..8000)
            .map(|i| ((i as f32 * 0.05).sin() * 10000.0) as i16)
            .collect();
        let data = wav_bytes(1, 8000, &tone);
        let pcm = decode_to_pcm(&data, MediaFormat::Wav)?;

        let expected = 16000.0;
        let ratio = pcm.len() as f64 / expected;
        assert!((0.9..1.1).contains(&ratio), "got {} samples", pcm.len());
        Ok(())
    }

    #[test]
    fn test_rejects_non_wav_bytes() {
        assert!(decode_to_pcm(b"not a wav file", MediaFormat::Wav).is_err());
    }
}
