//! ═══════════════════════════════════════════════════════════════════════════════
//! AUDIO — Speech Payload Decoding and Output
//! ═══════════════════════════════════════════════════════════════════════════════
//! TTS answers arrive as base64 16-bit little-endian mono PCM at 24 kHz.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::info;

use crate::error::{GatewayError, GatewayResult};

pub const TTS_SAMPLE_RATE: u32 = 24_000;

/// Decode a base64 PCM16LE payload. A trailing odd byte is dropped.
pub fn decode_pcm16(payload: &str) -> GatewayResult<Vec<i16>> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| GatewayError::Decode(format!("audio payload is not base64: {}", e)))?;
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Where decoded speech goes
pub trait AudioSink {
    fn play(&self, samples: &[i16], sample_rate: u32) -> GatewayResult<()>;
}

/// Discards audio
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, _samples: &[i16], _sample_rate: u32) -> GatewayResult<()> {
        Ok(())
    }
}

/// Writes each utterance to a mono 16-bit WAV file
#[derive(Debug, Clone)]
pub struct WavSink {
    dir: PathBuf,
}

impl WavSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
        let tag = uuid::Uuid::new_v4().simple().to_string();
        self.dir.join(format!("jarvis-{}-{}.wav", stamp, &tag[..8]))
    }

    /// Write samples and return the file path
    pub fn write(&self, samples: &[i16], sample_rate: u32) -> GatewayResult<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(playback)?;
        let path = self.next_path();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).map_err(playback)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(playback)?;
        }
        writer.finalize().map_err(playback)?;
        Ok(path)
    }
}

fn playback(err: impl std::fmt::Display) -> GatewayError {
    GatewayError::Playback(err.to_string())
}

impl AudioSink for WavSink {
    fn play(&self, samples: &[i16], sample_rate: u32) -> GatewayResult<()> {
        let path = self.write(samples, sample_rate)?;
        info!(path = %path.display(), samples = samples.len(), "speech written");
        Ok(())
    }
}
