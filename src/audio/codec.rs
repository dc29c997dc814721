//! PCM conversions between the capture/playback float domain and the 16-bit
//! little-endian wire format the realtime endpoint speaks.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;

pub const CAPTURE_MIME: &str = "audio/pcm;rate=16000";
pub const PLAYBACK_RATE: u32 = 24_000;

/// Chunk-local faults. A bad chunk is dropped and the session continues;
/// these never tear a session down.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("malformed base64 audio payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("pcm payload of {len} bytes does not align to {channels}-channel 16-bit frames")]
    MalformedAudio { len: usize, channels: u16 },
}

/// One capture frame, encoded for transmission.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

/// A decoded audio chunk shaped for the playback scheduler.
#[derive(Debug, Clone)]
pub struct PlayableBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PlayableBuffer {
    /// Duration in whole timeline frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Quantize float samples to PCM16-LE. Total over all inputs: out-of-range
/// samples clamp, NaN maps to zero via the clamp.
pub fn encode_frame(samples: &[f32]) -> EncodedFrame {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let s = if s.is_nan() { 0.0 } else { s.clamp(-1.0, 1.0) };
        // Asymmetric scaling: the i16 range is [-32768, 32767].
        let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
        let q = scaled.round() as i16;
        data.extend_from_slice(&q.to_le_bytes());
    }
    EncodedFrame {
        data,
        mime_type: CAPTURE_MIME,
    }
}

/// Strict base64 decode of an audio payload. Malformed text is an error the
/// caller must handle; it is never substituted with silence.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, AudioError> {
    Ok(BASE64.decode(payload)?)
}

/// Reinterpret PCM16-LE bytes as float samples in [-1, 1].
pub fn playable_buffer(
    bytes: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<PlayableBuffer, AudioError> {
    let frame_bytes = 2 * channels.max(1) as usize;
    if bytes.len() % frame_bytes != 0 {
        return Err(AudioError::MalformedAudio {
            len: bytes.len(),
            channels,
        });
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect();

    Ok(PlayableBuffer {
        samples,
        sample_rate,
        channels,
    })
}

/// Sample rate declared by a `audio/pcm;rate=NNN` tag. Chunks without a
/// parseable rate fall back to the endpoint's 24 kHz output rate.
pub fn rate_from_mime(mime: &str) -> u32 {
    mime.split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .filter_map(|r| r.parse().ok())
        .next()
        .unwrap_or(PLAYBACK_RATE)
}
