//! Console microphone check: exercises the capture pipeline without opening a
//! live session, showing a level meter and optionally dumping the take to a
//! WAV file for inspection.

use std::io::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

use super::capture::open_capture;
use super::framer::{spawn_framer, CAPTURE_RATE};
use crate::error::VoiceError;

/// Root-mean-square level of one frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f32 = frame.iter().map(|s| s * s).sum();
    (sum / frame.len() as f32).sqrt()
}

fn level_bar(value: f32, width: usize) -> String {
    // RMS of normal speech sits well under 1.0; scale up so the bar moves.
    let filled = ((value * 4.0).min(1.0) * width as f32) as usize;
    let mut bar = String::with_capacity(width);
    for i in 0..width {
        bar.push(if i < filled { '#' } else { '.' });
    }
    bar
}

/// Run the mic check for `seconds`, printing a live meter. Blocking; callers
/// on the async side should wrap this in `spawn_blocking`.
pub fn run_mic_check(seconds: u64, wav_dump: Option<&Path>) -> Result<(), VoiceError> {
    let (mut capture, consumer) = open_capture()?;
    let rate = capture.sample_rate;

    let recorded: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();
    let keep = wav_dump.is_some();

    let mut framer = spawn_framer(consumer, rate, move |frame| {
        let level = rms(frame);
        let db = 20.0 * level.max(1e-6).log10();
        print!("\r  mic [{}] {:>6.1} dB", level_bar(level, 30), db);
        let _ = std::io::stdout().flush();
        if keep {
            if let Ok(mut buf) = sink.lock() {
                buf.extend_from_slice(frame);
            }
        }
    });

    std::thread::sleep(Duration::from_secs(seconds));
    framer.stop();
    capture.stop();
    println!();

    if let Some(path) = wav_dump {
        let samples = recorded.lock().map(|b| b.clone()).unwrap_or_default();
        write_wav(path, &samples).map_err(|e| {
            VoiceError::Config(format!("could not write {}: {}", path.display(), e))
        })?;
        info!("Mic check recording written to {}", path.display());
    }

    Ok(())
}

fn write_wav(path: &Path, samples: &[f32]) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: CAPTURE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * 32767.0) as i16)?;
    }
    writer.finalize()
}
