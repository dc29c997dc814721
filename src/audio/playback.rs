//! Gapless playback of streamed audio chunks.
//!
//! The scheduler is pure sample-domain state: a monotonically advancing clock
//! (frames rendered so far), a timeline cursor (`next_start`), and the set of
//! scheduled sources still in flight. The engine wraps one scheduler in a
//! mutex behind a cpal output stream; the render callback is the only place
//! the clock advances, and finished sources remove themselves there.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, error, info, trace};

use super::codec::PlayableBuffer;
use crate::error::VoiceError;

struct ScheduledSource {
    id: u64,
    start: u64,
    samples: Vec<f32>,
}

impl ScheduledSource {
    fn end(&self) -> u64 {
        self.start + self.samples.len() as u64
    }
}

/// Timeline state for one session cycle. All positions are in frames at the
/// output rate; `clock <= next_start` except transiently inside `schedule`.
pub struct PlaybackScheduler {
    clock: u64,
    next_start: u64,
    sources: Vec<ScheduledSource>,
    next_id: u64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            clock: 0,
            next_start: 0,
            sources: Vec::new(),
            next_id: 0,
        }
    }

    /// Frames rendered since the timeline began.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn active_sources(&self) -> usize {
        self.sources.len()
    }

    /// Place a chunk on the timeline: back-to-back with the previous chunk,
    /// but never before the clock. Returns the chosen start position.
    pub fn schedule(&mut self, samples: Vec<f32>) -> u64 {
        let start = self.next_start.max(self.clock);
        self.next_start = start + samples.len() as u64;
        let id = self.next_id;
        self.next_id += 1;
        trace!(
            "scheduled source {} at frame {} ({} frames)",
            id,
            start,
            samples.len()
        );
        self.sources.push(ScheduledSource { id, start, samples });
        start
    }

    /// Mix every live source into `out` (mono) and advance the clock.
    /// Sources whose end has been rendered drop out of the active set here;
    /// nothing polls them from outside.
    pub fn mix_into(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let window_start = self.clock;
        let window_end = self.clock + out.len() as u64;

        for src in &self.sources {
            if src.start >= window_end || src.end() <= window_start {
                continue;
            }
            let from = src.start.max(window_start);
            let to = src.end().min(window_end);
            for pos in from..to {
                let out_idx = (pos - window_start) as usize;
                let src_idx = (pos - src.start) as usize;
                out[out_idx] += src.samples[src_idx];
            }
        }

        self.clock = window_end;
        self.sources.retain(|s| {
            let done = s.end() <= window_end;
            if done {
                trace!("source {} finished", s.id);
            }
            !done
        });
    }

    /// Forced stop: silence everything immediately and reset the cursor to
    /// the current clock so the next session starts clean.
    pub fn stop_all(&mut self) {
        let dropped = self.sources.len();
        self.sources.clear();
        self.next_start = self.clock;
        if dropped > 0 {
            debug!("stopped {} active playback sources", dropped);
        }
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Output engine: one scheduler shared with a cpal output stream living on
/// its own thread (cpal streams are not `Send`). `shutdown` is idempotent.
pub struct PlaybackEngine {
    shared: Arc<Mutex<PlaybackScheduler>>,
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Open the default output device at the given rate and start rendering.
    /// Blocks until the stream is live or failed.
    pub fn start(sample_rate: u32) -> Result<Self, VoiceError> {
        let shared = Arc::new(Mutex::new(PlaybackScheduler::new()));
        let render_state = shared.clone();

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = std::thread::spawn(move || {
            playback_thread(render_state, sample_rate, ready_tx, stop_rx)
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Playback engine live at {}Hz", sample_rate);
                Ok(Self {
                    shared,
                    stop_tx: Some(stop_tx),
                    thread: Some(thread),
                })
            }
            Ok(Err(msg)) => {
                let _ = thread.join();
                Err(VoiceError::PlaybackUnavailable(msg))
            }
            Err(_) => Err(VoiceError::PlaybackUnavailable(
                "playback thread exited before reporting readiness".to_string(),
            )),
        }
    }

    /// Schedule a decoded chunk for gapless playback. Multi-channel buffers
    /// are downmixed; the live endpoint sends mono.
    pub fn enqueue(&self, buffer: PlayableBuffer) {
        let samples = if buffer.channels <= 1 {
            buffer.samples
        } else {
            let ch = buffer.channels as usize;
            buffer
                .samples
                .chunks(ch)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };
        if let Ok(mut sched) = self.shared.lock() {
            sched.schedule(samples);
        }
    }

    pub fn stop_all(&self) {
        if let Ok(mut sched) = self.shared.lock() {
            sched.stop_all();
        }
    }

    pub fn active_sources(&self) -> usize {
        self.shared.lock().map(|s| s.active_sources()).unwrap_or(0)
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn playback_thread(
    shared: Arc<Mutex<PlaybackScheduler>>,
    sample_rate: u32,
    ready_tx: mpsc::Sender<Result<(), String>>,
    stop_rx: mpsc::Receiver<()>,
) {
    let host = cpal::default_host();
    let device = match host.default_output_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err("no output device available".to_string()));
            return;
        }
    };
    info!("Audio output device: {}", device.name().unwrap_or_default());

    // Any range covering the requested rate will do; prefer the fewest
    // channels since we render mono and duplicate.
    let ranges = match device.supported_output_configs() {
        Ok(r) => r,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("device rejected config query: {}", e)));
            return;
        }
    };
    let mut candidates: Vec<_> = ranges
        .filter(|r| {
            r.min_sample_rate().0 <= sample_rate
                && r.max_sample_rate().0 >= sample_rate
                && r.sample_format() == cpal::SampleFormat::F32
        })
        .collect();
    candidates.sort_by_key(|r| r.channels());

    let config = match candidates.into_iter().next() {
        Some(r) => r.with_sample_rate(cpal::SampleRate(sample_rate)),
        None => {
            let _ = ready_tx.send(Err(format!(
                "output device does not support {}Hz f32 playback",
                sample_rate
            )));
            return;
        }
    };

    let channels = config.channels() as usize;
    let err_fn = |err| error!("playback stream error: {}", err);
    let mut mono: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &_| {
            let frames = data.len() / channels.max(1);
            mono.resize(frames, 0.0);
            if let Ok(mut sched) = shared.lock() {
                sched.mix_into(&mut mono);
            } else {
                mono.fill(0.0);
            }
            for (i, frame) in data.chunks_mut(channels.max(1)).enumerate() {
                frame.fill(mono[i]);
            }
        },
        err_fn,
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to open output stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("failed to start output stream: {}", e)));
        return;
    }

    let _ = ready_tx.send(Ok(()));
    let _ = stop_rx.recv();
    info!("Playback thread exiting");
}
