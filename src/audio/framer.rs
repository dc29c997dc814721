use ringbuf::traits::{Consumer, Observer};
use ringbuf::HeapCons;
use rubato::{FftFixedIn, Resampler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Samples per delivered frame (mono, 16 kHz).
pub const FRAME_SAMPLES: usize = 4096;

/// Rate every delivered frame is normalized to.
pub const CAPTURE_RATE: u32 = 16_000;

const RESAMPLE_CHUNK: usize = 1024;
const RESAMPLE_SUB_CHUNKS: usize = 2;

/// Handle to the frame-assembly thread. Stopping twice is a no-op.
pub struct FramerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FramerHandle {
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for FramerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pop device-rate samples off the capture ring, normalize to fixed
/// 4096-sample 16 kHz frames, and hand each frame to `handler` in arrival
/// order. No backlog is kept beyond the ring itself: a slow handler delays
/// the pop loop and the ring drops the overflow at the producer side.
pub fn spawn_framer<F>(consumer: HeapCons<f32>, device_rate: u32, handler: F) -> FramerHandle
where
    F: FnMut(&[f32]) + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let thread = std::thread::spawn(move || {
        if device_rate == CAPTURE_RATE {
            run_direct(consumer, stop_flag, handler);
        } else {
            run_resampled(consumer, device_rate, stop_flag, handler);
        }
    });
    FramerHandle {
        stop,
        thread: Some(thread),
    }
}

fn run_direct<F>(mut consumer: HeapCons<f32>, stop: Arc<AtomicBool>, mut handler: F)
where
    F: FnMut(&[f32]),
{
    info!("Framer started (direct, {}Hz)", CAPTURE_RATE);
    let mut frame = vec![0.0f32; FRAME_SAMPLES];

    while !stop.load(Ordering::SeqCst) {
        if consumer.occupied_len() < FRAME_SAMPLES {
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }
        let _ = consumer.pop_slice(&mut frame);
        handler(&frame);
    }
    debug!("Framer exiting");
}

fn run_resampled<F>(
    mut consumer: HeapCons<f32>,
    device_rate: u32,
    stop: Arc<AtomicBool>,
    mut handler: F,
) where
    F: FnMut(&[f32]),
{
    info!(
        "Framer started (resampling {}Hz -> {}Hz)",
        device_rate, CAPTURE_RATE
    );

    let mut resampler = match FftFixedIn::<f32>::new(
        device_rate as usize,
        CAPTURE_RATE as usize,
        RESAMPLE_CHUNK,
        RESAMPLE_SUB_CHUNKS,
        1,
    ) {
        Ok(r) => r,
        Err(e) => {
            error!("failed to construct resampler: {}", e);
            return;
        }
    };

    let mut in_buf = vec![0.0f32; RESAMPLE_CHUNK];
    let mut pending: Vec<f32> = Vec::with_capacity(FRAME_SAMPLES * 2);

    while !stop.load(Ordering::SeqCst) {
        let need = resampler.input_frames_next();
        if consumer.occupied_len() < need {
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }

        in_buf.resize(need, 0.0);
        let _ = consumer.pop_slice(&mut in_buf);

        match resampler.process(&[&in_buf], None) {
            Ok(out) => pending.extend_from_slice(&out[0]),
            Err(e) => {
                warn!("resampler error, dropping chunk: {}", e);
                continue;
            }
        }

        while pending.len() >= FRAME_SAMPLES {
            let frame: Vec<f32> = pending.drain(..FRAME_SAMPLES).collect();
            handler(&frame);
        }
    }
    debug!("Framer exiting");
}
