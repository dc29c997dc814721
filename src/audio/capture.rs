use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

use crate::error::VoiceError;

/// Ring sized for over a second of device-rate audio; overrun drops samples
/// rather than blocking the device callback.
const RING_CAPACITY: usize = 65_536;

/// Preferred capture rates, best first. 16 kHz is what the wire wants; any
/// other rate goes through the framer's resampler.
const TARGET_RATES: [u32; 5] = [16_000, 48_000, 44_100, 32_000, 8_000];

/// Handle to the thread that owns the microphone stream (cpal streams are not
/// `Send`, so the stream lives and dies on its own thread). Dropping the
/// handle stops the device track; calling `stop` twice is a no-op.
pub struct CaptureHandle {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    pub sample_rate: u32,
}

impl CaptureHandle {
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Acquire the default microphone and start pumping mono f32 samples into the
/// returned consumer. Blocks until the device is live or acquisition failed;
/// denial/absence of a device surfaces as `PermissionDenied`.
pub fn open_capture() -> Result<(CaptureHandle, HeapCons<f32>), VoiceError> {
    let rb = HeapRb::<f32>::new(RING_CAPACITY);
    let (producer, consumer) = rb.split();

    let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let thread = std::thread::spawn(move || capture_thread(producer, ready_tx, stop_rx));

    match ready_rx.recv() {
        Ok(Ok(sample_rate)) => {
            info!("Microphone live at {}Hz", sample_rate);
            Ok((
                CaptureHandle {
                    stop_tx: Some(stop_tx),
                    thread: Some(thread),
                    sample_rate,
                },
                consumer,
            ))
        }
        Ok(Err(msg)) => {
            let _ = thread.join();
            Err(VoiceError::PermissionDenied(msg))
        }
        Err(_) => Err(VoiceError::PermissionDenied(
            "capture thread exited before reporting readiness".to_string(),
        )),
    }
}

fn capture_thread(
    mut producer: HeapProd<f32>,
    ready_tx: mpsc::Sender<Result<u32, String>>,
    stop_rx: mpsc::Receiver<()>,
) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err("no input device available".to_string()));
            return;
        }
    };
    info!("Audio input device: {}", device.name().unwrap_or_default());

    // Look for a config range covering a preferred rate, best rate first.
    let mut selected = None;
    for &rate in &TARGET_RATES {
        let ranges = match device.supported_input_configs() {
            Ok(r) => r,
            Err(e) => {
                let _ = ready_tx.send(Err(format!("device rejected config query: {}", e)));
                return;
            }
        };
        for range in ranges {
            if range.min_sample_rate().0 <= rate && range.max_sample_rate().0 >= rate {
                selected = Some(range.with_sample_rate(cpal::SampleRate(rate)));
                break;
            }
        }
        if selected.is_some() {
            break;
        }
    }

    let config = match selected {
        Some(c) => c,
        None => match device.default_input_config() {
            Ok(c) => c,
            Err(e) => {
                let _ = ready_tx.send(Err(format!("no usable input config: {}", e)));
                return;
            }
        },
    };

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    info!(
        "Capture config: rate={}Hz channels={} format={:?}",
        sample_rate,
        channels,
        config.sample_format()
    );

    let err_fn = |err| error!("capture stream error: {}", err);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config.into(),
            move |data: &[f32], _: &_| push_mono(data, channels, &mut producer),
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config.into(),
            move |data: &[i16], _: &_| {
                let mut buf = Vec::with_capacity(data.len() / channels.max(1));
                for frame in data.chunks(channels.max(1)) {
                    let sum: f32 = frame.iter().map(|&s| s as f32 / i16::MAX as f32).sum();
                    buf.push(sum / frame.len() as f32);
                }
                if producer.push_slice(&buf) < buf.len() {
                    warn!("capture ring overrun; dropping samples");
                }
            },
            err_fn,
            None,
        ),
        other => {
            let _ = ready_tx.send(Err(format!("unsupported sample format {:?}", other)));
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to open input stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("failed to start input stream: {}", e)));
        return;
    }

    let _ = ready_tx.send(Ok(sample_rate));

    // Park until teardown; the stream drops (and the track stops) on exit.
    let _ = stop_rx.recv();
    info!("Capture thread exiting");
}

fn push_mono(input: &[f32], channels: usize, producer: &mut HeapProd<f32>) {
    if channels <= 1 {
        producer.push_slice(input);
        return;
    }
    for frame in input.chunks(channels) {
        let sum: f32 = frame.iter().sum();
        let _ = producer.try_push(sum / frame.len() as f32);
    }
}
