//! Async driver for the voice session: owns the real resources (capture,
//! playback, live transport), executes the actions the controller decides on,
//! and feeds async completions back into it as events. The controller never
//! touches I/O; the driver never decides transitions.

use ringbuf::HeapCons;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use super::controller::{Action, SessionController, SessionEvent, SessionState};
use super::event::{ChatMessage, StreamEvent};
use crate::audio::capture::{open_capture, CaptureHandle};
use crate::audio::codec;
use crate::audio::framer::{spawn_framer, FramerHandle};
use crate::audio::playback::PlaybackEngine;
use crate::config::Settings;
use crate::error::VoiceError;
use crate::live::transport::LiveSession;

/// Front-end requests.
#[derive(Debug)]
pub enum VoiceCommand {
    Start,
    Stop,
}

/// Snapshot published to the front-end after every step: the state drives
/// the call-button affordance, the error (if any) the failure indicator.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub state: SessionState,
    pub error: Option<String>,
}

/// Results of async acquisitions, fed back into the select loop so a stop
/// request can overtake a resolution in flight.
enum DriverEvent {
    AudioDone(Result<AudioResources, VoiceError>),
    TransportDone(Result<(LiveSession, mpsc::Receiver<StreamEvent>), VoiceError>),
}

struct AudioResources {
    playback: PlaybackEngine,
    capture: CaptureHandle,
    consumer: HeapCons<f32>,
}

pub struct VoiceDriver {
    controller: SessionController,
    settings: Settings,

    cmd_rx: mpsc::Receiver<VoiceCommand>,
    messages_tx: mpsc::Sender<ChatMessage>,
    state_tx: watch::Sender<SessionUpdate>,
    done_tx: mpsc::Sender<DriverEvent>,
    done_rx: mpsc::Receiver<DriverEvent>,

    // Resources of the current cycle; all None while idle.
    playback: Option<PlaybackEngine>,
    capture: Option<CaptureHandle>,
    consumer: Option<HeapCons<f32>>,
    framer: Option<FramerHandle>,
    live: Option<LiveSession>,
    events_rx: Option<mpsc::Receiver<StreamEvent>>,
}

impl VoiceDriver {
    pub fn new(
        settings: Settings,
        cmd_rx: mpsc::Receiver<VoiceCommand>,
        messages_tx: mpsc::Sender<ChatMessage>,
    ) -> (Self, watch::Receiver<SessionUpdate>) {
        let (state_tx, state_rx) = watch::channel(SessionUpdate {
            state: SessionState::Idle,
            error: None,
        });
        let (done_tx, done_rx) = mpsc::channel(8);
        (
            Self {
                controller: SessionController::new(),
                settings,
                cmd_rx,
                messages_tx,
                state_tx,
                done_tx,
                done_rx,
                playback: None,
                capture: None,
                consumer: None,
                framer: None,
                live: None,
                events_rx: None,
            },
            state_rx,
        )
    }

    pub async fn run(mut self) {
        loop {
            let event = tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(VoiceCommand::Start) => SessionEvent::StartRequested,
                    Some(VoiceCommand::Stop) => SessionEvent::StopRequested,
                    None => break,
                },
                Some(done) = self.done_rx.recv() => match done {
                    DriverEvent::AudioDone(Ok(res)) => {
                        self.playback = Some(res.playback);
                        self.capture = Some(res.capture);
                        self.consumer = Some(res.consumer);
                        SessionEvent::AudioReady
                    }
                    DriverEvent::AudioDone(Err(e)) => SessionEvent::AudioFailed(e.to_string()),
                    DriverEvent::TransportDone(Ok((live, rx))) => {
                        self.live = Some(live);
                        self.events_rx = Some(rx);
                        SessionEvent::TransportOpened
                    }
                    DriverEvent::TransportDone(Err(e)) => {
                        SessionEvent::TransportFailed(e.to_string())
                    }
                },
                ev = recv_stream(&mut self.events_rx) => match ev {
                    Some(ev) => SessionEvent::Stream(ev),
                    None => {
                        // Transport tasks are gone; the terminal event (if
                        // any) was already delivered.
                        self.events_rx = None;
                        continue;
                    }
                },
            };
            self.dispatch(event);
        }

        // Front-end went away; release whatever the current cycle holds.
        self.release_all();
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let actions = self.controller.handle(event);
        for action in actions {
            self.execute(action);
        }
        let _ = self.state_tx.send(SessionUpdate {
            state: self.controller.state(),
            error: self.controller.last_error().map(str::to_string),
        });
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::PrepareAudio => {
                let tx = self.done_tx.clone();
                tokio::task::spawn_blocking(move || {
                    let res = prepare_audio();
                    let _ = tx.blocking_send(DriverEvent::AudioDone(res));
                });
            }
            Action::OpenTransport => {
                let config = self.settings.live_config();
                let tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let res = LiveSession::open(config).await;
                    let _ = tx.send(DriverEvent::TransportDone(res)).await;
                });
            }
            Action::BeginStreaming => self.begin_streaming(),
            Action::Play(buffer) => {
                if let Some(engine) = &self.playback {
                    engine.enqueue(buffer);
                } else {
                    debug!("play action with no engine; dropped");
                }
            }
            Action::Publish(message) => {
                if self.messages_tx.try_send(message).is_err() {
                    warn!("chat history channel full; message dropped");
                }
            }
            Action::Teardown => {
                self.release_all();
                self.dispatch(SessionEvent::TornDown);
            }
        }
    }

    /// Wire capture frames into the live session: every framer frame is
    /// encoded and sent fire-and-forget, in capture order.
    fn begin_streaming(&mut self) {
        let Some(sender) = self.live.as_ref().map(|l| l.sender()) else {
            warn!("begin streaming without a live session; ignoring");
            return;
        };
        let Some(consumer) = self.consumer.take() else {
            warn!("begin streaming without a capture ring; ignoring");
            return;
        };
        let rate = self
            .capture
            .as_ref()
            .map(|c| c.sample_rate)
            .unwrap_or(crate::audio::framer::CAPTURE_RATE);
        self.framer = Some(spawn_framer(consumer, rate, move |frame| {
            sender.send(codec::encode_frame(frame));
        }));
    }

    /// Best-effort, idempotent release of every held resource. Each step is
    /// attempted independently; a stuck handle never blocks the rest.
    fn release_all(&mut self) {
        if let Some(live) = self.live.take() {
            live.close();
        }
        self.events_rx = None;
        if let Some(mut framer) = self.framer.take() {
            framer.stop();
        }
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        self.consumer = None;
        if let Some(mut playback) = self.playback.take() {
            playback.stop_all();
            playback.shutdown();
        }
    }
}

fn prepare_audio() -> Result<AudioResources, VoiceError> {
    // Output context first; the microphone is the step that can prompt.
    let playback = PlaybackEngine::start(codec::PLAYBACK_RATE)?;
    let (capture, consumer) = open_capture()?;
    Ok(AudioResources {
        playback,
        capture,
        consumer,
    })
}

async fn recv_stream(rx: &mut Option<mpsc::Receiver<StreamEvent>>) -> Option<StreamEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
