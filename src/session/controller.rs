//! Session lifecycle state machine.
//!
//! Pure step function in the driver/core split: the controller owns the
//! session state, the abort intent, and the transcript aggregator, and maps
//! each incoming event to the actions the driver must execute. It performs no
//! I/O itself, so every transition in the table is testable by feeding events
//! and inspecting the returned actions.

use tracing::{debug, info, warn};

use super::event::{ChatMessage, StreamEvent};
use super::transcript::TranscriptAggregator;
use crate::audio::codec::{self, PlayableBuffer};

/// The sole externally observable session flag; drives the front-end's
/// call-button / end-call affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    /// Transient: a fatal fault was observed and teardown is in flight. The
    /// machine lands back in `Idle` once the driver reports teardown done.
    Error,
}

/// Everything that can advance the machine. Driver-side completions
/// (`AudioReady`, `TransportOpened`, ...) arrive asynchronously; stream
/// events arrive one at a time in transport order.
#[derive(Debug)]
pub enum SessionEvent {
    StartRequested,
    StopRequested,
    /// Both audio contexts (capture + playback) acquired.
    AudioReady,
    AudioFailed(String),
    TransportOpened,
    TransportFailed(String),
    /// Driver finished executing a requested teardown.
    TornDown,
    Stream(StreamEvent),
}

/// Side effects for the driver to execute, in order.
#[derive(Debug)]
pub enum Action {
    /// Acquire the playback context and the microphone.
    PrepareAudio,
    OpenTransport,
    /// Wire capture frames into the live session; events start flowing.
    BeginStreaming,
    Play(PlayableBuffer),
    Publish(ChatMessage),
    /// Release everything: transport, capture, playback, both contexts.
    Teardown,
}

pub struct SessionController {
    state: SessionState,
    abort_requested: bool,
    transcript: TranscriptAggregator,
    last_error: Option<String>,
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            abort_requested: false,
            transcript: TranscriptAggregator::new(),
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Description of the most recent session-fatal fault, if the last cycle
    /// ended in one. Cleared when a new session starts.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Action> {
        match event {
            SessionEvent::StartRequested => self.on_start(),
            SessionEvent::StopRequested => self.on_stop(),
            SessionEvent::AudioReady => self.on_audio_ready(),
            SessionEvent::AudioFailed(msg) => self.on_fatal(msg),
            SessionEvent::TransportOpened => self.on_transport_opened(),
            SessionEvent::TransportFailed(msg) => self.on_fatal(msg),
            SessionEvent::TornDown => self.on_torn_down(),
            SessionEvent::Stream(ev) => self.on_stream(ev),
        }
    }

    fn on_start(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Idle => {
                info!("Session: Idle -> Connecting");
                self.state = SessionState::Connecting;
                self.abort_requested = false;
                self.last_error = None;
                vec![Action::PrepareAudio]
            }
            _ => {
                warn!("start ignored in {:?}", self.state);
                Vec::new()
            }
        }
    }

    fn on_stop(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Active => {
                info!("Session: Active -> Idle (stop requested)");
                self.state = SessionState::Idle;
                let mut actions = self.flush_transcript();
                actions.push(Action::Teardown);
                actions
            }
            SessionState::Connecting => {
                // Mid-flight: the pending acquisition cannot be interrupted,
                // so mark intent and release on resolution.
                debug!("stop requested while connecting; will abort on resolution");
                self.abort_requested = true;
                Vec::new()
            }
            SessionState::Idle | SessionState::Error => Vec::new(),
        }
    }

    fn on_audio_ready(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Connecting if self.abort_requested => {
                info!("Session: aborted before transport open");
                self.state = SessionState::Idle;
                vec![Action::Teardown]
            }
            SessionState::Connecting => vec![Action::OpenTransport],
            _ => {
                debug!("audio ready ignored in {:?}", self.state);
                Vec::new()
            }
        }
    }

    fn on_transport_opened(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Connecting if self.abort_requested => {
                info!("Session: aborted on transport open");
                self.state = SessionState::Idle;
                vec![Action::Teardown]
            }
            SessionState::Connecting => {
                info!("Session: Connecting -> Active");
                self.state = SessionState::Active;
                vec![Action::BeginStreaming]
            }
            _ => {
                debug!("transport open ignored in {:?}", self.state);
                Vec::new()
            }
        }
    }

    /// Session-fatal fault from either acquisition or the live stream.
    fn on_fatal(&mut self, message: String) -> Vec<Action> {
        match self.state {
            SessionState::Connecting | SessionState::Active => {
                warn!("Session fault: {}", message);
                self.last_error = Some(message);
                self.state = SessionState::Error;
                let mut actions = self.flush_transcript();
                actions.push(Action::Teardown);
                actions
            }
            _ => {
                debug!("fault ignored in {:?}: {}", self.state, message);
                Vec::new()
            }
        }
    }

    fn on_torn_down(&mut self) -> Vec<Action> {
        if self.state == SessionState::Error {
            info!("Session: Error -> Idle");
            self.state = SessionState::Idle;
        }
        Vec::new()
    }

    fn on_stream(&mut self, event: StreamEvent) -> Vec<Action> {
        if self.state != SessionState::Active {
            // Late events from a closing transport; the cycle already ended.
            debug!("stream event ignored in {:?}", self.state);
            return Vec::new();
        }

        match event {
            StreamEvent::PartialTranscript { speaker, text } => {
                self.transcript.append(speaker, &text);
                Vec::new()
            }
            StreamEvent::AudioChunk { payload, mime_type } => {
                match decode_chunk(&payload, &mime_type) {
                    Ok(buffer) => vec![Action::Play(buffer)],
                    Err(e) => {
                        // Chunk-local: drop it, keep the session alive.
                        warn!("dropping malformed audio chunk: {}", e);
                        Vec::new()
                    }
                }
            }
            StreamEvent::TurnComplete => self
                .transcript
                .complete_turn()
                .into_iter()
                .map(Action::Publish)
                .collect(),
            StreamEvent::SessionClosed => {
                info!("Session: remote closed, Active -> Idle");
                self.state = SessionState::Idle;
                let mut actions = self.flush_transcript();
                actions.push(Action::Teardown);
                actions
            }
            StreamEvent::SessionError { message } => self.on_fatal(message),
        }
    }

    fn flush_transcript(&mut self) -> Vec<Action> {
        self.transcript
            .flush()
            .into_iter()
            .map(Action::Publish)
            .collect()
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_chunk(payload: &str, mime_type: &str) -> Result<PlayableBuffer, codec::AudioError> {
    let bytes = codec::decode_base64(payload)?;
    codec::playable_buffer(&bytes, codec::rate_from_mime(mime_type), 1)
}
