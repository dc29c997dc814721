//! Duplex streaming session against the realtime model endpoint.
//!
//! One WebSocket per session: `open` performs the setup handshake, then a
//! writer task drains the outbound frame queue and a reader task translates
//! inbound frames into `StreamEvent`s for the single registered consumer.
//! After a post-open failure the reader emits exactly one `SessionError` and
//! goes silent; `close` is idempotent and stops both tasks.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::protocol::{self, ServerMessage};
use crate::audio::codec::EncodedFrame;
use crate::error::VoiceError;
use crate::session::event::StreamEvent;

const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// How long the remote gets to acknowledge the setup payload.
const OPEN_TIMEOUT: Duration = Duration::from_secs(15);

/// Outbound queue depth. Frames are at-most-once: when the queue is full the
/// frame is dropped (audio degrades) rather than stalling capture or
/// aborting the session.
const OUTBOUND_QUEUE: usize = 32;

const EVENT_QUEUE: usize = 64;

#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
    /// Endpoint override; `None` means the hosted service.
    pub endpoint: Option<String>,
}

/// Cloneable fire-and-forget sender handed to the capture side.
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<EncodedFrame>,
}

impl FrameSender {
    pub fn send(&self, frame: EncodedFrame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("outbound queue full; dropping one frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("outbound queue closed; dropping frame");
            }
        }
    }
}

pub struct LiveSession {
    id: Uuid,
    frames_tx: mpsc::Sender<EncodedFrame>,
    cancel: CancellationToken,
}

impl LiveSession {
    /// Open the duplex stream: connect, send the session configuration, and
    /// wait for the remote acknowledgment. Resolves to the session handle and
    /// the event stream for its lifetime.
    pub async fn open(
        config: LiveConfig,
    ) -> Result<(Self, mpsc::Receiver<StreamEvent>), VoiceError> {
        let id = Uuid::new_v4();
        let endpoint = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT)
            .to_string();
        let url = format!("{}?key={}", endpoint, config.api_key);

        info!("Live session {}: connecting ({})", id, config.model);
        let (ws, _response) = timeout(OPEN_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| VoiceError::Connection("timed out reaching endpoint".to_string()))?
            .map_err(|e| VoiceError::Connection(e.to_string()))?;

        let (mut sink, mut stream) = ws.split();

        let setup = protocol::setup_message(&config.model, &config.voice, &config.system_instruction);
        let payload = serde_json::to_string(&setup)
            .map_err(|e| VoiceError::Connection(format!("setup serialization: {}", e)))?;
        sink.send(Message::Text(payload))
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))?;

        // The first server frame must be the setup acknowledgment.
        let acked = timeout(OPEN_TIMEOUT, async {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(msg) => match parse_server_message(&msg) {
                        Some(server) if server.setup_complete.is_some() => return Ok(true),
                        Some(_) | None => continue,
                    },
                    Err(e) => return Err(VoiceError::Connection(e.to_string())),
                }
            }
            Ok(false)
        })
        .await
        .map_err(|_| VoiceError::Connection("timed out awaiting setup ack".to_string()))??;

        if !acked {
            return Err(VoiceError::Connection(
                "connection closed before setup ack".to_string(),
            ));
        }
        info!("Live session {}: open", id);

        let (frames_tx, frames_rx) = mpsc::channel::<EncodedFrame>(OUTBOUND_QUEUE);
        let (events_tx, events_rx) = mpsc::channel::<StreamEvent>(EVENT_QUEUE);
        let cancel = CancellationToken::new();

        tokio::spawn(write_loop(sink, frames_rx, cancel.clone(), id));
        tokio::spawn(read_loop(stream, events_tx, cancel.clone(), id));

        Ok((
            Self {
                id,
                frames_tx,
                cancel,
            },
            events_rx,
        ))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Fire-and-forget frame send; ordering is preserved by the queue and
    /// the socket, nothing is awaited or retried per frame.
    pub fn send(&self, frame: EncodedFrame) {
        self.sender().send(frame)
    }

    pub fn sender(&self) -> FrameSender {
        FrameSender {
            tx: self.frames_tx.clone(),
        }
    }

    /// Idempotent; stops both tasks. No events are delivered once the
    /// consumer observes the close.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            info!("Live session {}: closing", self.id);
        }
        self.cancel.cancel();
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.close();
    }
}

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsStream = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

async fn write_loop(
    mut sink: WsSink,
    mut frames_rx: mpsc::Receiver<EncodedFrame>,
    cancel: CancellationToken,
    id: Uuid,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames_rx.recv() => match frame {
                Some(f) => f,
                None => break,
            },
        };

        let msg = protocol::realtime_input_message(&frame);
        let payload = match serde_json::to_string(&msg) {
            Ok(p) => p,
            Err(e) => {
                warn!("live session {}: frame serialization failed: {}", id, e);
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(payload)).await {
            // The reader observes the same failure and reports it.
            debug!("live session {}: send failed: {}", id, e);
            break;
        }
    }

    let _ = sink.close().await;
    debug!("live session {}: writer exited", id);
}

async fn read_loop(
    mut stream: WsStream,
    events_tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    id: Uuid,
) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = stream.next() => msg,
        };

        match msg {
            Some(Ok(Message::Close(_))) | None => {
                let _ = events_tx.send(StreamEvent::SessionClosed).await;
                break;
            }
            Some(Ok(msg)) => {
                let Some(server) = parse_server_message(&msg) else {
                    continue;
                };
                for event in server.into_events() {
                    if events_tx.send(event).await.is_err() {
                        // Consumer gone; the session is being torn down.
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                // Exactly one terminal event, then silence.
                let _ = events_tx
                    .send(StreamEvent::SessionError {
                        message: e.to_string(),
                    })
                    .await;
                break;
            }
        }
    }
    debug!("live session {}: reader exited", id);
}

/// The service frames JSON either as text or as binary; both decode the same.
fn parse_server_message(msg: &Message) -> Option<ServerMessage> {
    let parsed = match msg {
        Message::Text(text) => serde_json::from_str::<ServerMessage>(text),
        Message::Binary(bytes) => serde_json::from_slice::<ServerMessage>(bytes),
        _ => return None,
    };
    match parsed {
        Ok(server) => Some(server),
        Err(e) => {
            warn!("unparseable server frame skipped: {}", e);
            None
        }
    }
}
