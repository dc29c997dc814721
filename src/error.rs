use thiserror::Error;

/// Session-fatal faults. Any of these ends the current voice session cycle;
/// nothing is retried automatically.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("microphone unavailable: {0}")]
    PermissionDenied(String),

    #[error("audio output unavailable: {0}")]
    PlaybackUnavailable(String),

    #[error("live connection failed: {0}")]
    Connection(String),

    #[error("configuration error: {0}")]
    Config(String),
}
