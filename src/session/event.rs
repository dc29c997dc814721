use chrono::{DateTime, Utc};

/// Who a transcript fragment or finalized message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Guest,
    Concierge,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Guest => "guest",
            Speaker::Concierge => "fuzzy",
        }
    }
}

/// Events the transport delivers, in arrival order, to a single consumer.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    PartialTranscript {
        speaker: Speaker,
        text: String,
    },
    /// Audio payload still in its wire form (base64 PCM16-LE); decoding is
    /// the consumer's job so a malformed chunk can be dropped in isolation.
    AudioChunk {
        payload: String,
        mime_type: String,
    },
    TurnComplete,
    SessionClosed,
    SessionError {
        message: String,
    },
}

/// A grounding source link attached to a text answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

/// One finalized chat history entry. Voice turns carry no citations.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub citations: Vec<Citation>,
}

impl ChatMessage {
    pub fn new(speaker: Speaker, text: String) -> Self {
        Self {
            speaker,
            text,
            timestamp: Utc::now(),
            citations: Vec::new(),
        }
    }
}
