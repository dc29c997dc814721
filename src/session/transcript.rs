use tracing::warn;

use super::event::{ChatMessage, Speaker};

/// Upper bound on one side's in-flight turn buffer. The remote normally ends
/// a turn long before this; if it never does, the oldest text is shed so the
/// buffer cannot grow without bound.
const MAX_TURN_BUFFER: usize = 16 * 1024;

/// Accumulates streamed transcript fragments for the turn in flight, one
/// buffer per speaker, and finalizes both on a turn boundary.
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    guest: String,
    concierge: String,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append-only, order-preserving concatenation. No deduplication, no
    /// trimming of the fragment itself.
    pub fn append(&mut self, speaker: Speaker, text: &str) {
        let buf = match speaker {
            Speaker::Guest => &mut self.guest,
            Speaker::Concierge => &mut self.concierge,
        };
        buf.push_str(text);
        if buf.len() > MAX_TURN_BUFFER {
            let mut cut = buf.len() - MAX_TURN_BUFFER;
            while !buf.is_char_boundary(cut) {
                cut += 1;
            }
            buf.drain(..cut);
            warn!("turn buffer for {} overflowed; oldest text shed", speaker.label());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.guest.is_empty() && self.concierge.is_empty()
    }

    /// Finalize the current turn: one message per non-empty side, guest
    /// first, then reset both buffers unconditionally. An empty turn yields
    /// nothing and is not an error.
    pub fn complete_turn(&mut self) -> Vec<ChatMessage> {
        let mut messages = Vec::new();
        if !self.guest.is_empty() {
            messages.push(ChatMessage::new(Speaker::Guest, std::mem::take(&mut self.guest)));
        }
        if !self.concierge.is_empty() {
            messages.push(ChatMessage::new(
                Speaker::Concierge,
                std::mem::take(&mut self.concierge),
            ));
        }
        self.guest.clear();
        self.concierge.clear();
        messages
    }

    /// Teardown path: whatever is mid-turn becomes final rather than being
    /// silently dropped.
    pub fn flush(&mut self) -> Vec<ChatMessage> {
        self.complete_turn()
    }
}
