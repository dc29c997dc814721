//! Wire types for the realtime endpoint, and their mapping onto the crate's
//! stream events. Only the fields this client reads or writes are modeled;
//! unknown fields are ignored on the way in.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::audio::codec::EncodedFrame;
use crate::session::event::{Speaker, StreamEvent};

// ---- client -> server ----

#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    /// Presence of these empty objects enables live transcription of the
    /// respective direction.
    pub input_audio_transcription: Empty,
    pub output_audio_transcription: Empty,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaBlob>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaBlob {
    pub mime_type: String,
    pub data: String,
}

pub fn setup_message(model: &str, voice: &str, system_instruction: &str) -> SetupMessage {
    SetupMessage {
        setup: Setup {
            model: format!("models/{}", model),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                },
            },
            system_instruction: Content {
                parts: vec![TextPart {
                    text: system_instruction.to_string(),
                }],
            },
            input_audio_transcription: Empty {},
            output_audio_transcription: Empty {},
        },
    }
}

pub fn realtime_input_message(frame: &EncodedFrame) -> RealtimeInputMessage {
    RealtimeInputMessage {
        realtime_input: RealtimeInput {
            media_chunks: vec![MediaBlob {
                mime_type: frame.mime_type.to_string(),
                data: BASE64.encode(&frame.data),
            }],
        },
    }
}

// ---- server -> client ----

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub turn_complete: Option<bool>,
    pub model_turn: Option<ModelTurn>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Transcription {
    pub text: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ModelTurn {
    pub parts: Vec<ModelPart>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelPart {
    pub inline_data: Option<MediaBlob>,
}

impl ServerMessage {
    /// Expand one wire message into stream events: transcript fragments
    /// first, then the turn boundary, then audio. Matches the order the
    /// remote intends them to be applied.
    pub fn into_events(self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let Some(content) = self.server_content else {
            return events;
        };

        if let Some(t) = content.input_transcription {
            if !t.text.is_empty() {
                events.push(StreamEvent::PartialTranscript {
                    speaker: Speaker::Guest,
                    text: t.text,
                });
            }
        }
        if let Some(t) = content.output_transcription {
            if !t.text.is_empty() {
                events.push(StreamEvent::PartialTranscript {
                    speaker: Speaker::Concierge,
                    text: t.text,
                });
            }
        }
        if content.turn_complete.unwrap_or(false) {
            events.push(StreamEvent::TurnComplete);
        }
        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(blob) = part.inline_data {
                    events.push(StreamEvent::AudioChunk {
                        payload: blob.data,
                        mime_type: blob.mime_type,
                    });
                }
            }
        }
        events
    }
}
