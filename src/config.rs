use std::env;

use crate::cabin;
use crate::error::VoiceError;
use crate::live::transport::LiveConfig;

pub const DEFAULT_CHAT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";
pub const DEFAULT_VOICE: &str = "Puck";

/// Runtime configuration, resolved once at startup. The API key is mandatory:
/// both the text and voice features refuse to run without it rather than
/// attempting a call that can only fail.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub chat_model: String,
    pub live_model: String,
    pub voice: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, VoiceError> {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                VoiceError::Config(
                    "no API key found: set GEMINI_API_KEY (or API_KEY) in the environment"
                        .to_string(),
                )
            })?;

        Ok(Self {
            api_key,
            chat_model: env::var("HEARTH_CHAT_MODEL")
                .unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
            live_model: env::var("HEARTH_LIVE_MODEL")
                .unwrap_or_else(|_| DEFAULT_LIVE_MODEL.to_string()),
            voice: env::var("HEARTH_VOICE").unwrap_or_else(|_| DEFAULT_VOICE.to_string()),
        })
    }

    /// Session configuration for the realtime endpoint. Voice sessions get the
    /// shortened-answer suffix on top of the concierge persona.
    pub fn live_config(&self) -> LiveConfig {
        LiveConfig {
            api_key: self.api_key.clone(),
            model: self.live_model.clone(),
            voice: self.voice.clone(),
            system_instruction: format!(
                "{}{}",
                cabin::SYSTEM_INSTRUCTION,
                cabin::VOICE_MODE_SUFFIX
            ),
            endpoint: None,
        }
    }
}
