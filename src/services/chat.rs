//! Typed-question flow against the model's text endpoint: one-shot
//! request/response, optionally grounded in search with citation links
//! harvested from the grounding metadata.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::cabin;
use crate::config::Settings;
use crate::session::event::Citation;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub citations: Vec<Citation>,
}

#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    system_instruction: RequestContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<RequestGenerationConfig>,
}

#[derive(Serialize)]
struct RequestContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: EmptyObject,
}

#[derive(Serialize)]
struct EmptyObject {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GroundingChunk {
    web: Option<GroundingSource>,
    maps: Option<GroundingSource>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GroundingSource {
    uri: Option<String>,
    title: Option<String>,
}

impl ChatClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key: settings.api_key.clone(),
            model: settings.chat_model.clone(),
        }
    }

    /// Answer one guest question. Tries a search-grounded request first and
    /// falls back to a plain one if the grounded call fails for any reason.
    pub async fn ask(&self, question: &str) -> Result<ChatReply> {
        match self.generate(question, true).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!("grounded request failed, retrying without tools: {}", e);
                self.generate(question, false).await
            }
        }
    }

    /// One-token probe to confirm the credential and endpoint are usable.
    pub async fn verify(&self) -> Result<()> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: Some("user".to_string()),
                parts: vec![RequestPart {
                    text: "test".to_string(),
                }],
            }],
            system_instruction: system_instruction(),
            tools: None,
            generation_config: Some(RequestGenerationConfig {
                max_output_tokens: 1,
            }),
        };
        self.post(&request).await.map(|_| ())
    }

    async fn generate(&self, question: &str, grounded: bool) -> Result<ChatReply> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: Some("user".to_string()),
                parts: vec![RequestPart {
                    text: question.to_string(),
                }],
            }],
            system_instruction: system_instruction(),
            tools: grounded.then(|| {
                vec![Tool {
                    google_search: EmptyObject {},
                }]
            }),
            generation_config: None,
        };

        let response = self.post(&request).await?;

        let candidate = response.candidates.into_iter().next().unwrap_or_default();
        let text: String = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        let text = if text.is_empty() {
            "I found the info, but had trouble phrasing it.".to_string()
        } else {
            text
        };

        let citations = candidate
            .grounding_metadata
            .map(|g| g.grounding_chunks)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|chunk| {
                let source = chunk.web.or(chunk.maps)?;
                Some(Citation {
                    uri: source.uri?,
                    title: source.title.unwrap_or_else(|| "Search Result".to_string()),
                })
            })
            .collect();

        Ok(ChatReply { text, citations })
    }

    async fn post(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        );
        debug!("text request to {}", self.model);

        let response = self.http.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("text endpoint error: {}", response.status()));
        }
        Ok(response.json().await?)
    }
}

fn system_instruction() -> RequestContent {
    RequestContent {
        role: None,
        parts: vec![RequestPart {
            text: cabin::SYSTEM_INSTRUCTION.to_string(),
        }],
    }
}
