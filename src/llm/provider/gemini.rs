// src/llm/provider/gemini.rs
// streamGenerateContent request shape (streamed as one growing JSON array)

use reqwest::{Client, RequestBuilder};
use serde::Serialize;

use crate::llm::types::{ChatMessage, GenerationConfig, MessageRole};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_k: u32,
}

impl GeminiRequest {
    /// The system prompt travels as a leading user turn
    pub(crate) fn new(messages: &[ChatMessage], config: &GenerationConfig) -> Self {
        let mut contents = Vec::with_capacity(messages.len() + 1);

        if let Some(prompt) = config.system_prompt() {
            contents.push(GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: format!("System Prompt: {}", prompt),
                }],
            });
        }

        for msg in messages {
            contents.push(GeminiContent {
                role: match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                },
                parts: vec![GeminiPart {
                    text: msg.content.clone(),
                }],
            });
        }

        Self {
            contents,
            generation_config: GeminiGenerationConfig {
                temperature: config.temperature,
                top_k: config.top_k,
            },
        }
    }
}

pub(crate) fn build_request(
    client: &Client,
    base_url: &str,
    api_key: &str,
    messages: &[ChatMessage],
    config: &GenerationConfig,
) -> RequestBuilder {
    let url = format!(
        "{}/v1beta/models/{}:streamGenerateContent",
        base_url.trim_end_matches('/'),
        config.model
    );
    client
        .post(url)
        .query(&[("key", api_key)])
        .json(&GeminiRequest::new(messages, config))
}
