// src/llm/provider/openai.rs
// Chat Completions request shape (streamed as SSE line events)

use reqwest::{Client, RequestBuilder};
use serde::Serialize;

use crate::llm::types::{ChatMessage, GenerationConfig, MessageRole};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> CompletionRequest<'a> {
    pub(crate) fn new(messages: &'a [ChatMessage], config: &'a GenerationConfig) -> Self {
        let mut wire = Vec::with_capacity(messages.len() + 1);

        if let Some(prompt) = config.system_prompt() {
            wire.push(CompletionMessage {
                role: "system",
                content: prompt,
            });
        }

        for msg in messages {
            wire.push(CompletionMessage {
                role: match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                content: &msg.content,
            });
        }

        Self {
            model: &config.model,
            messages: wire,
            temperature: config.temperature,
            stream: true,
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
    let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
    client
        .post(url)
        .bearer_auth(api_key)
        .json(&CompletionRequest::new(messages, config))
}
