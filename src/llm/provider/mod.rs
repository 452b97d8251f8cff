// src/llm/provider/mod.rs
// Provider adapter: one generate() contract over both upstream wire formats

mod gemini;
mod openai;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::fmt::Display;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::accumulator::{Completion, SnapshotSink, TextAccumulator};
use super::decoder::{decoder_for, StreamDecoder};
use super::types::{ChatMessage, Credentials, GenerationConfig, ProviderKind};
use crate::error::PlexusError;

pub use gemini::DEFAULT_BASE_URL as GEMINI_BASE_URL;
pub use openai::DEFAULT_BASE_URL as OPENAI_BASE_URL;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Anything that can turn a message list into text, reporting cumulative
/// snapshots along the way.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        config: &GenerationConfig,
        sink: &mut dyn SnapshotSink,
        cancel: &CancellationToken,
    ) -> Completion;
}

/// HTTP adapter for the two supported providers. Holds no per-call
/// state, so concurrent generations are independent.
#[derive(Debug, Clone)]
pub struct ProviderAdapter {
    client: HttpClient,
    credentials: Credentials,
    openai_base_url: String,
    gemini_base_url: String,
    timeout: Duration,
}

impl ProviderAdapter {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            client: HttpClient::new(),
            credentials,
            openai_base_url: OPENAI_BASE_URL.to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_urls(mut self, openai: impl Into<String>, gemini: impl Into<String>) -> Self {
        self.openai_base_url = openai.into();
        self.gemini_base_url = gemini.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn open_stream(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
        config: &GenerationConfig,
    ) -> Result<reqwest::Response, PlexusError> {
        let request = match config.provider {
            ProviderKind::OpenAi => {
                openai::build_request(&self.client, &self.openai_base_url, api_key, messages, config)
            }
            ProviderKind::Google => {
                gemini::build_request(&self.client, &self.gemini_base_url, api_key, messages, config)
            }
        };

        // bounds time to response headers only; a long body keeps streaming
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| PlexusError::Timeout {
                provider: config.provider,
                waited: self.timeout,
            })??;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlexusError::Status {
                provider: config.provider,
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for ProviderAdapter {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        config: &GenerationConfig,
        sink: &mut dyn SnapshotSink,
        cancel: &CancellationToken,
    ) -> Completion {
        let Some(api_key) = self.credentials.key_for(config.provider) else {
            warn!("No {} API key configured", config.provider);
            return Completion::Failed(PlexusError::MissingCredential {
                provider: config.provider,
            });
        };

        info!(
            "Starting generation - provider: {}, model: {}, messages: {}",
            config.provider.as_str(),
            config.model,
            messages.len()
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Completion::Failed(PlexusError::Cancelled),
            result = self.open_stream(api_key, messages, config) => result,
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("Generation request failed: {}", e);
                return Completion::Failed(e);
            }
        };

        let completion = drive_stream(
            response.bytes_stream(),
            decoder_for(config.provider),
            sink,
            cancel,
        )
        .await;

        info!(
            "Generation finished - provider: {}, chars: {}, interrupted: {}",
            config.provider.as_str(),
            completion.text().map(str::len).unwrap_or(0),
            completion.error().is_some()
        );
        completion
    }
}

/// Pull chunks from `stream` through `decoder` until the body ends, the
/// completion sentinel arrives, a read fails or `cancel` fires. Failures
/// keep the text accumulated so far.
pub async fn drive_stream<S, B, E>(
    stream: S,
    decoder: Box<dyn StreamDecoder>,
    sink: &mut dyn SnapshotSink,
    cancel: &CancellationToken,
) -> Completion
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut accumulator = TextAccumulator::new(decoder);
    let mut chunk_count = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Generation cancelled after {} chunks", chunk_count);
                return Completion::interrupted(accumulator.into_text(), PlexusError::Cancelled);
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                chunk_count += 1;
                if accumulator.push(chunk.as_ref(), sink) {
                    debug!("Completion sentinel after {} chunks", chunk_count);
                    break;
                }
            }
            Some(Err(e)) => {
                warn!("Stream error at chunk #{}: {}", chunk_count, e);
                return Completion::interrupted(
                    accumulator.into_text(),
                    PlexusError::StreamRead(e.to_string()),
                );
            }
            None => {
                accumulator.finish(sink);
                break;
            }
        }
    }

    Completion::Finished(accumulator.into_text())
}

/// `error.message` from a provider error body, else the raw body
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let from_json = serde_json::from_str::<Value>(trimmed).ok().and_then(|json| {
        json.pointer("/error/message")
            // streamGenerateContent wraps errors in a one-element array
            .or_else(|| json.pointer("/0/error/message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    Some(from_json.unwrap_or_else(|| trimmed.to_string()))
}
