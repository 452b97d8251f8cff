// src/llm/mod.rs
// Streaming ingestion: decoders, accumulator and the provider adapter

pub mod accumulator;
pub mod decoder;
pub mod provider;
pub mod types;

pub use accumulator::{Completion, SnapshotSink, TextAccumulator, NO_RESPONSE};
pub use decoder::{decoder_for, DecodeStep, LineEventDecoder, ProgressiveScanDecoder, StreamDecoder};
pub use provider::{drive_stream, ProviderAdapter, TextGenerator};
pub use types::{ChatMessage, Credentials, GenerationConfig, MessageRole, ProviderKind};
