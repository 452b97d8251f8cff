// src/lib.rs

pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod orchestrator;

pub use config::PlexusConfig;
pub use error::{PlexusError, Result};
pub use graph::{
    ClickModifiers, ConversationGraph, Edge, GraphRecord, Node, NodeKind, PlexusSession, SharedSession,
};
pub use llm::{
    ChatMessage, Completion, GenerationConfig, ProviderAdapter, ProviderKind, SnapshotSink, TextGenerator,
};
pub use orchestrator::Orchestrator;
