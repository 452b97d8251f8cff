//! Orchestrator: turns the current selection into provider messages and
//! writes the generated answer back into the graph.
//!
//! The session lock is only held for graph reads and writes, never across
//! a generation await.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{PlexusError, Result};
use crate::graph::{Node, NodeKind, PlexusSession, SharedSession};
use crate::llm::{ChatMessage, Completion, GenerationConfig, MessageRole, SnapshotSink, TextGenerator};

/// Conversation turns for one thread; the system root carries no text
pub fn thread_messages(thread: &[Node]) -> Vec<ChatMessage> {
    thread
        .iter()
        .filter_map(|node| match node.kind() {
            NodeKind::User => Some(ChatMessage::user(node.label.clone())),
            NodeKind::Ai | NodeKind::Synthesis => Some(ChatMessage::assistant(node.label.clone())),
            NodeKind::System => None,
        })
        .collect()
}

/// Single user turn asking the model to merge several branches
pub fn synthesis_prompt(threads: &[Vec<Node>], question: &str) -> String {
    let mut prompt = String::from(
        "The following conversation branches explore the same topic from different directions. \
         Combine their insights into one coherent answer.\n",
    );

    for (i, thread) in threads.iter().enumerate() {
        prompt.push_str(&format!("\n### Branch {}\n", i + 1));
        for msg in thread_messages(thread) {
            let speaker = match msg.role {
                MessageRole::User => "User",
                MessageRole::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{}: {}\n", speaker, msg.content));
        }
    }

    prompt.push_str(&format!("\n### Request\n{}\n", question));
    prompt
}

pub fn summary_prompt(question: &str, answer: &str) -> String {
    format!(
        "Summarize the following Q&A into a single concise paragraph (under 100 characters). \
         The summary should capture the essence of the discussion for quick recall. \
         Write the summary in the same language as the content.\n\nQ: {}\nA: {}\n\nSummary:",
        question, answer
    )
}

/// Where a new question attaches: the focused node, else the one node
/// still selected, else the root
fn single_mode_parent(session: &PlexusSession) -> String {
    if let Some(active) = session.active_node_id() {
        return active.to_string();
    }
    let mut selected = session.selected_node_ids();
    if selected.len() == 1 {
        if let Some(only) = selected.pop() {
            return only;
        }
    }
    session.root_id().to_string()
}

pub struct Orchestrator<G> {
    session: SharedSession,
    generator: G,
    config: GenerationConfig,
    auto_summarize: bool,
}

impl<G: TextGenerator> Orchestrator<G> {
    pub fn new(session: SharedSession, generator: G, config: GenerationConfig) -> Self {
        Self {
            session,
            generator,
            config,
            auto_summarize: false,
        }
    }

    pub fn with_auto_summarize(mut self, enabled: bool) -> Self {
        self.auto_summarize = enabled;
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Ask a question against the current selection and return the id of
    /// the node holding the answer (`ai`, or `synthesis` when several
    /// branches are selected in synthesis mode).
    pub async fn submit(
        &self,
        question: &str,
        sink: &mut dyn SnapshotSink,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let synthesis_sources = {
            let session = self.session.lock().await;
            let selected = session.selected_node_ids();
            (session.synthesis_mode() && selected.len() > 1).then_some(selected)
        };

        match synthesis_sources {
            Some(sources) => self.synthesize(&sources, question, sink, cancel).await,
            None => self.ask(question, sink, cancel).await,
        }
    }

    async fn ask(
        &self,
        question: &str,
        sink: &mut dyn SnapshotSink,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let (user_id, messages) = {
            let mut session = self.session.lock().await;
            let parent = single_mode_parent(&session);
            if !session.graph().contains(&parent) {
                return Err(PlexusError::UnknownNode(parent));
            }
            let user = Node::generated(NodeKind::User, question);
            let user_id = user.id.clone();
            session.add_node(user)?;
            session.add_edge(&parent, &user_id)?;
            (user_id.clone(), thread_messages(&session.thread(&user_id)))
        };

        let completion = self.generator.generate(&messages, &self.config, sink, cancel).await;
        let answer = self.record(NodeKind::Ai, &[user_id], &completion).await?;
        self.summarize(&answer, question, &completion).await;
        Ok(answer)
    }

    async fn synthesize(
        &self,
        sources: &[String],
        question: &str,
        sink: &mut dyn SnapshotSink,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let threads = {
            let session = self.session.lock().await;
            session
                .graph()
                .build_threads(sources.iter().map(String::as_str))
        };
        info!("Synthesizing {} branches", threads.len());

        let messages = vec![ChatMessage::user(synthesis_prompt(&threads, question))];
        let completion = self.generator.generate(&messages, &self.config, sink, cancel).await;
        let node = self.record(NodeKind::Synthesis, sources, &completion).await?;
        self.summarize(&node, question, &completion).await;
        Ok(node)
    }

    /// Store the outcome as a new node under every parent
    async fn record(&self, kind: NodeKind, parents: &[String], completion: &Completion) -> Result<String> {
        if let Some(error) = completion.error() {
            warn!("Recording {} node after interrupted generation: {}", kind, error);
        }

        let node = Node::generated(kind, completion.final_text());
        let id = node.id.clone();

        let mut session = self.session.lock().await;
        if let Some(missing) = parents.iter().find(|p| !session.graph().contains(p)) {
            return Err(PlexusError::UnknownNode(missing.clone()));
        }
        session.add_node(node)?;
        for parent in parents {
            session.add_edge(parent, &id)?;
        }
        Ok(id)
    }

    async fn summarize(&self, node_id: &str, question: &str, completion: &Completion) {
        if !self.auto_summarize {
            return;
        }
        // interrupted or empty answers are not summarized
        let Completion::Finished(answer) = completion else {
            return;
        };
        if answer.is_empty() {
            return;
        }

        let messages = vec![ChatMessage::user(summary_prompt(question, answer))];
        let summary = self
            .generator
            .generate(&messages, &self.config, &mut (), &CancellationToken::new())
            .await;

        match summary.text() {
            Some(text) => {
                let mut session = self.session.lock().await;
                if let Err(e) = session.set_summary(node_id, text.trim()) {
                    warn!("Failed to store summary for {}: {}", node_id, e);
                }
            }
            None => warn!("Summary generation produced no text for {}", node_id),
        }
    }
}
