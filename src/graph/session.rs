// src/graph/session.rs
// Graph + selection aggregate, the single owner of all mutable plexus state

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::{ClickModifiers, ConversationGraph, Edge, GraphRecord, Node, NodeKind, SelectionState};
use crate::error::{PlexusError, Result};

pub const ROOT_NODE_ID: &str = "root";

/// One lock around the whole session; graph and selection are never
/// locked separately.
pub type SharedSession = Arc<Mutex<PlexusSession>>;

#[derive(Debug, Clone)]
pub struct PlexusSession {
    graph: ConversationGraph,
    selection: SelectionState,
    /// Id of the single `system` node
    root: String,
}

impl Default for PlexusSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlexusSession {
    /// Session holding only the system root, focused and selected
    pub fn new() -> Self {
        let graph = ConversationGraph::with_root(Node::new(ROOT_NODE_ID, NodeKind::System, "System"));
        let mut selection = SelectionState::new();
        selection.set_active_node(Some(ROOT_NODE_ID));
        Self {
            graph,
            selection,
            root: ROOT_NODE_ID.to_string(),
        }
    }

    /// Restore from an external record, focused on its root. The record
    /// must hold exactly one `system` node.
    pub fn from_record(record: GraphRecord) -> Result<Self> {
        let mut roots = record.nodes.iter().filter(|n| n.kind() == NodeKind::System);
        let root = match (roots.next(), roots.next()) {
            (Some(root), None) => root.id.clone(),
            (None, _) => return Err(PlexusError::InvalidRoot("record has no system node".to_string())),
            (Some(first), Some(second)) => {
                return Err(PlexusError::InvalidRoot(format!(
                    "record has several system nodes ({}, {})",
                    first.id, second.id
                )));
            }
        };

        let graph = ConversationGraph::from_record(record)?;
        let mut selection = SelectionState::new();
        selection.set_active_node(Some(&root));
        Ok(Self { graph, selection, root })
    }

    pub fn root_id(&self) -> &str {
        &self.root
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn graph(&self) -> &ConversationGraph {
        &self.graph
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Add a node and make it the focused, sole selection.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if node.kind() == NodeKind::System {
            return Err(PlexusError::InvalidRoot(format!(
                "{} would be a second system node besides {}",
                node.id, self.root
            )));
        }
        let id = node.id.clone();
        self.graph.add_node(node)?;
        self.selection.set_active_node(Some(&id));
        debug!("added node {}", id);
        Ok(())
    }

    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<()> {
        self.graph.add_edge(source, target)
    }

    pub fn set_label(&mut self, id: &str, label: impl Into<String>) -> Result<()> {
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| PlexusError::UnknownNode(id.to_string()))?;
        node.label = label.into();
        Ok(())
    }

    pub fn set_summary(&mut self, id: &str, summary: impl Into<String>) -> Result<()> {
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| PlexusError::UnknownNode(id.to_string()))?;
        node.summary = Some(summary.into());
        Ok(())
    }

    pub fn leaf_nodes(&self) -> Vec<&Node> {
        self.graph.leaf_nodes()
    }

    pub fn thread(&self, node_id: &str) -> Vec<Node> {
        self.graph.thread(node_id)
    }

    pub fn incoming_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.graph.incoming_edges(node_id)
    }

    /// One thread per currently selected id, in selection order
    pub fn selected_threads(&self) -> Vec<Vec<Node>> {
        self.graph.build_threads(self.selection.selected_node_ids())
    }

    pub fn click(&mut self, node_id: &str, modifiers: ClickModifiers) {
        self.selection.click(&self.graph, node_id, modifiers);
    }

    pub fn toggle_synthesis_mode(&mut self, explicit: Option<bool>) {
        self.selection.toggle_synthesis_mode(&self.graph, explicit);
    }

    pub fn set_active_node(&mut self, id: Option<&str>) {
        self.selection.set_active_node(id);
    }

    pub fn active_node_id(&self) -> Option<&str> {
        self.selection.active_node_id()
    }

    pub fn selected_node_ids(&self) -> Vec<String> {
        self.selection.selected_node_ids().map(str::to_string).collect()
    }

    pub fn synthesis_mode(&self) -> bool {
        self.selection.synthesis_mode()
    }
}
