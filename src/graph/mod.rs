//! Conversation graph: nodes, edges and thread reconstruction
//!
//! Nodes are stored in insertion order (range selection depends on it) and
//! edges are stored by id only. Two side indexes keep `thread()` at
//! O(depth) and `leaf_nodes()` at O(nodes):
//! - `incoming`: target id -> edge positions, in insertion order
//! - `outgoing`: source id -> number of edges leaving it

mod selection;
mod session;

pub use selection::{inclusive_index_range, ClickModifiers, SelectionState};
pub use session::{PlexusSession, SharedSession, ROOT_NODE_ID};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::error::{PlexusError, Result};

/// What produced a node. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    User,
    Ai,
    Synthesis,
    System,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::User => "user",
            NodeKind::Ai => "ai",
            NodeKind::Synthesis => "synthesis",
            NodeKind::System => "system",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    kind: NodeKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            summary: None,
        }
    }

    /// Node with a fresh random id
    pub fn generated(kind: NodeKind, label: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), kind, label)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_synthesis(&self) -> bool {
        self.kind == NodeKind::Synthesis
    }
}

/// `source` generated/preceded `target`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Serialized form handed to external persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphRecord {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    positions: HashMap<String, usize>,
    incoming: HashMap<String, Vec<usize>>,
    outgoing: HashMap<String, usize>,
}

impl ConversationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph holding a single root node
    pub fn with_root(root: Node) -> Self {
        let mut graph = Self::new();
        graph.positions.insert(root.id.clone(), 0);
        graph.nodes.push(root);
        graph
    }

    /// Append a node. Duplicate ids are rejected and leave the graph unchanged.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.positions.contains_key(&node.id) {
            return Err(PlexusError::DuplicateNode(node.id));
        }
        self.positions.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Append an edge. No cycle check and no deduplication; both endpoints
    /// must already be nodes of this graph.
    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<()> {
        for id in [source, target] {
            if !self.positions.contains_key(id) {
                return Err(PlexusError::UnknownNode(id.to_string()));
            }
        }
        self.incoming
            .entry(target.to_string())
            .or_default()
            .push(self.edges.len());
        *self.outgoing.entry(source.to_string()).or_default() += 1;
        self.edges.push(Edge::new(source, target));
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.positions.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        match self.positions.get(id) {
            Some(&pos) => Some(&mut self.nodes[pos]),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Position of a node in insertion order
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that never appear as an edge source, in insertion order
    pub fn leaf_nodes(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| !self.outgoing.contains_key(&n.id))
            .collect()
    }

    /// Every edge pointing at `id`, in insertion order. A synthesis node
    /// has one per contributing branch.
    pub fn incoming_edges(&self, id: &str) -> Vec<&Edge> {
        self.incoming
            .get(id)
            .map(|positions| positions.iter().map(|&pos| &self.edges[pos]).collect())
            .unwrap_or_default()
    }

    fn first_parent(&self, id: &str) -> Option<&str> {
        self.incoming
            .get(id)
            .and_then(|positions| positions.first())
            .map(|&pos| self.edges[pos].source.as_str())
    }

    /// Ancestor chain ending at `node_id`, ordered root to leaf.
    ///
    /// Follows the first-inserted incoming edge at every step, so only one
    /// lineage of a merge point is reconstructed; use [`incoming_edges`] to
    /// reach the others. The walk stops at a true root, on a revisit, or
    /// right after including an upstream synthesis node (history does not
    /// continue past a merge). The starting node itself may be a synthesis
    /// node; its first parent lineage is followed.
    ///
    /// [`incoming_edges`]: ConversationGraph::incoming_edges
    pub fn thread(&self, node_id: &str) -> Vec<Node> {
        let mut thread = VecDeque::new();
        let mut visited = HashSet::new();
        let mut current = Some(node_id);

        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let Some(node) = self.node(id) else {
                break;
            };
            thread.push_front(node.clone());

            if node.is_synthesis() && id != node_id {
                break;
            }
            current = self.first_parent(id);
        }

        thread.into()
    }

    /// One thread per id, in the given order
    pub fn build_threads<'a, I>(&self, ids: I) -> Vec<Vec<Node>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().map(|id| self.thread(id)).collect()
    }

    pub fn to_record(&self) -> GraphRecord {
        GraphRecord {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Rebuild a graph by replaying a record through `add_node`/`add_edge`
    pub fn from_record(record: GraphRecord) -> Result<Self> {
        let mut graph = Self::new();
        for node in record.nodes {
            graph.add_node(node)?;
        }
        for edge in &record.edges {
            graph.add_edge(&edge.source, &edge.target)?;
        }
        Ok(graph)
    }
}
