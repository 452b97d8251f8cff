// src/graph/selection.rs
// Multi-selection bookkeeping and the single/synthesis mode switch

use indexmap::IndexSet;
use std::ops::RangeInclusive;
use tracing::debug;

use super::ConversationGraph;

/// Closed index interval between an anchor and a target, regardless of
/// which one comes first. `None` if either index is out of bounds.
pub fn inclusive_index_range(
    anchor_index: usize,
    target_index: usize,
    len: usize,
) -> Option<RangeInclusive<usize>> {
    if len == 0 || anchor_index >= len || target_index >= len {
        return None;
    }
    let (start, end) = if anchor_index <= target_index {
        (anchor_index, target_index)
    } else {
        (target_index, anchor_index)
    };
    Some(start..=end)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickModifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl ClickModifiers {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            shift: false,
        }
    }

    pub fn shift() -> Self {
        Self {
            ctrl: false,
            shift: true,
        }
    }
}

/// Selected ids (insertion ordered), focus, range anchor and synthesis mode.
///
/// Ids are not checked against the graph; passing sensible ids is the
/// caller's job.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selected: IndexSet<String>,
    active: Option<String>,
    anchor: Option<String>,
    synthesis_mode: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_node_ids(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    pub fn selected_len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn active_node_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn last_selected_node_id(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn synthesis_mode(&self) -> bool {
        self.synthesis_mode
    }

    /// Apply a click. Shift with an anchor unions the insertion-order range
    /// between anchor and target; ctrl toggles membership; a plain click
    /// replaces the selection. The mode is recomputed from cardinality.
    pub fn click(&mut self, graph: &ConversationGraph, node_id: &str, modifiers: ClickModifiers) {
        if modifiers.shift && self.anchor.is_some() {
            self.extend_range(graph, node_id);
        } else if modifiers.ctrl {
            self.toggle_member(node_id);
        } else {
            self.select_only(Some(node_id));
        }
        self.synthesis_mode = self.selected.len() > 1;
    }

    fn extend_range(&mut self, graph: &ConversationGraph, node_id: &str) {
        let range = self.anchor.as_deref().and_then(|anchor| {
            let anchor_index = graph.index_of(anchor)?;
            let target_index = graph.index_of(node_id)?;
            inclusive_index_range(anchor_index, target_index, graph.len())
        });

        match range {
            Some(range) => {
                for node in &graph.nodes()[range] {
                    self.selected.insert(node.id.clone());
                }
            }
            None => {
                debug!("range endpoint {} not in graph, selecting it alone", node_id);
                self.selected.insert(node_id.to_string());
            }
        }
        self.active = Some(node_id.to_string());
    }

    fn toggle_member(&mut self, node_id: &str) {
        if self.selected.shift_remove(node_id) {
            if self.active.as_deref() == Some(node_id) {
                self.active = None;
            }
        } else {
            self.selected.insert(node_id.to_string());
            self.active = Some(node_id.to_string());
            self.anchor = Some(node_id.to_string());
        }
    }

    fn select_only(&mut self, node_id: Option<&str>) {
        self.selected.clear();
        if let Some(id) = node_id {
            self.selected.insert(id.to_string());
        }
        self.active = node_id.map(str::to_string);
        self.anchor = node_id.map(str::to_string);
    }

    /// Switch synthesis mode on or off (`None` flips it).
    ///
    /// Turning on with at most one selected node seeds the selection with
    /// every leaf; turning on with several already selected keeps them.
    /// Turning off collapses to the active node.
    pub fn toggle_synthesis_mode(&mut self, graph: &ConversationGraph, explicit: Option<bool>) {
        let enable = explicit.unwrap_or(!self.synthesis_mode);
        self.synthesis_mode = enable;

        if enable {
            if self.selected.len() <= 1 {
                self.selected = graph.leaf_nodes().into_iter().map(|n| n.id.clone()).collect();
                debug!("synthesis mode on, seeded {} leaves", self.selected.len());
            }
        } else {
            self.selected.clear();
            if let Some(active) = &self.active {
                self.selected.insert(active.clone());
            }
            self.anchor = self.active.clone();
        }
    }

    /// Hard reset: focus `id` and make it the only selection (or clear both).
    pub fn set_active_node(&mut self, id: Option<&str>) {
        self.select_only(id);
        self.synthesis_mode = false;
    }
}
