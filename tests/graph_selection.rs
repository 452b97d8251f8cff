// tests/graph_selection.rs
// Graph + selection scenarios driven through PlexusSession

use plexus::graph::{ClickModifiers, GraphRecord, Node, NodeKind, PlexusSession, ROOT_NODE_ID};
use proptest::prelude::*;

fn ids(thread: &[Node]) -> Vec<&str> {
    thread.iter().map(|n| n.id.as_str()).collect()
}

/// root -> q1 -> a1 and root -> q2 -> a2
fn two_branches() -> PlexusSession {
    let mut session = PlexusSession::new();
    for (q, a) in [("q1", "a1"), ("q2", "a2")] {
        session.add_node(Node::new(q, NodeKind::User, q)).unwrap();
        session.add_edge(ROOT_NODE_ID, q).unwrap();
        session.add_node(Node::new(a, NodeKind::Ai, a)).unwrap();
        session.add_edge(q, a).unwrap();
    }
    session
}

#[test]
fn test_new_session_focuses_root() {
    let session = PlexusSession::new();
    assert_eq!(session.active_node_id(), Some(ROOT_NODE_ID));
    assert_eq!(session.selected_node_ids(), vec![ROOT_NODE_ID]);
    assert!(!session.synthesis_mode());
    assert_eq!(ids(&session.thread(ROOT_NODE_ID)), vec![ROOT_NODE_ID]);
}

#[test]
fn test_ctrl_click_enters_synthesis_mode() {
    let mut session = two_branches();
    session.click("a1", ClickModifiers::plain());
    session.click("a2", ClickModifiers::ctrl());

    assert!(session.synthesis_mode());
    assert_eq!(session.selected_node_ids(), vec!["a1", "a2"]);

    let threads = session.selected_threads();
    assert_eq!(ids(&threads[0]), vec!["root", "q1", "a1"]);
    assert_eq!(ids(&threads[1]), vec!["root", "q2", "a2"]);

    session.click("a1", ClickModifiers::ctrl());
    assert!(!session.synthesis_mode());
    assert_eq!(session.selected_node_ids(), vec!["a2"]);
}

#[test]
fn test_shift_click_selects_insertion_range() {
    let mut session = two_branches();
    session.click("a1", ClickModifiers::plain());
    session.click("q2", ClickModifiers::shift());
    assert_eq!(session.selected_node_ids(), vec!["a1", "q2"]);

    // backwards from the same anchor
    session.click("q1", ClickModifiers::plain());
    session.click(ROOT_NODE_ID, ClickModifiers::shift());
    assert_eq!(session.selected_node_ids(), vec!["q1", "root"]);
    assert_eq!(session.active_node_id(), Some(ROOT_NODE_ID));
}

#[test]
fn test_toggle_seeds_leaves_then_collapses() {
    let mut session = two_branches();
    session.click("a2", ClickModifiers::plain());

    session.toggle_synthesis_mode(None);
    assert!(session.synthesis_mode());
    assert_eq!(session.selected_node_ids(), vec!["a1", "a2"]);

    session.toggle_synthesis_mode(None);
    assert!(!session.synthesis_mode());
    assert_eq!(session.selected_node_ids(), vec!["a2"]);
}

#[test]
fn test_synthesis_node_ends_upstream_history() {
    let mut session = two_branches();
    session.add_node(Node::new("s", NodeKind::Synthesis, "merged")).unwrap();
    session.add_edge("a1", "s").unwrap();
    session.add_edge("a2", "s").unwrap();
    session.add_node(Node::new("q3", NodeKind::User, "next")).unwrap();
    session.add_edge("s", "q3").unwrap();

    // starting at the merge follows its first parent
    assert_eq!(ids(&session.thread("s")), vec!["root", "q1", "a1", "s"]);
    // anything downstream stops at the merge
    assert_eq!(ids(&session.thread("q3")), vec!["s", "q3"]);

    let leaves: Vec<&str> = session.leaf_nodes().into_iter().map(|n| n.id.as_str()).collect();
    assert_eq!(leaves, vec!["q3"]);
}

#[test]
fn test_record_restore_keeps_structure() {
    let session = two_branches();
    let json = session.graph().to_record().to_json().unwrap();
    assert!(json.contains(r#""type":"ai""#));

    let record = GraphRecord::from_json(&json).unwrap();
    let restored = PlexusSession::from_record(record).unwrap();
    assert_eq!(restored.active_node_id(), Some(ROOT_NODE_ID));
    assert_eq!(ids(&restored.thread("a2")), vec!["root", "q2", "a2"]);
}

#[test]
fn test_misuse_is_rejected() {
    let mut session = two_branches();
    let dup = session.add_node(Node::new("q1", NodeKind::User, "again")).unwrap_err();
    assert!(dup.is_graph_misuse());
    let dangling = session.add_edge("q1", "ghost").unwrap_err();
    assert!(dangling.is_graph_misuse());
    assert!(session.set_summary("ghost", "x").is_err());
}

#[derive(Debug, Clone)]
enum Click {
    Plain(usize),
    Ctrl(usize),
    Shift(usize),
}

fn click_strategy() -> impl Strategy<Value = Click> {
    prop_oneof![
        (0usize..8).prop_map(Click::Plain),
        (0usize..8).prop_map(Click::Ctrl),
        (0usize..8).prop_map(Click::Shift),
    ]
}

proptest! {
    /// Parent choice is arbitrary (any earlier node), so some graphs are
    /// deep chains and some are bushy; thread() must always end at a
    /// node with no parent.
    #[test]
    fn prop_thread_reaches_root(parents in prop::collection::vec(any::<prop::sample::Index>(), 1..24)) {
        let mut session = PlexusSession::new();
        let mut all = vec![ROOT_NODE_ID.to_string()];
        for (i, parent) in parents.iter().enumerate() {
            let id = format!("n{i}");
            let parent_id = all[parent.index(all.len())].clone();
            session.add_node(Node::new(&id, NodeKind::User, "x")).unwrap();
            session.add_edge(&parent_id, &id).unwrap();
            all.push(id);
        }

        for id in &all {
            let thread = session.thread(id);
            prop_assert_eq!(thread.first().map(|n| n.id.as_str()), Some(ROOT_NODE_ID));
            prop_assert_eq!(thread.last().map(|n| n.id.as_str()), Some(id.as_str()));
            prop_assert!(thread.len() <= all.len());
        }
    }

    #[test]
    fn prop_click_mode_tracks_cardinality(clicks in prop::collection::vec(click_strategy(), 1..40)) {
        let mut session = PlexusSession::new();
        for i in 0..7 {
            let id = format!("n{i}");
            session.add_node(Node::new(&id, NodeKind::User, "x")).unwrap();
            session.add_edge(ROOT_NODE_ID, &id).unwrap();
        }
        let node_ids: Vec<String> = session.graph().nodes().iter().map(|n| n.id.clone()).collect();

        for click in clicks {
            let (index, modifiers) = match click {
                Click::Plain(i) => (i, ClickModifiers::plain()),
                Click::Ctrl(i) => (i, ClickModifiers::ctrl()),
                Click::Shift(i) => (i, ClickModifiers::shift()),
            };
            session.click(&node_ids[index % node_ids.len()], modifiers);

            let selected = session.selected_node_ids();
            prop_assert_eq!(session.synthesis_mode(), selected.len() > 1);
            let mut deduped = selected.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), selected.len());
        }
    }
}
