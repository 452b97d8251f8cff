// src/llm/accumulator.rs
// Cumulative text buffer fed by a stream decoder, reported as snapshots

use tokio::sync::{mpsc, watch};

use super::decoder::{DecodeStep, StreamDecoder};
use crate::error::PlexusError;

/// Receives the full text produced so far, never a bare delta.
///
/// Implementations must not block; the decode loop calls this inline.
pub trait SnapshotSink: Send {
    fn snapshot(&mut self, text: &str);
}

/// Latest-value channel: slow readers skip intermediates but always see
/// the final text.
impl SnapshotSink for watch::Sender<String> {
    fn snapshot(&mut self, text: &str) {
        self.send_replace(text.to_string());
    }
}

impl SnapshotSink for mpsc::UnboundedSender<String> {
    fn snapshot(&mut self, text: &str) {
        // receiver gone means nobody is watching; generation still finishes
        let _ = self.send(text.to_string());
    }
}

impl SnapshotSink for Vec<String> {
    fn snapshot(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

/// Discard snapshots
impl SnapshotSink for () {
    fn snapshot(&mut self, _text: &str) {}
}

pub struct TextAccumulator {
    decoder: Box<dyn StreamDecoder>,
    text: String,
    done: bool,
}

impl TextAccumulator {
    pub fn new(decoder: Box<dyn StreamDecoder>) -> Self {
        Self {
            decoder,
            text: String::new(),
            done: false,
        }
    }

    /// Decode one chunk, emitting a snapshot per recovered delta.
    /// Returns true once the completion sentinel has been seen.
    pub fn push(&mut self, chunk: &[u8], sink: &mut dyn SnapshotSink) -> bool {
        if self.done {
            return true;
        }
        let step = self.decoder.push(chunk);
        self.apply(step, sink)
    }

    /// Flush the decoder at end of body
    pub fn finish(&mut self, sink: &mut dyn SnapshotSink) -> bool {
        if self.done {
            return true;
        }
        let step = self.decoder.finish();
        self.apply(step, sink)
    }

    fn apply(&mut self, step: DecodeStep, sink: &mut dyn SnapshotSink) -> bool {
        for delta in step.deltas {
            if delta.is_empty() {
                continue;
            }
            self.text.push_str(&delta);
            sink.snapshot(&self.text);
        }
        self.done = step.done;
        self.done
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

pub const NO_RESPONSE: &str = "No response.";

/// Outcome of one generation call. Never an `Err`: failures keep whatever
/// text had already arrived.
#[derive(Debug)]
pub enum Completion {
    /// Stream ended normally
    Finished(String),
    /// Stream broke after some text arrived
    Partial { text: String, error: PlexusError },
    /// Nothing arrived before the failure
    Failed(PlexusError),
}

impl Completion {
    /// Apply the partial-result policy to an interrupted accumulation
    pub fn interrupted(text: String, error: PlexusError) -> Self {
        if text.is_empty() {
            Completion::Failed(error)
        } else {
            Completion::Partial { text, error }
        }
    }

    /// Accumulated text, `"No response."` for an empty success, or
    /// `"Error: <message>"` when nothing was produced.
    pub fn final_text(&self) -> String {
        match self {
            Completion::Finished(text) if text.is_empty() => NO_RESPONSE.to_string(),
            Completion::Finished(text) | Completion::Partial { text, .. } => text.clone(),
            Completion::Failed(error) => format!("Error: {}", error),
        }
    }

    /// Produced text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Completion::Finished(text) | Completion::Partial { text, .. } if !text.is_empty() => {
                Some(text.as_str())
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PlexusError> {
        match self {
            Completion::Finished(_) => None,
            Completion::Partial { error, .. } | Completion::Failed(error) => Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Completion::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::decoder::{LineEventDecoder, ProgressiveScanDecoder};

    #[test]
    fn test_line_events_emit_cumulative_snapshots() {
        let mut acc = TextAccumulator::new(Box::new(LineEventDecoder::new("/delta")));
        let mut snapshots: Vec<String> = Vec::new();

        assert!(!acc.push(b"data: {\"delta\":\"Hel\"}\n", &mut snapshots));
        assert!(!acc.push(b"data: {\"delta\":\"lo\"}\n", &mut snapshots));
        assert!(acc.push(b"data: [DONE]\n", &mut snapshots));

        assert_eq!(snapshots, vec!["Hel", "Hello"]);
        assert_eq!(acc.text(), "Hello");
    }

    #[test]
    fn test_scan_never_emits_half_escape() {
        let mut acc = TextAccumulator::new(Box::new(ProgressiveScanDecoder::gemini()));
        let mut snapshots: Vec<String> = Vec::new();

        acc.push(br#"[{"text": "a"}, {"text": "say \"#, &mut snapshots);
        assert_eq!(snapshots, vec!["a"]);
        acc.push(br#""x\" ok"}]"#, &mut snapshots);
        assert_eq!(snapshots, vec!["a", "asay \"x\" ok"]);
    }

    #[test]
    fn test_watch_sink_keeps_latest() {
        let (mut tx, rx) = watch::channel(String::new());
        let mut acc = TextAccumulator::new(Box::new(LineEventDecoder::new("/delta")));
        acc.push(b"data: {\"delta\":\"a\"}\ndata: {\"delta\":\"b\"}\n", &mut tx);
        assert_eq!(*rx.borrow(), "ab");
    }

    #[test]
    fn test_final_text_policy() {
        assert_eq!(Completion::Finished("hi".into()).final_text(), "hi");
        assert_eq!(Completion::Finished(String::new()).final_text(), NO_RESPONSE);

        let partial = Completion::interrupted("par".into(), PlexusError::Cancelled);
        assert_eq!(partial.final_text(), "par");
        assert!(partial.error().is_some());

        let failed = Completion::interrupted(String::new(), PlexusError::Cancelled);
        assert!(failed.is_failed());
        assert_eq!(failed.final_text(), "Error: generation cancelled");
        assert_eq!(failed.text(), None);
    }
}
