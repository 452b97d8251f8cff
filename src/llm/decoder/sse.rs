//! Line-event decoder for SSE delta streams
//!
//! Each `data: ` line carries one JSON object; the text delta sits at a
//! fixed JSON pointer. `[DONE]` ends the stream. Lines that fail to parse
//! are skipped so one corrupt event never aborts generation.

use serde_json::Value;
use tracing::{debug, warn};

use super::{DecodeStep, StreamDecoder};

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// Delta location in a Chat Completions chunk
pub const OPENAI_DELTA_POINTER: &str = "/choices/0/delta/content";

#[derive(Debug)]
pub struct LineEventDecoder {
    buffer: Vec<u8>,
    delta_pointer: String,
    done: bool,
}

impl LineEventDecoder {
    /// Maximum bytes held for one unterminated line
    const MAX_LINE_BYTES: usize = 1024 * 1024;

    pub fn new(delta_pointer: impl Into<String>) -> Self {
        Self {
            buffer: Vec::new(),
            delta_pointer: delta_pointer.into(),
            done: false,
        }
    }

    pub fn openai() -> Self {
        Self::new(OPENAI_DELTA_POINTER)
    }

    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty()
    }

    fn handle_line(&mut self, raw: &[u8], step: &mut DecodeStep) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches('\r');

        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        if data.trim() == DONE_SENTINEL {
            self.done = true;
            step.done = true;
            return;
        }

        let frame: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                debug!("Skipping malformed event line: {}", e);
                return;
            }
        };
        if let Some(delta) = frame.pointer(&self.delta_pointer).and_then(Value::as_str) {
            if !delta.is_empty() {
                step.deltas.push(delta.to_string());
            }
        }
    }
}

impl StreamDecoder for LineEventDecoder {
    fn push(&mut self, chunk: &[u8]) -> DecodeStep {
        let mut step = DecodeStep::default();
        if self.done {
            step.done = true;
            return step;
        }

        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = self.buffer[start..end].to_vec();
            start = end + 1;

            self.handle_line(&line, &mut step);
            if self.done {
                break;
            }
        }
        self.buffer.drain(..start);

        if self.buffer.len() > Self::MAX_LINE_BYTES {
            warn!(
                "Event line exceeded {}KB without a newline, dropping it",
                Self::MAX_LINE_BYTES / 1024
            );
            self.buffer.clear();
        }

        step
    }

    fn finish(&mut self) -> DecodeStep {
        let mut step = DecodeStep::default();
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.handle_line(&line, &mut step);
        }
        step.done = self.done;
        step
    }
}
