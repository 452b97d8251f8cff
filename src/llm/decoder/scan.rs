//! Progressive scan decoder for streamed JSON documents
//!
//! The body is one JSON array that is never complete until the stream
//! ends, so nothing is parsed as a document. Instead the raw buffer is
//! searched from a cursor for the next complete `"text": "..."` field.
//! A field only matches once its closing quote is in the buffer, so a
//! truncated string or a split escape at the tail is simply not seen yet.

use regex::bytes::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{DecodeStep, StreamDecoder};

/// Complete quoted `text` field with JSON escape pairs kept intact
static GEMINI_TEXT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s-u)"text":\s*"((?:[^"\\]|\\.)*)""#).expect("text field pattern is valid")
});

#[derive(Debug)]
pub struct ProgressiveScanDecoder {
    /// Bytes after the last consumed field
    raw: Vec<u8>,
    /// Bytes already consumed and dropped from `raw`
    consumed: usize,
    pattern: Regex,
}

impl ProgressiveScanDecoder {
    /// Scan for a custom field pattern. Capture group 1 must be the body of
    /// a JSON string literal (without its quotes).
    pub fn with_pattern(pattern: Regex) -> Self {
        Self {
            raw: Vec::new(),
            consumed: 0,
            pattern,
        }
    }

    pub fn gemini() -> Self {
        Self::with_pattern(GEMINI_TEXT_FIELD.clone())
    }

    /// Stream offset up to which every complete field has been consumed
    pub fn cursor(&self) -> usize {
        self.consumed
    }

    /// Bytes held back waiting for the next field to close
    pub fn buffered(&self) -> usize {
        self.raw.len()
    }

    fn scan(&mut self) -> Vec<String> {
        let mut deltas = Vec::new();
        let mut cursor = 0;

        while let Some(caps) = self.pattern.captures_at(&self.raw, cursor) {
            let (Some(field), Some(value)) = (caps.get(0), caps.get(1)) else {
                break;
            };

            // a matched field is closed, so more bytes cannot fix a bad escape
            let text = decode_json_string(value.as_bytes()).unwrap_or_else(|e| {
                debug!(
                    "Lossy decode of text field at offset {}: {}",
                    self.consumed + field.start(),
                    e
                );
                decode_json_string_lossy(value.as_bytes())
            });
            if !text.is_empty() {
                deltas.push(text);
            }
            cursor = field.end();
        }

        self.raw.drain(..cursor);
        self.consumed += cursor;
        deltas
    }
}

fn decode_json_string(body: &[u8]) -> serde_json::Result<String> {
    let mut literal = Vec::with_capacity(body.len() + 2);
    literal.push(b'"');
    literal.extend_from_slice(body);
    literal.push(b'"');
    serde_json::from_slice(&literal)
}

/// Unescape a string body the strict parser rejected. Unknown escapes,
/// lone surrogates and invalid UTF-8 become U+FFFD.
fn decode_json_string_lossy(body: &[u8]) -> String {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;

    while i < body.len() {
        if body[i] != b'\\' || i + 1 >= body.len() {
            out.push(body[i]);
            i += 1;
            continue;
        }

        let escaped = body[i + 1];
        i += 2;
        let simple = match escaped {
            b'"' => Some('"'),
            b'\\' => Some('\\'),
            b'/' => Some('/'),
            b'b' => Some('\u{8}'),
            b'f' => Some('\u{c}'),
            b'n' => Some('\n'),
            b'r' => Some('\r'),
            b't' => Some('\t'),
            _ => None,
        };
        let ch = match (simple, escaped) {
            (Some(c), _) => c,
            (None, b'u') => match hex4(body, i) {
                Some(high @ 0xD800..=0xDBFF) => {
                    let low = (body.get(i + 4..i + 6) == Some(&b"\\u"[..]))
                        .then(|| hex4(body, i + 6))
                        .flatten()
                        .filter(|low| (0xDC00..=0xDFFF).contains(low));
                    match low {
                        Some(low) => {
                            i += 10;
                            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                            char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
                        }
                        None => {
                            i += 4;
                            char::REPLACEMENT_CHARACTER
                        }
                    }
                }
                Some(code) => {
                    i += 4;
                    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
                }
                None => char::REPLACEMENT_CHARACTER,
            },
            _ => char::REPLACEMENT_CHARACTER,
        };
        let mut utf8 = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex4(body: &[u8], at: usize) -> Option<u32> {
    let digits = body.get(at..at + 4)?;
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u32::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()
}

impl StreamDecoder for ProgressiveScanDecoder {
    fn push(&mut self, chunk: &[u8]) -> DecodeStep {
        self.raw.extend_from_slice(chunk);
        DecodeStep {
            deltas: self.scan(),
            done: false,
        }
    }
}
