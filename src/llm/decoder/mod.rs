//! Stream decoders: raw response bytes in, text deltas out
//!
//! Chunk boundaries are arbitrary, so both decoders buffer raw bytes and
//! only emit text once a complete unit (line or quoted field) is present.

mod scan;
mod sse;

pub use scan::ProgressiveScanDecoder;
pub use sse::LineEventDecoder;

use super::types::ProviderKind;

/// Deltas recovered from one push
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodeStep {
    pub deltas: Vec<String>,
    /// Completion sentinel seen; nothing after it is decoded
    pub done: bool,
}

pub trait StreamDecoder: Send {
    /// Feed the next chunk
    fn push(&mut self, chunk: &[u8]) -> DecodeStep;

    /// Upstream closed the body; flush whatever is still decodable
    fn finish(&mut self) -> DecodeStep {
        DecodeStep::default()
    }
}

/// Pick the decoder matching a provider's wire format
pub fn decoder_for(provider: ProviderKind) -> Box<dyn StreamDecoder> {
    match provider {
        ProviderKind::OpenAi => Box::new(LineEventDecoder::openai()),
        ProviderKind::Google => Box::new(ProgressiveScanDecoder::gemini()),
    }
}
