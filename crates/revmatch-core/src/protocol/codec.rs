//! Prompt-delimited framing
//!
//! Outgoing commands get a trailing carriage return. Incoming bytes are
//! collected until the prompt byte and returned with whitespace and the
//! prompt stripped, e.g. `"41 0C 1A F8\r\r>"` becomes `"410C1AF8"`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use super::{ProtocolError, MAX_RESPONSE_SIZE, PROMPT};

/// Codec for the ELM327 line protocol
#[derive(Debug, Clone, Copy)]
pub struct PromptCodec {
    terminator: u8,
    max_len: usize,
}

impl Default for PromptCodec {
    fn default() -> Self {
        Self::new(PROMPT)
    }
}

impl PromptCodec {
    /// Codec that ends each response at `terminator`
    pub fn new(terminator: u8) -> Self {
        Self {
            terminator,
            max_len: MAX_RESPONSE_SIZE,
        }
    }

    /// Limit on bytes buffered while waiting for the terminator
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Response terminator
    pub fn terminator(&self) -> u8 {
        self.terminator
    }
}

/// Remove the spacing and line breaks the adapter pads responses with
pub fn clean_response(raw: &[u8]) -> String {
    raw.iter()
        .filter(|b| !matches!(b, b' ' | b'\r' | b'\n' | b'\0'))
        .map(|&b| b as char)
        .collect()
}

impl Decoder for PromptCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        let Some(end) = src.iter().position(|&b| b == self.terminator) else {
            if src.len() > self.max_len {
                src.clear();
                return Err(ProtocolError::BufferOverflow(self.max_len));
            }
            return Ok(None);
        };

        let frame = src.split_to(end + 1);
        Ok(Some(clean_response(&frame[..end])))
    }
}

impl Encoder<String> for PromptCodec {
    type Error = ProtocolError;

    fn encode(&mut self, command: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        dst.reserve(command.len() + 1);
        dst.extend_from_slice(command.as_bytes());
        if !command.ends_with('\r') {
            dst.extend_from_slice(b"\r");
        }
        Ok(())
    }
}
