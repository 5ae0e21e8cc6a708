use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use super::extract::parse_response;
use super::request::StreamChunk;
use super::ClassificationRecord;
use crate::error::{Error, Result};

const DATA_PREFIX: &str = "data: ";

/// Accumulates text fragments from a `text/event-stream` response body.
///
/// Lines may arrive split across chunks (possibly mid UTF-8 sequence), so
/// bytes after the last newline are held back until the next chunk.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    text: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk of the response body.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return;
        };
        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
        for line in complete.split(|&b| b == b'\n') {
            self.process_line(&String::from_utf8_lossy(line));
        }
    }

    /// Text accumulated so far, in arrival order.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Flush any unterminated final line and extract the classification.
    pub fn finish(mut self) -> ClassificationRecord {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.process_line(&String::from_utf8_lossy(&tail));
        }
        debug!(chars = self.text.len(), "Classification stream complete");
        parse_response(&self.text)
    }

    fn process_line(&mut self, line: &str) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        if payload.trim().is_empty() {
            return;
        }

        match serde_json::from_str::<StreamChunk>(payload) {
            Ok(chunk) => {
                if let Some(fragment) = chunk.first_text() {
                    self.text.push_str(fragment);
                }
            }
            Err(e) => warn!(error = %e, "Skipping malformed SSE data line"),
        }
    }
}

/// Drive a byte stream to completion and decode the classification.
///
/// Only transport errors fail the call; malformed content degrades to the
/// fallback fields.
pub async fn decode_stream<S, B, E>(stream: S) -> Result<ClassificationRecord>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut decoder = SseDecoder::new();
    let mut stream = std::pin::pin!(stream);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::StreamRead(format!("reading SSE chunk: {e}")))?;
        decoder.feed(chunk.as_ref());
    }

    Ok(decoder.finish())
}
