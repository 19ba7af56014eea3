//! Incremental parser for the generation stream's `data:` lines.

use tracing::debug;

use super::frame::StreamFrame;
use super::recovery::recover_complete_frame;

const DATA_PREFIX: &str = "data: ";

/// Turns arbitrarily chunked bytes into [`StreamFrame`]s.
///
/// Bytes are buffered until a `\n` completes a line, so neither a frame nor
/// a multi-byte UTF-8 sequence split across chunks is ever seen half-way.
/// Lines that do not decode are handed to the fallback decoder and
/// otherwise dropped; feeding never fails.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    dropped: usize,
}

impl SseParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every frame completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        complete
            .split(|&b| b == b'\n')
            .filter_map(|line| self.parse_line(&String::from_utf8_lossy(line)))
            .collect()
    }

    /// Processes whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.is_empty() {
            return Vec::new();
        }
        rest.split(|&b| b == b'\n')
            .filter_map(|line| self.parse_line(&String::from_utf8_lossy(line)))
            .collect()
    }

    /// Number of candidate lines dropped so far because nothing could be
    /// recovered from them.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn parse_line(&mut self, line: &str) -> Option<StreamFrame> {
        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }

        match serde_json::from_str::<StreamFrame>(payload) {
            Ok(frame) => Some(frame),
            Err(err) => {
                if let Some(frame) = recover_complete_frame(payload) {
                    debug!(error = %err, "recovered complete frame from malformed JSON");
                    return Some(frame);
                }
                self.dropped += 1;
                debug!(error = %err, len = payload.len(), "dropping undecodable stream frame");
                None
            }
        }
    }
}
