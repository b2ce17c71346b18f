//! Newline framing for the gateway byte stream.

use crate::DELIMITER;

/// Default cap on the unterminated tail kept between reads.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Buffers stream input and splits it into delimiter-terminated payloads.
///
/// Transports deliver bytes in arbitrary chunks: a read may carry half a
/// message, several messages, or both. Every complete segment is returned
/// without its delimiter; the trailing partial segment stays buffered until
/// a later `feed` completes it.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_frame_len: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { buffer: Vec::with_capacity(1024), max_frame_len: max_frame_len.max(1) }
    }

    /// Append `bytes` and return every payload completed by them.
    ///
    /// Empty segments (two delimiters in a row) are returned as empty payloads.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[consumed..].iter().position(|b| *b == DELIMITER) {
            let end = consumed + offset;
            frames.push(self.buffer[consumed..end].to_vec());
            consumed = end + 1;
        }
        self.buffer.drain(..consumed);

        if self.buffer.len() > self.max_frame_len {
            log::warn!(
                "framing: dropping unterminated tail len={} max={}",
                self.buffer.len(),
                self.max_frame_len
            );
            self.buffer.clear();
        }

        frames
    }

    /// Number of bytes waiting for a delimiter.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_frames_in_one_chunk() {
        let mut framer = LineFramer::new();
        let frames = framer.feed(b"one\ntwo\n");
        assert_eq!(frames, vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn holds_partial_frame_until_delimiter() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"{\"cmd\"").is_empty());
        assert!(framer.feed(b":3").is_empty());
        assert_eq!(framer.buffered(), 8);

        let frames = framer.feed(b"}\n{\"cm");
        assert_eq!(frames, vec![b"{\"cmd\":3}".to_vec()]);
        assert_eq!(framer.buffered(), 4);
    }

    #[test]
    fn passes_empty_segments_through() {
        let mut framer = LineFramer::new();
        let frames = framer.feed(b"\n\nx\n");
        assert_eq!(frames, vec![Vec::new(), Vec::new(), b"x".to_vec()]);
    }

    #[test]
    fn never_emits_unterminated_tail() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"no newline here").is_empty());
        assert_eq!(framer.buffered(), 15);
    }

    #[test]
    fn drops_oversized_tail_and_recovers() {
        let mut framer = LineFramer::with_max_frame_len(8);
        assert!(framer.feed(b"0123456789").is_empty());
        assert_eq!(framer.buffered(), 0);

        let frames = framer.feed(b"ok\n");
        assert_eq!(frames, vec![b"ok".to_vec()]);
    }

    #[test]
    fn complete_frames_are_kept_even_when_chunk_is_large() {
        let mut framer = LineFramer::with_max_frame_len(4);
        let frames = framer.feed(b"abcdefgh\nij");
        assert_eq!(frames, vec![b"abcdefgh".to_vec()]);
        assert_eq!(framer.buffered(), 2);
    }

    #[test]
    fn reset_discards_buffered_bytes() {
        let mut framer = LineFramer::new();
        framer.feed(b"partial");
        framer.reset();
        assert_eq!(framer.feed(b"x\n"), vec![b"x".to_vec()]);
    }
}
