/// Reassembles newline-delimited frames from arbitrarily chunked transport
/// reads. The transport is free to split one frame across many chunks or to
/// pack many frames into one chunk; any unterminated suffix is carried over
/// and prepended to the next chunk before re-splitting.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transport chunk and returns every complete frame it closed,
    /// in wire order, with the `\n` delimiter stripped. Frames that are blank
    /// after trimming are discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            // Buffering happens at the byte level so a multi-byte sequence
            // split across chunks is whole again by the time it is decoded.
            let text = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            lines.push(trimmed.to_string());
        }

        lines
    }

    /// Consumes the decoder at end of stream, yielding the trailing
    /// unterminated remainder when one exists. The caller attempts to parse
    /// it as a final frame and drops it if it is still malformed.
    pub fn finish(self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.buffer);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LineDecoder;

    #[test]
    fn splits_multiple_frames_in_one_chunk() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"{\"step\":1}\n{\"step\":2}\n");
        assert_eq!(lines, vec!["{\"step\":1}", "{\"step\":2}"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn carries_partial_frame_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"step\":1,\"res").is_empty());
        let lines = decoder.push(b"ult\":\"ok\"}\n");
        assert_eq!(lines, vec!["{\"step\":1,\"result\":\"ok\"}"]);
    }

    #[test]
    fn reassembles_multibyte_character_split_mid_sequence() {
        let frame = "{\"step\":1,\"result\":\"caf\u{e9}\"}\n".as_bytes().to_vec();
        // Split inside the two-byte encoding of e-acute.
        let split = frame.len() - 4;
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&frame[..split]).is_empty());
        let lines = decoder.push(&frame[split..]);
        assert_eq!(lines, vec!["{\"step\":1,\"result\":\"caf\u{e9}\"}"]);
    }

    #[test]
    fn discards_blank_lines() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"\n  \n{\"step\":1}\n\n");
        assert_eq!(lines, vec!["{\"step\":1}"]);
    }

    #[test]
    fn finish_returns_trailing_unterminated_remainder() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"final_report\":\"Done.\"}").is_empty());
        assert_eq!(
            decoder.finish(),
            Some("{\"final_report\":\"Done.\"}".to_string())
        );
    }

    #[test]
    fn finish_ignores_whitespace_remainder() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"  ").is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn arbitrary_chunk_boundaries_yield_identical_frames() {
        let payload = b"{\"step\":2,\"result\":\"ok2\",\"execution_time\":\"1.2s\"}\n";
        for split in 0..payload.len() {
            let mut decoder = LineDecoder::new();
            let mut lines = decoder.push(&payload[..split]);
            lines.extend(decoder.push(&payload[split..]));
            assert_eq!(
                lines,
                vec!["{\"step\":2,\"result\":\"ok2\",\"execution_time\":\"1.2s\"}"],
                "split at byte {split}"
            );
        }
    }
}
