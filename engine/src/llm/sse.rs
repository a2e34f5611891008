//! Server-Sent Events decoding
//!
//! Chat-completion streams arrive as `data: <json>` lines separated by blank
//! lines and terminated by `data: [DONE]`. Network chunks do not respect line
//! boundaries (nor UTF-8 boundaries), so bytes are buffered until a full line
//! is available.

/// A decoded SSE payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// The body of one `data:` line
    Data(String),

    /// The `[DONE]` terminator
    Done,
}

/// Incremental SSE line decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every frame completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = Self::decode_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Option<SseFrame> {
        let line = std::mem::take(&mut self.buffer);
        Self::decode_line(&line)
    }

    fn decode_line(line: &[u8]) -> Option<SseFrame> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\n', '\r']);

        // Comments (": keep-alive") and other fields are ignored
        let data = line.strip_prefix("data:")?.trim_start();
        if data.is_empty() {
            return None;
        }

        if data == "[DONE]" {
            Some(SseFrame::Done)
        } else {
            Some(SseFrame::Data(data.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");

        assert_eq!(
            frames,
            vec![SseFrame::Data("{\"a\":1}".to_string()), SseFrame::Done]
        );
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"con").is_empty());
        assert!(decoder.push(b"tent\":\"x\"}").is_empty());

        let frames = decoder.push(b"\r\n");
        assert_eq!(frames, vec![SseFrame::Data("{\"content\":\"x\"}".to_string())]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let line = "data: \"résumé\"\n".as_bytes();
        let (head, tail) = line.split_at(9);

        assert!(decoder.push(head).is_empty());
        assert_eq!(
            decoder.push(tail),
            vec![SseFrame::Data("\"résumé\"".to_string())]
        );
    }

    #[test]
    fn test_comments_and_fields_ignored() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": OPENROUTER PROCESSING\n\nevent: message\nid: 4\n");
        assert!(frames.is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), Some(SseFrame::Done));
        assert_eq!(decoder.finish(), None);
    }
}
