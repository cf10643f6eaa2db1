//! Server-Sent Events decoding for streamed chat completions

/// One decoded `data:` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    /// The `[DONE]` terminator
    Done,
}

impl SseEvent {
    fn from_payload(payload: &str) -> Self {
        if payload == "[DONE]" {
            SseEvent::Done
        } else {
            SseEvent::Data(payload.to_string())
        }
    }
}

/// Incremental SSE decoder
///
/// Bytes may arrive split anywhere, including inside a multi-byte UTF-8
/// sequence, so undecoded bytes stay buffered until a full line is present.
/// Lines other than `data:` (comments, `event:`, `id:`) are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event completed by it
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a final line that had no trailing newline
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest).into_iter().collect()
    }
}

fn parse_line(line: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(line);
    let payload = line.trim().strip_prefix("data:")?.trim();
    Some(SseEvent::from_payload(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"text\":\"hel").is_empty());
        assert_eq!(
            decoder.push(b"lo\"}\n\n"),
            vec![SseEvent::Data("{\"text\":\"hello\"}".to_string())]
        );
    }

    #[test]
    fn test_done_marker_and_ignored_lines() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\nevent: message\ndata: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("{\"a\":1}".to_string()), SseEvent::Done]
        );
    }

    #[test]
    fn test_multibyte_character_split_between_chunks() {
        let mut decoder = SseDecoder::new();
        let text = "data: {\"t\":\"é\"}\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.push(&text[..split]).is_empty());
        assert_eq!(
            decoder.push(&text[split..]),
            vec![SseEvent::Data("{\"t\":\"é\"}".to_string())]
        );
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"done\":true}").is_empty());
        assert_eq!(
            decoder.finish(),
            vec![SseEvent::Data("{\"done\":true}".to_string())]
        );
        assert!(decoder.finish().is_empty());
    }
}
