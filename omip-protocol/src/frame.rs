//! Frame encoding and decoding for the primary (serial) link.
//!
//! Frame format:
//! - MARKER (1 byte): `'~'` (0x7E) synchronization byte
//! - LENGTH (1 byte): payload length (0-255)
//! - PAYLOAD (0-255 bytes): one encoded envelope
//!
//! There is no checksum; a stalled or truncated frame is abandoned by the
//! parser's timeouts instead.

use core::fmt;

use heapless::Vec;

/// Default frame synchronization byte
pub const FRAME_MARKER: u8 = b'~';

/// Maximum payload size in bytes (one-byte length field)
pub const MAX_FRAME_PAYLOAD: usize = 255;

/// Frame header size (MARKER + LENGTH)
pub const FRAME_HEADER_SIZE: usize = 2;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = FRAME_HEADER_SIZE + MAX_FRAME_PAYLOAD;

/// Default wait for the length byte after a marker
pub const DEFAULT_LENGTH_TIMEOUT_MS: u32 = 100;

/// Default wait for the complete payload after the length byte
pub const DEFAULT_PAYLOAD_TIMEOUT_MS: u32 = 500;

/// Errors that can occur during frame encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::PayloadTooLarge => f.write_str("frame payload exceeds 255 bytes"),
            FrameError::BufferTooSmall => f.write_str("frame buffer too small"),
        }
    }
}

/// Encode `payload` as a frame into `buffer`
///
/// Returns the number of bytes written
pub fn encode_frame(marker: u8, payload: &[u8], buffer: &mut [u8]) -> Result<usize, FrameError> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(FrameError::PayloadTooLarge);
    }
    let frame_len = FRAME_HEADER_SIZE + payload.len();
    if buffer.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }

    buffer[0] = marker;
    buffer[1] = payload.len() as u8;
    buffer[FRAME_HEADER_SIZE..frame_len].copy_from_slice(payload);

    Ok(frame_len)
}

/// A received frame payload
pub type FramePayload = Vec<u8, MAX_FRAME_PAYLOAD>;

/// Parser timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameTimeouts {
    /// Wait for LENGTH after MARKER
    pub length_ms: u32,
    /// Wait for all PAYLOAD bytes after LENGTH
    pub payload_ms: u32,
}

impl Default for FrameTimeouts {
    fn default() -> Self {
        Self {
            length_ms: DEFAULT_LENGTH_TIMEOUT_MS,
            payload_ms: DEFAULT_PAYLOAD_TIMEOUT_MS,
        }
    }
}

/// State machine for parsing incoming frames
///
/// Bytes are fed together with the current time. A partial frame that
/// stalls longer than the configured timeout is dropped silently and the
/// parser goes back to hunting for a marker.
#[derive(Debug, Clone)]
pub struct FrameParser {
    marker: u8,
    timeouts: FrameTimeouts,
    state: ParseState,
    buffer: FramePayload,
    expected_length: u8,
    /// When the current wait started
    since_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    /// Waiting for MARKER
    Idle,
    /// Got MARKER, waiting for LENGTH
    AwaitingLength,
    /// Reading payload bytes
    AwaitingPayload,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(FRAME_MARKER, FrameTimeouts::default())
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new(marker: u8, timeouts: FrameTimeouts) -> Self {
        Self {
            marker,
            timeouts,
            state: ParseState::Idle,
            buffer: Vec::new(),
            expected_length: 0,
            since_ms: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.buffer.clear();
        self.expected_length = 0;
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Drop a stalled partial frame
    ///
    /// Returns true if a partial frame was abandoned.
    pub fn expire(&mut self, now_ms: u32) -> bool {
        let limit = match self.state {
            ParseState::Idle => return false,
            ParseState::AwaitingLength => self.timeouts.length_ms,
            ParseState::AwaitingPayload => self.timeouts.payload_ms,
        };

        if now_ms.wrapping_sub(self.since_ms) > limit {
            self.reset();
            return true;
        }
        false
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Some(payload)` when a complete frame has been received.
    pub fn feed(&mut self, byte: u8, now_ms: u32) -> Option<FramePayload> {
        self.expire(now_ms);

        match self.state {
            ParseState::Idle => {
                if byte == self.marker {
                    self.state = ParseState::AwaitingLength;
                    self.since_ms = now_ms;
                }
                // Silently ignore non-marker bytes while waiting
                None
            }
            ParseState::AwaitingLength => {
                if byte == 0 {
                    self.reset();
                    return Some(Vec::new());
                }
                self.expected_length = byte;
                self.buffer.clear();
                self.state = ParseState::AwaitingPayload;
                self.since_ms = now_ms;
                None
            }
            ParseState::AwaitingPayload => {
                // Cannot overflow: expected_length <= MAX_FRAME_PAYLOAD
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.expected_length as usize {
                    let payload = core::mem::take(&mut self.buffer);
                    self.reset();
                    return Some(payload);
                }
                None
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8], now_ms: u32) -> Option<FramePayload> {
        for &byte in bytes {
            if let Some(payload) = self.feed(byte, now_ms) {
                return Some(payload);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frame_to_vec(payload: &[u8]) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = encode_frame(FRAME_MARKER, payload, &mut buffer).unwrap();
        Vec::from_slice(&buffer[..len]).unwrap()
    }

    #[test]
    fn test_frame_encode_empty_payload() {
        let mut buffer = [0u8; 4];
        let len = encode_frame(FRAME_MARKER, &[], &mut buffer).unwrap();

        assert_eq!(len, 2);
        assert_eq!(buffer[0], b'~');
        assert_eq!(buffer[1], 0);
    }

    #[test]
    fn test_frame_encode_with_payload() {
        let mut buffer = [0u8; 8];
        let len = encode_frame(FRAME_MARKER, &[0x0A, 0x00], &mut buffer).unwrap();

        assert_eq!(len, 4);
        assert_eq!(&buffer[..4], &[0x7E, 0x02, 0x0A, 0x00]);
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buffer = [0u8; 3];
        assert_eq!(
            encode_frame(FRAME_MARKER, &[1, 2], &mut buffer),
            Err(FrameError::BufferTooSmall)
        );
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_FRAME_PAYLOAD + 1];
        let mut buffer = [0u8; MAX_FRAME_SIZE + 1];
        assert_eq!(
            encode_frame(FRAME_MARKER, &large_payload, &mut buffer),
            Err(FrameError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_empty_frame_is_emitted() {
        let mut parser = FrameParser::default();
        let payload = parser.feed_bytes(&[0x7E, 0x00], 0).unwrap();
        assert!(payload.is_empty());
        assert_eq!(parser.state(), ParseState::Idle);
    }

    #[test]
    fn test_parser_resync_after_garbage() {
        let mut parser = FrameParser::default();
        let payload = parser
            .feed_bytes(&[0x00, 0xFF, 0x12, 0x7E, 0x01, 0x42], 0)
            .unwrap();
        assert_eq!(&payload[..], &[0x42]);
    }

    #[test]
    fn test_length_timeout_drops_frame() {
        let mut parser = FrameParser::default();
        assert!(parser.feed(0x7E, 0).is_none());
        assert!(!parser.expire(100));
        assert!(parser.expire(101));
        assert_eq!(parser.state(), ParseState::Idle);

        // The late length byte is treated as noise, not as a length
        assert!(parser.feed(0x01, 150).is_none());
        assert_eq!(parser.state(), ParseState::Idle);
    }

    #[test]
    fn test_payload_timeout_drops_frame() {
        let mut parser = FrameParser::default();
        parser.feed_bytes(&[0x7E, 0x03, 0xAA], 1_000);
        assert_eq!(parser.state(), ParseState::AwaitingPayload);

        // Remaining bytes arrive too late and are ignored
        assert!(parser.feed(0xBB, 1_501).is_none());
        assert_eq!(parser.state(), ParseState::Idle);

        // A fresh frame still parses
        let payload = parser.feed_bytes(&[0x7E, 0x01, 0x09], 1_600).unwrap();
        assert_eq!(&payload[..], &[0x09]);
    }

    #[test]
    fn test_slow_but_in_time_payload() {
        let mut parser = FrameParser::default();
        assert!(parser.feed(0x7E, 0).is_none());
        assert!(parser.feed(0x02, 90).is_none());
        assert!(parser.feed(0x01, 300).is_none());
        let payload = parser.feed(0x02, 590).unwrap();
        assert_eq!(&payload[..], &[0x01, 0x02]);
    }

    #[test]
    fn test_timeout_across_clock_wrap() {
        let mut parser = FrameParser::default();
        let start = u32::MAX - 20;
        parser.feed(0x7E, start);
        assert!(!parser.expire(start.wrapping_add(50)));
        assert!(parser.expire(start.wrapping_add(150)));
    }

    #[test]
    fn test_custom_marker() {
        let mut parser = FrameParser::new(0xAA, FrameTimeouts::default());
        assert!(parser.feed_bytes(&[0x7E, 0x01, 0x05], 0).is_none());
        let payload = parser.feed_bytes(&[0xAA, 0x01, 0x05], 0).unwrap();
        assert_eq!(&payload[..], &[0x05]);
    }

    #[test]
    fn test_marker_inside_payload() {
        let frame = frame_to_vec(&[0x7E, 0x7E, 0x01]);
        let mut parser = FrameParser::default();
        let payload = parser.feed_bytes(&frame, 0).unwrap();
        assert_eq!(&payload[..], &[0x7E, 0x7E, 0x01]);
    }

    proptest! {
        #[test]
        fn prop_frame_roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..=MAX_FRAME_PAYLOAD)) {
            let frame = frame_to_vec(&payload);
            let mut parser = FrameParser::default();
            let parsed = parser.feed_bytes(&frame, 0).unwrap();
            prop_assert_eq!(&parsed[..], &payload[..]);
            prop_assert_eq!(parser.state(), ParseState::Idle);
        }
    }
}
