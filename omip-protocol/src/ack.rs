//! Image transfer acknowledgements
//!
//! Every image chunk is answered with one unframed byte on the primary link,
//! whichever link delivered the chunk.

/// Acknowledgement sent back for an image chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// Chunk accepted (or image completed / slot cleared)
    Ready,
    /// Chunk rejected; the transfer has been abandoned
    Error,
}

// Wire format values (ASCII ACK / NAK)
pub const ACK_READY: u8 = 0x06;
pub const ACK_ERROR: u8 = 0x15;

impl Ack {
    /// Parse an acknowledgement from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ACK_READY => Some(Ack::Ready),
            ACK_ERROR => Some(Ack::Error),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Ack::Ready => ACK_READY,
            Ack::Error => ACK_ERROR,
        }
    }
}
