//! Secondary link: whole envelopes over a message-oriented wireless link
//!
//! The link keeps message boundaries, so envelopes are sent and received as
//! single values with no framing. Connection state comes from the radio
//! stack's callbacks. Inbound writes are queued until the control loop gets
//! to them.

use core::fmt;

use heapless::{Deque, Vec};
use omip_hal::MessageLink;
use omip_protocol::MAX_MESSAGE_SIZE;

/// Inbound messages held between polls
pub const INBOX_DEPTH: usize = 4;

/// One inbound message
pub type InboundMessage = Vec<u8, MAX_MESSAGE_SIZE>;

/// Errors sending on the secondary link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecondaryError<E> {
    /// No host connected
    LinkDown,
    Link(E),
}

impl<E: fmt::Debug> fmt::Display for SecondaryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecondaryError::LinkDown => f.write_str("secondary link is down"),
            SecondaryError::Link(e) => write!(f, "secondary link send failed: {:?}", e),
        }
    }
}

/// Frame layer and connection tracking for the secondary link
pub struct SecondaryLink<L> {
    link: L,
    up: bool,
    inbox: Deque<InboundMessage, INBOX_DEPTH>,
    dropped: u32,
}

impl<L: MessageLink> SecondaryLink<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            up: false,
            inbox: Deque::new(),
            dropped: 0,
        }
    }

    pub fn is_up(&self) -> bool {
        self.up
    }

    /// Start advertising for a first connection
    pub fn start(&mut self) -> Result<(), L::Error> {
        self.link.start_advertising()
    }

    /// Host connected
    pub fn on_connect(&mut self) {
        info!("secondary link up");
        self.up = true;
    }

    /// Host disconnected; advertise again so it can come back
    pub fn on_disconnect(&mut self) -> Result<(), L::Error> {
        info!("secondary link down");
        self.up = false;
        self.link.start_advertising()
    }

    /// Queue a message written by the host
    ///
    /// When the inbox is full the oldest message is dropped. Returns false if
    /// the message itself was too large to keep.
    pub fn on_write(&mut self, bytes: &[u8]) -> bool {
        let Ok(message) = InboundMessage::from_slice(bytes) else {
            warn!("secondary link: dropping {} byte write", bytes.len());
            self.dropped = self.dropped.wrapping_add(1);
            return false;
        };

        if self.inbox.is_full() {
            self.inbox.pop_front();
            self.dropped = self.dropped.wrapping_add(1);
            warn!("secondary link: inbox full, dropped oldest message");
        }
        // Room was made above
        let _ = self.inbox.push_back(message);
        true
    }

    /// Oldest queued message
    pub fn take_message(&mut self) -> Option<InboundMessage> {
        self.inbox.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Messages dropped since startup
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Send one encoded envelope as a single notification
    pub fn send(&mut self, payload: &[u8]) -> Result<(), SecondaryError<L::Error>> {
        if !self.up {
            return Err(SecondaryError::LinkDown);
        }
        self.link.notify(payload).map_err(SecondaryError::Link)
    }
}
