//! Secondary link abstractions
//!
//! The secondary link is a connection-oriented wireless channel (a BLE
//! characteristic pair on the reference panel). The link itself preserves
//! message boundaries, so implementations send and deliver whole messages.
//!
//! Inbound traffic and connection changes arrive through callbacks driven by
//! the radio stack; those are forwarded to the core, not modelled here.

/// Outbound side of a message-oriented link
pub trait MessageLink {
    /// Error type for link operations
    type Error;

    /// Send one complete message as a single notification
    fn notify(&mut self, message: &[u8]) -> Result<(), Self::Error>;

    /// (Re)start advertising so a host can reconnect
    fn start_advertising(&mut self) -> Result<(), Self::Error>;
}
