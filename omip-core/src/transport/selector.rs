//! Outbound route selection
//!
//! Every outbound envelope goes over the secondary link while a host is
//! connected there, and over the primary link otherwise. Sends are fire and
//! forget: no queueing, no retry, no fallback to the other link.

use core::fmt;

use omip_hal::{MessageLink, Uart, UartTx};
use omip_protocol::{Ack, EncodeError, Envelope, FrameError, MAX_MESSAGE_SIZE};

use super::primary::{PrimaryError, PrimaryLink};
use super::secondary::{SecondaryError, SecondaryLink};

/// Link an outbound message went out on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    Primary,
    Secondary,
}

/// Errors sending an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError<P, S> {
    /// Envelope does not fit a message
    Encode(EncodeError),
    /// Encoded envelope does not fit a frame
    Frame(FrameError),
    /// Secondary link dropped between route choice and send
    LinkDown,
    Primary(P),
    Secondary(S),
}

impl<P: fmt::Debug, S: fmt::Debug> fmt::Display for SendError<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Encode(e) => write!(f, "encode failed: {}", e),
            SendError::Frame(e) => write!(f, "framing failed: {}", e),
            SendError::LinkDown => f.write_str("secondary link is down"),
            SendError::Primary(e) => write!(f, "primary link error: {:?}", e),
            SendError::Secondary(e) => write!(f, "secondary link error: {:?}", e),
        }
    }
}

impl<P, S> From<EncodeError> for SendError<P, S> {
    fn from(e: EncodeError) -> Self {
        SendError::Encode(e)
    }
}

impl<P, S> From<PrimaryError<P>> for SendError<P, S> {
    fn from(e: PrimaryError<P>) -> Self {
        match e {
            PrimaryError::Frame(e) => SendError::Frame(e),
            PrimaryError::Uart(e) => SendError::Primary(e),
        }
    }
}

impl<P, S> From<SecondaryError<S>> for SendError<P, S> {
    fn from(e: SecondaryError<S>) -> Self {
        match e {
            SecondaryError::LinkDown => SendError::LinkDown,
            SecondaryError::Link(e) => SendError::Secondary(e),
        }
    }
}

/// Send error for a transport over `U` and `L`
pub type TransportError<U, L> = SendError<<U as UartTx>::Error, <L as MessageLink>::Error>;

/// Both frame layers plus the routing policy
pub struct Transport<U, L> {
    primary: PrimaryLink<U>,
    secondary: SecondaryLink<L>,
}

impl<U: Uart, L: MessageLink> Transport<U, L> {
    pub fn new(primary: PrimaryLink<U>, secondary: SecondaryLink<L>) -> Self {
        Self { primary, secondary }
    }

    /// Link the next outbound message would use
    pub fn route(&self) -> Route {
        if self.secondary.is_up() {
            Route::Secondary
        } else {
            Route::Primary
        }
    }

    /// Encode and send an envelope
    pub fn send(&mut self, envelope: &Envelope) -> Result<Route, TransportError<U, L>> {
        let mut buffer = [0u8; MAX_MESSAGE_SIZE];
        let len = envelope.encode(&mut buffer)?;
        self.send_encoded(&buffer[..len])
    }

    /// Send an already encoded envelope
    pub fn send_encoded(&mut self, payload: &[u8]) -> Result<Route, TransportError<U, L>> {
        let route = self.route();
        match route {
            Route::Secondary => self.secondary.send(payload)?,
            Route::Primary => self.primary.send(payload)?,
        }
        Ok(route)
    }

    /// Acknowledge an image chunk; always on the primary link
    pub fn send_ack(&mut self, ack: Ack) -> Result<(), <U as UartTx>::Error> {
        self.primary.send_ack(ack)
    }

    pub fn primary(&self) -> &PrimaryLink<U> {
        &self.primary
    }

    pub fn primary_mut(&mut self) -> &mut PrimaryLink<U> {
        &mut self.primary
    }

    pub fn secondary(&self) -> &SecondaryLink<L> {
        &self.secondary
    }

    pub fn secondary_mut(&mut self) -> &mut SecondaryLink<L> {
        &mut self.secondary
    }
}
