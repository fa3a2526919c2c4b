//! Primary and secondary frame layers and the route between them

pub mod primary;
pub mod secondary;
pub mod selector;

pub use primary::{PrimaryError, PrimaryLink};
pub use secondary::{InboundMessage, SecondaryError, SecondaryLink, INBOX_DEPTH};
pub use selector::{Route, SendError, Transport, TransportError};
