//! OMIP wire protocol
//!
//! This crate defines the messages exchanged between the OMIP panel and its
//! host, and the framing used on the serial link. It is pure: no I/O, no
//! allocation, no clocks of its own.
//!
//! # Protocol Overview
//!
//! Messages are protobuf-compatible envelopes (see [`messages`]). On the
//! serial link each envelope is wrapped in a simple frame:
//! ```text
//! ┌────────┬────────┬─────────────┐
//! │ MARKER │ LENGTH │ PAYLOAD     │
//! │ 1B '~' │ 1B     │ 0–255B      │
//! └────────┴────────┴─────────────┘
//! ```
//!
//! On the wireless link the link itself keeps message boundaries, so the
//! envelope bytes are sent as-is. Image chunks are acknowledged with a single
//! unframed [`Ack`] byte on the serial link.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod ack;
pub mod frame;
pub mod messages;
pub mod wire;

pub use ack::{Ack, ACK_ERROR, ACK_READY};
pub use frame::{
    encode_frame, FrameError, FrameParser, FramePayload, FrameTimeouts, ParseState, FRAME_MARKER,
    MAX_FRAME_PAYLOAD, MAX_FRAME_SIZE,
};
pub use messages::{
    encode_capability_response, AnalogInput, CapabilityResponse, DecodeError, DigitalInput,
    EncodeError, Envelope, FeedbackImage, ImageFormat, PortDescriptor, PortType, MAX_CHUNK_SIZE,
    MAX_MESSAGE_SIZE, MAX_PORTS,
};
