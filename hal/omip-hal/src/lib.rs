//! OMIP Hardware Abstraction Layer
//!
//! This crate defines the link and clock traits the protocol core is written
//! against. Board support code (ESP32 UART driver, BLE stack glue, test
//! doubles) implements them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  omip-core (Device control loop)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  omip-hal (this crate - traits)         │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  UART driver  │       │   BLE stack   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Primary link byte stream
//! - [`link::MessageLink`] - Secondary link message channel
//! - [`clock::Clock`] - Monotonic milliseconds for frame timeouts

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod link;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
pub use link::MessageLink;
pub use uart::{Uart, UartRx, UartTx};
