//! Board-agnostic protocol core for the OMIP input panel
//!
//! This crate contains everything between the links and the screen that
//! does not depend on a specific board:
//!
//! - Primary (UART) and secondary (wireless) frame layers
//! - Outbound route selection
//! - Capability catalog
//! - Chunked image reassembly and the per-cell image cache
//! - Input event reporting
//! - Device configuration
//!
//! [`Device`] ties them together behind `initialize` / `poll`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

// Must come first so the logging macros are visible to later modules
#[macro_use]
mod fmt;

pub mod capability;
pub mod config;
pub mod device;
pub mod image;
pub mod input;
pub mod layout;
pub mod traits;
pub mod transport;

#[cfg(test)]
mod testing;

pub use capability::CapabilityBuilder;
pub use config::{ConfigError, DeviceConfig};
pub use device::{Device, DeviceError, Source};
pub use image::{ChunkOutcome, ImageError, ImageReceiver};
pub use input::{InputEvent, ReportError};
pub use layout::{resolve_screen, ScreenTarget};
pub use traits::{ImageRenderer, Rect};
pub use transport::{Route, SendError, Transport};
