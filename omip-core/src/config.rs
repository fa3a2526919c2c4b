//! Device configuration
//!
//! Board-agnostic settings for the protocol core. Provisioning tools can
//! ship them as a postcard-serialized blob; anything not provisioned falls
//! back to the defaults below.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use omip_protocol::frame::{DEFAULT_LENGTH_TIMEOUT_MS, DEFAULT_PAYLOAD_TIMEOUT_MS};
use omip_protocol::{FrameTimeouts, ACK_ERROR, ACK_READY, FRAME_MARKER};

/// Device id reported in capability responses and input reports
pub const DEFAULT_DEVICE_ID: u32 = 1;

/// Largest image accepted by default (512 KiB, fits a full-screen JPEG)
pub const DEFAULT_MAX_IMAGE_SIZE: u32 = 512 * 1024;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Frame marker collides with an acknowledgement byte
    MarkerCollidesWithAck,
    /// A frame timeout is zero
    ZeroTimeout,
    /// Image size limit is zero
    ZeroImageLimit,
    /// Deserialization failed
    Deserialize,
    /// Serialization failed (buffer too small)
    Serialize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MarkerCollidesWithAck => {
                f.write_str("frame marker must differ from the ACK/NAK bytes")
            }
            ConfigError::ZeroTimeout => f.write_str("frame timeouts must be non-zero"),
            ConfigError::ZeroImageLimit => f.write_str("image size limit must be non-zero"),
            ConfigError::Deserialize => f.write_str("config blob could not be decoded"),
            ConfigError::Serialize => f.write_str("config blob could not be encoded"),
        }
    }
}

/// Protocol core configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    /// Device id announced to the host
    pub device_id: u32,
    /// Serial frame synchronization byte
    pub frame_marker: u8,
    /// Wait for the length byte after a marker (ms)
    pub length_timeout_ms: u32,
    /// Wait for the full payload after the length byte (ms)
    pub payload_timeout_ms: u32,
    /// Largest pushed image accepted (bytes)
    pub max_image_size: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID,
            frame_marker: FRAME_MARKER,
            length_timeout_ms: DEFAULT_LENGTH_TIMEOUT_MS,
            payload_timeout_ms: DEFAULT_PAYLOAD_TIMEOUT_MS,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }
}

impl DeviceConfig {
    /// Check the configuration for values the protocol cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The host reads ACK/NAK bytes and frame markers from the same stream
        if self.frame_marker == ACK_READY || self.frame_marker == ACK_ERROR {
            return Err(ConfigError::MarkerCollidesWithAck);
        }
        if self.length_timeout_ms == 0 || self.payload_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_image_size == 0 {
            return Err(ConfigError::ZeroImageLimit);
        }
        Ok(())
    }

    /// Timeouts for the serial frame parser
    pub fn frame_timeouts(&self) -> FrameTimeouts {
        FrameTimeouts {
            length_ms: self.length_timeout_ms,
            payload_ms: self.payload_timeout_ms,
        }
    }

    /// Decode and validate a postcard provisioning blob
    #[cfg(feature = "serde")]
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: DeviceConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        config.validate()?;
        Ok(config)
    }

    /// Encode as a postcard blob into `buffer`
    #[cfg(feature = "serde")]
    pub fn to_postcard<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialize)
    }
}
