//! Primary link: framed envelopes over the UART
//!
//! Outbound messages are framed as `MARKER | LENGTH | PAYLOAD`. Inbound bytes
//! are read without blocking and fed to a timed [`FrameParser`], so a stalled
//! sender holds up frame assembly for at most the two parser timeouts.

use core::fmt;

use omip_hal::{Uart, UartRx, UartTx};
use omip_protocol::{
    encode_frame, Ack, FrameError, FrameParser, FramePayload, FrameTimeouts, MAX_FRAME_SIZE,
};

/// Most bytes consumed by one call to [`PrimaryLink::poll`]
pub const MAX_BYTES_PER_POLL: usize = MAX_FRAME_SIZE;

/// Errors sending on the primary link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrimaryError<E> {
    Frame(FrameError),
    Uart(E),
}

impl<E: fmt::Debug> fmt::Display for PrimaryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryError::Frame(e) => write!(f, "framing failed: {}", e),
            PrimaryError::Uart(e) => write!(f, "uart write failed: {:?}", e),
        }
    }
}

/// Frame layer over a UART
pub struct PrimaryLink<U> {
    uart: U,
    marker: u8,
    parser: FrameParser,
}

impl<U: Uart> PrimaryLink<U> {
    pub fn new(uart: U, marker: u8, timeouts: FrameTimeouts) -> Self {
        Self {
            uart,
            marker,
            parser: FrameParser::new(marker, timeouts),
        }
    }

    /// Drop any partial inbound frame
    pub fn reset(&mut self) {
        self.parser.reset();
    }

    /// Read pending bytes until a frame completes or the UART runs dry
    ///
    /// A read error drops the partial frame.
    pub fn poll(&mut self, now_ms: u32) -> Result<Option<FramePayload>, <U as UartRx>::Error> {
        if self.parser.expire(now_ms) {
            debug!("primary link: partial frame timed out");
        }

        for _ in 0..MAX_BYTES_PER_POLL {
            let byte = match self.uart.try_read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => return Ok(None),
                Err(e) => {
                    self.parser.reset();
                    return Err(e);
                }
            };
            if let Some(payload) = self.parser.feed(byte, now_ms) {
                trace!("primary link: frame of {} bytes", payload.len());
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    /// Frame and write one payload
    pub fn send(&mut self, payload: &[u8]) -> Result<(), PrimaryError<<U as UartTx>::Error>> {
        let mut frame = [0u8; MAX_FRAME_SIZE];
        let len = encode_frame(self.marker, payload, &mut frame).map_err(PrimaryError::Frame)?;
        self.uart
            .write_blocking(&frame[..len])
            .map_err(PrimaryError::Uart)?;
        self.uart.flush().map_err(PrimaryError::Uart)
    }

    /// Write an unframed acknowledgement byte
    pub fn send_ack(&mut self, ack: Ack) -> Result<(), <U as UartTx>::Error> {
        self.uart.write_byte(ack.to_byte())?;
        self.uart.flush()
    }
}
