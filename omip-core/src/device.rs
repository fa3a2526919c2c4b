//! Device control loop
//!
//! [`Device`] owns every piece of protocol state: both frame layers, the
//! image receiver and the configuration. Board glue calls [`Device::poll`]
//! from its main loop and forwards secondary link callbacks and input
//! events. Nothing in here blocks or halts on bad input.

use core::fmt;

use omip_hal::{Clock, MessageLink, Uart, UartTx};
use omip_protocol::{Envelope, MAX_MESSAGE_SIZE};

use crate::capability::CapabilityBuilder;
use crate::config::{ConfigError, DeviceConfig};
use crate::image::{ChunkOutcome, ImageReceiver, ReassemblyState, SlotCache};
use crate::input::{InputEvent, ReportError};
use crate::traits::ImageRenderer;
use crate::transport::{PrimaryLink, SecondaryLink, SendError, Transport, TransportError};

/// Frames taken from the primary link per poll
pub const MAX_FRAMES_PER_POLL: usize = 4;

/// Errors reporting an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError<P, S> {
    Report(ReportError),
    Send(SendError<P, S>),
}

impl<P: fmt::Debug, S: fmt::Debug> fmt::Display for DeviceError<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Report(e) => write!(f, "{}", e),
            DeviceError::Send(e) => write!(f, "{}", e),
        }
    }
}

impl<P, S> From<ReportError> for DeviceError<P, S> {
    fn from(e: ReportError) -> Self {
        DeviceError::Report(e)
    }
}

impl<P, S> From<SendError<P, S>> for DeviceError<P, S> {
    fn from(e: SendError<P, S>) -> Self {
        DeviceError::Send(e)
    }
}

/// Where an inbound message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    Primary,
    Secondary,
}

/// Protocol state for one panel
pub struct Device<U, L, C, R> {
    config: DeviceConfig,
    transport: Transport<U, L>,
    clock: C,
    renderer: R,
    images: ImageReceiver,
    capabilities: CapabilityBuilder,
}

impl<U, L, C, R> Device<U, L, C, R>
where
    U: Uart,
    L: MessageLink,
    C: Clock,
    R: ImageRenderer,
{
    /// Build a device from its collaborators
    pub fn new(
        config: DeviceConfig,
        uart: U,
        link: L,
        clock: C,
        renderer: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let primary = PrimaryLink::new(uart, config.frame_marker, config.frame_timeouts());
        let secondary = SecondaryLink::new(link);

        Ok(Self {
            transport: Transport::new(primary, secondary),
            clock,
            renderer,
            images: ImageReceiver::new(config.max_image_size),
            capabilities: CapabilityBuilder::new(config.device_id),
            config,
        })
    }

    /// Reset protocol state and start advertising on the secondary link
    pub fn initialize(&mut self) -> Result<(), L::Error> {
        self.transport.primary_mut().reset();
        self.images.reset();
        info!(
            "omip device {} ready, {} byte image limit",
            self.config.device_id,
            self.config.max_image_size
        );
        self.transport.secondary_mut().start()
    }

    /// Run the control loop once
    ///
    /// Handles up to [`MAX_FRAMES_PER_POLL`] primary frames, then everything
    /// queued by the secondary link. Returns the number of messages handled.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut handled = 0;

        for _ in 0..MAX_FRAMES_PER_POLL {
            match self.transport.primary_mut().poll(now) {
                Ok(Some(frame)) => {
                    self.dispatch(&frame, Source::Primary);
                    handled += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("primary link read failed");
                    break;
                }
            }
        }

        while let Some(message) = self.transport.secondary_mut().take_message() {
            self.dispatch(&message, Source::Secondary);
            handled += 1;
        }

        handled
    }

    /// Decode and act on one inbound message
    pub fn dispatch(&mut self, bytes: &[u8], source: Source) {
        let envelope = match Envelope::decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("dropping {} byte message from {:?}: {}", bytes.len(), source, e);
                return;
            }
        };

        match envelope {
            Envelope::CapabilityRequest => self.answer_capabilities(),
            Envelope::FeedbackImage(chunk) => {
                let outcome = self.images.handle_chunk(&chunk, &mut self.renderer);
                if let ChunkOutcome::Completed(target) = outcome {
                    debug!("image for {:?} complete", target);
                }
                if self.transport.send_ack(outcome.ack()).is_err() {
                    error!("failed to write image ack");
                }
            }
            Envelope::Unsupported { field } => {
                debug!("ignoring unsupported message field {}", field);
            }
            Envelope::CapabilityResponse(_)
            | Envelope::DigitalInput(_)
            | Envelope::AnalogInput(_) => {
                debug!("ignoring device-to-host message from {:?}", source);
            }
        }
    }

    fn answer_capabilities(&mut self) {
        let mut buffer = [0u8; MAX_MESSAGE_SIZE];
        let result = match self.capabilities.encode(&mut buffer) {
            Ok(len) => self.transport.send_encoded(&buffer[..len]),
            Err(e) => Err(SendError::Encode(e)),
        };
        match result {
            Ok(route) => debug!("capabilities sent over {:?}", route),
            Err(SendError::Encode(e)) => warn!("failed to encode capabilities: {}", e),
            Err(_) => warn!("failed to send capabilities"),
        }
    }

    /// Report an input event to the host
    pub fn report(
        &mut self,
        event: InputEvent,
    ) -> Result<(), DeviceError<<U as UartTx>::Error, L::Error>> {
        for envelope in event.to_envelopes(self.config.device_id)? {
            self.send(&envelope)?;
        }
        Ok(())
    }

    /// Send an envelope over the selected link
    pub fn send(&mut self, envelope: &Envelope) -> Result<(), TransportError<U, L>> {
        self.transport.send(envelope).map(|_| ())
    }

    pub fn is_secondary_link_up(&self) -> bool {
        self.transport.secondary().is_up()
    }

    /// Secondary link callback: host connected
    pub fn on_secondary_connect(&mut self) {
        self.transport.secondary_mut().on_connect();
    }

    /// Secondary link callback: host disconnected
    pub fn on_secondary_disconnect(&mut self) -> Result<(), L::Error> {
        self.transport.secondary_mut().on_disconnect()
    }

    /// Secondary link callback: host wrote a message
    pub fn on_secondary_write(&mut self, bytes: &[u8]) -> bool {
        self.transport.secondary_mut().on_write(bytes)
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn slots(&self) -> &SlotCache {
        self.images.cache()
    }

    pub fn reassembly_state(&self) -> ReassemblyState {
        self.images.state()
    }

    pub fn transport(&self) -> &Transport<U, L> {
        &self.transport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}
