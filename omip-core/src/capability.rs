//! Capability catalog
//!
//! The panel's ports are fixed at compile time. A capability request is
//! answered by streaming [`CATALOG`] straight into the output buffer.

use heapless::Vec;
use omip_protocol::{
    encode_capability_response, CapabilityResponse, EncodeError, Envelope, PortDescriptor,
    PortType, MAX_PORTS,
};

use crate::layout::SLOT_COUNT;

/// Sidebar slider (value 0.0 - 1.0)
pub const PORT_SLIDER: u32 = 18;
/// Swipe left pulse
pub const PORT_SWIPE_LEFT: u32 = 19;
/// Swipe right pulse
pub const PORT_SWIPE_RIGHT: u32 = 20;
/// Whole display surface
pub const PORT_DISPLAY: u32 = 100;

/// Total number of declared ports
pub const PORT_COUNT: usize = SLOT_COUNT + 4;

const _: () = assert!(PORT_COUNT <= MAX_PORTS);

const fn build_catalog() -> [PortDescriptor; PORT_COUNT] {
    let mut ports = [PortDescriptor::new(0, PortType::DigitalInput); PORT_COUNT];
    let mut i = 0;
    while i < SLOT_COUNT {
        ports[i] = PortDescriptor::new(i as u32, PortType::DigitalInput);
        i += 1;
    }
    ports[SLOT_COUNT] = PortDescriptor::new(PORT_SLIDER, PortType::AnalogInput);
    ports[SLOT_COUNT + 1] = PortDescriptor::new(PORT_SWIPE_LEFT, PortType::DigitalInput);
    ports[SLOT_COUNT + 2] = PortDescriptor::new(PORT_SWIPE_RIGHT, PortType::DigitalInput);
    ports[SLOT_COUNT + 3] = PortDescriptor::new(PORT_DISPLAY, PortType::ImageOutput);
    ports
}

/// Declared ports, in announcement order
pub static CATALOG: [PortDescriptor; PORT_COUNT] = build_catalog();

/// Builds capability responses for one device id
#[derive(Debug, Clone, Copy)]
pub struct CapabilityBuilder {
    device_id: u32,
}

impl CapabilityBuilder {
    pub const fn new(device_id: u32) -> Self {
        Self { device_id }
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Iterate over the catalog in announcement order
    pub fn ports(&self) -> impl Iterator<Item = PortDescriptor> {
        CATALOG.iter().copied()
    }

    /// Build the response as an envelope
    pub fn build(&self) -> Envelope {
        let mut ports: Vec<PortDescriptor, MAX_PORTS> = Vec::new();
        for port in self.ports() {
            // Capacity checked at compile time
            let _ = ports.push(port);
        }
        Envelope::CapabilityResponse(CapabilityResponse {
            device_id: self.device_id,
            ports,
        })
    }

    /// Stream the response into `buffer` without materializing the port list
    ///
    /// On `BufferTooSmall` the buffer contents are undefined and must not be
    /// sent.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, EncodeError> {
        encode_capability_response(self.device_id, self.ports(), buffer)
    }
}
