//! Message envelope for the OMIP protocol
//!
//! Every message travels inside a [`Envelope`], a oneof wrapper with exactly
//! one populated variant:
//! - Host → Device: capability requests, pushed image chunks
//! - Device → Host: capability responses, digital and analog input reports
//!
//! The encoding is protobuf-compatible so host tooling generated from the
//! schema can talk to the device directly.

use core::fmt;

use heapless::Vec;

use crate::wire::{Reader, Writer};

/// Largest encoded envelope accepted or produced
pub const MAX_MESSAGE_SIZE: usize = 256;

/// Largest `chunk_data` payload carried by one image chunk
pub const MAX_CHUNK_SIZE: usize = 240;

/// Most port descriptors kept when decoding a capability response
pub const MAX_PORTS: usize = 32;

// Envelope oneof field numbers
pub const FIELD_CAPABILITY_REQUEST: u32 = 1;
pub const FIELD_CAPABILITY_RESPONSE: u32 = 2;
pub const FIELD_INPUT_DIGITAL: u32 = 3;
pub const FIELD_INPUT_ANALOG: u32 = 4;
pub const FIELD_FEEDBACK_IMAGE: u32 = 5;

/// Errors that can occur while encoding an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Serialized form does not fit the destination buffer
    BufferTooSmall,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::BufferTooSmall => f.write_str("encoded message exceeds buffer"),
        }
    }
}

/// Errors that can occur while decoding an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Truncated input, bad varint, bad tag or wrong wire type
    Malformed,
    /// No oneof member present
    NoVariant,
    /// More than one known oneof member present
    ConflictingVariants,
    /// A repeated or bytes field exceeds the fixed decode capacity
    CapacityExceeded,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed => f.write_str("malformed message"),
            DecodeError::NoVariant => f.write_str("envelope carries no message"),
            DecodeError::ConflictingVariants => f.write_str("envelope carries several messages"),
            DecodeError::CapacityExceeded => f.write_str("field exceeds decode capacity"),
        }
    }
}

/// Port types advertised in a capability response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortType {
    DigitalInput,
    AnalogInput,
    EncoderInput,
    ImageOutput,
    LedOutput,
    /// Value defined by a newer schema
    Unknown(u32),
}

const PORT_TYPE_DIGITAL_INPUT: u32 = 0;
const PORT_TYPE_ANALOG_INPUT: u32 = 1;
const PORT_TYPE_ENCODER_INPUT: u32 = 2;
const PORT_TYPE_IMAGE_OUTPUT: u32 = 3;
const PORT_TYPE_LED_OUTPUT: u32 = 4;

impl PortType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            PORT_TYPE_DIGITAL_INPUT => PortType::DigitalInput,
            PORT_TYPE_ANALOG_INPUT => PortType::AnalogInput,
            PORT_TYPE_ENCODER_INPUT => PortType::EncoderInput,
            PORT_TYPE_IMAGE_OUTPUT => PortType::ImageOutput,
            PORT_TYPE_LED_OUTPUT => PortType::LedOutput,
            other => PortType::Unknown(other),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            PortType::DigitalInput => PORT_TYPE_DIGITAL_INPUT,
            PortType::AnalogInput => PORT_TYPE_ANALOG_INPUT,
            PortType::EncoderInput => PORT_TYPE_ENCODER_INPUT,
            PortType::ImageOutput => PORT_TYPE_IMAGE_OUTPUT,
            PortType::LedOutput => PORT_TYPE_LED_OUTPUT,
            PortType::Unknown(other) => other,
        }
    }
}

/// Pixel encodings accepted for pushed images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageFormat {
    Jpeg,
    /// Value defined by a newer schema; never rendered
    Unknown(u32),
}

const IMAGE_FORMAT_JPEG: u32 = 0;

impl ImageFormat {
    pub fn from_u32(value: u32) -> Self {
        match value {
            IMAGE_FORMAT_JPEG => ImageFormat::Jpeg,
            other => ImageFormat::Unknown(other),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            ImageFormat::Jpeg => IMAGE_FORMAT_JPEG,
            ImageFormat::Unknown(other) => other,
        }
    }
}

/// One entry of the capability catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortDescriptor {
    pub port_id: u32,
    pub port_type: PortType,
}

impl PortDescriptor {
    pub const fn new(port_id: u32, port_type: PortType) -> Self {
        Self { port_id, port_type }
    }

    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.uint32_field(1, self.port_type.to_u32())?;
        w.uint32_field(2, self.port_id)
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut port = PortDescriptor::new(0, PortType::DigitalInput);
        let mut r = Reader::new(bytes);
        while let Some((field, value)) = r.next_field()? {
            match field {
                1 => port.port_type = PortType::from_u32(value.as_u32()?),
                2 => port.port_id = value.as_u32()?,
                _ => {}
            }
        }
        Ok(port)
    }
}

/// Device description sent in reply to a capability request
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapabilityResponse {
    pub device_id: u32,
    pub ports: Vec<PortDescriptor, MAX_PORTS>,
}

impl CapabilityResponse {
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut response = CapabilityResponse {
            device_id: 0,
            ports: Vec::new(),
        };
        let mut r = Reader::new(bytes);
        while let Some((field, value)) = r.next_field()? {
            match field {
                1 => response.device_id = value.as_u32()?,
                2 => {
                    let port = PortDescriptor::decode(value.as_bytes()?)?;
                    response
                        .ports
                        .push(port)
                        .map_err(|_| DecodeError::CapacityExceeded)?;
                }
                _ => {}
            }
        }
        Ok(response)
    }
}

/// Binary input report (grid cell, gesture pulse)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DigitalInput {
    pub device_id: u32,
    pub port_id: u32,
    pub state: bool,
}

impl DigitalInput {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.uint32_field(1, self.device_id)?;
        w.uint32_field(2, self.port_id)?;
        w.bool_field(3, self.state)
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut input = DigitalInput {
            device_id: 0,
            port_id: 0,
            state: false,
        };
        let mut r = Reader::new(bytes);
        while let Some((field, value)) = r.next_field()? {
            match field {
                1 => input.device_id = value.as_u32()?,
                2 => input.port_id = value.as_u32()?,
                3 => input.state = value.as_bool()?,
                _ => {}
            }
        }
        Ok(input)
    }
}

/// Continuous input report (slider)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogInput {
    pub device_id: u32,
    pub port_id: u32,
    pub value: f32,
}

impl AnalogInput {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.uint32_field(1, self.device_id)?;
        w.uint32_field(2, self.port_id)?;
        w.float_field(3, self.value)
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut input = AnalogInput {
            device_id: 0,
            port_id: 0,
            value: 0.0,
        };
        let mut r = Reader::new(bytes);
        while let Some((field, value)) = r.next_field()? {
            match field {
                1 => input.device_id = value.as_u32()?,
                2 => input.port_id = value.as_u32()?,
                3 => input.value = value.as_f32()?,
                _ => {}
            }
        }
        Ok(input)
    }
}

/// One chunk of a pushed image
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackImage {
    /// Target device; hosts usually send 0 (broadcast)
    pub device_id: u32,
    pub screen_id: u32,
    pub format: ImageFormat,
    /// Size of the complete image; 0 means "clear this screen"
    pub total_size: u32,
    pub chunk_offset: u32,
    pub chunk_data: Vec<u8, MAX_CHUNK_SIZE>,
    pub is_last_chunk: bool,
}

impl FeedbackImage {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.uint32_field(1, self.device_id)?;
        w.uint32_field(2, self.screen_id)?;
        w.uint32_field(3, self.format.to_u32())?;
        w.uint32_field(4, self.total_size)?;
        w.uint32_field(5, self.chunk_offset)?;
        w.bytes_field(6, &self.chunk_data)?;
        w.bool_field(7, self.is_last_chunk)
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut chunk = FeedbackImage {
            device_id: 0,
            screen_id: 0,
            format: ImageFormat::Jpeg,
            total_size: 0,
            chunk_offset: 0,
            chunk_data: Vec::new(),
            is_last_chunk: false,
        };
        let mut r = Reader::new(bytes);
        while let Some((field, value)) = r.next_field()? {
            match field {
                1 => chunk.device_id = value.as_u32()?,
                2 => chunk.screen_id = value.as_u32()?,
                3 => chunk.format = ImageFormat::from_u32(value.as_u32()?),
                4 => chunk.total_size = value.as_u32()?,
                5 => chunk.chunk_offset = value.as_u32()?,
                6 => {
                    chunk.chunk_data.clear();
                    chunk
                        .chunk_data
                        .extend_from_slice(value.as_bytes()?)
                        .map_err(|_| DecodeError::CapacityExceeded)?;
                }
                7 => chunk.is_last_chunk = value.as_bool()?,
                _ => {}
            }
        }
        Ok(chunk)
    }

    /// Byte offset just past this chunk, saturating on overflow
    pub fn chunk_end(&self) -> u32 {
        self.chunk_offset
            .saturating_add(self.chunk_data.len() as u32)
    }
}

/// Top-level wire message
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Envelope {
    CapabilityRequest,
    CapabilityResponse(CapabilityResponse),
    DigitalInput(DigitalInput),
    AnalogInput(AnalogInput),
    FeedbackImage(FeedbackImage),
    /// A oneof member this build does not know; dispatchers ignore it
    Unsupported { field: u32 },
}

impl Envelope {
    /// Encode into `buffer`, returning the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, EncodeError> {
        let mut w = Writer::new(buffer);
        match self {
            Envelope::CapabilityRequest => {
                w.message_field(FIELD_CAPABILITY_REQUEST, |_| Ok(()))?;
            }
            Envelope::CapabilityResponse(response) => {
                let ports = response.ports.iter().copied();
                write_capability_response(&mut w, response.device_id, ports)?;
            }
            Envelope::DigitalInput(input) => {
                w.message_field(FIELD_INPUT_DIGITAL, |inner| input.encode(inner))?;
            }
            Envelope::AnalogInput(input) => {
                w.message_field(FIELD_INPUT_ANALOG, |inner| input.encode(inner))?;
            }
            Envelope::FeedbackImage(chunk) => {
                w.message_field(FIELD_FEEDBACK_IMAGE, |inner| chunk.encode(inner))?;
            }
            Envelope::Unsupported { field } => {
                w.message_field(*field, |_| Ok(()))?;
            }
        }
        Ok(w.position())
    }

    /// Encode into a heapless Vec sized for the largest message
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_MESSAGE_SIZE>, EncodeError> {
        let mut buffer = [0u8; MAX_MESSAGE_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| EncodeError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Decode an envelope
    ///
    /// Unknown length-delimited top-level fields decode to
    /// [`Envelope::Unsupported`] unless a known variant is also present.
    /// Unknown fields of any other wire type are malformed. Bytes that fail to parse after a
    /// variant has been read are treated as trailing garbage.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        let mut known: Option<Envelope> = None;
        let mut unknown: Option<u32> = None;

        loop {
            let next = match r.next_field() {
                Ok(next) => next,
                Err(_) if known.is_some() || unknown.is_some() => break,
                Err(e) => return Err(e),
            };
            let Some((field, value)) = next else {
                break;
            };

            let decoded = match field {
                FIELD_CAPABILITY_REQUEST => {
                    value.as_bytes()?;
                    Envelope::CapabilityRequest
                }
                FIELD_CAPABILITY_RESPONSE => {
                    Envelope::CapabilityResponse(CapabilityResponse::decode(value.as_bytes()?)?)
                }
                FIELD_INPUT_DIGITAL => {
                    Envelope::DigitalInput(DigitalInput::decode(value.as_bytes()?)?)
                }
                FIELD_INPUT_ANALOG => Envelope::AnalogInput(AnalogInput::decode(value.as_bytes()?)?),
                FIELD_FEEDBACK_IMAGE => {
                    Envelope::FeedbackImage(FeedbackImage::decode(value.as_bytes()?)?)
                }
                other => {
                    // Variants are submessages; a scalar here is not one
                    value.as_bytes()?;
                    unknown.get_or_insert(other);
                    continue;
                }
            };

            if known.is_some() {
                return Err(DecodeError::ConflictingVariants);
            }
            known = Some(decoded);
        }

        match (known, unknown) {
            (Some(envelope), _) => Ok(envelope),
            (None, Some(field)) => Ok(Envelope::Unsupported { field }),
            (None, None) => Err(DecodeError::NoVariant),
        }
    }
}

/// Encode a capability response, pulling ports from `ports` one at a time
///
/// The port list is never materialized; each descriptor is written as soon
/// as it is produced. If the buffer fills up the whole encode fails and the
/// partially written bytes must be discarded by the caller.
pub fn encode_capability_response<I>(
    device_id: u32,
    ports: I,
    buffer: &mut [u8],
) -> Result<usize, EncodeError>
where
    I: IntoIterator<Item = PortDescriptor>,
{
    let mut w = Writer::new(buffer);
    write_capability_response(&mut w, device_id, ports)?;
    Ok(w.position())
}

fn write_capability_response<I>(
    w: &mut Writer<'_>,
    device_id: u32,
    ports: I,
) -> Result<(), EncodeError>
where
    I: IntoIterator<Item = PortDescriptor>,
{
    w.message_field(FIELD_CAPABILITY_RESPONSE, |inner| {
        inner.uint32_field(1, device_id)?;
        for port in ports {
            inner.message_field(2, |p| port.encode(p))?;
        }
        Ok(())
    })
}
