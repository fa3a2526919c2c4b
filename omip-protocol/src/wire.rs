//! Protobuf-compatible wire primitives
//!
//! Only the subset the envelope needs: varints, length-delimited fields and
//! fixed32. Everything works on caller-provided slices so the codec never
//! allocates.

use crate::messages::{DecodeError, EncodeError};

/// Longest legal varint (10 bytes for a u64)
const MAX_VARINT_LEN: usize = 10;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            // Groups (3, 4) are deprecated and never produced by the host
            _ => None,
        }
    }

    fn bits(self) -> u8 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::Fixed32 => 5,
        }
    }
}

/// Number of bytes `value` occupies as a varint
pub fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Cursor writing protobuf fields into a fixed buffer
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn put_u8(&mut self, byte: u8) -> Result<(), EncodeError> {
        let slot = self.buf.get_mut(self.pos).ok_or(EncodeError::BufferTooSmall)?;
        *slot = byte;
        self.pos += 1;
        Ok(())
    }

    pub fn put_slice(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        let end = self.pos + data.len();
        if end > self.buf.len() {
            return Err(EncodeError::BufferTooSmall);
        }
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    pub fn put_varint(&mut self, mut value: u64) -> Result<(), EncodeError> {
        while value >= 0x80 {
            self.put_u8((value as u8 & 0x7F) | 0x80)?;
            value >>= 7;
        }
        self.put_u8(value as u8)
    }

    pub fn put_tag(&mut self, field: u32, wire_type: WireType) -> Result<(), EncodeError> {
        self.put_varint(((field as u64) << 3) | wire_type.bits() as u64)
    }

    /// Write a `uint32`/enum field, omitting the proto3 default
    pub fn uint32_field(&mut self, field: u32, value: u32) -> Result<(), EncodeError> {
        if value == 0 {
            return Ok(());
        }
        self.put_tag(field, WireType::Varint)?;
        self.put_varint(value as u64)
    }

    pub fn bool_field(&mut self, field: u32, value: bool) -> Result<(), EncodeError> {
        self.uint32_field(field, value as u32)
    }

    pub fn float_field(&mut self, field: u32, value: f32) -> Result<(), EncodeError> {
        let bits = value.to_bits();
        if bits == 0 {
            return Ok(());
        }
        self.put_tag(field, WireType::Fixed32)?;
        self.put_slice(&bits.to_le_bytes())
    }

    pub fn bytes_field(&mut self, field: u32, data: &[u8]) -> Result<(), EncodeError> {
        if data.is_empty() {
            return Ok(());
        }
        self.put_tag(field, WireType::LengthDelimited)?;
        self.put_varint(data.len() as u64)?;
        self.put_slice(data)
    }

    /// Write a submessage field whose body is produced by `body`
    ///
    /// The body is written in place behind a one-byte length placeholder and
    /// shifted right afterwards if its length needs a longer varint, so no
    /// scratch buffer or sizing pass is required. Submessages are always
    /// emitted, even when empty, since oneof membership depends on presence.
    pub fn message_field<F>(&mut self, field: u32, body: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Writer<'_>) -> Result<(), EncodeError>,
    {
        self.put_tag(field, WireType::LengthDelimited)?;
        let len_at = self.pos;
        self.put_u8(0)?;

        let mut inner = Writer {
            buf: &mut *self.buf,
            pos: self.pos,
        };
        body(&mut inner)?;
        let body_end = inner.pos;

        let body_len = body_end - (len_at + 1);
        let prefix_len = varint_len(body_len as u64);
        if prefix_len > 1 {
            let shift = prefix_len - 1;
            if body_end + shift > self.buf.len() {
                return Err(EncodeError::BufferTooSmall);
            }
            self.buf.copy_within(len_at + 1..body_end, len_at + prefix_len);
        }

        self.pos = len_at;
        self.put_varint(body_len as u64)?;
        self.pos = len_at + prefix_len + body_len;
        Ok(())
    }
}

/// A decoded field value, borrowing length-delimited payloads from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

impl<'a> FieldValue<'a> {
    pub fn as_u32(&self) -> Result<u32, DecodeError> {
        match *self {
            // proto3 uint32 keeps the low 32 bits of the varint
            FieldValue::Varint(v) => Ok(v as u32),
            _ => Err(DecodeError::Malformed),
        }
    }

    pub fn as_bool(&self) -> Result<bool, DecodeError> {
        match *self {
            FieldValue::Varint(v) => Ok(v != 0),
            _ => Err(DecodeError::Malformed),
        }
    }

    pub fn as_f32(&self) -> Result<f32, DecodeError> {
        match *self {
            FieldValue::Fixed32(bits) => Ok(f32::from_bits(bits)),
            _ => Err(DecodeError::Malformed),
        }
    }

    pub fn as_bytes(&self) -> Result<&'a [u8], DecodeError> {
        match *self {
            FieldValue::Bytes(b) => Ok(b),
            _ => Err(DecodeError::Malformed),
        }
    }
}

/// Cursor reading protobuf fields from a byte slice
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::Malformed)?;
        let bytes = self.buf.get(self.pos..end).ok_or(DecodeError::Malformed)?;
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = *self.buf.get(self.pos).ok_or(DecodeError::Malformed)?;
            self.pos += 1;
            value |= ((byte & 0x7F) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::Malformed)
    }

    /// Read the next `(field number, value)` pair
    ///
    /// Returns `Ok(None)` at the end of input.
    pub fn next_field(&mut self) -> Result<Option<(u32, FieldValue<'a>)>, DecodeError> {
        if self.is_empty() {
            return Ok(None);
        }

        let key = self.read_varint()?;
        let field = u32::try_from(key >> 3).map_err(|_| DecodeError::Malformed)?;
        if field == 0 {
            return Err(DecodeError::Malformed);
        }
        let wire_type = WireType::from_bits((key & 0x07) as u8).ok_or(DecodeError::Malformed)?;

        let value = match wire_type {
            WireType::Varint => FieldValue::Varint(self.read_varint()?),
            WireType::Fixed64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(self.take(8)?);
                FieldValue::Fixed64(u64::from_le_bytes(raw))
            }
            WireType::LengthDelimited => {
                let len = usize::try_from(self.read_varint()?).map_err(|_| DecodeError::Malformed)?;
                FieldValue::Bytes(self.take(len)?)
            }
            WireType::Fixed32 => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(self.take(4)?);
                FieldValue::Fixed32(u32::from_le_bytes(raw))
            }
        };

        Ok(Some((field, value)))
    }
}
