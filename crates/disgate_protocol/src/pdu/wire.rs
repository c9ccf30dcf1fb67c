//! Byte-order aware primitive readers and writers.

use super::CodecError;
use serde::{Deserialize, Serialize};

/// Byte order used for every multi-byte field of a PDU.
///
/// DIS mandates network (big-endian) order; little-endian is kept for
/// simulators that were built against a broken peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// Append-only PDU writer.
#[derive(Debug)]
pub struct WireWriter {
    buf: Vec<u8>,
    order: ByteOrder,
}

impl WireWriter {
    pub fn new(order: ByteOrder) -> Self {
        Self { buf: Vec::new(), order }
    }

    pub fn with_capacity(order: ByteOrder, capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity), order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        match self.order {
            ByteOrder::Big => self.buf.extend_from_slice(&value.to_be_bytes()),
            ByteOrder::Little => self.buf.extend_from_slice(&value.to_le_bytes()),
        }
    }

    pub fn put_u32(&mut self, value: u32) {
        match self.order {
            ByteOrder::Big => self.buf.extend_from_slice(&value.to_be_bytes()),
            ByteOrder::Little => self.buf.extend_from_slice(&value.to_le_bytes()),
        }
    }

    pub fn put_u64(&mut self, value: u64) {
        match self.order {
            ByteOrder::Big => self.buf.extend_from_slice(&value.to_be_bytes()),
            ByteOrder::Little => self.buf.extend_from_slice(&value.to_le_bytes()),
        }
    }

    /// Floats are written through their bit pattern so NaN payloads survive.
    pub fn put_f32(&mut self, value: f32) {
        self.put_u32(value.to_bits());
    }

    pub fn put_f64(&mut self, value: f64) {
        self.put_u64(value.to_bits());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Overwrites a previously written u16, used to patch the length field.
    pub(crate) fn patch_u16(&mut self, offset: usize, value: u16) {
        let bytes = match self.order {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        };
        if let Some(slot) = self.buf.get_mut(offset..offset + 2) {
            slot.copy_from_slice(&bytes);
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self { data, pos: 0, order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.get_bytes(N)?);
        Ok(out)
    }

    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::Truncated { needed: len, remaining: self.remaining() });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, CodecError> {
        let raw = self.take::<2>()?;
        Ok(match self.order {
            ByteOrder::Big => u16::from_be_bytes(raw),
            ByteOrder::Little => u16::from_le_bytes(raw),
        })
    }

    pub fn get_u32(&mut self) -> Result<u32, CodecError> {
        let raw = self.take::<4>()?;
        Ok(match self.order {
            ByteOrder::Big => u32::from_be_bytes(raw),
            ByteOrder::Little => u32::from_le_bytes(raw),
        })
    }

    pub fn get_u64(&mut self) -> Result<u64, CodecError> {
        let raw = self.take::<8>()?;
        Ok(match self.order {
            ByteOrder::Big => u64::from_be_bytes(raw),
            ByteOrder::Little => u64::from_le_bytes(raw),
        })
    }

    pub fn get_f32(&mut self) -> Result<f32, CodecError> {
        self.get_u32().map(f32::from_bits)
    }

    pub fn get_f64(&mut self) -> Result<f64, CodecError> {
        self.get_u64().map(f64::from_bits)
    }

    pub fn get_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        self.take::<N>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order_is_honored() {
        let mut big = WireWriter::new(ByteOrder::Big);
        big.put_u16(0x0102);
        big.put_u32(0x0304_0506);
        assert_eq!(big.into_inner(), vec![1, 2, 3, 4, 5, 6]);

        let mut little = WireWriter::new(ByteOrder::Little);
        little.put_u16(0x0102);
        little.put_u32(0x0304_0506);
        assert_eq!(little.into_inner(), vec![2, 1, 6, 5, 4, 3]);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let data = [0u8; 3];
        let mut reader = WireReader::new(&data, ByteOrder::Big);
        assert_eq!(reader.get_u16().unwrap(), 0);
        assert_eq!(
            reader.get_u32(),
            Err(CodecError::Truncated { needed: 4, remaining: 1 })
        );
        // a failed read does not advance
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_float_bits_survive() {
        let mut writer = WireWriter::new(ByteOrder::Little);
        writer.put_f64(-1234.5);
        writer.put_f32(f32::from_bits(0x7fc0_0001));
        let bytes = writer.into_inner();

        let mut reader = WireReader::new(&bytes, ByteOrder::Little);
        assert_eq!(reader.get_f64().unwrap(), -1234.5);
        assert_eq!(reader.get_f32().unwrap().to_bits(), 0x7fc0_0001);
    }
}
