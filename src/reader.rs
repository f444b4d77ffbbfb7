//! Bounds-checked little-endian reads over a byte slice.
//!
//! Every structure in a hive is decoded through [`ByteReader`], so a corrupt
//! length or offset surfaces as [`RegistryError::OutOfRange`] instead of a
//! slice panic.

use crate::error::{RegistryError, Result};
use crate::utils::read_utf16_string;
use byteorder::{ByteOrder, LittleEndian};

/// Read-only view over a byte slice with checked accessors.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Wraps a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Returns the length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `length` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::OutOfRange`] if the range does not fit.
    pub fn read_bytes(&self, offset: usize, length: usize) -> Result<&'a [u8]> {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= self.data.len())
            .ok_or(RegistryError::OutOfRange {
                offset,
                length,
                size: self.data.len(),
            })?;
        Ok(&self.data[offset..end])
    }

    /// Reads a u16 at the given offset.
    pub fn read_u16_le(&self, offset: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(offset, 2)?))
    }

    /// Reads a u32 at the given offset.
    pub fn read_u32_le(&self, offset: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(offset, 4)?))
    }

    /// Reads an i32 at the given offset.
    pub fn read_i32_le(&self, offset: usize) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(offset, 4)?))
    }

    /// Reads a u64 at the given offset.
    pub fn read_u64_le(&self, offset: usize) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(offset, 8)?))
    }

    /// Reads a two-byte signature at the given offset.
    pub fn read_signature(&self, offset: usize) -> Result<[u8; 2]> {
        let bytes = self.read_bytes(offset, 2)?;
        Ok([bytes[0], bytes[1]])
    }

    /// Reads a UTF-16LE string prefixed by its u16 byte length.
    ///
    /// Trailing NULs are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::OutOfRange`] if the prefix or the string body
    /// exceeds the buffer, and [`RegistryError::DecodeError`] if the body is
    /// not valid UTF-16.
    pub fn read_length_prefixed_utf16(&self, offset: usize) -> Result<String> {
        let length = self.read_u16_le(offset)? as usize;
        let body = self.read_bytes(offset + 2, length)?;
        read_utf16_string(body, offset as u32)
    }
}
