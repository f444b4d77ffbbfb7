//! Registry value (vk) parsing and data extraction.

use crate::cell::{Cell, ValueType};
use crate::config::NamePolicy;
use crate::error::{RegistryError, Result};
use crate::key::decode_name;
use crate::utils::{read_latin1_string, read_utf16_lossy};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Minimum size of a value key structure in bytes.
const VALUE_KEY_MIN_SIZE: usize = 0x14;

/// Offset of the value name in the value key structure.
const VALUE_NAME_OFFSET: usize = 0x14;

/// High bit of the data length: data is stored in the offset field.
const DATA_INLINE_FLAG: u32 = 0x8000_0000;

/// Value name is stored compressed (Latin-1).
const VALUE_COMP_NAME: u16 = 0x0001;

/// Number of strings `describe` shows for a multi-string.
pub const DESCRIBE_MAX_STRINGS: usize = 4;

/// Number of bytes `describe` shows for binary data.
pub const DESCRIBE_MAX_BYTES: usize = 40;

/// Appended by `describe` when output was cut short.
pub const TRUNCATION_MARKER: &str = "…";

/// Value key (vk) structure.
#[derive(Debug, Clone)]
pub struct ValueKey {
    /// Offset of the cell holding this value key.
    pub offset: u32,

    /// Declared length of value data (inline flag stripped).
    pub data_length: u32,

    /// True if the data is stored in the offset field itself.
    pub data_inline: bool,

    /// Offset to value data, or the data itself when inline.
    pub data_offset: u32,

    /// Value data type.
    pub data_type: ValueType,

    /// Flags (0x0001 = name is compressed).
    pub flags: u16,

    /// Raw value name bytes. Empty for the default value.
    pub name_raw: Vec<u8>,
}

impl ValueKey {
    /// Parses a value key from a resolved cell.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DecodeError`] if the signature is not `vk`
    /// or the record is truncated.
    pub fn parse(cell: &Cell<'_>) -> Result<Self> {
        let offset = cell.offset;
        let signature = cell.signature()?;
        if &signature != b"vk" {
            return Err(RegistryError::decode(
                offset,
                format!("expected 'vk' signature, found {:?}", signature),
            ));
        }

        if cell.data.len() < VALUE_KEY_MIN_SIZE {
            return Err(RegistryError::decode(
                offset,
                format!(
                    "value key is {} bytes, needs at least {}",
                    cell.data.len(),
                    VALUE_KEY_MIN_SIZE
                ),
            ));
        }

        let reader = cell.reader();
        let name_length = reader.read_u16_le(0x02)? as usize;
        let data_length_raw = reader.read_u32_le(0x04)?;
        let name_raw = reader
            .read_bytes(VALUE_NAME_OFFSET, name_length)
            .map_err(|_| {
                RegistryError::decode(
                    offset,
                    format!("value name length {} exceeds cell", name_length),
                )
            })?
            .to_vec();

        Ok(ValueKey {
            offset,
            data_length: data_length_raw & !DATA_INLINE_FLAG,
            data_inline: data_length_raw & DATA_INLINE_FLAG != 0,
            data_offset: reader.read_u32_le(0x08)?,
            data_type: ValueType::from_u32(reader.read_u32_le(0x0C)?),
            flags: reader.read_u16_le(0x10)?,
            name_raw,
        })
    }

    /// Returns true if the name is stored compressed.
    pub fn is_name_compressed(&self) -> bool {
        self.flags & VALUE_COMP_NAME != 0
    }

    /// Returns true if this is the default (unnamed) value.
    pub fn is_default(&self) -> bool {
        self.name_raw.is_empty()
    }

    /// Decodes the value name according to `policy`.
    ///
    /// The default value has an empty name.
    pub fn name(&self, policy: NamePolicy) -> Result<String> {
        match policy {
            NamePolicy::Strict => {
                decode_name(&self.name_raw, self.is_name_compressed(), self.offset)
            }
            NamePolicy::Lossy => Ok(self.name_lossy()),
        }
    }

    /// Decodes the value name, never failing.
    pub fn name_lossy(&self) -> String {
        if self.is_name_compressed() {
            read_latin1_string(&self.name_raw)
        } else {
            read_utf16_lossy(&self.name_raw).0
        }
    }

    /// Extracts inline data.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DecodeError`] if the declared length exceeds
    /// the four bytes available inline.
    pub fn inline_data(&self) -> Result<Vec<u8>> {
        if self.data_length > 4 {
            return Err(RegistryError::decode(
                self.offset,
                format!("inline data length {} exceeds 4 bytes", self.data_length),
            ));
        }
        let bytes = self.data_offset.to_le_bytes();
        Ok(bytes[..self.data_length as usize].to_vec())
    }
}

/// Ordered strings decoded from a `REG_MULTI_SZ` payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultiString {
    strings: Vec<String>,
}

impl MultiString {
    /// Decodes a multi-string payload.
    ///
    /// The payload is a sequence of NUL-terminated UTF-16LE strings followed
    /// by an empty string, so it must end with two NUL code units. An empty
    /// payload or a lone NUL decodes to no strings. Extra trailing NULs are
    /// tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DecodeError`] for an odd byte length, a
    /// missing terminator, or malformed UTF-16.
    pub fn decode(data: &[u8], offset: u32) -> Result<Self> {
        if data.len() % 2 != 0 {
            return Err(RegistryError::decode(
                offset,
                format!("multi-string has odd byte length {}", data.len()),
            ));
        }

        let units: Vec<u16> = data.chunks_exact(2).map(LittleEndian::read_u16).collect();
        if units.is_empty() || units == [0] {
            return Ok(Self::default());
        }

        if !units.ends_with(&[0, 0]) {
            return Err(RegistryError::decode(
                offset,
                "multi-string is missing its terminating empty string",
            ));
        }

        let body_len = units.iter().rposition(|&u| u != 0).map_or(0, |i| i + 1);
        if body_len == 0 {
            return Ok(Self::default());
        }

        let strings = units[..body_len]
            .split(|&u| u == 0)
            .map(|segment| {
                String::from_utf16(segment).map_err(|_| {
                    RegistryError::decode(offset, "multi-string contains malformed UTF-16")
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { strings })
    }

    /// Returns the number of strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if there are no strings.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Returns the string at `index`.
    pub fn get(&self, index: usize) -> Result<&str> {
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or(RegistryError::IndexOutOfRange {
                index,
                count: self.strings.len(),
            })
    }

    /// Returns all strings in order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Consumes the multi-string, returning its strings.
    pub fn into_strings(self) -> Vec<String> {
        self.strings
    }
}

impl From<Vec<String>> for MultiString {
    fn from(strings: Vec<String>) -> Self {
        Self { strings }
    }
}

/// Parsed registry value data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueData {
    /// No data.
    None,

    /// String value.
    String(String),

    /// Expandable string value.
    ExpandString(String),

    /// Symbolic link target.
    Link(String),

    /// Binary data.
    Binary(Vec<u8>),

    /// 32-bit integer.
    Dword(u32),

    /// 32-bit big-endian integer.
    DwordBigEndian(u32),

    /// Multiple strings.
    MultiString(MultiString),

    /// 64-bit integer.
    Qword(u64),

    /// Type without a typed view (resource lists, unknown codes).
    Unknown {
        /// Raw type code.
        type_code: u32,
        /// Raw payload.
        bytes: Vec<u8>,
    },
}

impl ValueData {
    /// Parses value data based on the value type.
    ///
    /// # Arguments
    ///
    /// * `data` - Raw value data bytes.
    /// * `value_type` - Type of the value.
    /// * `offset` - Offset for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TypeMismatch`] when an integer payload has
    /// the wrong width and [`RegistryError::DecodeError`] on malformed text.
    pub fn parse(data: &[u8], value_type: ValueType, offset: u32) -> Result<Self> {
        match value_type {
            ValueType::None => Ok(ValueData::None),
            ValueType::String => Ok(ValueData::String(decode_reg_string(data, offset)?)),
            ValueType::ExpandString => {
                Ok(ValueData::ExpandString(decode_reg_string(data, offset)?))
            }
            ValueType::Link => Ok(ValueData::Link(decode_reg_string(data, offset)?)),
            ValueType::Binary => Ok(ValueData::Binary(data.to_vec())),
            ValueType::Dword => Ok(ValueData::Dword(LittleEndian::read_u32(
                fixed_width(data, 4, value_type)?,
            ))),
            ValueType::DwordBigEndian => Ok(ValueData::DwordBigEndian(BigEndian::read_u32(
                fixed_width(data, 4, value_type)?,
            ))),
            ValueType::Qword => Ok(ValueData::Qword(LittleEndian::read_u64(fixed_width(
                data, 8, value_type,
            )?))),
            ValueType::MultiString => Ok(ValueData::MultiString(MultiString::decode(data, offset)?)),
            ValueType::ResourceList
            | ValueType::FullResourceDescriptor
            | ValueType::ResourceRequirementsList
            | ValueType::Unknown(_) => Ok(ValueData::Unknown {
                type_code: value_type.code(),
                bytes: data.to_vec(),
            }),
        }
    }

    /// Renders the data for display.
    ///
    /// Multi-strings show at most [`DESCRIBE_MAX_STRINGS`] entries and binary
    /// data at most [`DESCRIBE_MAX_BYTES`] bytes of hex; longer data ends with
    /// [`TRUNCATION_MARKER`]. Types without a typed view render as a
    /// placeholder naming the type code.
    pub fn describe(&self) -> String {
        match self {
            ValueData::None => String::from("(none)"),
            ValueData::String(s) | ValueData::ExpandString(s) | ValueData::Link(s) => s.clone(),
            ValueData::Binary(b) => {
                let shown = &b[..b.len().min(DESCRIBE_MAX_BYTES)];
                let mut out = hex::encode(shown);
                if b.len() > DESCRIBE_MAX_BYTES {
                    out.push_str(TRUNCATION_MARKER);
                }
                out
            }
            ValueData::Dword(d) | ValueData::DwordBigEndian(d) => d.to_string(),
            ValueData::Qword(q) => q.to_string(),
            ValueData::MultiString(ms) => {
                let strings = ms.strings();
                let shown = &strings[..strings.len().min(DESCRIBE_MAX_STRINGS)];
                let mut out = shown.join(", ");
                if strings.len() > DESCRIBE_MAX_STRINGS {
                    out.push_str(TRUNCATION_MARKER);
                }
                out
            }
            ValueData::Unknown { type_code, .. } => {
                format!("[unsupported value type {}]", type_code)
            }
        }
    }
}

impl fmt::Display for ValueData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Decodes a `REG_SZ`-style payload: UTF-16LE, ending at the first NUL.
fn decode_reg_string(data: &[u8], offset: u32) -> Result<String> {
    if data.len() % 2 != 0 {
        return Err(RegistryError::decode(
            offset,
            format!("string has odd byte length {}", data.len()),
        ));
    }
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(LittleEndian::read_u16)
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16(&units)
        .map_err(|_| RegistryError::decode(offset, "string contains malformed UTF-16"))
}

/// Checks that an integer payload has exactly `width` bytes.
fn fixed_width(data: &[u8], width: usize, value_type: ValueType) -> Result<&[u8]> {
    if data.len() != width {
        return Err(RegistryError::type_mismatch(
            format!("{} of {} bytes", value_type, width),
            format!("{} bytes", data.len()),
        ));
    }
    Ok(data)
}
