//! Registry key node (nk) parsing and representation.

use crate::cell::{Cell, KeyNodeFlags};
use crate::config::NamePolicy;
use crate::error::{RegistryError, Result};
use crate::reader::ByteReader;
use crate::utils::{filetime_to_datetime, read_latin1_string, read_utf16_lossy, read_utf16_string};
use tracing::warn;

/// Minimum size of a key node structure in bytes.
const KEY_NODE_MIN_SIZE: usize = 0x4C;

/// Offset of the key name in the key node structure.
const KEY_NAME_OFFSET: usize = 0x4C;

/// Marker for "no cell" in offset fields.
pub const NO_CELL: u32 = 0xFFFF_FFFF;

/// Key node (nk) structure.
///
/// Represents a registry key with metadata including name, timestamps,
/// and references to subkeys and values. The name is kept as raw bytes
/// and decoded on demand.
#[derive(Debug, Clone)]
pub struct KeyNode {
    /// Offset of the cell holding this key node.
    pub offset: u32,

    /// Flags for this key.
    pub flags: KeyNodeFlags,

    /// Last written timestamp (Windows FILETIME).
    pub last_written: u64,

    /// Offset to parent key node.
    pub parent_offset: u32,

    /// Number of subkeys.
    pub subkey_count: u32,

    /// Number of volatile subkeys.
    pub volatile_subkey_count: u32,

    /// Offset to subkey list.
    pub subkey_list_offset: u32,

    /// Number of values.
    pub value_count: u32,

    /// Offset to value list.
    pub value_list_offset: u32,

    /// Offset to security descriptor.
    pub security_offset: u32,

    /// Offset to class name.
    pub class_name_offset: u32,

    /// Length of class name in bytes.
    pub class_name_length: u16,

    /// Raw key name bytes.
    pub name_raw: Vec<u8>,
}

impl KeyNode {
    /// Parses a key node from a resolved cell.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotAKeyNode`] if the signature is not `nk`,
    /// and [`RegistryError::DecodeError`] if the record is truncated.
    pub fn parse(cell: &Cell<'_>) -> Result<Self> {
        let offset = cell.offset;
        let signature = cell.signature()?;
        if &signature != b"nk" {
            return Err(RegistryError::NotAKeyNode {
                offset,
                found: signature,
            });
        }

        if cell.data.len() < KEY_NODE_MIN_SIZE {
            return Err(RegistryError::decode(
                offset,
                format!(
                    "key node is {} bytes, needs at least {}",
                    cell.data.len(),
                    KEY_NODE_MIN_SIZE
                ),
            ));
        }

        let reader = cell.reader();
        let name_length = reader.read_u16_le(0x48)? as usize;
        let name_raw = reader
            .read_bytes(KEY_NAME_OFFSET, name_length)
            .map_err(|_| {
                RegistryError::decode(
                    offset,
                    format!("key name length {} exceeds cell", name_length),
                )
            })?
            .to_vec();

        Ok(KeyNode {
            offset,
            flags: KeyNodeFlags::new(reader.read_u16_le(0x02)?),
            last_written: reader.read_u64_le(0x04)?,
            parent_offset: reader.read_u32_le(0x10)?,
            subkey_count: reader.read_u32_le(0x14)?,
            volatile_subkey_count: reader.read_u32_le(0x18)?,
            subkey_list_offset: reader.read_u32_le(0x1C)?,
            value_count: reader.read_u32_le(0x24)?,
            value_list_offset: reader.read_u32_le(0x28)?,
            security_offset: reader.read_u32_le(0x2C)?,
            class_name_offset: reader.read_u32_le(0x30)?,
            class_name_length: reader.read_u16_le(0x4A)?,
            name_raw,
        })
    }

    /// Decodes the key name according to `policy`.
    ///
    /// Compressed names are Latin-1 and always decode. UTF-16 names fail
    /// with [`RegistryError::DecodeError`] under [`NamePolicy::Strict`]; under
    /// [`NamePolicy::Lossy`] bad code units become U+FFFD.
    pub fn name(&self, policy: NamePolicy) -> Result<String> {
        match policy {
            NamePolicy::Strict => decode_name(&self.name_raw, self.flags.is_compressed(), self.offset),
            NamePolicy::Lossy => Ok(self.name_lossy()),
        }
    }

    /// Decodes the key name, never failing.
    pub fn name_lossy(&self) -> String {
        if self.flags.is_compressed() {
            return read_latin1_string(&self.name_raw);
        }
        let (name, lossy) = read_utf16_lossy(&self.name_raw);
        if lossy {
            warn!(offset = %format!("{:#x}", self.offset), "Key name contains malformed UTF-16");
        }
        name
    }

    /// Returns true if this key has subkeys.
    pub fn has_subkeys(&self) -> bool {
        self.subkey_count > 0 && has_cell(self.subkey_list_offset)
    }

    /// Returns true if this key has values.
    pub fn has_values(&self) -> bool {
        self.value_count > 0 && has_cell(self.value_list_offset)
    }

    /// Returns true if this key has a class name.
    pub fn has_class_name(&self) -> bool {
        self.class_name_length > 0 && has_cell(self.class_name_offset)
    }

    /// Returns true if this is the root key.
    pub fn is_root(&self) -> bool {
        self.flags.is_root()
    }

    /// Converts the last written timestamp to a UTC datetime.
    pub fn last_written_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        filetime_to_datetime(self.last_written)
    }
}

/// Decodes a key or value name stored either compressed or as UTF-16LE.
pub(crate) fn decode_name(raw: &[u8], compressed: bool, offset: u32) -> Result<String> {
    if compressed {
        Ok(read_latin1_string(raw))
    } else {
        read_utf16_string(raw, offset)
    }
}

/// Returns true if an offset field points at a cell.
pub(crate) fn has_cell(offset: u32) -> bool {
    offset != NO_CELL && offset != 0
}

/// Reads `count` cell offsets from a value list or segment list cell.
pub(crate) fn read_offset_list(cell: &Cell<'_>, count: usize) -> Result<Vec<u32>> {
    let reader = ByteReader::new(cell.data);
    let needed = count.checked_mul(4).unwrap_or(usize::MAX);
    if needed > reader.len() {
        return Err(RegistryError::decode(
            cell.offset,
            format!(
                "offset list needs {} bytes for {} entries, cell holds {}",
                needed,
                count,
                reader.len()
            ),
        ));
    }
    (0..count).map(|i| reader.read_u32_le(i * 4)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn nk_payload(flags: u16, name: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; KEY_NAME_OFFSET + name.len()];
        data[0..2].copy_from_slice(b"nk");
        data[0x02..0x04].copy_from_slice(&flags.to_le_bytes());
        data[0x14..0x18].copy_from_slice(&2u32.to_le_bytes());
        data[0x1C..0x20].copy_from_slice(&0x80u32.to_le_bytes());
        data[0x28..0x2C].copy_from_slice(&NO_CELL.to_le_bytes());
        data[0x48..0x4A].copy_from_slice(&(name.len() as u16).to_le_bytes());
        data[KEY_NAME_OFFSET..].copy_from_slice(name);
        data
    }

    fn cell(data: &[u8]) -> Cell<'_> {
        Cell {
            offset: 0x20,
            size: data.len() as u32 + 4,
            allocated: true,
            data,
        }
    }

    #[test]
    fn test_parse_compressed_name() {
        let data = nk_payload(KeyNodeFlags::COMP_NAME, b"Software");
        let node = KeyNode::parse(&cell(&data)).unwrap();
        assert_eq!(node.name(NamePolicy::Strict).unwrap(), "Software");
        assert_eq!(node.subkey_count, 2);
        assert!(node.has_subkeys());
        assert!(!node.has_values());
    }

    #[test]
    fn test_parse_utf16_name() {
        let name: Vec<u8> = "Ключ".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let data = nk_payload(0, &name);
        let node = KeyNode::parse(&cell(&data)).unwrap();
        assert_eq!(node.name(NamePolicy::Strict).unwrap(), "Ключ");
    }

    #[test]
    fn test_malformed_name_strict_and_lossy() {
        let data = nk_payload(0, &[b'A', 0, 0x00, 0xD8]);
        let node = KeyNode::parse(&cell(&data)).unwrap();
        let err = node.name(NamePolicy::Strict).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
        let lossy = node.name(NamePolicy::Lossy).unwrap();
        assert!(lossy.starts_with('A'));
        assert!(lossy.contains('\u{FFFD}'));
    }

    #[test]
    fn test_wrong_signature() {
        let mut data = nk_payload(0, b"");
        data[0..2].copy_from_slice(b"vk");
        let err = KeyNode::parse(&cell(&data)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAKeyNode);
    }

    #[test]
    fn test_truncated_key_node() {
        let data = nk_payload(0, b"");
        let err = KeyNode::parse(&cell(&data[..0x40])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);

        let mut long_name = nk_payload(KeyNodeFlags::COMP_NAME, b"Abc");
        long_name[0x48..0x4A].copy_from_slice(&40u16.to_le_bytes());
        let err = KeyNode::parse(&cell(&long_name)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[test]
    fn test_read_offset_list() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x20u32.to_le_bytes());
        data.extend_from_slice(&0x40u32.to_le_bytes());
        assert_eq!(read_offset_list(&cell(&data), 2).unwrap(), vec![0x20, 0x40]);
        assert!(read_offset_list(&cell(&data), 3).is_err());
    }
}
