//! Registry cell definitions.
//!
//! Cells are the fundamental storage units within hive bins. Each cell
//! starts with a signed 32-bit size (negative when allocated) and, for
//! typed records, a 2-byte signature identifying the record.

use crate::error::{RegistryError, Result};
use crate::reader::ByteReader;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest cell the format allows (size field plus one record word).
pub const MIN_CELL_SIZE: usize = 8;

/// Cell type signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    /// Key node (nk) - represents a registry key.
    KeyNode,

    /// Value key (vk) - represents a registry value.
    ValueKey,

    /// Security descriptor (sk).
    Security,

    /// Index leaf (li) - list of subkey offsets.
    IndexLeaf,

    /// Fast leaf (lf) - list of subkeys with name hints.
    FastLeaf,

    /// Hash leaf (lh) - list of subkeys with name hashes.
    HashLeaf,

    /// Index root (ri) - list of subkey list offsets.
    IndexRoot,

    /// Data block (db) - big data block.
    DataBlock,
}

impl CellType {
    /// Parses a cell type from a 2-byte signature.
    pub fn from_signature(sig: &[u8; 2]) -> Option<Self> {
        match sig {
            b"nk" => Some(CellType::KeyNode),
            b"vk" => Some(CellType::ValueKey),
            b"sk" => Some(CellType::Security),
            b"li" => Some(CellType::IndexLeaf),
            b"lf" => Some(CellType::FastLeaf),
            b"lh" => Some(CellType::HashLeaf),
            b"ri" => Some(CellType::IndexRoot),
            b"db" => Some(CellType::DataBlock),
            _ => None,
        }
    }

    /// Returns the 2-byte signature for this cell type.
    pub fn signature(&self) -> &'static [u8; 2] {
        match self {
            CellType::KeyNode => b"nk",
            CellType::ValueKey => b"vk",
            CellType::Security => b"sk",
            CellType::IndexLeaf => b"li",
            CellType::FastLeaf => b"lf",
            CellType::HashLeaf => b"lh",
            CellType::IndexRoot => b"ri",
            CellType::DataBlock => b"db",
        }
    }

    /// Returns true if this cell type represents a subkey list.
    pub fn is_subkey_list(&self) -> bool {
        matches!(
            self,
            CellType::IndexLeaf | CellType::FastLeaf | CellType::HashLeaf | CellType::IndexRoot
        )
    }
}

/// A resolved cell: a view into the hive bytes.
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    /// Offset of this cell relative to the first hbin.
    pub offset: u32,

    /// Size of the cell including the size field.
    pub size: u32,

    /// Whether this cell is allocated (negative size on disk).
    pub allocated: bool,

    /// Cell payload (excluding the size field).
    pub data: &'a [u8],
}

impl<'a> Cell<'a> {
    /// Returns a bounds-checked reader over the payload.
    pub fn reader(&self) -> ByteReader<'a> {
        ByteReader::new(self.data)
    }

    /// Returns the record signature (first 2 bytes of the payload).
    pub fn signature(&self) -> Result<[u8; 2]> {
        self.reader().read_signature(0).map_err(|_| {
            RegistryError::decode(self.offset, "cell too small to hold a signature")
        })
    }

    /// Returns the record type, if the signature is a known one.
    pub fn cell_type(&self) -> Option<CellType> {
        self.signature()
            .ok()
            .and_then(|sig| CellType::from_signature(&sig))
    }
}

/// Flags for key nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNodeFlags(pub u16);

impl KeyNodeFlags {
    /// Key is volatile (not stored on disk).
    pub const VOLATILE: u16 = 0x0001;

    /// Key is a mount point for another hive.
    pub const HIVE_EXIT: u16 = 0x0002;

    /// Key is the root key.
    pub const ROOT_KEY: u16 = 0x0004;

    /// Key cannot be deleted.
    pub const NO_DELETE: u16 = 0x0008;

    /// Key is a symbolic link.
    pub const SYM_LINK: u16 = 0x0010;

    /// Key name is in compressed format (Latin-1).
    pub const COMP_NAME: u16 = 0x0020;

    /// Key is a predefined handle.
    pub const PREDEF_HANDLE: u16 = 0x0040;

    /// Creates a new KeyNodeFlags from a u16 value.
    pub fn new(flags: u16) -> Self {
        Self(flags)
    }

    /// Returns true if the specified flag is set.
    pub fn has_flag(&self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    /// Returns true if the key name is compressed (Latin-1).
    pub fn is_compressed(&self) -> bool {
        self.has_flag(Self::COMP_NAME)
    }

    /// Returns true if this is a volatile key.
    pub fn is_volatile(&self) -> bool {
        self.has_flag(Self::VOLATILE)
    }

    /// Returns true if this is the root key.
    pub fn is_root(&self) -> bool {
        self.has_flag(Self::ROOT_KEY)
    }

    /// Returns true if this key is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.has_flag(Self::SYM_LINK)
    }
}

/// Registry value data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueType {
    /// No value type.
    None,

    /// String (null-terminated).
    String,

    /// String with environment variables.
    ExpandString,

    /// Binary data.
    Binary,

    /// 32-bit little-endian integer.
    Dword,

    /// 32-bit big-endian integer.
    DwordBigEndian,

    /// Symbolic link (Unicode).
    Link,

    /// Multiple strings.
    MultiString,

    /// Resource list.
    ResourceList,

    /// Full resource descriptor.
    FullResourceDescriptor,

    /// Resource requirements list.
    ResourceRequirementsList,

    /// 64-bit little-endian integer.
    Qword,

    /// Unknown or non-standard value type.
    /// Contains the raw type value.
    Unknown(u32),
}

impl ValueType {
    /// Maps a raw type code to a value type.
    ///
    /// Codes 0-11 are predefined; anything else is kept as
    /// [`ValueType::Unknown`].
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ValueType::None,
            1 => ValueType::String,
            2 => ValueType::ExpandString,
            3 => ValueType::Binary,
            4 => ValueType::Dword,
            5 => ValueType::DwordBigEndian,
            6 => ValueType::Link,
            7 => ValueType::MultiString,
            8 => ValueType::ResourceList,
            9 => ValueType::FullResourceDescriptor,
            10 => ValueType::ResourceRequirementsList,
            11 => ValueType::Qword,
            _ => ValueType::Unknown(value),
        }
    }

    /// Returns the raw type code.
    pub fn code(&self) -> u32 {
        match self {
            ValueType::None => 0,
            ValueType::String => 1,
            ValueType::ExpandString => 2,
            ValueType::Binary => 3,
            ValueType::Dword => 4,
            ValueType::DwordBigEndian => 5,
            ValueType::Link => 6,
            ValueType::MultiString => 7,
            ValueType::ResourceList => 8,
            ValueType::FullResourceDescriptor => 9,
            ValueType::ResourceRequirementsList => 10,
            ValueType::Qword => 11,
            ValueType::Unknown(value) => *value,
        }
    }

    /// Returns the name of this value type.
    pub fn name(&self) -> String {
        match self {
            ValueType::None => "REG_NONE".to_string(),
            ValueType::String => "REG_SZ".to_string(),
            ValueType::ExpandString => "REG_EXPAND_SZ".to_string(),
            ValueType::Binary => "REG_BINARY".to_string(),
            ValueType::Dword => "REG_DWORD".to_string(),
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN".to_string(),
            ValueType::Link => "REG_LINK".to_string(),
            ValueType::MultiString => "REG_MULTI_SZ".to_string(),
            ValueType::ResourceList => "REG_RESOURCE_LIST".to_string(),
            ValueType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR".to_string(),
            ValueType::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST".to_string(),
            ValueType::Qword => "REG_QWORD".to_string(),
            ValueType::Unknown(value) => format!("REG_UNKNOWN_{:#010x}", value),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
