//! Subkey list parsing (lf, lh, li, ri).
//!
//! Registry keys can have multiple subkeys, which are organized in various
//! list structures. Leaf lists point at key nodes directly; an index root
//! points at leaf lists.

use crate::cell::Cell;
use crate::error::{RegistryError, Result};
use crate::utils::{hint_matches, name_hash};

/// Subkey list types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubkeyListType {
    /// Index leaf (li) - simple list of offsets.
    IndexLeaf,

    /// Fast leaf (lf) - list with 4-byte name hints.
    FastLeaf,

    /// Hash leaf (lh) - list with name hash hints.
    HashLeaf,

    /// Index root (ri) - list of subkey list offsets.
    IndexRoot,
}

impl SubkeyListType {
    /// Parses a subkey list type from a 2-byte signature.
    pub fn from_signature(sig: &[u8; 2]) -> Option<Self> {
        match sig {
            b"li" => Some(SubkeyListType::IndexLeaf),
            b"lf" => Some(SubkeyListType::FastLeaf),
            b"lh" => Some(SubkeyListType::HashLeaf),
            b"ri" => Some(SubkeyListType::IndexRoot),
            _ => None,
        }
    }
}

/// Subkey list entry (for lf/lh lists).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubkeyListEntry {
    /// Offset to the key node.
    pub key_offset: u32,

    /// Name hint (first 4 chars for lf, hash for lh).
    pub name_hint: u32,
}

/// Parsed subkey list.
#[derive(Debug, Clone)]
pub enum SubkeyList {
    /// Index leaf - simple list of offsets.
    IndexLeaf(Vec<u32>),

    /// Fast leaf or hash leaf - list with hints.
    LeafWithHints(SubkeyListType, Vec<SubkeyListEntry>),

    /// Index root - list of sublist offsets.
    IndexRoot(Vec<u32>),
}

impl SubkeyList {
    /// Parses a subkey list from a resolved cell.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DecodeError`] for an unknown signature or a
    /// count that does not fit in the cell.
    pub fn parse(cell: &Cell<'_>) -> Result<Self> {
        let offset = cell.offset;
        let reader = cell.reader();
        let sig = cell.signature()?;
        let list_type = SubkeyListType::from_signature(&sig).ok_or_else(|| {
            RegistryError::decode(offset, format!("invalid subkey list signature {:?}", sig))
        })?;

        let count = reader.read_u16_le(2)? as usize;
        let entry_size = match list_type {
            SubkeyListType::FastLeaf | SubkeyListType::HashLeaf => 8,
            SubkeyListType::IndexLeaf | SubkeyListType::IndexRoot => 4,
        };

        let expected_size = 4 + count * entry_size;
        if reader.len() < expected_size {
            return Err(RegistryError::decode(
                offset,
                format!(
                    "subkey list declares {} entries ({} bytes), cell holds {}",
                    count,
                    expected_size,
                    reader.len()
                ),
            ));
        }

        match list_type {
            SubkeyListType::IndexLeaf | SubkeyListType::IndexRoot => {
                let offsets = (0..count)
                    .map(|i| reader.read_u32_le(4 + i * 4))
                    .collect::<Result<Vec<_>>>()?;
                if list_type == SubkeyListType::IndexRoot {
                    Ok(SubkeyList::IndexRoot(offsets))
                } else {
                    Ok(SubkeyList::IndexLeaf(offsets))
                }
            }

            SubkeyListType::FastLeaf | SubkeyListType::HashLeaf => {
                let entries = (0..count)
                    .map(|i| -> Result<SubkeyListEntry> {
                        let entry_pos = 4 + i * 8;
                        Ok(SubkeyListEntry {
                            key_offset: reader.read_u32_le(entry_pos)?,
                            name_hint: reader.read_u32_le(entry_pos + 4)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(SubkeyList::LeafWithHints(list_type, entries))
            }
        }
    }

    /// Returns the list type.
    pub fn list_type(&self) -> SubkeyListType {
        match self {
            SubkeyList::IndexLeaf(_) => SubkeyListType::IndexLeaf,
            SubkeyList::LeafWithHints(list_type, _) => *list_type,
            SubkeyList::IndexRoot(_) => SubkeyListType::IndexRoot,
        }
    }

    /// Returns an iterator over the offsets stored in this list.
    ///
    /// For index roots these are sublist offsets, not key offsets.
    pub fn offsets_iter(&self) -> impl Iterator<Item = u32> + '_ {
        match self {
            SubkeyList::IndexLeaf(offsets) | SubkeyList::IndexRoot(offsets) => {
                Box::new(offsets.iter().copied()) as Box<dyn Iterator<Item = u32> + '_>
            }
            SubkeyList::LeafWithHints(_, entries) => Box::new(entries.iter().map(|e| e.key_offset)),
        }
    }

    /// Returns the offset at `index`.
    pub fn offset_at(&self, index: usize) -> Option<u32> {
        match self {
            SubkeyList::IndexLeaf(offsets) | SubkeyList::IndexRoot(offsets) => {
                offsets.get(index).copied()
            }
            SubkeyList::LeafWithHints(_, entries) => entries.get(index).map(|e| e.key_offset),
        }
    }

    /// Returns the key offsets whose stored hint is compatible with `name`.
    ///
    /// Index leaves carry no hints, so every entry is a candidate. Index
    /// roots return nothing: their entries are lists, not keys.
    pub fn candidates(&self, name: &str) -> Vec<u32> {
        match self {
            SubkeyList::IndexLeaf(offsets) => offsets.clone(),
            SubkeyList::IndexRoot(_) => Vec::new(),
            SubkeyList::LeafWithHints(SubkeyListType::HashLeaf, entries) => {
                let hash = name_hash(name);
                entries
                    .iter()
                    .filter(|e| e.name_hint == hash)
                    .map(|e| e.key_offset)
                    .collect()
            }
            SubkeyList::LeafWithHints(_, entries) => entries
                .iter()
                .filter(|e| hint_matches(e.name_hint, name))
                .map(|e| e.key_offset)
                .collect(),
        }
    }

    /// Returns the number of entries in this list.
    pub fn len(&self) -> usize {
        match self {
            SubkeyList::IndexLeaf(offsets) => offsets.len(),
            SubkeyList::LeafWithHints(_, entries) => entries.len(),
            SubkeyList::IndexRoot(offsets) => offsets.len(),
        }
    }

    /// Returns true if this list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if this is an index root (contains sublists).
    pub fn is_index_root(&self) -> bool {
        matches!(self, SubkeyList::IndexRoot(_))
    }
}
