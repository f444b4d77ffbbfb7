//! Big data block (db) parsing.
//!
//! In hives of version 1.4 and later, values larger than 16,344 bytes are
//! stored in big data blocks: a header cell pointing at a list of segment
//! cells whose payloads are concatenated.

use crate::cell::Cell;
use crate::error::{RegistryError, Result};

/// Largest payload stored directly in a single data cell.
pub const MAX_DIRECT_DATA_SIZE: u32 = 16344;

/// Big data block header structure.
///
/// Format:
/// ```text
/// Offset  Size  Description
/// 0x00    2     Signature ("db")
/// 0x02    2     Number of segments
/// 0x04    4     Offset to segment list
/// ```
#[derive(Debug, Clone)]
pub struct BigDataBlock {
    /// Number of data segments
    pub segment_count: u16,

    /// Offset to the list of segment offsets
    pub segment_list_offset: u32,
}

impl BigDataBlock {
    /// Minimum size of a big data block header
    const MIN_SIZE: usize = 8;

    /// Parses a big data block header from a resolved cell.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DecodeError`] if the signature is not `db`,
    /// the header is truncated, or it declares no segments.
    pub fn parse(cell: &Cell<'_>) -> Result<Self> {
        let offset = cell.offset;
        if cell.data.len() < Self::MIN_SIZE {
            return Err(RegistryError::decode(
                offset,
                format!("big data header is {} bytes", cell.data.len()),
            ));
        }

        let signature = cell.signature()?;
        if &signature != b"db" {
            return Err(RegistryError::decode(
                offset,
                format!("expected 'db' signature, found {:?}", signature),
            ));
        }

        let reader = cell.reader();
        let segment_count = reader.read_u16_le(0x02)?;
        if segment_count == 0 {
            return Err(RegistryError::decode(offset, "big data block has no segments"));
        }

        Ok(BigDataBlock {
            segment_count,
            segment_list_offset: reader.read_u32_le(0x04)?,
        })
    }
}
