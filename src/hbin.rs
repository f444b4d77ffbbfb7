//! Hive bin (hbin) block parsing.
//!
//! Hive bins are 4KB-aligned blocks that contain registry cells. Each hbin
//! has a header followed by a sequence of cells; a cell never crosses the
//! end of its bin.

use crate::error::{RegistryError, Result};
use crate::reader::ByteReader;

/// Expected signature for hive bins ("hbin").
pub const HBIN_SIGNATURE: &[u8; 4] = b"hbin";

/// Size of an hbin header.
pub const HBIN_HEADER_SIZE: usize = 0x20;

/// Hive bins are sized in multiples of this.
pub const HBIN_ALIGNMENT: u32 = 0x1000;

/// Hive bin header structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbinHeader {
    /// Offset of this hbin relative to the first hbin.
    pub offset: u32,

    /// Size of this hbin in bytes (including header).
    pub size: u32,

    /// Timestamp (Windows FILETIME), only meaningful in the first bin.
    pub timestamp: u64,
}

impl HbinHeader {
    /// Parses an hbin header from raw bytes.
    ///
    /// # Arguments
    ///
    /// * `data` - Raw bytes starting at the hbin header.
    /// * `expected_offset` - Offset this bin should declare for itself.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidHeader`] if the signature, declared
    /// offset or size is inconsistent, and [`RegistryError::OutOfRange`] if
    /// the header is truncated.
    pub fn parse(data: &[u8], expected_offset: u32) -> Result<Self> {
        let reader = ByteReader::new(data);

        let signature = reader.read_bytes(0, 4)?;
        if signature != HBIN_SIGNATURE {
            return Err(RegistryError::invalid_header(format!(
                "expected hbin signature at {:#x}, found {:?}",
                expected_offset, signature
            )));
        }

        let offset = reader.read_u32_le(0x04)?;
        if offset != expected_offset {
            return Err(RegistryError::invalid_header(format!(
                "hbin offset mismatch: expected {:#x}, found {:#x}",
                expected_offset, offset
            )));
        }

        let size = reader.read_u32_le(0x08)?;
        if size == 0 || size % HBIN_ALIGNMENT != 0 {
            return Err(RegistryError::invalid_header(format!(
                "hbin at {:#x} has invalid size {:#x}",
                offset, size
            )));
        }

        Ok(HbinHeader {
            offset,
            size,
            timestamp: reader.read_u64_le(0x14)?,
        })
    }

    /// Returns the size of the data area (excluding the header).
    pub fn data_size(&self) -> u32 {
        self.size.saturating_sub(HBIN_HEADER_SIZE as u32)
    }

    /// Returns the offset one past the end of this bin.
    pub fn end(&self) -> u32 {
        self.offset.saturating_add(self.size)
    }

    /// Returns true if `cell_offset` lies in this bin's cell area.
    pub fn contains_cell(&self, cell_offset: u32) -> bool {
        cell_offset >= self.offset.saturating_add(HBIN_HEADER_SIZE as u32)
            && cell_offset < self.end()
    }

    /// Returns true if `offset` lies anywhere in this bin, header included.
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.offset && offset < self.end()
    }
}

/// Ordered map of the hive bins, used to validate cell boundaries.
#[derive(Debug, Clone, Default)]
pub struct BinMap {
    bins: Vec<HbinHeader>,
}

impl BinMap {
    /// Builds the map from bins sorted by offset.
    pub fn new(bins: Vec<HbinHeader>) -> Self {
        Self { bins }
    }

    /// Finds the bin containing `offset`.
    pub fn find(&self, offset: u32) -> Option<&HbinHeader> {
        let index = self.bins.partition_point(|bin| bin.end() <= offset);
        self.bins.get(index).filter(|bin| bin.contains(offset))
    }

    /// Returns the bins in file order.
    pub fn bins(&self) -> &[HbinHeader] {
        &self.bins
    }

    /// Returns the number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Returns true if no bins were mapped.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(offset: u32, size: u32) -> Vec<u8> {
        let mut data = vec![0u8; HBIN_HEADER_SIZE];
        data[0..4].copy_from_slice(HBIN_SIGNATURE);
        data[4..8].copy_from_slice(&offset.to_le_bytes());
        data[8..12].copy_from_slice(&size.to_le_bytes());
        data
    }

    #[test]
    fn test_parse_header() {
        let header = HbinHeader::parse(&header_bytes(0x1000, 0x2000), 0x1000).unwrap();
        assert_eq!(header.offset, 0x1000);
        assert_eq!(header.data_size(), 0x2000 - 0x20);
        assert!(header.contains_cell(0x1020));
        assert!(!header.contains_cell(0x1010));
        assert!(!header.contains_cell(0x3000));
    }

    #[test]
    fn test_invalid_signature() {
        let mut data = header_bytes(0, 0x1000);
        data[0..4].copy_from_slice(b"XXXX");
        assert!(HbinHeader::parse(&data, 0).is_err());
    }

    #[test]
    fn test_offset_and_size_validation() {
        assert!(HbinHeader::parse(&header_bytes(0x1000, 0x1000), 0).is_err());
        assert!(HbinHeader::parse(&header_bytes(0, 0x1234), 0).is_err());
        assert!(HbinHeader::parse(&header_bytes(0, 0x1000)[..8], 0).is_err());
    }

    #[test]
    fn test_bin_map_find() {
        let map = BinMap::new(vec![
            HbinHeader { offset: 0, size: 0x1000, timestamp: 0 },
            HbinHeader { offset: 0x1000, size: 0x2000, timestamp: 0 },
        ]);
        assert_eq!(map.find(0x20).map(|b| b.offset), Some(0));
        assert_eq!(map.find(0x1000).map(|b| b.offset), Some(0x1000));
        assert_eq!(map.find(0x2FFF).map(|b| b.offset), Some(0x1000));
        assert!(map.find(0x3000).is_none());
    }
}
