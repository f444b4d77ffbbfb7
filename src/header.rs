//! Registry hive base block (header) parsing.
//!
//! The base block is the first 4096 bytes (0x1000) of a registry hive file.
//! It contains metadata about the hive including version, timestamps, and
//! the root key cell offset.

use crate::error::{RegistryError, Result};
use crate::reader::ByteReader;
use crate::utils::{calculate_checksum, filetime_to_datetime, read_utf16_lossy, CHECKSUM_OFFSET};
use std::fmt;

/// Size of the base block in bytes.
pub const BASE_BLOCK_SIZE: usize = 4096;

/// Expected signature for a valid registry hive ("regf").
pub const REGF_SIGNATURE: &[u8; 4] = b"regf";

/// Offset of the file name in the base block.
const FILE_NAME_OFFSET: usize = 0x30;

/// Length of the file name field (64 UTF-16LE characters = 128 bytes).
const FILE_NAME_LENGTH: usize = 128;

/// Registry hive base block header.
#[derive(Debug, Clone)]
pub struct BaseBlock {
    /// Primary sequence number.
    pub primary_sequence: u32,

    /// Secondary sequence number.
    pub secondary_sequence: u32,

    /// Last written timestamp (Windows FILETIME).
    pub last_written: u64,

    /// Major version of the hive format.
    pub major_version: u32,

    /// Minor version of the hive format.
    pub minor_version: u32,

    /// File type (0 = primary file).
    pub file_type: u32,

    /// File format (1 = direct memory load).
    pub file_format: u32,

    /// Offset to root key cell (relative to first hbin).
    pub root_cell_offset: u32,

    /// Length of hive bins data in bytes.
    pub hive_length: u32,

    /// Clustering factor (always 1).
    pub clustering_factor: u32,

    /// Embedded file name (the tail of the hive's path, may be empty).
    pub file_name: String,

    /// Stored checksum.
    pub checksum: u32,

    /// Checksum computed over the header.
    pub calculated_checksum: u32,
}

impl BaseBlock {
    /// Parses a base block from raw bytes.
    ///
    /// The checksum is computed but not enforced; see
    /// [`BaseBlock::verify_checksum`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidHeader`] if:
    /// - Data is smaller than the base block
    /// - Signature is not `regf`
    /// - Version is unsupported
    /// - The file is not a primary hive file
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BASE_BLOCK_SIZE {
            return Err(RegistryError::invalid_header(format!(
                "hive is {} bytes, base block needs {}",
                data.len(),
                BASE_BLOCK_SIZE
            )));
        }

        let reader = ByteReader::new(&data[..BASE_BLOCK_SIZE]);

        let signature = reader.read_bytes(0, 4)?;
        if signature != REGF_SIGNATURE {
            return Err(RegistryError::invalid_header(format!(
                "expected signature {:?}, found {:?}",
                REGF_SIGNATURE, signature
            )));
        }

        let major_version = reader.read_u32_le(0x14)?;
        let minor_version = reader.read_u32_le(0x18)?;

        // Versions 1.2 through 1.6
        if major_version != 1 || !(2..=6).contains(&minor_version) {
            return Err(RegistryError::invalid_header(format!(
                "unsupported hive version {}.{}",
                major_version, minor_version
            )));
        }

        let file_type = reader.read_u32_le(0x1C)?;
        if file_type != 0 {
            return Err(RegistryError::invalid_header(format!(
                "file type {} is not a primary hive file",
                file_type
            )));
        }

        let file_name_bytes = reader.read_bytes(FILE_NAME_OFFSET, FILE_NAME_LENGTH)?;
        let (file_name, _) = read_utf16_lossy(file_name_bytes);

        Ok(BaseBlock {
            primary_sequence: reader.read_u32_le(0x04)?,
            secondary_sequence: reader.read_u32_le(0x08)?,
            last_written: reader.read_u64_le(0x0C)?,
            major_version,
            minor_version,
            file_type,
            file_format: reader.read_u32_le(0x20)?,
            root_cell_offset: reader.read_u32_le(0x24)?,
            hive_length: reader.read_u32_le(0x28)?,
            clustering_factor: reader.read_u32_le(0x2C)?,
            file_name: file_name
                .split('\0')
                .next()
                .unwrap_or_default()
                .to_string(),
            checksum: reader.read_u32_le(CHECKSUM_OFFSET)?,
            calculated_checksum: calculate_checksum(data),
        })
    }

    /// Checks the stored checksum against the computed one.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ChecksumMismatch`] (a warning-class error) on
    /// mismatch.
    pub fn verify_checksum(&self) -> Result<()> {
        if self.checksum != self.calculated_checksum {
            return Err(RegistryError::ChecksumMismatch {
                stored: self.checksum,
                calculated: self.calculated_checksum,
            });
        }
        Ok(())
    }

    /// Returns true if the hive is in a consistent state.
    ///
    /// The hive is consistent when primary and secondary sequence numbers match.
    pub fn is_consistent(&self) -> bool {
        self.primary_sequence == self.secondary_sequence
    }

    /// Returns true if the hive supports big data (`db`) records.
    pub fn supports_big_data(&self) -> bool {
        self.minor_version >= 4
    }

    /// Converts the last written timestamp to a UTC datetime.
    pub fn last_written_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        filetime_to_datetime(self.last_written)
    }
}

impl fmt::Display for BaseBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Registry Hive Header:\n\
             - Version: {}.{}\n\
             - Root Cell Offset: {:#x}\n\
             - Hive Length: {} bytes\n\
             - Consistent: {}\n\
             - File Name: {}",
            self.major_version,
            self.minor_version,
            self.root_cell_offset,
            self.hive_length,
            self.is_consistent(),
            self.file_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn header(minor: u32) -> Vec<u8> {
        let mut data = vec![0u8; BASE_BLOCK_SIZE];
        data[0..4].copy_from_slice(REGF_SIGNATURE);
        data[0x04..0x08].copy_from_slice(&7u32.to_le_bytes());
        data[0x08..0x0C].copy_from_slice(&7u32.to_le_bytes());
        data[0x14..0x18].copy_from_slice(&1u32.to_le_bytes());
        data[0x18..0x1C].copy_from_slice(&minor.to_le_bytes());
        data[0x20..0x24].copy_from_slice(&1u32.to_le_bytes());
        data[0x24..0x28].copy_from_slice(&0x20u32.to_le_bytes());
        data[0x28..0x2C].copy_from_slice(&0x1000u32.to_le_bytes());
        for (i, unit) in "SYSTEM".encode_utf16().enumerate() {
            data[FILE_NAME_OFFSET + i * 2..FILE_NAME_OFFSET + i * 2 + 2]
                .copy_from_slice(&unit.to_le_bytes());
        }
        let checksum = calculate_checksum(&data);
        data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&checksum.to_le_bytes());
        data
    }

    #[test]
    fn test_parse_valid_header() {
        let block = BaseBlock::parse(&header(5)).unwrap();
        assert_eq!(block.root_cell_offset, 0x20);
        assert_eq!(block.hive_length, 0x1000);
        assert_eq!(block.file_name, "SYSTEM");
        assert!(block.is_consistent());
        assert!(block.supports_big_data());
        assert!(block.verify_checksum().is_ok());
    }

    #[test]
    fn test_checksum_mismatch_is_reported_not_fatal() {
        let mut data = header(3);
        data[CHECKSUM_OFFSET] ^= 0xFF;
        let block = BaseBlock::parse(&data).unwrap();
        assert!(!block.supports_big_data());
        let err = block.verify_checksum().unwrap_err();
        assert!(err.is_warning());
    }

    #[test]
    fn test_invalid_signature() {
        let mut data = header(5);
        data[0..4].copy_from_slice(b"XXXX");
        let err = BaseBlock::parse(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeader);
    }

    #[test]
    fn test_unsupported_version() {
        let err = BaseBlock::parse(&header(9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeader);
    }

    #[test]
    fn test_too_small() {
        let err = BaseBlock::parse(&[0u8; 100]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeader);
    }
}
