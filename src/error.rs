//! Error types for registry parsing operations.
//!
//! Every decode and lookup operation returns a [`RegistryError`] describing
//! which structure failed and where. Only [`RegistryError::ChecksumMismatch`]
//! is considered a warning: it can be recorded at open time without
//! preventing further use of the hive.

use std::io;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Fieldless classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Underlying I/O failure.
    Io,
    /// Base block or bin map is unusable.
    InvalidHeader,
    /// Base block checksum does not match its contents.
    ChecksumMismatch,
    /// Cell offset or size falls outside the mapped bins.
    CellOutOfRange,
    /// Cell was expected to hold a key node.
    NotAKeyNode,
    /// Ordinal access past the end of a list.
    IndexOutOfRange,
    /// Named key, value or path segment does not exist.
    NotFound,
    /// Typed accessor used on a value of another type.
    TypeMismatch,
    /// Payload or name bytes are malformed.
    DecodeError,
    /// Traversal revisited a structure already on the current path.
    CyclicStructure,
    /// Read past the end of a buffer.
    OutOfRange,
}

/// Errors that can occur during registry parsing.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// I/O error occurred while reading the hive file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The base block is missing, malformed, or describes no usable bins.
    #[error("Invalid hive header: {reason}")]
    InvalidHeader {
        /// What was wrong with the header.
        reason: String,
    },

    /// Checksum mismatch in the base block.
    #[error("Checksum mismatch: stored {stored:#x}, calculated {calculated:#x}")]
    ChecksumMismatch {
        /// Checksum stored at offset 0x1FC.
        stored: u32,
        /// Checksum computed over the header.
        calculated: u32,
    },

    /// Cell offset does not resolve to a cell inside a hive bin.
    #[error("Cell out of range at {offset:#x}: {reason}")]
    CellOutOfRange {
        /// Cell offset (relative to the first hbin).
        offset: u32,
        /// Why the cell could not be resolved.
        reason: String,
    },

    /// Cell does not carry the `nk` signature.
    #[error("Cell at {offset:#x} is not a key node (signature {found:?})")]
    NotAKeyNode {
        /// Cell offset (relative to the first hbin).
        offset: u32,
        /// Signature bytes actually found.
        found: [u8; 2],
    },

    /// Ordinal subkey or value access outside `[0, count)`.
    #[error("Index {index} out of range (count: {count})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of entries available.
        count: usize,
    },

    /// Key, value, or path segment not found.
    #[error("{kind} '{name}' not found{}", segment_suffix(.segment))]
    NotFound {
        /// What was being looked up ("key", "value").
        kind: &'static str,
        /// Name that was not found.
        name: String,
        /// Position of the failing segment for path lookups.
        segment: Option<usize>,
    },

    /// Typed accessor does not match the value's type or width.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Type or width the accessor requires.
        expected: String,
        /// Type or width the value actually has.
        found: String,
    },

    /// Malformed name or payload bytes.
    #[error("Decode error at {offset:#x}: {reason}")]
    DecodeError {
        /// Offset of the structure being decoded.
        offset: u32,
        /// What was malformed.
        reason: String,
    },

    /// A subkey or subkey list refers back to a structure on the current path.
    #[error("Cyclic structure: offset {offset:#x} is already on the traversal path")]
    CyclicStructure {
        /// Offset that was revisited.
        offset: u32,
    },

    /// Read outside the bounds of a buffer.
    #[error("Read of {length} bytes at {offset:#x} exceeds buffer of {size} bytes")]
    OutOfRange {
        /// Start of the read.
        offset: usize,
        /// Requested length.
        length: usize,
        /// Size of the buffer.
        size: usize,
    },
}

fn segment_suffix(segment: &Option<usize>) -> String {
    match segment {
        Some(index) => format!(" (path segment {})", index),
        None => String::new(),
    }
}

impl RegistryError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidHeader { .. } => ErrorKind::InvalidHeader,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::CellOutOfRange { .. } => ErrorKind::CellOutOfRange,
            Self::NotAKeyNode { .. } => ErrorKind::NotAKeyNode,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::DecodeError { .. } => ErrorKind::DecodeError,
            Self::CyclicStructure { .. } => ErrorKind::CyclicStructure,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
        }
    }

    /// Returns true for warning-class errors that do not make a hive unusable.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }

    /// Creates an invalid header error.
    pub fn invalid_header(reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            reason: reason.into(),
        }
    }

    /// Creates a cell out of range error.
    ///
    /// # Arguments
    ///
    /// * `offset` - The offending cell offset
    /// * `reason` - Why it could not be resolved
    pub fn cell_out_of_range(offset: u32, reason: impl Into<String>) -> Self {
        Self::CellOutOfRange {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates a decode error with context.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use regf_reader::error::RegistryError;
    /// let err = RegistryError::decode(0x20, "odd UTF-16 length");
    /// assert!(err.to_string().contains("0x20"));
    /// ```
    pub fn decode(offset: u32, reason: impl Into<String>) -> Self {
        Self::DecodeError {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates a not found error with context about what was being searched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use regf_reader::error::RegistryError;
    /// let err = RegistryError::not_found("value", "DisplayName");
    /// assert_eq!(err.to_string(), "value 'DisplayName' not found");
    /// ```
    pub fn not_found(kind: &'static str, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
            segment: None,
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
