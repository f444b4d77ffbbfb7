//! Options controlling how a hive is opened and navigated.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do when the base block checksum does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChecksumPolicy {
    /// Record the mismatch as a warning and keep going.
    #[default]
    Warn,
    /// Refuse to open the hive.
    Strict,
    /// Do not verify the checksum.
    Ignore,
}

/// How malformed UTF-16 key and value names are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NamePolicy {
    /// Malformed names fail with a decode error.
    #[default]
    Strict,
    /// Malformed code units are replaced with U+FFFD and a warning is logged.
    Lossy,
}

/// Options for [`Hive`](crate::Hive).
///
/// ```rust
/// use regf_reader::{ChecksumPolicy, HiveOptions};
///
/// let options = HiveOptions::default()
///     .checksum(ChecksumPolicy::Strict)
///     .separator('/')
///     .cache_keys(true);
/// assert_eq!(options.separator, '/');
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HiveOptions {
    /// Checksum verification policy.
    pub checksum: ChecksumPolicy,
    /// Name decoding policy.
    pub names: NamePolicy,
    /// Separator between path segments.
    pub separator: char,
    /// Keep parsed key nodes in an in-memory cache.
    pub cache_keys: bool,
}

impl Default for HiveOptions {
    fn default() -> Self {
        Self {
            checksum: ChecksumPolicy::default(),
            names: NamePolicy::default(),
            separator: '\\',
            cache_keys: false,
        }
    }
}

impl HiveOptions {
    /// Sets the checksum policy.
    pub fn checksum(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum = policy;
        self
    }

    /// Sets the name decoding policy.
    pub fn names(mut self, policy: NamePolicy) -> Self {
        self.names = policy;
        self
    }

    /// Sets the path separator.
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Enables or disables the key node cache.
    pub fn cache_keys(mut self, enabled: bool) -> Self {
        self.cache_keys = enabled;
        self
    }
}
