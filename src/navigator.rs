//! Path-based lookup of keys and values.
//!
//! Paths are relative to the root key and split on
//! [`HiveOptions::separator`](crate::HiveOptions::separator). Segment
//! comparison is case-insensitive, like every other name lookup.

use crate::error::{RegistryError, Result};
use crate::hive::{Hive, RegistryKey, RegistryValue};
use tracing::{debug, instrument};

impl Hive {
    /// Finds a key by its path from the root.
    ///
    /// Leading, trailing and repeated separators are ignored, so the empty
    /// path yields the root key.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] carrying the index of the first
    /// segment that does not exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use regf_reader::Hive;
    ///
    /// # fn main() -> regf_reader::Result<()> {
    /// let hive = Hive::open("SOFTWARE")?;
    /// let key = hive.key_by_path("Microsoft\\Windows\\CurrentVersion")?;
    /// println!("{} values", key.value_count());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self))]
    pub fn key_by_path(&self, path: &str) -> Result<RegistryKey<'_>> {
        let segments: Vec<&str> = path
            .split(self.options().separator)
            .filter(|s| !s.is_empty())
            .collect();
        self.key_by_segments(&segments)
    }

    /// Finds a value by its path: every segment but the last names a key,
    /// the last names the value.
    ///
    /// A trailing separator selects the key's default value. Value names
    /// containing the separator cannot be addressed this way; use
    /// [`Hive::value_by_components`] for those.
    #[instrument(skip(self))]
    pub fn value_by_path(&self, path: &str) -> Result<RegistryValue<'_>> {
        let separator = self.options().separator;
        let path = path.trim_start_matches(separator);
        let (key_path, value_name) = path.rsplit_once(separator).unwrap_or(("", path));
        self.key_by_path(key_path)?.value_by_name(value_name)
    }

    /// Finds a value from already-split key segments and a value name.
    ///
    /// Segments are matched as given, so they may contain the separator.
    pub fn value_by_components(
        &self,
        key_segments: &[&str],
        value_name: &str,
    ) -> Result<RegistryValue<'_>> {
        self.key_by_segments(key_segments)?
            .value_by_name(value_name)
    }

    fn key_by_segments(&self, segments: &[&str]) -> Result<RegistryKey<'_>> {
        let mut key = self.root_key()?;
        for (index, segment) in segments.iter().enumerate() {
            key = key.subkey_by_name(segment).map_err(|e| match e {
                RegistryError::NotFound { kind, name, .. } => RegistryError::NotFound {
                    kind,
                    name,
                    segment: Some(index),
                },
                other => other,
            })?;
            debug!(segment = index, name = segment, "Descended into subkey");
        }
        Ok(key)
    }
}
