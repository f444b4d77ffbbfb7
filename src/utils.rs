//! Utility functions for name decoding, hashing and offset conversion.

use crate::error::{RegistryError, Result};
use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::UTF_16LE;

/// Offset where hive bins start (after base block)
pub const HBIN_START_OFFSET: u32 = 0x1000;

/// Offset of the checksum field in the base block.
pub const CHECKSUM_OFFSET: usize = 0x1FC;

/// Windows FILETIME epoch (1601-01-01) to Unix epoch, in seconds.
const FILETIME_UNIX_DIFF: i64 = 11_644_473_600;

/// Decodes a compressed (Latin-1) name, trimming trailing NULs.
///
/// Every byte maps to the code point of the same value, so this never fails.
pub fn read_latin1_string(data: &[u8]) -> String {
    data.iter()
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end_matches('\0')
        .to_string()
}

/// Reads a UTF-16LE string from a byte slice, trimming trailing NULs.
///
/// # Errors
///
/// Returns [`RegistryError::DecodeError`] if the length is odd or the data
/// contains unpaired surrogates.
pub fn read_utf16_string(data: &[u8], offset: u32) -> Result<String> {
    if data.is_empty() {
        return Ok(String::new());
    }

    // UTF-16 requires even number of bytes
    if data.len() % 2 != 0 {
        return Err(RegistryError::decode(
            offset,
            format!("odd UTF-16 byte length {}", data.len()),
        ));
    }

    let decoded = UTF_16LE
        .decode_without_bom_handling_and_without_replacement(data)
        .ok_or_else(|| RegistryError::decode(offset, "malformed UTF-16 sequence"))?;

    Ok(decoded.trim_end_matches('\0').to_string())
}

/// Reads a UTF-16LE string, substituting U+FFFD for malformed sequences.
///
/// A trailing odd byte is dropped. Returns the string and whether any
/// replacement happened.
pub fn read_utf16_lossy(data: &[u8]) -> (String, bool) {
    let even = &data[..data.len() & !1];
    let (decoded, had_errors) = UTF_16LE.decode_without_bom_handling(even);
    let lossy = had_errors || even.len() != data.len();
    (decoded.trim_end_matches('\0').to_string(), lossy)
}

/// Simple (one-to-one) uppercase mapping used for name comparison.
///
/// Characters whose uppercase form expands to several characters are left
/// unchanged, matching how the registry upcases names.
pub fn upcase_char(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Case-insensitive name comparison.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.chars().map(upcase_char).eq(b.chars().map(upcase_char))
}

/// Computes the hash stored in hash-leaf (`lh`) entries.
///
/// For each UTF-16 code unit of the upcased name: `hash = hash * 37 + unit`.
pub fn name_hash(name: &str) -> u32 {
    let upper: String = name.chars().map(upcase_char).collect();
    upper
        .encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(37).wrapping_add(u32::from(unit)))
}

/// Checks a fast-leaf (`lf`) name hint against a candidate name.
///
/// The hint holds the first four characters of the name as bytes, zero
/// padded. Names with non-ASCII characters in that prefix always pass.
pub fn hint_matches(hint: u32, name: &str) -> bool {
    let hint_bytes = hint.to_le_bytes();
    let mut chars = name.chars();
    for &hint_byte in &hint_bytes {
        match chars.next() {
            Some(c) if !c.is_ascii() => return true,
            Some(c) => {
                if !c.eq_ignore_ascii_case(&(hint_byte as char)) {
                    return false;
                }
            }
            None => return hint_byte == 0,
        }
    }
    true
}

/// Calculates the base block checksum.
///
/// XOR of the 127 dwords preceding the checksum field, with 0 mapped to 1
/// and 0xFFFFFFFF mapped to 0xFFFFFFFE.
pub fn calculate_checksum(data: &[u8]) -> u32 {
    let end = CHECKSUM_OFFSET.min(data.len() & !3);
    let checksum = data[..end]
        .chunks_exact(4)
        .fold(0u32, |acc, dword| acc ^ LittleEndian::read_u32(dword));

    match checksum {
        0 => 1,
        0xFFFF_FFFF => 0xFFFF_FFFE,
        other => other,
    }
}

/// Converts a Windows FILETIME to a UTC timestamp.
pub fn filetime_to_datetime(filetime: u64) -> Option<chrono::DateTime<chrono::Utc>> {
    let seconds = (filetime / 10_000_000) as i64 - FILETIME_UNIX_DIFF;
    let nanos = ((filetime % 10_000_000) * 100) as u32;
    chrono::DateTime::from_timestamp(seconds, nanos)
}

/// Converts a relative cell offset to an absolute hive offset.
///
/// Cell offsets in the registry are relative to the first hbin (at 0x1000).
///
/// # Errors
///
/// Returns [`RegistryError::CellOutOfRange`] if the addition would overflow.
#[inline]
pub fn cell_offset_to_absolute(cell_offset: u32) -> Result<usize> {
    cell_offset
        .checked_add(HBIN_START_OFFSET)
        .map(|abs| abs as usize)
        .ok_or_else(|| RegistryError::cell_out_of_range(cell_offset, "offset overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_latin1_string() {
        assert_eq!(read_latin1_string(b"Hello\0\0"), "Hello");
        assert_eq!(read_latin1_string(&[0x4D, 0xFC, 0x6C]), "Mül");
    }

    #[test]
    fn test_read_utf16_string() {
        let data = [b'H', 0, b'i', 0, 0, 0];
        assert_eq!(read_utf16_string(&data, 0).unwrap(), "Hi");
        assert!(read_utf16_string(&[b'H', 0, b'i'], 0).is_err());
        // Lone high surrogate.
        assert!(read_utf16_string(&[0x00, 0xD8], 0).is_err());
    }

    #[test]
    fn test_read_utf16_lossy() {
        let (s, lossy) = read_utf16_lossy(&[b'A', 0, 0x00, 0xD8]);
        assert!(lossy);
        assert!(s.starts_with('A'));
        let (s, lossy) = read_utf16_lossy(&[b'A', 0]);
        assert!(!lossy);
        assert_eq!(s, "A");
    }

    #[test]
    fn test_names_equal() {
        assert!(names_equal("Software", "SOFTWARE"));
        assert!(names_equal("straße", "STRAßE"));
        assert!(!names_equal("Software", "Softwar"));
    }

    #[test]
    fn test_name_hash() {
        // "AB": 'A' * 37 + 'B'
        assert_eq!(name_hash("ab"), 0x41 * 37 + 0x42);
        assert_eq!(name_hash("Software"), name_hash("SOFTWARE"));
        assert_eq!(name_hash(""), 0);
    }

    #[test]
    fn test_hint_matches() {
        let hint = u32::from_le_bytes(*b"Soft");
        assert!(hint_matches(hint, "software"));
        assert!(!hint_matches(hint, "System"));
        let short = u32::from_le_bytes([b'A', b'b', 0, 0]);
        assert!(hint_matches(short, "AB"));
        assert!(!hint_matches(short, "ABC"));
    }

    #[test]
    fn test_checksum_remapping() {
        let zeros = vec![0u8; 0x200];
        assert_eq!(calculate_checksum(&zeros), 1);

        let mut data = vec![0u8; 0x200];
        data[0..4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        assert_eq!(calculate_checksum(&data), 0xFFFF_FFFE);

        data[4..8].copy_from_slice(&0x0000_00FFu32.to_le_bytes());
        assert_eq!(calculate_checksum(&data), 0xFFFF_FF00);
    }

    #[test]
    fn test_filetime_conversion() {
        let dt = filetime_to_datetime(128_920_193_770_000_000).unwrap();
        assert_eq!(dt.timestamp(), 1_247_545_777);
    }

    #[test]
    fn test_offset_conversion() {
        assert_eq!(cell_offset_to_absolute(0).unwrap(), 0x1000);
        assert_eq!(cell_offset_to_absolute(0x20).unwrap(), 0x1020);
        assert!(cell_offset_to_absolute(u32::MAX).is_err());
    }
}
