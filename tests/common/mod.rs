//! Synthetic hive builder shared by the integration tests and benchmarks.
//!
//! Cells are appended bottom-up: children before parents, so every offset a
//! structure refers to is already known. `patch_*` rewrites fields after the
//! fact for the corruption and cycle cases.

#![allow(dead_code)]

use regf_reader::utils::{calculate_checksum, name_hash};
use std::collections::HashMap;

pub const REG_SZ: u32 = 1;
pub const REG_EXPAND_SZ: u32 = 2;
pub const REG_BINARY: u32 = 3;
pub const REG_DWORD: u32 = 4;
pub const REG_DWORD_BIG_ENDIAN: u32 = 5;
pub const REG_MULTI_SZ: u32 = 7;
pub const REG_QWORD: u32 = 11;

const KEY_COMP_NAME: u16 = 0x0020;
const KEY_ROOT: u16 = 0x0004;
const VALUE_COMP_NAME: u16 = 0x0001;
const NO_CELL: u32 = 0xFFFF_FFFF;
const BIG_DATA_SEGMENT: usize = 16344;

pub fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// UTF-16LE with a terminating NUL, as `REG_SZ` data is stored.
pub fn reg_sz(s: &str) -> Vec<u8> {
    let mut data = utf16(s);
    data.extend_from_slice(&[0, 0]);
    data
}

/// `REG_MULTI_SZ` encoding: each string NUL-terminated, then an empty string.
pub fn reg_multi_sz(strings: &[&str]) -> Vec<u8> {
    let mut data = Vec::new();
    for s in strings {
        data.extend_from_slice(&reg_sz(s));
    }
    data.extend_from_slice(&[0, 0]);
    data
}

fn encode_name(name: &str) -> (Vec<u8>, bool) {
    if name.chars().all(|c| (c as u32) < 0x100) {
        (name.chars().map(|c| c as u8).collect(), true)
    } else {
        (utf16(name), false)
    }
}

pub struct HiveBuilder {
    /// Bins area, starting at the first hbin header.
    bins: Vec<u8>,
    bin_starts: Vec<usize>,
    minor_version: u32,
    root: u32,
    key_names: HashMap<u32, String>,
}

impl HiveBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            bins: Vec::new(),
            bin_starts: Vec::new(),
            minor_version: 5,
            root: 0,
            key_names: HashMap::new(),
        };
        builder.start_bin();
        builder
    }

    pub fn minor_version(mut self, minor: u32) -> Self {
        self.minor_version = minor;
        self
    }

    fn start_bin(&mut self) {
        self.bin_starts.push(self.bins.len());
        self.bins.resize(self.bins.len() + 0x20, 0);
    }

    /// Closes the current bin (padding it with a free cell) and opens another.
    pub fn new_bin(&mut self) {
        let padding = (0x1000 - self.bins.len() % 0x1000) % 0x1000;
        if padding > 0 {
            let start = self.bins.len();
            self.bins.resize(start + padding, 0);
            self.bins[start..start + 4].copy_from_slice(&(padding as i32).to_le_bytes());
        }
        self.start_bin();
    }

    /// Appends an allocated cell and returns its offset.
    pub fn cell(&mut self, payload: &[u8]) -> u32 {
        let offset = self.bins.len() as u32;
        let size = (4 + payload.len() + 7) & !7;
        self.bins.extend_from_slice(&(-(size as i32)).to_le_bytes());
        self.bins.extend_from_slice(payload);
        self.bins.resize(offset as usize + size, 0);
        offset
    }

    /// Overwrites a little-endian u32 inside a cell's payload.
    pub fn patch_u32(&mut self, cell: u32, field: usize, value: u32) {
        let pos = cell as usize + 4 + field;
        self.bins[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Overwrites a cell's size field.
    pub fn patch_cell_size(&mut self, cell: u32, size: i32) {
        let pos = cell as usize;
        self.bins[pos..pos + 4].copy_from_slice(&size.to_le_bytes());
    }

    /// Low-level key node.
    pub fn key_node(
        &mut self,
        name_raw: &[u8],
        flags: u16,
        subkeys: (u32, u32),
        values: (u32, u32),
    ) -> u32 {
        let mut nk = vec![0u8; 0x4C];
        nk[0..2].copy_from_slice(b"nk");
        nk[0x02..0x04].copy_from_slice(&flags.to_le_bytes());
        nk[0x04..0x0C].copy_from_slice(&0x01D0_0000_0000_0000u64.to_le_bytes());
        nk[0x14..0x18].copy_from_slice(&subkeys.0.to_le_bytes());
        nk[0x1C..0x20].copy_from_slice(&subkeys.1.to_le_bytes());
        nk[0x20..0x24].copy_from_slice(&NO_CELL.to_le_bytes());
        nk[0x24..0x28].copy_from_slice(&values.0.to_le_bytes());
        nk[0x28..0x2C].copy_from_slice(&values.1.to_le_bytes());
        nk[0x2C..0x30].copy_from_slice(&NO_CELL.to_le_bytes());
        nk[0x30..0x34].copy_from_slice(&NO_CELL.to_le_bytes());
        nk[0x48..0x4A].copy_from_slice(&(name_raw.len() as u16).to_le_bytes());
        nk.extend_from_slice(name_raw);
        self.cell(&nk)
    }

    /// Key whose subkeys sit in a hash leaf built from `subkeys`.
    pub fn key(&mut self, name: &str, subkeys: &[u32], values: &[u32]) -> u32 {
        let list = if subkeys.is_empty() {
            NO_CELL
        } else {
            self.hash_leaf(subkeys)
        };
        self.key_with_list(name, list, subkeys.len() as u32, values)
    }

    /// Key pointing at an already-built subkey list.
    pub fn key_with_list(&mut self, name: &str, list: u32, subkey_count: u32, values: &[u32]) -> u32 {
        let value_list = self.value_list(values);
        let (raw, compressed) = encode_name(name);
        let flags = if compressed { KEY_COMP_NAME } else { 0 };
        let offset = self.key_node(&raw, flags, (subkey_count, list), (values.len() as u32, value_list));
        self.key_names.insert(offset, name.to_string());
        offset
    }

    /// Builds the root key and records it in the base block.
    pub fn root(&mut self, subkeys: &[u32], values: &[u32]) -> u32 {
        let list = if subkeys.is_empty() {
            NO_CELL
        } else {
            self.hash_leaf(subkeys)
        };
        let value_list = self.value_list(values);
        let root = self.key_node(
            b"ROOT",
            KEY_COMP_NAME | KEY_ROOT,
            (subkeys.len() as u32, list),
            (values.len() as u32, value_list),
        );
        self.key_names.insert(root, "ROOT".to_string());
        self.root = root;
        root
    }

    pub fn set_root(&mut self, root: u32) {
        self.root = root;
    }

    /// Points `key` at `list` holding `count` subkeys.
    pub fn set_subkeys(&mut self, key: u32, list: u32, count: u32) {
        self.patch_u32(key, 0x14, count);
        self.patch_u32(key, 0x1C, list);
    }

    fn value_list(&mut self, values: &[u32]) -> u32 {
        if values.is_empty() {
            return NO_CELL;
        }
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.cell(&payload)
    }

    fn list(&mut self, signature: &[u8; 2], entries: &[u32]) -> u32 {
        let mut payload = signature.to_vec();
        payload.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for entry in entries {
            payload.extend_from_slice(&entry.to_le_bytes());
        }
        self.cell(&payload)
    }

    fn hinted_list(&mut self, signature: &[u8; 2], keys: &[u32], hint: impl Fn(&str) -> u32) -> u32 {
        let mut payload = signature.to_vec();
        payload.extend_from_slice(&(keys.len() as u16).to_le_bytes());
        for key in keys {
            let name = self.key_names.get(key).cloned().unwrap_or_default();
            payload.extend_from_slice(&key.to_le_bytes());
            payload.extend_from_slice(&hint(&name).to_le_bytes());
        }
        self.cell(&payload)
    }

    pub fn hash_leaf(&mut self, keys: &[u32]) -> u32 {
        self.hinted_list(b"lh", keys, name_hash)
    }

    pub fn fast_leaf(&mut self, keys: &[u32]) -> u32 {
        self.hinted_list(b"lf", keys, |name| {
            let mut hint = [0u8; 4];
            for (slot, c) in hint.iter_mut().zip(name.chars()) {
                *slot = if c.is_ascii() { c as u8 } else { 0 };
            }
            u32::from_le_bytes(hint)
        })
    }

    pub fn index_leaf(&mut self, keys: &[u32]) -> u32 {
        self.list(b"li", keys)
    }

    pub fn index_root(&mut self, lists: &[u32]) -> u32 {
        self.list(b"ri", lists)
    }

    /// Value with its data stored inline (≤ 4 bytes) or in a data cell.
    pub fn value(&mut self, name: &str, value_type: u32, data: &[u8]) -> u32 {
        if data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..data.len()].copy_from_slice(data);
            self.value_raw(name, value_type, data.len() as u32 | 0x8000_0000, u32::from_le_bytes(inline))
        } else {
            let cell = self.cell(data);
            self.value_raw(name, value_type, data.len() as u32, cell)
        }
    }

    /// Value whose data is split over a `db` record.
    pub fn big_value(&mut self, name: &str, value_type: u32, data: &[u8]) -> u32 {
        let segments: Vec<u32> = data
            .chunks(BIG_DATA_SEGMENT)
            .map(|chunk| self.cell(chunk))
            .collect();
        let segment_list = self.value_list(&segments);

        let mut db = b"db".to_vec();
        db.extend_from_slice(&(segments.len() as u16).to_le_bytes());
        db.extend_from_slice(&segment_list.to_le_bytes());
        let header = self.cell(&db);
        self.value_raw(name, value_type, data.len() as u32, header)
    }

    pub fn value_raw(&mut self, name: &str, value_type: u32, data_length: u32, data_offset: u32) -> u32 {
        let (raw, compressed) = encode_name(name);
        let mut vk = vec![0u8; 0x14];
        vk[0..2].copy_from_slice(b"vk");
        vk[0x02..0x04].copy_from_slice(&(raw.len() as u16).to_le_bytes());
        vk[0x04..0x08].copy_from_slice(&data_length.to_le_bytes());
        vk[0x08..0x0C].copy_from_slice(&data_offset.to_le_bytes());
        vk[0x0C..0x10].copy_from_slice(&value_type.to_le_bytes());
        let flags = if compressed { VALUE_COMP_NAME } else { 0 };
        vk[0x10..0x12].copy_from_slice(&flags.to_le_bytes());
        vk.extend_from_slice(&raw);
        self.cell(&vk)
    }

    /// Serializes the base block and bins.
    pub fn build(&self) -> Vec<u8> {
        let mut bins = self.bins.clone();
        let total = (bins.len() + 0xFFF) & !0xFFF;
        let slack = total - bins.len();
        if slack >= 8 {
            let start = bins.len();
            bins.resize(total, 0);
            bins[start..start + 4].copy_from_slice(&(slack as i32).to_le_bytes());
        } else {
            bins.resize(total, 0);
        }

        for (i, &start) in self.bin_starts.iter().enumerate() {
            let end = self.bin_starts.get(i + 1).copied().unwrap_or(total);
            bins[start..start + 4].copy_from_slice(b"hbin");
            bins[start + 4..start + 8].copy_from_slice(&(start as u32).to_le_bytes());
            bins[start + 8..start + 12].copy_from_slice(&((end - start) as u32).to_le_bytes());
        }

        let mut base = vec![0u8; 0x1000];
        base[0..4].copy_from_slice(b"regf");
        base[0x04..0x08].copy_from_slice(&1u32.to_le_bytes());
        base[0x08..0x0C].copy_from_slice(&1u32.to_le_bytes());
        base[0x14..0x18].copy_from_slice(&1u32.to_le_bytes());
        base[0x18..0x1C].copy_from_slice(&self.minor_version.to_le_bytes());
        base[0x20..0x24].copy_from_slice(&1u32.to_le_bytes());
        base[0x24..0x28].copy_from_slice(&self.root.to_le_bytes());
        base[0x28..0x2C].copy_from_slice(&(total as u32).to_le_bytes());
        base[0x2C..0x30].copy_from_slice(&1u32.to_le_bytes());
        base[0x30..0x30 + 8].copy_from_slice(&utf16("TEST"));
        let checksum = calculate_checksum(&base);
        base[0x1FC..0x200].copy_from_slice(&checksum.to_le_bytes());

        base.extend_from_slice(&bins);
        base
    }
}

/// `ROOT\Software\Vendor` with `Name = "Acme"` plus one value of each
/// common type on `Vendor`.
pub fn sample_hive() -> Vec<u8> {
    let mut b = HiveBuilder::new();
    let values = vec![
        b.value("Name", REG_SZ, &reg_sz("Acme")),
        b.value("Path", REG_EXPAND_SZ, &reg_sz("%SystemRoot%\\acme")),
        b.value("Count", REG_DWORD, &42u32.to_le_bytes()),
        b.value("Big", REG_DWORD_BIG_ENDIAN, &7u32.to_be_bytes()),
        b.value("Size", REG_QWORD, &0x1_0000_0000u64.to_le_bytes()),
        b.value("Blob", REG_BINARY, &[0xDE, 0xAD, 0xBE, 0xEF, 0x01]),
        b.value("List", REG_MULTI_SZ, &reg_multi_sz(&["a", "b", "c"])),
        b.value("", REG_SZ, &reg_sz("default")),
    ];
    let vendor = b.key("Vendor", &[], &values);
    let other = b.key("Other", &[], &[]);
    let software = b.key("Software", &[vendor, other], &[]);
    let system = b.key("System", &[], &[]);
    b.root(&[software, system], &[]);
    b.build()
}
