//! Main registry hive parser with memory-mapped file support.

use crate::bigdata::{BigDataBlock, MAX_DIRECT_DATA_SIZE};
use crate::cell::{Cell, ValueType, MIN_CELL_SIZE};
use crate::config::{ChecksumPolicy, HiveOptions};
use crate::error::{RegistryError, Result};
use crate::hbin::{BinMap, HbinHeader, HBIN_HEADER_SIZE};
use crate::header::{BaseBlock, BASE_BLOCK_SIZE};
use crate::key::{has_cell, read_offset_list, KeyNode};
use crate::reader::ByteReader;
use crate::subkey_list::SubkeyList;
use crate::utils::{cell_offset_to_absolute, names_equal, read_utf16_string};
use crate::value::{MultiString, ValueData, ValueKey};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Deepest chain of nested index roots followed before giving up.
const MAX_INDEX_DEPTH: usize = 16;

/// Main registry hive parser.
///
/// This structure provides read-only access to a Windows registry hive,
/// either memory-mapped from a file or held in an owned buffer. It is
/// immutable after opening and can be shared between threads.
///
/// # Caching
///
/// With [`HiveOptions::cache_keys`] enabled, parsed key nodes are kept in a
/// `RwLock`-guarded map so repeated traversals skip re-parsing.
pub struct Hive {
    /// Hive data - either memory-mapped or owned.
    data: HiveData,

    /// Parsed base block header.
    base_block: BaseBlock,

    /// Hive bins, used to bound every cell.
    bins: BinMap,

    /// Options the hive was opened with.
    options: HiveOptions,

    /// Non-fatal problems found while opening.
    warnings: Vec<RegistryError>,

    /// Cache of parsed key nodes (offset -> KeyNode).
    key_cache: Option<RwLock<HashMap<u32, KeyNode>>>,
}

/// Represents hive data storage.
enum HiveData {
    /// Memory-mapped file data.
    Mapped(Mmap),
    /// Owned data.
    Owned(Vec<u8>),
}

impl HiveData {
    /// Returns a slice of the hive data.
    fn as_slice(&self) -> &[u8] {
        match self {
            HiveData::Mapped(mmap) => mmap,
            HiveData::Owned(data) => data,
        }
    }
}

impl Hive {
    /// Opens a registry hive file with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be opened
    /// - File is not a valid registry hive
    /// - Header is corrupted
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use regf_reader::Hive;
    ///
    /// let hive = Hive::open("SYSTEM").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, HiveOptions::default())
    }

    /// Opens a registry hive file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the registry hive file.
    /// * `options` - Checksum, naming, separator and caching options.
    #[instrument(skip(path, options), fields(path = %path.as_ref().display()))]
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: HiveOptions) -> Result<Self> {
        info!("Opening registry hive");
        let file = File::open(&path)?;

        // Validate file size BEFORE creating memory map
        let file_size = file.metadata()?.len() as usize;
        if file_size < BASE_BLOCK_SIZE {
            return Err(RegistryError::invalid_header(format!(
                "file is {} bytes, base block needs {}",
                file_size, BASE_BLOCK_SIZE
            )));
        }

        debug!(size = file_size, "File size validated");

        // SAFETY: The file is opened read-only and the map is never written.
        // Its lifetime is tied to the Hive, and every access goes through
        // bounds-checked readers, so a file shrinking underneath the map is
        // the only hazard; that is inherent to memory-mapped input.
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(size = mmap.len(), "Memory mapped hive file");

        Self::from_data(HiveData::Mapped(mmap), options)
    }

    /// Creates a hive parser from owned data with default options.
    pub fn from_vec(data: Vec<u8>) -> Result<Self> {
        Self::from_vec_with_options(data, HiveOptions::default())
    }

    /// Creates a hive parser from owned data.
    pub fn from_vec_with_options(data: Vec<u8>, options: HiveOptions) -> Result<Self> {
        Self::from_data(HiveData::Owned(data), options)
    }

    /// Validates the header, maps the bins and locates the root cell.
    fn from_data(data: HiveData, options: HiveOptions) -> Result<Self> {
        let bytes = data.as_slice();
        let base_block = BaseBlock::parse(bytes)?;
        let mut warnings = Vec::new();

        match options.checksum {
            ChecksumPolicy::Ignore => {}
            ChecksumPolicy::Strict => base_block.verify_checksum()?,
            ChecksumPolicy::Warn => {
                if let Err(e) = base_block.verify_checksum() {
                    warn!(error = %e, "Base block checksum mismatch");
                    warnings.push(e);
                }
            }
        }

        if !base_block.is_consistent() {
            warn!(
                primary = base_block.primary_sequence,
                secondary = base_block.secondary_sequence,
                "Hive sequence numbers differ; hive was not cleanly written"
            );
        }

        let available = bytes.len() - BASE_BLOCK_SIZE;
        let declared = base_block.hive_length as usize;
        let limit = if declared == 0 || declared > available {
            if declared > available {
                warn!(declared, available, "Hive length exceeds file size");
            }
            available
        } else {
            declared
        };

        let mut bins = Vec::new();
        for result in HbinIterator::new(&bytes[BASE_BLOCK_SIZE..BASE_BLOCK_SIZE + limit]) {
            match result {
                Ok(header) => bins.push(header),
                Err(e) => {
                    warn!(error = %e, "Stopping bin scan");
                    break;
                }
            }
        }

        if bins.is_empty() {
            return Err(RegistryError::invalid_header("hive contains no valid bins"));
        }
        debug!(count = bins.len(), "Mapped hive bins");

        let bins = BinMap::new(bins);
        let root = base_block.root_cell_offset;
        if !bins.find(root).is_some_and(|bin| bin.contains_cell(root)) {
            return Err(RegistryError::invalid_header(format!(
                "root cell offset {:#x} is not inside a hive bin",
                root
            )));
        }

        let key_cache = options.cache_keys.then(|| RwLock::new(HashMap::new()));

        Ok(Self {
            data,
            base_block,
            bins,
            options,
            warnings,
            key_cache,
        })
    }

    /// Returns a reference to the base block header.
    pub fn base_block(&self) -> &BaseBlock {
        &self.base_block
    }

    /// Returns the hive bins in file order.
    pub fn bins(&self) -> &[HbinHeader] {
        self.bins.bins()
    }

    /// Returns the options this hive was opened with.
    pub fn options(&self) -> &HiveOptions {
        &self.options
    }

    /// Returns the warning-class problems found while opening.
    pub fn warnings(&self) -> &[RegistryError] {
        &self.warnings
    }

    /// Returns the size of the underlying data in bytes.
    pub fn len(&self) -> usize {
        self.data.as_slice().len()
    }

    /// Returns true if the underlying data is empty (never for an open hive).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the root key of the hive.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotAKeyNode`] if the root cell is not a key
    /// node.
    #[instrument(skip(self))]
    pub fn root_key(&self) -> Result<RegistryKey<'_>> {
        let offset = self.base_block.root_cell_offset;
        debug!(offset = %format!("{:#x}", offset), "Accessing root key");
        Ok(RegistryKey {
            hive: self,
            node: self.key_node(offset)?,
            ancestors: Vec::new(),
        })
    }

    /// Resolves the cell at `offset`.
    ///
    /// # Arguments
    ///
    /// * `offset` - Cell offset (relative to first hbin).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CellOutOfRange`] if the offset is outside the
    /// bins' cell areas, the size is too small, or the cell crosses the end
    /// of its bin.
    pub fn resolve_cell(&self, offset: u32) -> Result<Cell<'_>> {
        let bin = self
            .bins
            .find(offset)
            .ok_or_else(|| RegistryError::cell_out_of_range(offset, "not inside any hive bin"))?;
        if !bin.contains_cell(offset) {
            return Err(RegistryError::cell_out_of_range(
                offset,
                format!("inside the header of bin {:#x}", bin.offset),
            ));
        }

        let abs_offset = cell_offset_to_absolute(offset)?;
        let reader = ByteReader::new(self.data.as_slice());
        let size = reader.read_i32_le(abs_offset)?;
        let abs_size = size.unsigned_abs() as usize;

        if abs_size < MIN_CELL_SIZE {
            return Err(RegistryError::cell_out_of_range(
                offset,
                format!("cell size {} is too small", size),
            ));
        }

        if offset as usize + abs_size > bin.end() as usize {
            return Err(RegistryError::cell_out_of_range(
                offset,
                format!(
                    "cell of {} bytes crosses the end of bin {:#x}",
                    abs_size, bin.offset
                ),
            ));
        }

        let data = reader.read_bytes(abs_offset + 4, abs_size - 4)?;
        if size > 0 {
            debug!(offset = %format!("{:#x}", offset), "Resolved a free cell");
        }

        Ok(Cell {
            offset,
            size: abs_size as u32,
            allocated: size < 0,
            data,
        })
    }

    /// Parses the key node at `offset`, consulting the cache if enabled.
    fn key_node(&self, offset: u32) -> Result<KeyNode> {
        if let Some(cache) = &self.key_cache {
            if let Some(node) = cache.read().ok().and_then(|c| c.get(&offset).cloned()) {
                debug!(offset = %format!("{:#x}", offset), "Cache hit for key node");
                return Ok(node);
            }
        }

        let node = KeyNode::parse(&self.resolve_cell(offset)?)?;

        if let Some(cache) = &self.key_cache {
            if let Ok(mut cache) = cache.write() {
                cache.insert(offset, node.clone());
            }
        }
        Ok(node)
    }

    /// Walks the leaf lists reachable from `list_offset`, descending through
    /// index roots, until `visit` breaks.
    ///
    /// `chain` holds the index roots currently being descended; meeting one
    /// of them again is a cycle.
    fn walk_subkey_lists<F>(
        &self,
        list_offset: u32,
        chain: &mut Vec<u32>,
        visit: &mut F,
    ) -> Result<ControlFlow<u32>>
    where
        F: FnMut(&SubkeyList) -> Result<ControlFlow<u32>>,
    {
        if chain.contains(&list_offset) {
            return Err(RegistryError::CyclicStructure {
                offset: list_offset,
            });
        }
        if chain.len() >= MAX_INDEX_DEPTH {
            return Err(RegistryError::decode(
                list_offset,
                format!("index roots nested deeper than {}", MAX_INDEX_DEPTH),
            ));
        }

        let list = SubkeyList::parse(&self.resolve_cell(list_offset)?)?;
        debug!(
            offset = %format!("{:#x}", list_offset),
            list_type = ?list.list_type(),
            entries = list.len(),
            "Parsed subkey list"
        );

        if !list.is_index_root() {
            return visit(&list);
        }

        chain.push(list_offset);
        for sublist_offset in list.offsets_iter() {
            if let ControlFlow::Break(found) = self.walk_subkey_lists(sublist_offset, chain, visit)? {
                chain.pop();
                return Ok(ControlFlow::Break(found));
            }
        }
        chain.pop();
        Ok(ControlFlow::Continue(()))
    }

    /// Reads value data for a value key.
    ///
    /// Handles inline data, single data cells, and big data blocks.
    fn read_value_data(&self, value_key: &ValueKey) -> Result<Vec<u8>> {
        if value_key.data_inline {
            return value_key.inline_data();
        }

        let length = value_key.data_length;
        if length == 0 {
            return Ok(Vec::new());
        }
        if !has_cell(value_key.data_offset) {
            return Err(RegistryError::decode(
                value_key.offset,
                format!("value declares {} bytes but has no data cell", length),
            ));
        }

        if length > MAX_DIRECT_DATA_SIZE && self.base_block.supports_big_data() {
            return self.read_big_data(value_key.data_offset, length);
        }

        let cell = self.resolve_cell(value_key.data_offset)?;
        let stored = cell.data.len();
        cell.data
            .get(..length as usize)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                RegistryError::decode(
                    value_key.offset,
                    format!("declared length {} exceeds stored size {}", length, stored),
                )
            })
    }

    /// Reads a big data block (values > 16KB).
    ///
    /// Every segment but the last holds [`MAX_DIRECT_DATA_SIZE`] bytes of
    /// payload; the remainder of each segment cell is padding.
    fn read_big_data(&self, offset: u32, expected_length: u32) -> Result<Vec<u8>> {
        debug!(offset = %format!("{:#x}", offset), expected_length, "Reading big data block");

        let header = BigDataBlock::parse(&self.resolve_cell(offset)?)?;
        let segment_list = self.resolve_cell(header.segment_list_offset)?;
        let segments = read_offset_list(&segment_list, header.segment_count as usize)?;

        let expected = expected_length as usize;
        let mut data = Vec::with_capacity(expected);
        for segment_offset in segments {
            if data.len() >= expected {
                break;
            }
            let segment = self.resolve_cell(segment_offset)?;
            let take = (expected - data.len())
                .min(MAX_DIRECT_DATA_SIZE as usize)
                .min(segment.data.len());
            data.extend_from_slice(&segment.data[..take]);
        }

        if data.len() < expected {
            return Err(RegistryError::decode(
                offset,
                format!(
                    "big data segments hold {} bytes, value declares {}",
                    data.len(),
                    expected
                ),
            ));
        }

        Ok(data)
    }
}

impl fmt::Debug for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hive")
            .field("len", &self.len())
            .field("base_block", &self.base_block)
            .field("bins", &self.bins.len())
            .field("warnings", &self.warnings.len())
            .finish()
    }
}

/// Iterator over hbins in a hive.
pub struct HbinIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> HbinIterator<'a> {
    /// Creates an iterator over the bins area (everything after the base block).
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }
}

impl<'a> Iterator for HbinIterator<'a> {
    type Item = Result<HbinHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset + HBIN_HEADER_SIZE > self.data.len() {
            return None;
        }

        let result = HbinHeader::parse(&self.data[self.offset..], self.offset as u32)
            .and_then(|header| {
                if self.offset + header.size as usize > self.data.len() {
                    Err(RegistryError::invalid_header(format!(
                        "hbin at {:#x} extends past the end of the hive",
                        header.offset
                    )))
                } else {
                    Ok(header)
                }
            });

        match result {
            Ok(header) => {
                self.offset += header.size as usize;
                Some(Ok(header))
            }
            Err(e) => {
                // Nothing after a bad bin header can be trusted.
                self.offset = self.data.len();
                Some(Err(e))
            }
        }
    }
}

/// A registry key with access to its hive.
#[derive(Debug, Clone)]
pub struct RegistryKey<'a> {
    hive: &'a Hive,
    node: KeyNode,
    /// Offsets of the keys from the root down to this key's parent.
    ancestors: Vec<u32>,
}

impl<'a> RegistryKey<'a> {
    /// Returns the cell offset of this key (relative to first hbin).
    pub fn offset(&self) -> u32 {
        self.node.offset
    }

    /// Returns the parsed key node.
    pub fn key_node(&self) -> &KeyNode {
        &self.node
    }

    /// Returns the hive this key belongs to.
    pub fn hive(&self) -> &'a Hive {
        self.hive
    }

    /// Returns the key name, decoded per the hive's [`NamePolicy`](crate::NamePolicy).
    pub fn name(&self) -> Result<String> {
        self.node.name(self.hive.options.names)
    }

    /// Returns the key name, replacing malformed characters.
    pub fn name_lossy(&self) -> String {
        self.node.name_lossy()
    }

    /// Returns the class name, if the key has one.
    pub fn class_name(&self) -> Result<Option<String>> {
        if !self.node.has_class_name() {
            return Ok(None);
        }
        let cell = self.hive.resolve_cell(self.node.class_name_offset)?;
        let bytes = cell
            .reader()
            .read_bytes(0, self.node.class_name_length as usize)
            .map_err(|_| {
                RegistryError::decode(
                    cell.offset,
                    format!(
                        "class name length {} exceeds cell",
                        self.node.class_name_length
                    ),
                )
            })?;
        read_utf16_string(bytes, cell.offset).map(Some)
    }

    /// Returns the last written timestamp (Windows FILETIME).
    pub fn last_written(&self) -> u64 {
        self.node.last_written
    }

    /// Returns the last written timestamp as a UTC datetime.
    pub fn last_written_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.node.last_written_datetime()
    }

    /// Returns the number of levels between the root and this key.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Returns the path of this key from the root, without the root's name.
    pub fn path(&self) -> Result<String> {
        if self.ancestors.is_empty() {
            return Ok(String::new());
        }
        let mut segments = Vec::with_capacity(self.ancestors.len());
        for &offset in &self.ancestors[1..] {
            segments.push(self.hive.key_node(offset)?.name(self.hive.options.names)?);
        }
        segments.push(self.name()?);
        let separator = self.hive.options.separator.to_string();
        Ok(segments.join(separator.as_str()))
    }

    /// Returns the number of subkeys.
    pub fn subkey_count(&self) -> usize {
        if self.node.has_subkeys() {
            self.node.subkey_count as usize
        } else {
            0
        }
    }

    /// Returns the subkey at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IndexOutOfRange`] if `index >= subkey_count()`
    /// and [`RegistryError::CyclicStructure`] if the subkey is an ancestor.
    pub fn subkey_at(&self, index: usize) -> Result<RegistryKey<'a>> {
        let count = self.subkey_count();
        if index >= count {
            return Err(RegistryError::IndexOutOfRange { index, count });
        }

        let list_offset = self.node.subkey_list_offset;
        let mut remaining = index;
        let flow = self
            .hive
            .walk_subkey_lists(list_offset, &mut Vec::new(), &mut |list: &SubkeyList| {
                match list.offset_at(remaining) {
                    Some(offset) => Ok(ControlFlow::Break(offset)),
                    None => {
                        remaining -= list.len();
                        Ok(ControlFlow::Continue(()))
                    }
                }
            })?;

        match flow {
            ControlFlow::Break(offset) => self.child(offset),
            ControlFlow::Continue(()) => Err(RegistryError::decode(
                list_offset,
                format!("subkey lists hold fewer than the {} declared entries", count),
            )),
        }
    }

    /// Finds a direct subkey by name (case-insensitive).
    ///
    /// Hash-leaf and fast-leaf lists are pre-filtered by their stored hash or
    /// name hint before names are compared.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no subkey matches. If a
    /// candidate could not be read, that error is returned instead.
    pub fn subkey_by_name(&self, name: &str) -> Result<RegistryKey<'a>> {
        if !self.node.has_subkeys() {
            return Err(RegistryError::not_found("key", name));
        }

        let mut deferred: Option<RegistryError> = None;
        let flow = self.hive.walk_subkey_lists(
            self.node.subkey_list_offset,
            &mut Vec::new(),
            &mut |list: &SubkeyList| {
                for offset in list.candidates(name) {
                    match self.child(offset) {
                        Ok(child) if names_equal(&child.name_lossy(), name) => {
                            return Ok(ControlFlow::Break(offset));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            debug!(offset = %format!("{:#x}", offset), error = %e, "Skipping unreadable subkey");
                            deferred.get_or_insert(e);
                        }
                    }
                }
                Ok(ControlFlow::Continue(()))
            },
        )?;

        match flow {
            ControlFlow::Break(offset) => self.child(offset),
            ControlFlow::Continue(()) => {
                Err(deferred.unwrap_or_else(|| RegistryError::not_found("key", name)))
            }
        }
    }

    /// Returns all direct subkeys in stored order.
    pub fn subkeys(&self) -> Result<Vec<RegistryKey<'a>>> {
        if !self.node.has_subkeys() {
            return Ok(Vec::new());
        }

        let mut offsets = Vec::new();
        self.hive.walk_subkey_lists(
            self.node.subkey_list_offset,
            &mut Vec::new(),
            &mut |list: &SubkeyList| {
                offsets.extend(list.offsets_iter());
                Ok(ControlFlow::Continue(()))
            },
        )?;

        if offsets.len() != self.subkey_count() {
            warn!(
                offset = %format!("{:#x}", self.offset()),
                declared = self.subkey_count(),
                found = offsets.len(),
                "Subkey count does not match subkey lists"
            );
        }

        offsets.into_iter().map(|offset| self.child(offset)).collect()
    }

    /// Builds a child key, refusing offsets already on the path from the root.
    fn child(&self, offset: u32) -> Result<RegistryKey<'a>> {
        if offset == self.offset() || self.ancestors.contains(&offset) {
            return Err(RegistryError::CyclicStructure { offset });
        }

        let node = self.hive.key_node(offset)?;
        let mut ancestors = Vec::with_capacity(self.ancestors.len() + 1);
        ancestors.extend_from_slice(&self.ancestors);
        ancestors.push(self.offset());

        Ok(RegistryKey {
            hive: self.hive,
            node,
            ancestors,
        })
    }

    /// Returns the number of values.
    pub fn value_count(&self) -> usize {
        if self.node.has_values() {
            self.node.value_count as usize
        } else {
            0
        }
    }

    /// Reads the offsets in this key's value list.
    fn value_offsets(&self) -> Result<Vec<u32>> {
        if !self.node.has_values() {
            return Ok(Vec::new());
        }
        let list = self.hive.resolve_cell(self.node.value_list_offset)?;
        read_offset_list(&list, self.value_count())
    }

    fn value_from_offset(&self, offset: u32) -> Result<RegistryValue<'a>> {
        let value_key = ValueKey::parse(&self.hive.resolve_cell(offset)?)?;
        Ok(RegistryValue {
            hive: self.hive,
            value_key,
        })
    }

    /// Returns the value at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IndexOutOfRange`] if `index >= value_count()`.
    pub fn value_at(&self, index: usize) -> Result<RegistryValue<'a>> {
        let count = self.value_count();
        if index >= count {
            return Err(RegistryError::IndexOutOfRange { index, count });
        }
        let offsets = self.value_offsets()?;
        self.value_from_offset(offsets[index])
    }

    /// Gets a specific value by name (case-insensitive).
    ///
    /// The empty name selects the default value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no value matches. If a value
    /// could not be read, that error is returned instead.
    pub fn value_by_name(&self, name: &str) -> Result<RegistryValue<'a>> {
        let mut deferred: Option<RegistryError> = None;
        for offset in self.value_offsets()? {
            match self.value_from_offset(offset) {
                Ok(value) if names_equal(&value.name_lossy(), name) => return Ok(value),
                Ok(_) => {}
                Err(e) => {
                    debug!(offset = %format!("{:#x}", offset), error = %e, "Skipping unreadable value");
                    deferred.get_or_insert(e);
                }
            }
        }
        Err(deferred.unwrap_or_else(|| RegistryError::not_found("value", name)))
    }

    /// Returns all values in stored order.
    pub fn values(&self) -> Result<Vec<RegistryValue<'a>>> {
        self.value_offsets()?
            .into_iter()
            .map(|offset| self.value_from_offset(offset))
            .collect()
    }
}

/// A registry value.
#[derive(Debug, Clone)]
pub struct RegistryValue<'a> {
    hive: &'a Hive,
    value_key: ValueKey,
}

impl<'a> RegistryValue<'a> {
    /// Returns the parsed value key.
    pub fn value_key(&self) -> &ValueKey {
        &self.value_key
    }

    /// Returns the value name; empty for the default value.
    pub fn name(&self) -> Result<String> {
        self.value_key.name(self.hive.options.names)
    }

    /// Returns the value name, replacing malformed characters.
    pub fn name_lossy(&self) -> String {
        self.value_key.name_lossy()
    }

    /// Returns the value data type.
    pub fn value_type(&self) -> ValueType {
        self.value_key.data_type
    }

    /// Returns the declared data length.
    pub fn data_length(&self) -> u32 {
        self.value_key.data_length
    }

    /// Returns the raw value data as bytes.
    pub fn raw_data(&self) -> Result<Vec<u8>> {
        self.hive.read_value_data(&self.value_key)
    }

    /// Returns the parsed value data.
    pub fn data(&self) -> Result<ValueData> {
        ValueData::parse(&self.raw_data()?, self.value_type(), self.value_key.offset)
    }

    fn expect_type(&self, accepted: &[ValueType], expected: &str) -> Result<()> {
        if accepted.contains(&self.value_type()) {
            Ok(())
        } else {
            Err(RegistryError::type_mismatch(expected, self.value_type().name()))
        }
    }

    /// Returns a `REG_SZ`, `REG_EXPAND_SZ` or `REG_LINK` value as a string.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TypeMismatch`] for other types and
    /// [`RegistryError::DecodeError`] for malformed UTF-16.
    pub fn as_string(&self) -> Result<String> {
        self.expect_type(
            &[ValueType::String, ValueType::ExpandString, ValueType::Link],
            "REG_SZ, REG_EXPAND_SZ or REG_LINK",
        )?;
        match self.data()? {
            ValueData::String(s) | ValueData::ExpandString(s) | ValueData::Link(s) => Ok(s),
            other => Err(RegistryError::type_mismatch("string", other.describe())),
        }
    }

    /// Returns a `REG_MULTI_SZ` value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DecodeError`] if the payload does not end
    /// with the empty-string terminator.
    pub fn as_multi_string(&self) -> Result<MultiString> {
        self.expect_type(&[ValueType::MultiString], "REG_MULTI_SZ")?;
        MultiString::decode(&self.raw_data()?, self.value_key.offset)
    }

    /// Returns a `REG_BINARY` value.
    pub fn as_binary(&self) -> Result<Vec<u8>> {
        self.expect_type(&[ValueType::Binary], "REG_BINARY")?;
        self.raw_data()
    }

    /// Returns a `REG_DWORD` or `REG_DWORD_BIG_ENDIAN` value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TypeMismatch`] for other types or a payload
    /// that is not exactly 4 bytes.
    pub fn as_u32(&self) -> Result<u32> {
        self.expect_type(
            &[ValueType::Dword, ValueType::DwordBigEndian],
            "REG_DWORD or REG_DWORD_BIG_ENDIAN",
        )?;
        match self.data()? {
            ValueData::Dword(d) | ValueData::DwordBigEndian(d) => Ok(d),
            other => Err(RegistryError::type_mismatch("32-bit integer", other.describe())),
        }
    }

    /// Returns a `REG_QWORD` value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TypeMismatch`] for other types or a payload
    /// that is not exactly 8 bytes.
    pub fn as_u64(&self) -> Result<u64> {
        self.expect_type(&[ValueType::Qword], "REG_QWORD")?;
        match self.data()? {
            ValueData::Qword(q) => Ok(q),
            other => Err(RegistryError::type_mismatch("64-bit integer", other.describe())),
        }
    }

    /// Renders the value for display. See [`ValueData::describe`].
    pub fn describe(&self) -> Result<String> {
        Ok(self.data()?.describe())
    }
}
