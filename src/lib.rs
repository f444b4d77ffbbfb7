//! # Windows Registry Hive Reader
//!
//! A read-only, memory-mapped decoder for Windows registry hive files
//! (`regf`): keys, values and their typed data, with path-based lookup.
//!
//! ## Features
//!
//! - **Memory-mapped input**: hives are mapped with `memmap2` and decoded lazily
//! - **Bounded cells**: every cell is checked against the bin that holds it
//! - **Cycle-safe traversal**: subkeys and index roots that point back up
//!   the tree are reported instead of followed
//! - **Hash-filtered lookups**: `lh`/`lf` hints narrow name lookups
//! - **Typed values**: strings, multi-strings, binary, 32/64-bit integers,
//!   big data (`db`) records
//!
//! ## Layout
//!
//! A hive is a 4KB base block followed by hive bins. Each bin holds
//! size-prefixed cells, addressed by their offset from the first bin:
//!
//! ```text
//! 0x0000  base block   "regf", sequence numbers, version, root cell, checksum
//! 0x1000  hbin         "hbin", own offset, size (multiple of 0x1000)
//! 0x1020    cell       i32 size (negative = allocated), then payload:
//!                        nk  key node         vk  value key
//!                        lf/lh/li/ri  subkey lists
//!                        db  big data header, raw data, offset lists
//! ```
//!
//! [`header`], [`hbin`] and [`cell`] decode the framing; [`key`],
//! [`subkey_list`], [`value`] and [`bigdata`] decode records; [`hive`] ties
//! them into a tree and [`navigator`] adds path lookup.
//!
//! ## Examples
//!
//! ### Basic Usage
//!
//! ```no_run
//! use regf_reader::Hive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hive = Hive::open("SYSTEM")?;
//!
//! let root = hive.root_key()?;
//! println!("Root key: {}", root.name()?);
//!
//! for subkey in root.subkeys()? {
//!     println!("  Subkey: {}", subkey.name()?);
//! }
//!
//! for value in root.values()? {
//!     println!("  Value: {} = {}", value.name()?, value.describe()?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Accessing Specific Values
//!
//! ```no_run
//! use regf_reader::{Hive, HiveOptions, ChecksumPolicy, ValueData};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = HiveOptions::default().checksum(ChecksumPolicy::Strict);
//! let hive = Hive::open_with_options("SOFTWARE", options)?;
//!
//! let value = hive.value_by_path("Microsoft\\Windows NT\\CurrentVersion\\ProductName")?;
//! match value.data()? {
//!     ValueData::String(s) => println!("Product: {}", s),
//!     other => println!("Unexpected: {}", other),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bigdata;
pub mod cell;
pub mod config;
pub mod error;
pub mod hbin;
pub mod header;
pub mod hive;
pub mod key;
pub mod navigator;
pub mod reader;
pub mod subkey_list;
pub mod utils;
pub mod value;

// Re-export main types for convenience
pub use cell::{Cell, CellType, KeyNodeFlags, ValueType};
pub use config::{ChecksumPolicy, HiveOptions, NamePolicy};
pub use error::{ErrorKind, RegistryError, Result};
pub use hbin::{BinMap, HbinHeader};
pub use header::BaseBlock;
pub use hive::{HbinIterator, Hive, RegistryKey, RegistryValue};
pub use key::KeyNode;
pub use reader::ByteReader;
pub use subkey_list::{SubkeyList, SubkeyListEntry, SubkeyListType};
pub use value::{MultiString, ValueData, ValueKey};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
