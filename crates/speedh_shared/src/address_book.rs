//! # Address Book
//!
//! Persisted `role -> chain id -> address` mapping. It is the only source of
//! truth for "is role X deployed on chain Y".
//!
//! ## Canonical Format
//!
//! ```text
//! # SpeedH contract address book.
//! # Roles in declaration order, extras alphabetically, chain ids ascending.
//!
//! [SpeedH_FixtureManager]
//! 40 = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//! 41 = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
//!
//! [SpeedH_HayToken]
//! ```
//!
//! The text is valid TOML. [`AddressBook::serialize`] is a pure function of
//! content: declared roles always appear (possibly empty) in declaration
//! order, then any extra role names alphabetically (compared by code point,
//! so `Z` sorts before `a`); chain ids ascend numerically; addresses are
//! EIP-55 checksummed. Role names that are not bare keys are written as TOML
//! basic strings with control characters escaped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{BookError, BookResult};
use crate::roles::ContractRole;

const HEADER: [&str; 2] = [
    "# SpeedH contract address book.",
    "# Roles in declaration order, extras alphabetically, chain ids ascending.",
];

/// Persisted mapping of role name to per-chain contract address.
///
/// A stored zero address is kept verbatim (so it round-trips) but resolves
/// exactly like a missing entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressBook {
    /// Role name -> chain id -> address. Never holds an empty inner map.
    entries: BTreeMap<String, BTreeMap<u64, Address>>,
}

impl AddressBook {
    /// Creates an empty address book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a declared role on a chain. Zero addresses resolve to `None`.
    #[must_use]
    pub fn resolve(&self, role: ContractRole, chain_id: u64) -> Option<Address> {
        self.resolve_name(role.name(), chain_id)
    }

    /// Resolves any role name, declared or extra.
    #[must_use]
    pub fn resolve_name(&self, name: &str, chain_id: u64) -> Option<Address> {
        self.stored(name, chain_id).filter(|address| !address.is_zero())
    }

    /// The raw stored value, zero addresses included.
    #[must_use]
    pub fn stored(&self, name: &str, chain_id: u64) -> Option<Address> {
        self.entries.get(name)?.get(&chain_id).copied()
    }

    /// Records `address` for `role` on `chain_id`, replacing any previous value.
    pub fn assign(&mut self, role: ContractRole, chain_id: u64, address: Address) {
        self.assign_name(role.name(), chain_id, address);
    }

    /// Records an address under an arbitrary role name.
    pub fn assign_name(&mut self, name: &str, chain_id: u64, address: Address) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .insert(chain_id, address);
    }

    /// Declared roles with no usable address on `chain_id`, in declaration order.
    #[must_use]
    pub fn missing_roles(&self, chain_id: u64) -> Vec<ContractRole> {
        ContractRole::ALL
            .into_iter()
            .filter(|role| self.resolve(*role, chain_id).is_none())
            .collect()
    }

    /// Every declared role resolved on `chain_id`, in declaration order.
    ///
    /// Returns `None` if any role is missing.
    #[must_use]
    pub fn resolve_all(&self, chain_id: u64) -> Option<Vec<(ContractRole, Address)>> {
        ContractRole::ALL
            .into_iter()
            .map(|role| self.resolve(role, chain_id).map(|address| (role, address)))
            .collect()
    }

    /// Role names in canonical order: declared roles first, then extras sorted.
    #[must_use]
    pub fn role_names(&self) -> Vec<&str> {
        let declared = ContractRole::ALL.iter().map(|role| role.name());
        let extras = self
            .entries
            .keys()
            .map(String::as_str)
            .filter(|name| ContractRole::from_name(name).is_none());
        declared.chain(extras).collect()
    }

    /// Number of `(role, chain)` entries stored, zero addresses included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Whether the book stores nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the canonical text form.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut lines: Vec<String> = HEADER.iter().map(|line| (*line).to_string()).collect();

        for name in self.role_names() {
            lines.push(String::new());
            lines.push(format!("[{}]", toml_key(name)));
            if let Some(chains) = self.entries.get(name) {
                for (chain_id, address) in chains {
                    lines.push(format!("{chain_id} = \"{}\"", address.to_checksum(None)));
                }
            }
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    /// Parses the canonical text form (any valid TOML of the same shape).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not TOML, a chain id is not an integer,
    /// or an address is not 20 bytes of hex.
    pub fn parse(text: &str) -> BookResult<Self> {
        let raw: BTreeMap<String, BTreeMap<String, String>> = toml::from_str(text)?;
        let mut book = Self::new();

        for (role, chains) in raw {
            for (key, value) in chains {
                let chain_id = key.trim().parse::<u64>().map_err(|_| BookError::InvalidChainId {
                    role: role.clone(),
                    key: key.clone(),
                })?;
                let address =
                    Address::from_str(value.trim()).map_err(|_| BookError::InvalidAddress {
                        role: role.clone(),
                        chain_id,
                        value: value.clone(),
                    })?;
                book.assign_name(&role, chain_id, address);
            }
        }

        Ok(book)
    }

    /// Loads the book from disk. A missing file is an empty book.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> BookResult<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(source) => Err(BookError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes the canonical form to `path` atomically (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written or renamed.
    pub fn persist(&self, path: &Path) -> BookResult<()> {
        write_atomic(path, &self.serialize())
    }

    /// Flat `{role: address}` JSON of the declared roles resolved on `chain_id`,
    /// in declaration order with four-space indentation.
    ///
    /// # Errors
    ///
    /// Returns an error only if JSON encoding fails.
    pub fn dump_json(&self, chain_id: u64) -> BookResult<String> {
        let dump = RoleDump(
            ContractRole::ALL
                .into_iter()
                .filter_map(|role| {
                    self.resolve(role, chain_id)
                        .map(|address| (role.name(), address.to_checksum(None)))
                })
                .collect(),
        );

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        dump.serialize(&mut ser)?;

        let mut text = String::from_utf8_lossy(&buf).into_owned();
        text.push('\n');
        Ok(text)
    }
}

/// Writes `contents` to `path` through a sibling temp file and a rename.
///
/// # Errors
///
/// Returns [`BookError::Io`] on any filesystem failure.
pub fn write_atomic(path: &Path, contents: &str) -> BookResult<()> {
    let io_err = |source| BookError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

/// Ordered `{role: address}` map for JSON encoding.
struct RoleDump<'a>(Vec<(&'a str, String)>);

impl Serialize for RoleDump<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, address) in &self.0 {
            map.serialize_entry(name, address)?;
        }
        map.end()
    }
}

/// Bare TOML key if possible, quoted otherwise.
fn toml_key(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        return name.to_string();
    }
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04X}", u32::from(c))),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
