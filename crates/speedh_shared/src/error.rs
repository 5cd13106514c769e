//! # Address Book Error Types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, parsing or persisting the address book.
#[derive(Error, Debug)]
pub enum BookError {
    /// The text is not valid TOML or not a `role -> chain -> address` table.
    #[error("malformed address book: {0}")]
    Malformed(#[from] toml::de::Error),

    /// A chain id key is not a non-negative integer.
    #[error("invalid chain id {key:?} under {role}")]
    InvalidChainId {
        /// Role table the key was found in.
        role: String,
        /// The offending key.
        key: String,
    },

    /// An address value is not 20 bytes of hex.
    #[error("invalid address {value:?} for {role} on chain {chain_id}")]
    InvalidAddress {
        /// Role table the value was found in.
        role: String,
        /// Chain the value was stored under.
        chain_id: u64,
        /// The offending value.
        value: String,
    },

    /// A role name outside the declared set was used where a declared role is required.
    #[error("unknown contract role: {0}")]
    UnknownRole(String),

    /// Reading or writing the book failed.
    #[error("address book I/O at {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The address dump could not be encoded.
    #[error("address dump encoding failed: {0}")]
    Dump(#[from] serde_json::Error),
}

/// Result type for address book operations.
pub type BookResult<T> = Result<T, BookError>;
