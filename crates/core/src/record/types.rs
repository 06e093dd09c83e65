//! Types for torrent metadata records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a hex-encoded SHA-1 info hash.
pub const INFO_HASH_LEN: usize = 40;

/// A validated, lowercase hex info hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InfoHash(String);

impl InfoHash {
    /// Parse an info hash, accepting any case and surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, InfoHashError> {
        let trimmed = raw.trim();

        if trimmed.len() != INFO_HASH_LEN {
            return Err(InfoHashError::InvalidLength(trimmed.len()));
        }

        if let Some(c) = trimmed.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(InfoHashError::InvalidCharacter(c));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InfoHash {
    type Err = InfoHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InfoHash {
    type Error = InfoHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InfoHash> for String {
    fn from(hash: InfoHash) -> Self {
        hash.0
    }
}

impl AsRef<str> for InfoHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors for info hash parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InfoHashError {
    #[error("info hash must be {INFO_HASH_LEN} characters, got {0}")]
    InvalidLength(usize),

    #[error("info hash contains non-hex character {0:?}")]
    InvalidCharacter(char),
}

/// Metadata for a single torrent as reported by the upstream index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Info hash (lowercase hex).
    pub info_hash: InfoHash,
    /// Torrent name.
    pub name: String,
    /// Total size in bytes.
    pub size: u64,
    /// Age as reported upstream (e.g. "3 years").
    pub age: String,
    /// Files in upstream order.
    #[serde(default)]
    pub files: Vec<TorrentFile>,
}

/// A file within a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// File name as listed upstream.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
}
