//! Identifiers and magnet URI validation
//!
//! Identifiers are opaque to the orchestrator; only the librqbit-backed source
//! needs to know they are magnet URIs, and uses [`MagnetLink::parse`] to reject
//! malformed ones before touching the session.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAGNET_PREFIX: &str = "magnet:?";
const BTIH_PREFIX: &str = "urn:btih:";

/// An opaque token naming a resource to resolve (one input line, trimmed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    #[inline]
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identifier {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MagnetError {
    #[error("not a magnet URI (expected `magnet:?` prefix)")]
    MissingScheme,
    #[error("magnet URI has no `xt=urn:btih:` parameter")]
    MissingInfoHash,
    #[error("invalid info hash `{0}`")]
    InvalidInfoHash(String),
    #[error("invalid percent-encoding in `{0}`")]
    InvalidEncoding(String),
}

/// The parts of a BitTorrent v1 magnet URI this tool cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    /// Info hash as given in the URI (40 hex or 32 base32 characters)
    pub info_hash: String,
    /// Optional `dn` parameter
    pub display_name: Option<String>,
    /// Every `tr` parameter, in order
    pub trackers: Vec<String>,
}

impl MagnetLink {
    /// Parse a `magnet:?xt=urn:btih:<hash>&dn=..&tr=..` URI
    pub fn parse(uri: &str) -> Result<Self, MagnetError> {
        let query = uri
            .trim()
            .strip_prefix(MAGNET_PREFIX)
            .ok_or(MagnetError::MissingScheme)?;

        let mut info_hash = None;
        let mut display_name = None;
        let mut trackers = Vec::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "xt" => {
                    if let Some(hash) = value.strip_prefix(BTIH_PREFIX) {
                        if !is_valid_info_hash(hash) {
                            return Err(MagnetError::InvalidInfoHash(hash.to_owned()));
                        }
                        info_hash = Some(hash.to_owned());
                    }
                }
                "dn" => display_name = Some(percent_decode(value)?),
                "tr" => trackers.push(percent_decode(value)?),
                _ => {}
            }
        }

        Ok(Self {
            info_hash: info_hash.ok_or(MagnetError::MissingInfoHash)?,
            display_name,
            trackers,
        })
    }
}

fn is_valid_info_hash(hash: &str) -> bool {
    match hash.len() {
        40 => hash.bytes().all(|b| b.is_ascii_hexdigit()),
        32 => hash
            .bytes()
            .all(|b| b.is_ascii_alphabetic() || (b'2'..=b'7').contains(&b)),
        _ => false,
    }
}

fn percent_decode(value: &str) -> Result<String, MagnetError> {
    let invalid = || MagnetError::InvalidEncoding(value.to_owned());
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let (hi, lo) = match bytes.get(i + 1..i + 3) {
                    Some(&[hi, lo]) => (hex_value(hi), hex_value(lo)),
                    _ => return Err(invalid()),
                };
                out.push((hi.ok_or_else(invalid)? << 4) | lo.ok_or_else(invalid)?);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
