//! Resolved torrent metadata
//!
//! The file listing of a resolved magnet, extracted from the raw info
//! dictionary that the session hands back.

use anyhow::{Context, Result};
use librqbit::{ByteBuf, torrent_from_bytes};
use serde::{Deserialize, Serialize};

/// A file in a resolved torrent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File index (0-based, in torrent order)
    pub index: usize,
    /// File path relative to torrent root, components joined with `/`
    pub path: String,
    /// File size in bytes
    pub size: u64,
}

/// File listing of a resolved torrent, in the order the torrent declares it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Torrent `name`, if present
    pub name: Option<String>,
    pub files: Vec<FileEntry>,
}

impl Metadata {
    /// Build metadata from `(path, size)` pairs, indexing them in order
    pub fn from_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, u64)>,
        P: Into<String>,
    {
        let files = files
            .into_iter()
            .enumerate()
            .map(|(index, (path, size))| FileEntry {
                index,
                path: path.into(),
                size,
            })
            .collect();
        Self { name: None, files }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse the file list out of raw .torrent bytes
    pub fn from_torrent_bytes(torrent_data: &[u8]) -> Result<Self> {
        let torrent_meta = torrent_from_bytes::<ByteBuf>(torrent_data).context("Failed to parse torrent")?;
        let info = &torrent_meta.info;

        let name = info
            .name
            .as_ref()
            .map(|n| String::from_utf8_lossy(n.0).to_string());

        let files = match info.files {
            Some(ref file_list) => file_list
                .iter()
                .enumerate()
                .map(|(index, file)| FileEntry {
                    index,
                    path: file
                        .path
                        .iter()
                        .map(|buf| String::from_utf8_lossy(buf.0).to_string())
                        .collect::<Vec<_>>()
                        .join("/"),
                    size: file.length,
                })
                .collect(),
            // single-file torrent: the name is the file
            None => vec![FileEntry {
                index: 0,
                path: name.clone().unwrap_or_default(),
                size: info.length.unwrap_or(0),
            }],
        };

        Ok(Self { name, files })
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}
