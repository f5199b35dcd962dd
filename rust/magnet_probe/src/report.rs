//! Largest-file reports for resolved identifiers

use crate::magnet::Identifier;
use crate::metadata::{FileEntry, Metadata};
use crate::orchestrator::ResolutionResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// The file with the strictly largest size; the first one wins a tie.
/// `None` when the torrent lists no files.
#[must_use]
pub fn largest_file(metadata: &Metadata) -> Option<&FileEntry> {
    metadata.files.iter().fold(None, |best, file| match best {
        Some(best) if best.size >= file.size => Some(best),
        _ => Some(file),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestFile {
    pub path: String,
    /// Size in bytes
    pub size: u64,
}

impl LargestFile {
    /// Size in GiB (bytes / 1024^3)
    #[must_use]
    pub fn size_gib(&self) -> f64 {
        bytes_to_gib(self.size)
    }
}

/// One output record per resolved identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub identifier: Identifier,
    /// `None` when the torrent has no files
    pub largest: Option<LargestFile>,
}

impl Report {
    #[must_use]
    pub fn from_result(result: &ResolutionResult) -> Self {
        Self {
            identifier: result.identifier.clone(),
            largest: largest_file(&result.metadata).map(|file| LargestFile {
                path: file.path.clone(),
                size: file.size,
            }),
        }
    }

    fn size(&self) -> u64 {
        self.largest.as_ref().map_or(0, |l| l.size)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "* Magnet: {}", self.identifier)?;
        match &self.largest {
            Some(largest) => {
                writeln!(f, "* Largest file: {}", largest.path)?;
                writeln!(f, "* Largest file size: {:.2} GB", largest.size_gib())
            }
            None => writeln!(f, "* Largest file: (no files)"),
        }
    }
}

#[must_use]
pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GIB
}

/// Order in which reports are emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// As the lookups completed
    #[default]
    Completion,
    /// Largest file first; completion order among equal sizes
    Size,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Build reports for every result, in the requested order.
pub fn build_reports(results: &[ResolutionResult], order: SortOrder) -> Vec<Report> {
    let mut reports: Vec<Report> = results.iter().map(Report::from_result).collect();
    if order == SortOrder::Size {
        reports.sort_by(|a, b| b.size().cmp(&a.size()));
    }
    reports
}

/// Write reports to `out`, separated by a blank line in text mode.
pub fn write_reports<W: Write>(
    out: &mut W,
    reports: &[Report],
    format: OutputFormat,
) -> io::Result<()> {
    for report in reports {
        match format {
            OutputFormat::Text => writeln!(out, "{report}")?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, report)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, files: &[(&str, u64)]) -> ResolutionResult {
        ResolutionResult {
            identifier: Identifier::from(id),
            metadata: Metadata::from_files(files.iter().copied()),
        }
    }

    #[test]
    fn test_scenario_c_largest_file() {
        let meta = Metadata::from_files([("a.mkv", 500_000_000), ("b.srt", 2_000)]);
        let largest = largest_file(&meta).unwrap();
        assert_eq!(largest.path, "a.mkv");
        assert!((bytes_to_gib(largest.size) - 0.4657).abs() < 1e-3);
        assert_eq!(format!("{:.2}", bytes_to_gib(largest.size)), "0.47");
    }

    #[test]
    fn test_tie_keeps_first() {
        let meta = Metadata::from_files([("small", 1), ("first", 10), ("second", 10)]);
        assert_eq!(largest_file(&meta).unwrap().path, "first");
    }

    #[test]
    fn test_zero_files_is_none() {
        let meta = Metadata::default();
        assert!(largest_file(&meta).is_none());

        let report = Report::from_result(&result("magnet:empty", &[]));
        assert_eq!(report.largest, None);
        assert_eq!(
            report.to_string(),
            "* Magnet: magnet:empty\n* Largest file: (no files)\n"
        );
    }

    #[test]
    fn test_text_rendering() {
        let report = Report::from_result(&result("magnet:a", &[("x/movie.mkv", 3 * 1024 * 1024 * 1024)]));
        let mut out = Vec::new();
        write_reports(&mut out, &[report], OutputFormat::Text).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "* Magnet: magnet:a\n* Largest file: x/movie.mkv\n* Largest file size: 3.00 GB\n\n"
        );
    }

    #[test]
    fn test_json_rendering() {
        let report = Report::from_result(&result("magnet:a", &[("f", 7)]));
        let mut out = Vec::new();
        write_reports(&mut out, &[report.clone()], OutputFormat::Json).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with('\n'));
        let parsed: Report = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_sort_by_size_is_stable() {
        let results = [
            result("small", &[("s", 1)]),
            result("big", &[("b", 100)]),
            result("empty", &[]),
            result("also-small", &[("s2", 1)]),
        ];
        let order: Vec<_> = build_reports(&results, SortOrder::Size)
            .into_iter()
            .map(|r| r.identifier.to_string())
            .collect();
        assert_eq!(order, ["big", "small", "also-small", "empty"]);

        let order: Vec<_> = build_reports(&results, SortOrder::Completion)
            .into_iter()
            .map(|r| r.identifier.to_string())
            .collect();
        assert_eq!(order, ["small", "big", "empty", "also-small"]);
    }
}
