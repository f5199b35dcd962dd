//! Command line surface and validated run configuration

use crate::keywords::{EmptyKeywordsError, KeywordSet};
use crate::orchestrator::{ResolverConfig, DEFAULT_TIMEOUT};
use crate::report::{OutputFormat, SortOrder};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Directory name used under the system temp dir when `--session-dir` is not given
pub const DEFAULT_SESSION_DIR_NAME: &str = "magnet-probe-session";

#[derive(Parser, Debug, Clone)]
#[command(name = "magnet-probe")]
#[command(about = "Find the largest file in each magnet that matches all keywords", long_about = None)]
#[command(version)]
pub struct Cli {
    /// File that contains the list of magnets to search, one per line
    #[arg(long, env = "MAGNET_PROBE_MAGNETS")]
    pub magnets: Option<PathBuf>,

    /// Space-separated keywords; a magnet must contain all of them (case-insensitive)
    #[arg(long, env = "MAGNET_PROBE_KEYWORDS")]
    pub keywords: Option<String>,

    /// Seconds to wait for each magnet's metadata
    #[arg(long, env = "MAGNET_PROBE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Log progress and failures
    #[arg(short, long, env = "MAGNET_PROBE_VERBOSE")]
    pub verbose: bool,

    /// Cap on concurrent lookups (unbounded when omitted)
    #[arg(long, env = "MAGNET_PROBE_MAX_CONCURRENT")]
    pub max_concurrent: Option<usize>,

    /// Scratch directory for the torrent session
    #[arg(long, env = "MAGNET_PROBE_SESSION_DIR")]
    pub session_dir: Option<PathBuf>,

    #[arg(long, env = "MAGNET_PROBE_FORMAT", value_enum, default_value_t = FormatArg::Text)]
    pub format: FormatArg,

    #[arg(long, env = "MAGNET_PROBE_SORT", value_enum, default_value_t = SortArg::Completion)]
    pub sort: SortArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Text,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    /// Completion order
    Completion,
    /// Largest file first
    Size,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

impl From<SortArg> for SortOrder {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Completion => SortOrder::Completion,
            SortArg::Size => SortOrder::Size,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("You need to pass both a magnet file and a keyword list")]
    MissingMagnets,
    #[error("You need to pass both a magnet file and a keyword list")]
    MissingKeywords(#[from] EmptyKeywordsError),
}

/// Everything a run needs, validated
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub magnets: PathBuf,
    pub keywords: KeywordSet,
    pub resolver: ResolverConfig,
    pub verbose: bool,
    pub session_dir: PathBuf,
    pub format: OutputFormat,
    pub sort: SortOrder,
}

impl ProbeConfig {
    /// # Errors
    /// Fails when the magnet file path or the keyword list is missing or empty.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let magnets = cli
            .magnets
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ConfigError::MissingMagnets)?;
        let keywords = KeywordSet::parse(cli.keywords.as_deref().unwrap_or_default())?;

        let resolver = ResolverConfig::default()
            .with_timeout(Duration::from_secs(cli.timeout))
            .with_max_concurrent(cli.max_concurrent);

        Ok(Self {
            magnets,
            keywords,
            resolver,
            verbose: cli.verbose,
            session_dir: cli
                .session_dir
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_SESSION_DIR_NAME)),
            format: cli.format.into(),
            sort: cli.sort.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ProbeConfig, ConfigError> {
        let cli = Cli::try_parse_from(std::iter::once("magnet-probe").chain(args.iter().copied()))
            .expect("arguments should parse");
        ProbeConfig::from_cli(cli)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--magnets", "list.txt", "--keywords", "a b"]).unwrap();
        assert_eq!(config.resolver.timeout, Duration::from_secs(120));
        assert_eq!(config.resolver.max_concurrent, None);
        assert_eq!(config.keywords.len(), 2);
        assert!(!config.verbose);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.sort, SortOrder::Completion);
        assert!(config.session_dir.ends_with(DEFAULT_SESSION_DIR_NAME));
    }

    #[test]
    fn test_all_flags() {
        let config = parse(&[
            "--magnets",
            "list.txt",
            "--keywords",
            "movie",
            "--timeout",
            "5",
            "--verbose",
            "--max-concurrent",
            "8",
            "--session-dir",
            "/tmp/s",
            "--format",
            "json",
            "--sort",
            "size",
        ])
        .unwrap();
        assert_eq!(config.resolver.timeout, Duration::from_secs(5));
        assert_eq!(config.resolver.max_concurrent, Some(8));
        assert!(config.verbose);
        assert_eq!(config.session_dir, PathBuf::from("/tmp/s"));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.sort, SortOrder::Size);
    }

    #[test]
    fn test_missing_inputs_are_rejected() {
        assert_eq!(
            parse(&["--keywords", "a"]).unwrap_err(),
            ConfigError::MissingMagnets
        );
        assert!(matches!(
            parse(&["--magnets", "list.txt"]),
            Err(ConfigError::MissingKeywords(_))
        ));
        assert!(matches!(
            parse(&["--magnets", "list.txt", "--keywords", "  "]),
            Err(ConfigError::MissingKeywords(_))
        ));
    }

    #[test]
    fn test_help_shows_no_empty_defaults() {
        use clap::CommandFactory as _;

        let help = Cli::command().render_help().to_string();
        assert!(help.contains("--magnets"));
        assert!(help.contains("--keywords"));
        assert!(!help.contains("[default: ]"));
    }
}
