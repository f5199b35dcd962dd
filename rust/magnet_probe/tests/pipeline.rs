use magnet_probe::input::read_identifiers;
use magnet_probe::report::{build_reports, write_reports, OutputFormat, SortOrder};
use magnet_probe::{
    Identifier, KeywordSet, Metadata, MetadataSource, Orchestrator, PendingMetadata,
    ResolverConfig, SourceError,
};
use std::collections::HashMap;
use std::io::Write as _;
use std::time::Duration;

/// Answers known identifiers immediately and never answers the rest
struct FixedSource(HashMap<String, Metadata>);

impl MetadataSource for FixedSource {
    fn begin_resolve(&mut self, identifier: &Identifier) -> Result<PendingMetadata, SourceError> {
        Ok(match self.0.get(identifier.as_str()) {
            Some(metadata) => PendingMetadata::ready_with(metadata.clone()),
            None => PendingMetadata::never(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn keyword_filtered_file_to_text_report() {
    let mut list = tempfile::NamedTempFile::new().unwrap();
    writeln!(list, "magnet:a (movie)").unwrap();
    writeln!(list, "magnet:b (other)").unwrap();
    write!(list, "  magnet:c (MOVIE extended)  ").unwrap();

    let keywords = KeywordSet::parse("movie").unwrap();
    let identifiers = read_identifiers(list.path(), &keywords).unwrap();
    assert_eq!(
        identifiers,
        vec![
            Identifier::from("magnet:a (movie)"),
            Identifier::from("magnet:c (MOVIE extended)")
        ]
    );

    let source = FixedSource(HashMap::from([
        (
            "magnet:a (movie)".to_owned(),
            Metadata::from_files([("a.mkv", 500_000_000), ("b.srt", 2_000)]),
        ),
        ("magnet:b (other)".to_owned(), Metadata::from_files([("x", 1)])),
    ]));
    let mut orchestrator = Orchestrator::new(
        source,
        ResolverConfig::default().with_timeout(Duration::from_secs(1)),
    );
    for identifier in identifiers {
        orchestrator.submit(identifier).unwrap();
    }
    assert_eq!(orchestrator.start().unwrap(), 2);

    let results = orchestrator.await_all().await;
    let reports = build_reports(results, SortOrder::Completion);
    let mut out = Vec::new();
    write_reports(&mut out, &reports, OutputFormat::Text).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "* Magnet: magnet:a (movie)\n* Largest file: a.mkv\n* Largest file size: 0.47 GB\n\n"
    );

    let summary = orchestrator.summary().unwrap();
    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.timed_out, 1);
    orchestrator.close().await;
}

#[tokio::test]
async fn resolved_torrent_without_files_reports_no_file() {
    let source = FixedSource(HashMap::from([(
        "magnet:empty".to_owned(),
        Metadata::default(),
    )]));
    let mut orchestrator = Orchestrator::new(source, ResolverConfig::default());
    orchestrator.submit("magnet:empty").unwrap();
    orchestrator.start().unwrap();

    let reports = build_reports(orchestrator.await_all().await, SortOrder::Size);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].largest, None);
    assert!(reports[0].to_string().contains("(no files)"));
}
