use anyhow::{Context, Result};
use clap::Parser as _;
use magnet_probe::config::{Cli, ProbeConfig};
use magnet_probe::input::read_identifiers;
use magnet_probe::report::{build_reports, write_reports};
use magnet_probe::{Orchestrator, RqbitSource};
use std::io;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = ProbeConfig::from_cli(cli)?;
    let identifiers = read_identifiers(&config.magnets, &config.keywords)?;
    println!("Found {} magnets", identifiers.len());

    let source = RqbitSource::new(config.session_dir.clone()).await?;
    let mut orchestrator = Orchestrator::new(source, config.resolver);

    let outcome = run(&mut orchestrator, identifiers, &config).await;
    orchestrator.close().await;
    outcome
}

async fn run(
    orchestrator: &mut Orchestrator<RqbitSource>,
    identifiers: Vec<magnet_probe::Identifier>,
    config: &ProbeConfig,
) -> Result<()> {
    for identifier in identifiers {
        orchestrator.submit(identifier)?;
    }
    orchestrator.start()?;
    println!("Waiting for all requests to finish...");

    let results = orchestrator.await_all().await;
    let reports = build_reports(results, config.sort);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_reports(&mut out, &reports, config.format).context("Failed to write reports")?;

    if let Some(summary) = orchestrator.summary() {
        log::info!("{summary:?}");
    }
    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::ERROR
    };
    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    if verbose {
        // rqbit is chatty at info
        filter = filter.add_directive("librqbit=warn".parse()?);
    }
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    Ok(())
}
