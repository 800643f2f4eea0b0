use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use hotel_climate::config::CityFailurePolicy;
use hotel_climate::telemetry::init_logging;
use hotel_climate::{
    HotelClimateConfig, HotelClimateError, MapQuestClient, MemoryStore, OpenWeatherClient,
    Pipeline, PipelineReport, PipelineSettings,
};

/// Enrich hotel records with addresses and collect major-city temperatures
#[derive(Debug, Parser)]
#[command(name = "hotel-climate", version, about)]
struct Cli {
    /// Zip archive, CSV file or directory of CSV files with hotel records
    source: PathBuf,
    /// Directory receiving the per-city CSVs and the analytics document
    output: PathBuf,
    /// Worker count per stage (capped at 9)
    #[arg(short, long)]
    threads: Option<usize>,
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Abort on the first city whose weather cannot be collected
    #[arg(long)]
    fail_fast: bool,
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<HotelClimateConfig> {
    let mut config = HotelClimateConfig::load_from_path(cli.config.clone())?;
    if let Some(threads) = cli.threads {
        config.set_workers(threads);
    }
    if cli.fail_fast {
        config.pipeline.on_city_failure = CityFailurePolicy::Abort;
    }
    Ok(config)
}

fn print_summary(report: &PipelineReport) {
    println!(
        "Major cities: {} | addresses resolved: {} | lookups exhausted: {}",
        report.major_cities.len(),
        report.enrichment.resolved_count(),
        report.enrichment.exhausted_hotels().len()
    );
    for failure in &report.failed_cities {
        println!(
            "  skipped {} ({}): {}",
            failure.city, failure.country, failure.error
        );
    }
    println!("CSV files written: {}", report.csv_files_written);
    if let Some(path) = &report.analytics_path {
        println!("Analytics: {}", path.display());
    }
}

async fn run(cli: Cli, config: HotelClimateConfig) -> Result<PipelineReport> {
    let geocoder = MapQuestClient::new(&config.geocoding)?;
    let weather = OpenWeatherClient::new(&config.weather)?;
    let settings = PipelineSettings::from_config(&config);

    info!(
        "Starting run with {} workers, source {}",
        settings.workers,
        cli.source.display()
    );
    let mut pipeline = Pipeline::new(MemoryStore::new(), geocoder, weather, settings);
    pipeline
        .run(&cli.source, &cli.output)
        .await
        .map_err(|err: HotelClimateError| {
            error!("{}", err);
            let message = err.user_message();
            anyhow::Error::new(err).context(message)
        })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config.logging, cli.verbose) {
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(cli, config).await {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_positionals_and_threads() {
        let cli = Cli::try_parse_from(["hotel-climate", "data", "out", "--threads", "12", "-v"]).unwrap();
        assert_eq!(cli.source, PathBuf::from("data"));
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(cli.threads, Some(12));
        assert!(cli.verbose);
        assert!(!cli.fail_fast);
    }

    #[test]
    fn test_cli_requires_output() {
        assert!(Cli::try_parse_from(["hotel-climate", "data"]).is_err());
    }
}
