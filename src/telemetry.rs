//! Logging setup

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::LoggingConfig;

/// Default level when `RUST_LOG` is unset
fn default_level(config: &LoggingConfig, verbose: bool) -> Result<LevelFilter> {
    if verbose {
        return Ok(LevelFilter::DEBUG);
    }
    config
        .level
        .parse()
        .with_context(|| format!("Invalid log level '{}'", config.level))
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(config, verbose)?.into())
        .from_env()
        .context("Invalid RUST_LOG filter")?;
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format.as_str() {
        "json" => tracing::subscriber::set_global_default(builder.json().finish()),
        _ => tracing::subscriber::set_global_default(builder.pretty().finish()),
    }
    .context("Failed to install tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        let mut config = LoggingConfig::default();
        assert_eq!(default_level(&config, false).unwrap(), LevelFilter::INFO);
        assert_eq!(default_level(&config, true).unwrap(), LevelFilter::DEBUG);

        config.level = "warn".to_string();
        assert_eq!(default_level(&config, false).unwrap(), LevelFilter::WARN);

        config.level = "loud".to_string();
        assert!(default_level(&config, false).is_err());
    }
}
