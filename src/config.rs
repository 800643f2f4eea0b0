//! Configuration management for the hotel climate pipeline
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::HotelClimateError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Hard ceiling on workers per pipeline stage
pub const MAX_WORKERS: usize = 9;

/// Hard ceiling imposed by the geocoding provider quota
pub const MAX_GEOCODING_REQUESTS_PER_SECOND: u32 = 20;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelClimateConfig {
    /// Reverse geocoding service settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Weather service settings
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Pipeline execution settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reverse geocoding configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// MapQuest API key
    pub api_key: Option<String>,
    /// Base URL for the geocoding API
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Shared request ceiling across all workers
    #[serde(default = "default_geocoding_rate")]
    pub requests_per_second: u32,
    /// Retries after the first failed attempt
    #[serde(default = "default_geocoding_max_retries")]
    pub max_retries: u32,
    /// Timeout per attempt in milliseconds
    #[serde(default = "default_geocoding_timeout_ms")]
    pub timeout_ms: u64,
    /// Base delay before a retry in milliseconds
    #[serde(default = "default_geocoding_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: Option<String>,
    /// Base URL for weather API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_weather_max_retries")]
    pub max_retries: u32,
}

/// What to do when one city's weather collection fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CityFailurePolicy {
    /// Leave the city out of the analytics and carry on
    #[default]
    Skip,
    /// Stop the run with the first failure
    Abort,
}

/// Pipeline execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Concurrent workers per stage, capped at `MAX_WORKERS`
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub on_city_failure: CityFailurePolicy,
    /// Records per exported hotel CSV file
    #[serde(default = "default_csv_records_per_file")]
    pub csv_records_per_file: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_geocoding_base_url() -> String {
    "https://www.mapquestapi.com/geocoding/v1".to_string()
}

fn default_geocoding_rate() -> u32 {
    MAX_GEOCODING_REQUESTS_PER_SECOND
}

fn default_geocoding_max_retries() -> u32 {
    3
}

fn default_geocoding_timeout_ms() -> u64 {
    1000
}

fn default_geocoding_backoff_ms() -> u64 {
    250
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_timeout() -> u32 {
    10
}

fn default_weather_max_retries() -> u32 {
    2
}

fn default_workers() -> usize {
    4
}

fn default_csv_records_per_file() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geocoding_base_url(),
            requests_per_second: default_geocoding_rate(),
            max_retries: default_geocoding_max_retries(),
            timeout_ms: default_geocoding_timeout_ms(),
            retry_backoff_ms: default_geocoding_backoff_ms(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_seconds: default_weather_timeout(),
            max_retries: default_weather_max_retries(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            on_city_failure: CityFailurePolicy::default(),
            csv_records_per_file: default_csv_records_per_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for HotelClimateConfig {
    fn default() -> Self {
        Self {
            geocoding: GeocodingConfig::default(),
            weather: WeatherConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Clamp a requested worker count into 1..=`MAX_WORKERS`
#[must_use]
pub fn cap_workers(requested: usize) -> usize {
    requested.clamp(1, MAX_WORKERS)
}

impl HotelClimateConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides with HOTELCLIMATE_ prefix
        builder = builder.add_source(
            Environment::with_prefix("HOTELCLIMATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: HotelClimateConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hotel-climate").join("config.toml"))
    }

    /// Apply default values to missing or out-of-range fields
    pub fn apply_defaults(&mut self) {
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.timeout_ms == 0 {
            self.geocoding.timeout_ms = default_geocoding_timeout_ms();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.pipeline.csv_records_per_file == 0 {
            self.pipeline.csv_records_per_file = default_csv_records_per_file();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        self.set_workers(self.pipeline.workers);
    }

    /// Set the worker count, capping it at `MAX_WORKERS`
    pub fn set_workers(&mut self, requested: usize) {
        let capped = cap_workers(requested);
        if capped != requested {
            warn!(
                "Requested {} workers; using {} (allowed range 1..={})",
                requested, capped, MAX_WORKERS
            );
        }
        self.pipeline.workers = capped;
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys when present
    pub fn validate_api_keys(&self) -> Result<()> {
        for (name, key) in [
            ("Geocoding", &self.geocoding.api_key),
            ("Weather", &self.weather.api_key),
        ] {
            if let Some(api_key) = key {
                if api_key.trim().is_empty() {
                    return Err(HotelClimateError::config(format!(
                        "{name} API key cannot be empty if provided. Either remove it or provide a valid key."
                    ))
                    .into());
                }

                if api_key.len() > 100 {
                    return Err(HotelClimateError::config(format!(
                        "{name} API key appears to be invalid (too long). Please check your API key."
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.geocoding.requests_per_second == 0
            || self.geocoding.requests_per_second > MAX_GEOCODING_REQUESTS_PER_SECOND
        {
            return Err(HotelClimateError::config(format!(
                "Geocoding requests per second must be between 1 and {MAX_GEOCODING_REQUESTS_PER_SECOND}"
            ))
            .into());
        }

        if self.geocoding.max_retries > 10 {
            return Err(
                HotelClimateError::config("Geocoding max retries cannot exceed 10").into(),
            );
        }

        if self.weather.timeout_seconds > 300 {
            return Err(
                HotelClimateError::config("Weather API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.weather.max_retries > 10 {
            return Err(
                HotelClimateError::config("Weather API max retries cannot exceed 10").into(),
            );
        }

        if self.pipeline.workers == 0 || self.pipeline.workers > MAX_WORKERS {
            return Err(HotelClimateError::config(format!(
                "Workers must be between 1 and {MAX_WORKERS}"
            ))
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(HotelClimateError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(HotelClimateError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Geocoding", &self.geocoding.base_url),
            ("Weather", &self.weather.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(HotelClimateError::config(format!(
                    "{name} API base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
