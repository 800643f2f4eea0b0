//! Error types and handling for the hotel climate pipeline

use thiserror::Error;

use crate::center::EmptyInputError;
use crate::store::StoreError;
use crate::weather::WeatherServiceError;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum HotelClimateError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Center requested for a city without hotels
    #[error(transparent)]
    EmptyInput(#[from] EmptyInputError),

    /// Weather collection failure for one city
    #[error("Weather collection failed for {city} ({country}): {source}")]
    Weather {
        country: String,
        city: String,
        #[source]
        source: WeatherServiceError,
    },

    /// Record store errors
    #[error("Store error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    /// CSV export errors
    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// JSON export errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl HotelClimateError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Attach the failing city to a weather service error
    pub fn weather<C: Into<String>, N: Into<String>>(
        country: C,
        city: N,
        source: WeatherServiceError,
    ) -> Self {
        Self::Weather {
            country: country.into(),
            city: city.into(),
            source,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            HotelClimateError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            HotelClimateError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            HotelClimateError::EmptyInput(err) => err.to_string(),
            HotelClimateError::Weather { country, city, .. } => format!(
                "Unable to collect temperatures for {city} ({country}). Please check your weather API key and connection."
            ),
            HotelClimateError::Store { .. } => {
                "Stored data is inconsistent. You may need to start from an empty store.".to_string()
            }
            HotelClimateError::Csv { .. }
            | HotelClimateError::Json { .. }
            | HotelClimateError::Io { .. } => {
                "File operation failed. Please check paths and file permissions.".to_string()
            }
        }
    }
}
