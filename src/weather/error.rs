use std::time::Duration;

use thiserror::Error;

use crate::models::{DaySlot, SeriesError};

/// Failure of a data-bearing weather call; fatal for the city's series
#[derive(Error, Debug)]
pub enum WeatherServiceError {
    #[error("Weather request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),

    #[error("Weather {endpoint} endpoint returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("Malformed {endpoint} response: {message}")]
    Malformed {
        endpoint: &'static str,
        message: String,
    },

    #[error("{endpoint} response is missing '{field}'")]
    MissingField {
        endpoint: &'static str,
        field: &'static str,
    },

    #[error("No temperature samples for day {0}")]
    EmptyDay(DaySlot),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("Weather request timed out after {0:?}")]
    Timeout(Duration),
}
