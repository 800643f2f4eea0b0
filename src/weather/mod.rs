//! Weather collection
//!
//! Resolves a city's UTC offset, derives its local day boundaries and
//! gathers five historic days, today and four forecast days of
//! temperatures from an OpenWeatherMap-compatible service.

pub mod client;
pub mod collector;
pub mod error;
pub mod window;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::OpenWeatherClient;
pub use collector::{CityCollection, WeatherCollector};
pub use error::WeatherServiceError;
pub use window::{DayWindow, ForecastSplit};

/// One three-hourly forecast temperature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Unix timestamp (UTC)
    pub timestamp: i64,
    /// Degrees Celsius
    pub temperature: f64,
}

/// The three weather endpoints a city's series is built from
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// UTC offset in seconds at the given location
    async fn timezone_offset(&self, latitude: f64, longitude: f64)
    -> Result<i64, WeatherServiceError>;

    /// Hourly temperatures of the day containing `at`, up to `at`
    async fn historic_temperatures(
        &self,
        latitude: f64,
        longitude: f64,
        at: i64,
    ) -> Result<Vec<f64>, WeatherServiceError>;

    /// Three-hourly forecast starting now
    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<ForecastSample>, WeatherServiceError>;
}

#[async_trait]
impl<T: WeatherService + ?Sized> WeatherService for Arc<T> {
    async fn timezone_offset(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<i64, WeatherServiceError> {
        (**self).timezone_offset(latitude, longitude).await
    }

    async fn historic_temperatures(
        &self,
        latitude: f64,
        longitude: f64,
        at: i64,
    ) -> Result<Vec<f64>, WeatherServiceError> {
        (**self).historic_temperatures(latitude, longitude, at).await
    }

    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<ForecastSample>, WeatherServiceError> {
        (**self).forecast(latitude, longitude).await
    }
}
