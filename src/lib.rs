//! `HotelClimate` - hotel address enrichment and city temperature analytics
//!
//! This library ingests hotel location records, picks the major city of
//! every country, resolves hotel addresses through a rate-limited reverse
//! geocoder and aggregates a ten-day temperature window per major city.

pub mod analytics;
pub mod center;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod ingest;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod selector;
pub mod store;
pub mod telemetry;
pub mod weather;

// Re-export core types for public API
pub use analytics::TemperatureAnalytics;
pub use config::HotelClimateConfig;
pub use error::HotelClimateError;
pub use geocoding::{AddressEnricher, MapQuestClient, ReverseGeocoder};
pub use models::{CityCenter, CityTemperatureSeries, HotelRecord, MajorCities};
pub use pipeline::{Pipeline, PipelineReport, PipelineSettings};
pub use store::{MemoryStore, RecordStore};
pub use weather::{OpenWeatherClient, WeatherCollector, WeatherService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, HotelClimateError>;
