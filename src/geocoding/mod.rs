//! Reverse geocoding
//!
//! This module resolves hotel coordinates into postal addresses:
//! - A provider seam (`ReverseGeocoder`) with a MapQuest implementation
//! - A shared rate gate keeping all workers under the provider quota
//! - The address enricher that drives the bounded worker pool

pub mod client;
pub mod enricher;
pub mod rate_limit;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use client::MapQuestClient;
pub use enricher::{AddressEnricher, AddressOutcome, EnrichmentReport, EnrichmentSettings};
pub use rate_limit::RateLimiter;

/// Failure of a single reverse geocoding attempt
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Geocoding service returned HTTP {0}")]
    Status(u16),

    #[error("Malformed geocoding response: {0}")]
    Malformed(String),

    #[error("No address found for {0}")]
    NotFound(String),

    #[error("Geocoding request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl GeocodeError {
    /// Errors that no amount of retrying will fix
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            GeocodeError::Status(401 | 403) | GeocodeError::NotFound(_)
        )
    }
}

/// A service able to turn coordinates into a formatted address
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError>;
}

#[async_trait]
impl<T: ReverseGeocoder + ?Sized> ReverseGeocoder for Arc<T> {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        (**self).reverse(latitude, longitude).await
    }
}
