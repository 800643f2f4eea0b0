//! MapQuest reverse geocoding client

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{GeocodeError, ReverseGeocoder};
use crate::config::GeocodingConfig;

/// Reverse geocoding client for the MapQuest geocoding API
pub struct MapQuestClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl MapQuestClient {
    /// Create a new client from configuration
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("Missing geocoding API key (geocoding.api_key)")?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("HotelClimate/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create geocoding HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn reverse_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/reverse?key={}&location={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&format!("{latitude},{longitude}"))
        )
    }
}

#[async_trait]
impl ReverseGeocoder for MapQuestClient {
    #[instrument(name = "reverse_geocode", level = "debug", skip(self))]
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let start = Instant::now();
        let response = self
            .client
            .get(self.reverse_url(latitude, longitude))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Geocoding request failed with HTTP {}", status);
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: mapquest::ReverseResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Malformed(e.to_string()))?;

        let address = body.into_address(latitude, longitude)?;
        debug!(
            "Resolved address in {:.3}s: {}",
            start.elapsed().as_secs_f64(),
            address
        );
        Ok(address)
    }
}

/// MapQuest API response structures
mod mapquest {
    use super::{Deserialize, GeocodeError};

    #[derive(Debug, Deserialize)]
    pub struct ReverseResponse {
        pub info: Option<Info>,
        #[serde(default)]
        pub results: Vec<ReverseResult>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Info {
        #[serde(rename = "statuscode")]
        pub status_code: i64,
        #[serde(default)]
        pub messages: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ReverseResult {
        #[serde(default)]
        pub locations: Vec<Address>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct Address {
        #[serde(default)]
        pub street: String,
        #[serde(default)]
        pub postal_code: String,
        /// City
        #[serde(default, rename = "adminArea5")]
        pub admin_area5: String,
        /// State or region
        #[serde(default, rename = "adminArea3")]
        pub admin_area3: String,
        /// Country
        #[serde(default, rename = "adminArea1")]
        pub admin_area1: String,
    }

    impl Address {
        /// "street, postal city, region, country" with blank parts left out
        pub fn formatted(&self) -> String {
            let locality = [self.postal_code.trim(), self.admin_area5.trim()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");

            [
                self.street.trim(),
                locality.as_str(),
                self.admin_area3.trim(),
                self.admin_area1.trim(),
            ]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
        }
    }

    impl ReverseResponse {
        pub fn into_address(self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
            if let Some(info) = &self.info {
                // the service reports key problems in the body of a 200 reply
                if let code @ (401 | 403) = info.status_code {
                    return Err(GeocodeError::Status(code as u16));
                }
                if info.status_code != 0 {
                    return Err(GeocodeError::Malformed(format!(
                        "status code {}: {}",
                        info.status_code,
                        info.messages.join("; ")
                    )));
                }
            }

            self.results
                .into_iter()
                .flat_map(|result| result.locations)
                .map(|location| location.formatted())
                .find(|address| !address.is_empty())
                .ok_or_else(|| GeocodeError::NotFound(format!("{latitude},{longitude}")))
        }
    }
}
