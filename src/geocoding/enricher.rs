//! Address enrichment for hotels in major cities

use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::RngExt;
use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

use super::{GeocodeError, RateLimiter, ReverseGeocoder};
use crate::config::{HotelClimateConfig, cap_workers};
use crate::models::{HotelId, HotelRecord, MajorCities};

/// Tuning knobs for the enrichment stage
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    /// Concurrent geocoding workers, capped at 9
    pub workers: usize,
    /// Shared ceiling across all workers
    pub requests_per_second: u32,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    /// Base delay before a retry, doubled per attempt
    pub retry_backoff: Duration,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self::from_config(&HotelClimateConfig::default())
    }
}

impl EnrichmentSettings {
    #[must_use]
    pub fn from_config(config: &HotelClimateConfig) -> Self {
        Self {
            workers: config.pipeline.workers,
            requests_per_second: config.geocoding.requests_per_second,
            max_retries: config.geocoding.max_retries,
            attempt_timeout: Duration::from_millis(config.geocoding.timeout_ms),
            retry_backoff: Duration::from_millis(config.geocoding.retry_backoff_ms),
        }
    }
}

/// Result of geocoding one hotel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddressOutcome {
    Resolved { address: String, attempts: u32 },
    /// Every attempt failed; the address stays empty
    Exhausted { attempts: u32, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelEnrichment {
    pub hotel_id: HotelId,
    pub outcome: AddressOutcome,
}

/// What the enrichment stage did, hotel by hotel
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    /// One entry per hotel that was geocoded, in no particular order
    pub outcomes: Vec<HotelEnrichment>,
    /// Major-city hotels that already had an address
    pub already_addressed: usize,
    /// Hotels outside their country's major city
    pub outside_major_cities: usize,
}

impl EnrichmentReport {
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, AddressOutcome::Resolved { .. }))
            .count()
    }

    /// Hotels whose address could not be resolved
    #[must_use]
    pub fn exhausted_hotels(&self) -> Vec<HotelId> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, AddressOutcome::Exhausted { .. }))
            .map(|o| o.hotel_id)
            .collect()
    }

    #[must_use]
    pub fn outcome_for(&self, hotel_id: HotelId) -> Option<&AddressOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.hotel_id == hotel_id)
            .map(|o| &o.outcome)
    }
}

/// Attaches reverse-geocoded addresses to hotels located in major cities
pub struct AddressEnricher<G> {
    geocoder: G,
    limiter: RateLimiter,
    settings: EnrichmentSettings,
}

impl<G: ReverseGeocoder> AddressEnricher<G> {
    pub fn new(geocoder: G, mut settings: EnrichmentSettings) -> Self {
        settings.workers = cap_workers(settings.workers);
        Self {
            limiter: RateLimiter::new(settings.requests_per_second),
            geocoder,
            settings,
        }
    }

    /// Geocode every major-city hotel that has no address yet.
    ///
    /// Addresses are written into `hotels` in place once all workers have
    /// finished. Failed hotels keep an empty address and show up as
    /// `Exhausted` in the report.
    #[instrument(name = "enrich_addresses", skip_all, fields(hotels = hotels.len()))]
    pub async fn enrich(
        &self,
        hotels: &mut [HotelRecord],
        major_cities: &MajorCities,
    ) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();
        let mut candidates = Vec::new();

        for (index, hotel) in hotels.iter().enumerate() {
            if !major_cities.contains_hotel(hotel) {
                report.outside_major_cities += 1;
            } else if hotel.has_address() {
                report.already_addressed += 1;
            } else {
                candidates.push((index, hotel.id, hotel.latitude, hotel.longitude));
            }
        }

        info!(
            "Geocoding {} hotels with {} workers ({} already addressed)",
            candidates.len(),
            self.settings.workers,
            report.already_addressed
        );

        let results: Vec<(usize, HotelId, u32, Result<String, GeocodeError>)> =
            stream::iter(candidates)
                .map(|(index, hotel_id, latitude, longitude)| async move {
                    let (attempts, result) = self.resolve(latitude, longitude).await;
                    (index, hotel_id, attempts, result)
                })
                .buffer_unordered(self.settings.workers)
                .collect()
                .await;

        for (index, hotel_id, attempts, result) in results {
            let outcome = match result {
                Ok(address) => {
                    hotels[index].address = Some(address.clone());
                    AddressOutcome::Resolved { address, attempts }
                }
                Err(err) => {
                    warn!(
                        hotel_id,
                        attempts, "Giving up on address lookup: {}", err
                    );
                    AddressOutcome::Exhausted {
                        attempts,
                        reason: err.to_string(),
                    }
                }
            };
            report.outcomes.push(HotelEnrichment { hotel_id, outcome });
        }

        info!(
            "Resolved {} addresses, {} lookups exhausted",
            report.resolved_count(),
            report.exhausted_hotels().len()
        );
        report
    }

    /// Look up one address with a bounded number of attempts.
    ///
    /// Returns the number of attempts made alongside the final result.
    async fn resolve(&self, latitude: f64, longitude: f64) -> (u32, Result<String, GeocodeError>) {
        let max_attempts = self.settings.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.limiter.acquire().await;

            let result = match timeout(
                self.settings.attempt_timeout,
                self.geocoder.reverse(latitude, longitude),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(GeocodeError::Timeout(self.settings.attempt_timeout)),
            };

            match result {
                Ok(address) => return (attempt, Ok(address)),
                Err(err) if attempt < max_attempts && !err.is_permanent() => {
                    let delay = self.backoff_delay(attempt);
                    debug!(
                        "Geocoding ({}, {}) failed on attempt {}/{}: {}; retrying in {:?}",
                        latitude, longitude, attempt, max_attempts, err, delay
                    );
                    sleep(delay).await;
                }
                Err(err) => return (attempt, Err(err)),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = (attempt - 1).min(6);
        let base = self.settings.retry_backoff * (1 << exponent);
        let jitter: f32 = rand::rng().random_range(0.9..1.1);
        base.mul_f32(jitter)
    }
}
