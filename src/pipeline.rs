//! End-to-end batch run
//!
//! Stages run in order and each commits its writes before the next one
//! reads: ingest, major cities, addresses, centers, temperatures, then the
//! analytics and file outputs.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::analytics::TemperatureAnalytics;
use crate::center::city_center;
use crate::config::{CityFailurePolicy, HotelClimateConfig};
use crate::geocoding::{AddressEnricher, AddressOutcome, EnrichmentReport, EnrichmentSettings, ReverseGeocoder};
use crate::ingest::ingest_path;
use crate::models::{CityCenter, CityTemperatureSeries, MajorCities};
use crate::output::{city_directory, write_analytics, write_city_hotels};
use crate::selector::select_major_cities;
use crate::store::{HotelFilter, RecordStore};
use crate::weather::{WeatherCollector, WeatherService};
use crate::{HotelClimateError, Result};

/// Knobs that shape a run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub enrichment: EnrichmentSettings,
    /// Weather collection workers
    pub workers: usize,
    pub on_city_failure: CityFailurePolicy,
    pub csv_records_per_file: usize,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &HotelClimateConfig) -> Self {
        Self {
            enrichment: EnrichmentSettings::from_config(config),
            workers: config.pipeline.workers,
            on_city_failure: config.pipeline.on_city_failure,
            csv_records_per_file: config.pipeline.csv_records_per_file,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&HotelClimateConfig::default())
    }
}

/// A city whose temperatures could not be collected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityFailure {
    pub country: String,
    pub city: String,
    pub error: String,
}

/// Summary of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// Hotels inserted by this run; zero when the store was already filled
    pub hotels_ingested: usize,
    pub records_rejected: usize,
    pub major_cities: MajorCities,
    pub enrichment: EnrichmentReport,
    pub centers_computed: usize,
    /// Cities whose series were collected during this run
    pub cities_collected: usize,
    pub failed_cities: Vec<CityFailure>,
    pub analytics: Option<TemperatureAnalytics>,
    pub csv_files_written: usize,
    pub analytics_path: Option<PathBuf>,
}

/// Runs every stage against one record store
pub struct Pipeline<S, G, W> {
    store: S,
    enricher: AddressEnricher<G>,
    collector: WeatherCollector<W>,
    settings: PipelineSettings,
}

impl<S, G, W> Pipeline<S, G, W>
where
    S: RecordStore,
    G: ReverseGeocoder,
    W: WeatherService,
{
    pub fn new(store: S, geocoder: G, weather: W, settings: PipelineSettings) -> Self {
        Self {
            store,
            enricher: AddressEnricher::new(geocoder, settings.enrichment.clone()),
            collector: WeatherCollector::new(weather, settings.workers),
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn run(&mut self, source: &Path, output: &Path) -> Result<PipelineReport> {
        self.run_at(source, output, Utc::now()).await
    }

    /// Run every stage with `now` as the reference time for the weather window
    #[instrument(name = "pipeline", skip_all, fields(source = %source.display(), output = %output.display()))]
    pub async fn run_at(
        &mut self,
        source: &Path,
        output: &Path,
        now: DateTime<Utc>,
    ) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();

        self.ingest(source, &mut report)?;
        let major_cities = self.select_major_cities()?;
        report.enrichment = self.enrich_addresses(&major_cities).await?;
        let centers = self.city_centers(&major_cities, &mut report)?;
        let series = self.collect_temperatures(&centers, now, &mut report).await?;

        report.analytics = TemperatureAnalytics::from_series(&series);
        if report.analytics.is_none() {
            warn!("No complete temperature series; analytics not written");
        }

        self.write_outputs(output, &major_cities, &mut report)?;
        report.major_cities = major_cities;

        info!(
            "Run finished: {} major cities, {} addresses resolved, {} cities failed",
            report.major_cities.len(),
            report.enrichment.resolved_count(),
            report.failed_cities.len()
        );
        Ok(report)
    }

    fn ingest(&mut self, source: &Path, report: &mut PipelineReport) -> Result<()> {
        let stored = self.store.query_hotels(&HotelFilter::all())?.len();
        if stored > 0 {
            info!("Store already holds {} hotels; skipping ingestion", stored);
            return Ok(());
        }
        if !source.exists() {
            return Err(HotelClimateError::validation(format!(
                "Source {} does not exist",
                source.display()
            )));
        }

        let summary = ingest_path(source)?;
        report.hotels_ingested = self.store.insert_hotels(summary.hotels)?.len();
        report.records_rejected = summary.rejected;
        self.store.commit()?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn select_major_cities(&mut self) -> Result<MajorCities> {
        let hotels = self.store.query_hotels(&HotelFilter::all())?;
        let cities = select_major_cities(&hotels);
        info!("Selected {} major cities", cities.len());

        self.store.replace_major_cities(cities)?;
        self.store.commit()?;
        Ok(self.store.query_major_cities()?)
    }

    async fn enrich_addresses(&mut self, major_cities: &MajorCities) -> Result<EnrichmentReport> {
        let mut hotels = self.store.query_hotels(&HotelFilter::all())?;
        let report = self.enricher.enrich(&mut hotels, major_cities).await;

        let resolved: Vec<_> = hotels
            .into_iter()
            .filter(|hotel| {
                matches!(
                    report.outcome_for(hotel.id),
                    Some(AddressOutcome::Resolved { .. })
                )
            })
            .collect();
        self.store.update_hotels(&resolved)?;
        self.store.commit()?;
        Ok(report)
    }

    /// Centers of every major city, computing only those not yet stored
    #[instrument(skip_all)]
    fn city_centers(
        &mut self,
        major_cities: &MajorCities,
        report: &mut PipelineReport,
    ) -> Result<Vec<CityCenter>> {
        let stored = self.store.query_city_centers()?;
        let mut computed = Vec::new();

        for city in major_cities.iter() {
            let known = stored
                .iter()
                .any(|c| c.country == city.country && c.city == city.city);
            if !known {
                let hotels = self
                    .store
                    .query_hotels(&HotelFilter::in_city(&city.country, &city.city))?;
                computed.push(city_center(&city.country, &city.city, &hotels)?);
            }
        }

        report.centers_computed = computed.len();
        if !computed.is_empty() {
            self.store.insert_city_centers(computed)?;
            self.store.commit()?;
        }

        Ok(self
            .store
            .query_city_centers()?
            .into_iter()
            .filter(|center| major_cities.city_of(&center.country) == Some(center.city.as_str()))
            .collect())
    }

    /// Series of every center, collecting only cities without a complete
    /// series from the current UTC date
    async fn collect_temperatures(
        &mut self,
        centers: &[CityCenter],
        now: DateTime<Utc>,
        report: &mut PipelineReport,
    ) -> Result<Vec<CityTemperatureSeries>> {
        let today = now.date_naive();
        let stored = self.store.query_temperature_series()?;
        let pending: Vec<CityCenter> = centers
            .iter()
            .filter(|center| {
                !stored.iter().any(|series| {
                    series.country == center.country
                        && series.city == center.city
                        && series.is_current(today)
                })
            })
            .cloned()
            .collect();

        if pending.is_empty() {
            info!("All {} cities already have temperatures", centers.len());
        } else {
            let mut collections = self.collector.collect_all_at(&pending, now).await;
            collections.sort_by(|a, b| (&a.country, &a.city).cmp(&(&b.country, &b.city)));

            let mut collected = Vec::new();
            for collection in collections {
                match collection.result {
                    Ok(series) => collected.push(series),
                    Err(err) => match self.settings.on_city_failure {
                        CityFailurePolicy::Abort => {
                            return Err(HotelClimateError::weather(
                                collection.country,
                                collection.city,
                                err,
                            ));
                        }
                        CityFailurePolicy::Skip => {
                            warn!(
                                "Skipping {} ({}) in analytics",
                                collection.city, collection.country
                            );
                            report.failed_cities.push(CityFailure {
                                country: collection.country,
                                city: collection.city,
                                error: err.to_string(),
                            });
                        }
                    },
                }
            }

            report.cities_collected = collected.len();
            self.store.store_temperature_series(collected)?;
            self.store.commit()?;
        }

        Ok(self
            .store
            .query_temperature_series()?
            .into_iter()
            .filter(|series| {
                series.collected_on == today
                    && centers
                        .iter()
                        .any(|c| c.country == series.country && c.city == series.city)
            })
            .collect())
    }

    #[instrument(skip_all)]
    fn write_outputs(
        &self,
        output: &Path,
        major_cities: &MajorCities,
        report: &mut PipelineReport,
    ) -> Result<()> {
        for city in major_cities.iter() {
            let hotels = self
                .store
                .query_hotels(&HotelFilter::in_city(&city.country, &city.city))?;
            let directory = city_directory(output, &city.country, &city.city);
            let state =
                write_city_hotels(&directory, &hotels, self.settings.csv_records_per_file)?;
            report.csv_files_written += state.current_file;
        }

        if let Some(analytics) = &report.analytics {
            report.analytics_path = Some(write_analytics(output, analytics)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::GeocodeError;
    use crate::models::{DaySlot, HotelRecord};
    use crate::store::MemoryStore;
    use crate::weather::{ForecastSample, WeatherServiceError};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StreetGeocoder;

    #[async_trait]
    impl ReverseGeocoder for StreetGeocoder {
        async fn reverse(&self, latitude: f64, longitude: f64) -> std::result::Result<String, GeocodeError> {
            Ok(format!("{latitude:.2} {longitude:.2} Street"))
        }
    }

    /// Flat temperatures everywhere except in Rome, which has no timezone
    struct FlatWeather {
        timezone_calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherService for FlatWeather {
        async fn timezone_offset(
            &self,
            latitude: f64,
            _: f64,
        ) -> std::result::Result<i64, WeatherServiceError> {
            self.timezone_calls.fetch_add(1, Ordering::SeqCst);
            if latitude < 42.0 {
                return Err(WeatherServiceError::MissingField {
                    endpoint: "weather",
                    field: "timezone",
                });
            }
            Ok(3600)
        }

        async fn historic_temperatures(
            &self,
            _: f64,
            _: f64,
            _: i64,
        ) -> std::result::Result<Vec<f64>, WeatherServiceError> {
            Ok(vec![5.0, 9.0])
        }

        async fn forecast(
            &self,
            _: f64,
            _: f64,
        ) -> std::result::Result<Vec<ForecastSample>, WeatherServiceError> {
            let start = NOW - 1800;
            Ok((0..40)
                .map(|i| ForecastSample {
                    timestamp: start + i * 3 * 3600,
                    temperature: 7.0,
                })
                .collect())
        }
    }

    // 2024-03-10T15:30:00Z
    const NOW: i64 = 1_710_084_600;

    fn settings(policy: CityFailurePolicy) -> PipelineSettings {
        let mut settings = PipelineSettings::default();
        settings.enrichment.retry_backoff = Duration::ZERO;
        settings.on_city_failure = policy;
        settings
    }

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .insert_hotels(vec![
                HotelRecord::new(0, "A", "IT", "Milan", 45.46, 9.19),
                HotelRecord::new(0, "B", "IT", "Milan", 45.47, 9.18),
                HotelRecord::new(0, "C", "IT", "Rome", 41.9, 12.5),
                HotelRecord::new(0, "D", "VA", "Vatican City", 41.90, 12.45),
                HotelRecord::new(0, "E", "AT", "Vienna", 48.2, 16.37),
            ])
            .unwrap();
        store.commit().unwrap();
        store
    }

    fn pipeline(policy: CityFailurePolicy) -> Pipeline<MemoryStore, StreetGeocoder, FlatWeather> {
        Pipeline::new(
            seeded_store(),
            StreetGeocoder,
            FlatWeather {
                timezone_calls: AtomicUsize::new(0),
            },
            settings(policy),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(NOW, 0).unwrap()
    }

    #[tokio::test]
    async fn test_failed_city_is_skipped() {
        let output = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(CityFailurePolicy::Skip);

        let report = pipeline
            .run_at(Path::new("unused"), output.path(), now())
            .await
            .unwrap();

        assert_eq!(report.hotels_ingested, 0);
        assert_eq!(report.major_cities.len(), 3);
        assert_eq!(report.enrichment.resolved_count(), 4);
        assert_eq!(report.failed_cities.len(), 1);
        assert_eq!(report.failed_cities[0].city, "Vatican City");
        assert_eq!(report.cities_collected, 2);

        let analytics = report.analytics.unwrap();
        assert_eq!(analytics.maximal_temperature.temperature, 9.0);
        assert_eq!(analytics.maximal_temperature.city, "Vienna");
        assert!(output.path().join("temperature_analytics.json").exists());
        assert!(output.path().join("IT/Milan/hotels_1.csv").exists());
        assert!(!output.path().join("IT/Rome").exists());
    }

    #[tokio::test]
    async fn test_abort_policy_stops_the_run() {
        let output = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(CityFailurePolicy::Abort);

        let err = pipeline
            .run_at(Path::new("unused"), output.path(), now())
            .await
            .unwrap_err();

        assert!(matches!(err, HotelClimateError::Weather { ref city, .. } if city == "Vatican City"));
        assert!(!output.path().join("temperature_analytics.json").exists());
    }

    #[tokio::test]
    async fn test_rerun_reuses_stored_work() {
        let output = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(CityFailurePolicy::Skip);
        pipeline
            .run_at(Path::new("unused"), output.path(), now())
            .await
            .unwrap();
        let calls_after_first = pipeline.collector_calls();

        let report = pipeline
            .run_at(Path::new("unused"), output.path(), now())
            .await
            .unwrap();

        assert_eq!(report.centers_computed, 0);
        assert!(report.enrichment.outcomes.is_empty());
        assert_eq!(report.enrichment.already_addressed, 4);
        // only the failed city is retried
        assert_eq!(pipeline.collector_calls(), calls_after_first + 1);
        assert_eq!(report.cities_collected, 0);

        let series = pipeline.store().query_temperature_series().unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|s| s.get(DaySlot::Forecast4).is_some()));
    }

    #[tokio::test]
    async fn test_rerun_on_a_later_day_recollects_series() {
        let output = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(CityFailurePolicy::Skip);
        pipeline
            .run_at(Path::new("unused"), output.path(), now())
            .await
            .unwrap();
        let calls_after_first = pipeline.collector_calls();

        let next_day = now() + chrono::Duration::days(1);
        let report = pipeline
            .run_at(Path::new("unused"), output.path(), next_day)
            .await
            .unwrap();

        // every city is fetched again, the failing one included
        assert_eq!(pipeline.collector_calls(), calls_after_first + 3);
        assert_eq!(report.cities_collected, 2);
        let analytics = report.analytics.unwrap();
        assert_eq!(analytics.maximal_temperature.day, "2024-03-06");

        let series = pipeline.store().query_temperature_series().unwrap();
        assert!(series.iter().all(|s| s.collected_on == next_day.date_naive()));
    }

    impl Pipeline<MemoryStore, StreetGeocoder, FlatWeather> {
        fn collector_calls(&self) -> usize {
            self.collector.service().timezone_calls.load(Ordering::SeqCst)
        }
    }
}
