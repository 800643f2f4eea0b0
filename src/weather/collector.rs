//! Per-city temperature series collection

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument};

use super::window::{DayWindow, ForecastSplit};
use super::{WeatherService, WeatherServiceError};
use crate::config::cap_workers;
use crate::models::{CityCenter, CityTemperatureSeries, DaySlot, TemperatureRange};

/// Historic queries: five past days and the partial current day
const HISTORIC_SLOTS: [DaySlot; 6] = [
    DaySlot::Historic5,
    DaySlot::Historic4,
    DaySlot::Historic3,
    DaySlot::Historic2,
    DaySlot::Historic1,
    DaySlot::Today,
];

/// Outcome of collecting one city
#[derive(Debug)]
pub struct CityCollection {
    pub country: String,
    pub city: String,
    pub result: Result<CityTemperatureSeries, WeatherServiceError>,
}

/// Gathers ten-day temperature series for city centers
pub struct WeatherCollector<W> {
    service: W,
    workers: usize,
}

impl<W: WeatherService> WeatherCollector<W> {
    pub fn new(service: W, workers: usize) -> Self {
        Self {
            service,
            workers: cap_workers(workers),
        }
    }

    pub fn service(&self) -> &W {
        &self.service
    }

    /// Collect every city concurrently as of `now`.
    ///
    /// A failing city does not stop the others; each result is returned
    /// for the caller to act on. Results come back in no particular order.
    #[instrument(name = "collect_weather", skip_all, fields(cities = centers.len()))]
    pub async fn collect_all_at(
        &self,
        centers: &[CityCenter],
        now: DateTime<Utc>,
    ) -> Vec<CityCollection> {
        info!(
            "Collecting temperatures for {} cities with {} workers",
            centers.len(),
            self.workers
        );
        stream::iter(centers)
            .map(|center| async move {
                let result = self.collect_city(center, now).await;
                if let Err(err) = &result {
                    error!(
                        country = %center.country,
                        city = %center.city,
                        "Weather collection failed: {}", err
                    );
                }
                CityCollection {
                    country: center.country.clone(),
                    city: center.city.clone(),
                    result,
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await
    }

    /// Build one city's series.
    ///
    /// The UTC offset is resolved first; the historic days and the forecast
    /// are then fetched concurrently.
    #[instrument(skip(self, center), fields(country = %center.country, city = %center.city))]
    pub async fn collect_city(
        &self,
        center: &CityCenter,
        now: DateTime<Utc>,
    ) -> Result<CityTemperatureSeries, WeatherServiceError> {
        let (latitude, longitude) = (center.latitude, center.longitude);
        let utc_offset = self.service.timezone_offset(latitude, longitude).await?;
        let window = DayWindow::new(now.timestamp(), utc_offset);
        debug!(
            "UTC offset {}s, local day starts at {}",
            utc_offset,
            window.today_start()
        );

        let historic = try_join_all(HISTORIC_SLOTS.into_iter().filter_map(|slot| {
            let at = window.historic_query_time(slot)?;
            Some(async move {
                let samples = self
                    .service
                    .historic_temperatures(latitude, longitude, at)
                    .await?;
                Ok::<_, WeatherServiceError>((slot, samples))
            })
        }));
        let forecast = self.service.forecast(latitude, longitude);

        let (historic, forecast) = tokio::try_join!(historic, forecast)?;
        let mut series =
            CityTemperatureSeries::new(&center.country, &center.city, now.date_naive());
        fill_series(&mut series, historic, window.split_forecast(forecast))?;
        Ok(series)
    }
}

/// Reduce raw samples into the ten ordered day ranges.
///
/// Today combines the partial-day historic samples with the forecast tail.
fn fill_series(
    series: &mut CityTemperatureSeries,
    historic: Vec<(DaySlot, Vec<f64>)>,
    forecast: ForecastSplit,
) -> Result<(), WeatherServiceError> {
    let mut samples: [Vec<f64>; 10] = Default::default();
    for (slot, values) in historic {
        samples[slot.index()] = values;
    }
    samples[DaySlot::Today.index()].extend(forecast.today_tail);
    for (day, values) in forecast.days.into_iter().enumerate() {
        samples[DaySlot::Forecast1.index() + day] = values;
    }

    for slot in DaySlot::ALL {
        let range = TemperatureRange::from_samples(&samples[slot.index()])
            .ok_or(WeatherServiceError::EmptyDay(slot))?;
        series.fill(slot, range)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::ForecastSample;
    use crate::weather::window::SECONDS_PER_DAY;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Temperatures sit at ten times the day's offset from today, so every
    /// slot is recognisable in assertions.
    struct FakeWeather {
        utc_offset: Option<i64>,
        historic_calls: Mutex<Vec<i64>>,
        forecast_samples: usize,
    }

    impl FakeWeather {
        fn new(utc_offset: i64) -> Self {
            Self {
                utc_offset: Some(utc_offset),
                historic_calls: Mutex::new(Vec::new()),
                forecast_samples: 40,
            }
        }
    }

    #[async_trait]
    impl WeatherService for FakeWeather {
        async fn timezone_offset(&self, _: f64, _: f64) -> Result<i64, WeatherServiceError> {
            self.utc_offset.ok_or(WeatherServiceError::MissingField {
                endpoint: "weather",
                field: "timezone",
            })
        }

        async fn historic_temperatures(
            &self,
            _: f64,
            _: f64,
            at: i64,
        ) -> Result<Vec<f64>, WeatherServiceError> {
            self.historic_calls.lock().unwrap().push(at);
            let day = (at - TODAY_START).div_euclid(SECONDS_PER_DAY) as f64;
            Ok(vec![day * 10.0, day * 10.0 + 2.0, day * 10.0 + 1.0])
        }

        async fn forecast(&self, _: f64, _: f64) -> Result<Vec<ForecastSample>, WeatherServiceError> {
            // 18:00 UTC onwards, every three hours
            Ok((0..self.forecast_samples)
                .map(|i| {
                    let timestamp = TODAY_START + 18 * 3600 + i as i64 * 3 * 3600;
                    let day = (timestamp - TODAY_START).div_euclid(SECONDS_PER_DAY) as f64;
                    ForecastSample {
                        timestamp,
                        temperature: day * 10.0 + (i % 8) as f64 * 0.5,
                    }
                })
                .collect())
        }
    }

    // 2024-03-10T15:30:00Z
    const NOW: i64 = 1_710_084_600;
    const TODAY_START: i64 = 1_710_028_800;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(NOW, 0).unwrap()
    }

    fn milan_center() -> CityCenter {
        CityCenter {
            country: "IT".to_string(),
            city: "Milan".to_string(),
            latitude: 45.46,
            longitude: 9.19,
        }
    }

    #[tokio::test]
    async fn test_series_has_ten_ordered_days() {
        let collector = WeatherCollector::new(FakeWeather::new(0), 4);

        let series = collector.collect_city(&milan_center(), now()).await.unwrap();
        let ranges = series.day_ranges().unwrap();

        assert_eq!(series.collected_on, chrono::NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

        assert_eq!(ranges[0], TemperatureRange { min: -50.0, max: -48.0 });
        assert_eq!(ranges[4], TemperatureRange { min: -10.0, max: -8.0 });
        // today: historic 0..2 plus forecast at 18:00 and 21:00 (0.0, 0.5)
        assert_eq!(ranges[5], TemperatureRange { min: 0.0, max: 2.0 });
        // first coming day: 8 samples starting at midnight
        assert_eq!(ranges[6], TemperatureRange { min: 10.0, max: 13.5 });
        assert_eq!(ranges[9].min, 40.0);
    }

    #[tokio::test]
    async fn test_historic_queries_use_local_day_ends() {
        let service = FakeWeather::new(0);
        let collector = WeatherCollector::new(service, 4);

        collector.collect_city(&milan_center(), now()).await.unwrap();

        let mut calls = collector.service.historic_calls.lock().unwrap().clone();
        calls.sort_unstable();
        let expected: Vec<i64> = (1..=5)
            .rev()
            .map(|n| TODAY_START - 1 - (n - 1) * SECONDS_PER_DAY)
            .chain([NOW - 5])
            .collect();
        assert_eq!(calls, expected);
    }

    #[tokio::test]
    async fn test_missing_timezone_is_fatal() {
        let mut service = FakeWeather::new(0);
        service.utc_offset = None;
        let collector = WeatherCollector::new(service, 4);

        let err = collector.collect_city(&milan_center(), now()).await.unwrap_err();

        assert!(matches!(err, WeatherServiceError::MissingField { .. }));
        assert!(collector.service.historic_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_short_forecast_is_an_empty_day() {
        let mut service = FakeWeather::new(0);
        service.forecast_samples = 20;
        let collector = WeatherCollector::new(service, 4);

        let err = collector.collect_city(&milan_center(), now()).await.unwrap_err();

        assert!(matches!(
            err,
            WeatherServiceError::EmptyDay(DaySlot::Forecast4)
        ));
    }

    #[tokio::test]
    async fn test_collect_all_reports_each_city() {
        let collector = WeatherCollector::new(FakeWeather::new(0), 2);
        let mut vienna = milan_center();
        vienna.country = "AT".to_string();
        vienna.city = "Vienna".to_string();
        let mut results = collector.collect_all_at(&[milan_center(), vienna], now()).await;
        results.sort_by(|a, b| a.country.cmp(&b.country));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].city, "Vienna");
        assert!(results.iter().all(|r| r.result.is_ok()));
    }
}
