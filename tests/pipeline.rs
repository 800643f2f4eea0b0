//! End-to-end pipeline runs over temporary CSV input with in-process services

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use hotel_climate::geocoding::GeocodeError;
use hotel_climate::store::HotelFilter;
use hotel_climate::weather::{ForecastSample, WeatherServiceError};
use hotel_climate::{
    MemoryStore, Pipeline, PipelineSettings, RecordStore, ReverseGeocoder, WeatherService,
};

// 2024-03-10T15:30:00Z
const NOW: i64 = 1_710_084_600;

#[derive(Default)]
struct RecordingGeocoder {
    requested: Mutex<Vec<(f64, f64)>>,
}

#[async_trait]
impl ReverseGeocoder for RecordingGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        self.requested.lock().unwrap().push((latitude, longitude));
        if latitude == 0.0 {
            return Err(GeocodeError::NotFound(format!("{latitude},{longitude}")));
        }
        Ok(format!("{latitude}, {longitude}"))
    }
}

/// Each city's temperatures scale with its latitude
struct LatitudeWeather;

#[async_trait]
impl WeatherService for LatitudeWeather {
    async fn timezone_offset(&self, _: f64, longitude: f64) -> Result<i64, WeatherServiceError> {
        Ok((longitude / 15.0).round() as i64 * 3600)
    }

    async fn historic_temperatures(
        &self,
        latitude: f64,
        _: f64,
        _: i64,
    ) -> Result<Vec<f64>, WeatherServiceError> {
        let base = 60.0 - latitude;
        Ok((0..24).map(|hour| base + f64::from(hour % 6)).collect())
    }

    async fn forecast(
        &self,
        latitude: f64,
        _: f64,
    ) -> Result<Vec<ForecastSample>, WeatherServiceError> {
        let base = 60.0 - latitude;
        Ok((0..40)
            .map(|i| ForecastSample {
                timestamp: NOW + i * 3 * 3600,
                temperature: base + 1.0,
            })
            .collect())
    }
}

fn write_source(dir: &Path) {
    fs::write(
        dir.join("hotels_a.csv"),
        "Id,Name,Country,City,Latitude,Longitude\n\
         1,Duomo,IT,Milan,45.464,9.190\n\
         2,Brera,IT,Milan,45.472,9.187\n\
         3,Navigli,IT,Milan,45.452,9.176\n\
         4,Colosseo,IT,Rome,41.890,12.492\n\
         5,Broken,OO,Milan,45.0,9.0\n",
    )
    .unwrap();
    fs::write(
        dir.join("hotels_b.csv"),
        "Id,Name,Country,City,Latitude,Longitude\n\
         6,Centrale,IT,Milan,45.486,9.204\n\
         7,Porta Romana,IT,Milan,45.451,9.203\n\
         8,Mole,IT,Turin,45.069,7.693\n\
         9,Stephansdom,AT,Vienna,48.208,16.373\n\
         10,Far Away,AT,Vienna,220,16.0\n\
         11,,AT,Vienna,48.2,16.3\n\
         12,Nowhere,AT,Graz,47.07\n",
    )
    .unwrap();
    fs::write(dir.join("notes.txt"), "not a csv").unwrap();
}

#[tokio::test]
async fn test_full_run_over_csv_directory() {
    let source = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_source(source.path());

    let geocoder = Arc::new(RecordingGeocoder::default());
    let mut pipeline = Pipeline::new(
        MemoryStore::new(),
        geocoder.clone(),
        LatitudeWeather,
        PipelineSettings::default(),
    );

    let report = pipeline
        .run_at(
            source.path(),
            output.path(),
            Utc.timestamp_opt(NOW, 0).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(report.hotels_ingested, 8);
    assert_eq!(report.records_rejected, 4);
    assert_eq!(report.major_cities.city_of("IT"), Some("Milan"));
    assert_eq!(report.major_cities.city_of("AT"), Some("Vienna"));

    // five Milan hotels plus the Vienna one; Rome and Turin are never queried
    let requested: BTreeSet<String> = geocoder
        .requested
        .lock()
        .unwrap()
        .iter()
        .map(|(lat, lon)| format!("{lat},{lon}"))
        .collect();
    assert_eq!(requested.len(), 6);
    assert!(!requested.contains("41.89,12.492"));
    assert!(!requested.contains("45.069,7.693"));
    assert_eq!(report.enrichment.resolved_count(), 6);

    let store = pipeline.store();
    let rome = store
        .query_hotels(&HotelFilter::in_city("IT", "Rome"))
        .unwrap();
    assert!(rome[0].address.is_none());
    let milan = store
        .query_hotels(&HotelFilter::in_city("IT", "Milan"))
        .unwrap();
    assert_eq!(milan.len(), 5);
    assert!(milan.iter().all(|hotel| hotel.has_address()));

    assert!(report.failed_cities.is_empty());
    let analytics: Value = serde_json::from_str(
        &fs::read_to_string(output.path().join("temperature_analytics.json")).unwrap(),
    )
    .unwrap();
    // Milan is further south, so warmer
    assert_eq!(analytics["Maximal temperature"]["city"], "Milan");
    assert_eq!(analytics["Minimal temperature"]["city"], "Vienna");
    assert_eq!(analytics["Maximal temperature"]["day"], "2024-03-05");

    let milan_csv = output.path().join("IT").join("Milan").join("hotels_1.csv");
    let rows = csv::Reader::from_path(&milan_csv).unwrap().records().count();
    assert_eq!(rows, 5);
    assert!(output.path().join("AT/Vienna/hotels_1.csv").exists());
    assert!(!output.path().join("IT/Rome").exists());
}

#[tokio::test]
async fn test_unresolvable_address_is_reported() {
    let source = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    fs::write(
        source.path().join("hotels.csv"),
        "Id,Name,Country,City,Latitude,Longitude\n\
         1,Null Island Inn,GH,Accra,0.0,0.0\n\
         2,Osu Castle,GH,Accra,5.547,-0.192\n",
    )
    .unwrap();

    let geocoder = Arc::new(RecordingGeocoder::default());
    let mut pipeline = Pipeline::new(
        MemoryStore::new(),
        geocoder.clone(),
        LatitudeWeather,
        PipelineSettings::default(),
    );

    let report = pipeline
        .run_at(
            &source.path().join("hotels.csv"),
            output.path(),
            Utc.timestamp_opt(NOW, 0).unwrap(),
        )
        .await
        .unwrap();

    // not-found answers are not retried
    assert_eq!(geocoder.requested.lock().unwrap().len(), 2);
    assert_eq!(report.enrichment.exhausted_hotels(), vec![1]);
    assert_eq!(report.enrichment.resolved_count(), 1);
}
