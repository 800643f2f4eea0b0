//! Cross-city temperature analytics

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CityTemperatureSeries, DaySlot};

/// One labelled day of a city's series
#[derive(Debug, Clone, PartialEq)]
pub struct DayTemperature {
    pub day: String,
    pub min: f64,
    pub max: f64,
}

impl DayTemperature {
    pub fn new(day: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            day: day.into(),
            min,
            max,
        }
    }
}

/// First item whose key beats every earlier one under `better`
fn first_extreme<T>(
    items: impl IntoIterator<Item = T>,
    key: impl Fn(&T) -> f64,
    better: impl Fn(f64, f64) -> bool,
) -> Option<T> {
    let mut best: Option<(f64, T)> = None;
    for item in items {
        let value = key(&item);
        let replace = match &best {
            Some((current, _)) => better(value, *current),
            None => true,
        };
        if replace {
            best = Some((value, item));
        }
    }
    best.map(|(_, item)| item)
}

/// Highest day maximum and the day it occurred on
#[must_use]
pub fn max_temp_day(days: &[DayTemperature]) -> Option<(f64, &str)> {
    first_extreme(days, |d| d.max, |a, b| a > b).map(|d| (d.max, d.day.as_str()))
}

/// Spread between the highest and lowest day maximum
#[must_use]
pub fn max_temp_delta(days: &[DayTemperature]) -> Option<f64> {
    let highest = first_extreme(days, |d| d.max, |a, b| a > b)?;
    let lowest = first_extreme(days, |d| d.max, |a, b| a < b)?;
    Some(highest.max - lowest.max)
}

/// Lowest day minimum and the day it occurred on
#[must_use]
pub fn min_temp_day(days: &[DayTemperature]) -> Option<(f64, &str)> {
    first_extreme(days, |d| d.min, |a, b| a < b).map(|d| (d.min, d.day.as_str()))
}

/// Largest single-day spread and the day it occurred on
#[must_use]
pub fn max_intraday_delta(days: &[DayTemperature]) -> Option<(f64, &str)> {
    first_extreme(days, |d| d.max - d.min, |a, b| a > b)
        .map(|d| (d.max - d.min, d.day.as_str()))
}

/// The four per-city indicators
#[derive(Debug, Clone, PartialEq)]
pub struct CityStatistics {
    pub country: String,
    pub city: String,
    pub max_temperature: (f64, String),
    pub max_temperature_delta: f64,
    pub min_temperature: (f64, String),
    pub max_intraday_delta: (f64, String),
}

impl CityStatistics {
    /// `None` when `days` is empty
    #[must_use]
    pub fn from_days(
        country: impl Into<String>,
        city: impl Into<String>,
        days: &[DayTemperature],
    ) -> Option<Self> {
        let (max_value, max_day) = max_temp_day(days)?;
        let (min_value, min_day) = min_temp_day(days)?;
        let (delta_value, delta_day) = max_intraday_delta(days)?;
        Some(Self {
            country: country.into(),
            city: city.into(),
            max_temperature: (max_value, max_day.to_string()),
            max_temperature_delta: max_temp_delta(days)?,
            min_temperature: (min_value, min_day.to_string()),
            max_intraday_delta: (delta_value, delta_day.to_string()),
        })
    }
}

/// ISO date labels for the ten slots, centred on `run_date`
#[must_use]
pub fn day_labels(run_date: NaiveDate) -> [String; 10] {
    DaySlot::ALL.map(|slot| (run_date + Duration::days(slot.day_offset())).to_string())
}

/// Label a complete series; `None` if any slot is still empty
#[must_use]
pub fn labelled_days(series: &CityTemperatureSeries, labels: &[String; 10]) -> Option<Vec<DayTemperature>> {
    let ranges = series.day_ranges()?;
    Some(
        ranges
            .iter()
            .zip(labels)
            .map(|(range, label)| DayTemperature::new(label.clone(), range.min, range.max))
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureOnDay {
    pub temperature: f64,
    pub day: String,
    pub country: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityVariation {
    pub variation: f64,
    pub country: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationOnDay {
    pub variation: f64,
    pub day: String,
    pub country: String,
    pub city: String,
}

/// Extremes across all collected cities, as exported to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureAnalytics {
    #[serde(rename = "Maximal temperature")]
    pub maximal_temperature: TemperatureOnDay,
    #[serde(rename = "Maximal variation of maximal temperature")]
    pub maximal_max_variation: CityVariation,
    #[serde(rename = "Minimal temperature")]
    pub minimal_temperature: TemperatureOnDay,
    #[serde(rename = "Maximal day temperature variation")]
    pub maximal_day_variation: VariationOnDay,
}

impl TemperatureAnalytics {
    /// Combine per-city statistics; earlier cities win ties.
    #[must_use]
    pub fn from_statistics(statistics: &[CityStatistics]) -> Option<Self> {
        let hottest = first_extreme(statistics, |s| s.max_temperature.0, |a, b| a > b)?;
        let most_varied = first_extreme(statistics, |s| s.max_temperature_delta, |a, b| a > b)?;
        let coldest = first_extreme(statistics, |s| s.min_temperature.0, |a, b| a < b)?;
        let widest_day = first_extreme(statistics, |s| s.max_intraday_delta.0, |a, b| a > b)?;

        Some(Self {
            maximal_temperature: TemperatureOnDay {
                temperature: hottest.max_temperature.0,
                day: hottest.max_temperature.1.clone(),
                country: hottest.country.clone(),
                city: hottest.city.clone(),
            },
            maximal_max_variation: CityVariation {
                variation: most_varied.max_temperature_delta,
                country: most_varied.country.clone(),
                city: most_varied.city.clone(),
            },
            minimal_temperature: TemperatureOnDay {
                temperature: coldest.min_temperature.0,
                day: coldest.min_temperature.1.clone(),
                country: coldest.country.clone(),
                city: coldest.city.clone(),
            },
            maximal_day_variation: VariationOnDay {
                variation: widest_day.max_intraday_delta.0,
                day: widest_day.max_intraday_delta.1.clone(),
                country: widest_day.country.clone(),
                city: widest_day.city.clone(),
            },
        })
    }

    /// Analyse complete series in the given order; incomplete ones are skipped.
    ///
    /// Days are labelled relative to the date each series was collected on.
    #[must_use]
    pub fn from_series(series: &[CityTemperatureSeries]) -> Option<Self> {
        let statistics: Vec<CityStatistics> = series
            .iter()
            .filter_map(|city| {
                let days = labelled_days(city, &day_labels(city.collected_on));
                if days.is_none() {
                    debug!("Skipping incomplete series for {} ({})", city.city, city.country);
                }
                CityStatistics::from_days(city.country.clone(), city.city.clone(), &days?)
            })
            .collect();
        Self::from_statistics(&statistics)
    }
}
