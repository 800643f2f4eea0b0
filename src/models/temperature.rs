//! Ten-day temperature series model

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Temperature range for a day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

impl TemperatureRange {
    /// Reduce raw samples to their (min, max) pair. `None` for an empty slice.
    #[must_use]
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let (first, rest) = samples.split_first()?;
        let range = rest.iter().fold(
            Self {
                min: *first,
                max: *first,
            },
            |range, &sample| Self {
                min: range.min.min(sample),
                max: range.max.max(sample),
            },
        );
        Some(range)
    }
}

/// One of the ten ordered day slots of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DaySlot {
    Historic5,
    Historic4,
    Historic3,
    Historic2,
    Historic1,
    Today,
    Forecast1,
    Forecast2,
    Forecast3,
    Forecast4,
}

impl DaySlot {
    /// All slots in chronological order
    pub const ALL: [DaySlot; 10] = [
        DaySlot::Historic5,
        DaySlot::Historic4,
        DaySlot::Historic3,
        DaySlot::Historic2,
        DaySlot::Historic1,
        DaySlot::Today,
        DaySlot::Forecast1,
        DaySlot::Forecast2,
        DaySlot::Forecast3,
        DaySlot::Forecast4,
    ];

    /// Position in the series (0 = five days ago)
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Day offset relative to today, in -5..=4
    #[must_use]
    pub fn day_offset(self) -> i64 {
        self.index() as i64 - 5
    }

    /// Stable column name used in persisted and exported data
    #[must_use]
    pub fn column_name(self) -> &'static str {
        match self {
            DaySlot::Historic5 => "historic_5",
            DaySlot::Historic4 => "historic_4",
            DaySlot::Historic3 => "historic_3",
            DaySlot::Historic2 => "historic_2",
            DaySlot::Historic1 => "historic_1",
            DaySlot::Today => "today",
            DaySlot::Forecast1 => "forecast_1",
            DaySlot::Forecast2 => "forecast_2",
            DaySlot::Forecast3 => "forecast_3",
            DaySlot::Forecast4 => "forecast_4",
        }
    }
}

impl fmt::Display for DaySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Slot {0} is already filled")]
    SlotAlreadyFilled(DaySlot),
}

/// Per-day temperature ranges of one major city, five days ago through four days ahead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityTemperatureSeries {
    pub country: String,
    pub city: String,
    /// UTC date of the run that collected the series; slot `Today` belongs to it
    pub collected_on: NaiveDate,
    slots: [Option<TemperatureRange>; 10],
}

impl CityTemperatureSeries {
    #[must_use]
    pub fn new(country: impl Into<String>, city: impl Into<String>, collected_on: NaiveDate) -> Self {
        Self {
            country: country.into(),
            city: city.into(),
            collected_on,
            slots: [None; 10],
        }
    }

    /// Fill a slot. Slots are write-once.
    pub fn fill(&mut self, slot: DaySlot, range: TemperatureRange) -> Result<(), SeriesError> {
        let entry = &mut self.slots[slot.index()];
        if entry.is_some() {
            return Err(SeriesError::SlotAlreadyFilled(slot));
        }
        *entry = Some(range);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, slot: DaySlot) -> Option<TemperatureRange> {
        self.slots[slot.index()]
    }

    /// Every slot is populated
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Complete and collected on `date`, so it can stand in for a fresh collection
    #[must_use]
    pub fn is_current(&self, date: NaiveDate) -> bool {
        self.collected_on == date && self.is_complete()
    }

    /// All ten ranges in chronological order, or `None` if any slot is empty
    #[must_use]
    pub fn day_ranges(&self) -> Option<[TemperatureRange; 10]> {
        let mut ranges = [TemperatureRange { min: 0.0, max: 0.0 }; 10];
        for (target, slot) in ranges.iter_mut().zip(self.slots.iter()) {
            *target = (*slot)?;
        }
        Some(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_from_samples() {
        let range = TemperatureRange::from_samples(&[3.5, -1.0, 7.25, 2.0]).unwrap();
        assert_eq!(range.min, -1.0);
        assert_eq!(range.max, 7.25);
        assert!(TemperatureRange::from_samples(&[]).is_none());
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let samples = [12.1, 9.8, 15.4, 14.0, 8.7, 11.3];
        let direct = TemperatureRange::from_samples(&samples).unwrap();
        let again = TemperatureRange::from_samples(&[direct.min, direct.max]).unwrap();
        assert_eq!(direct, again);
    }

    #[test]
    fn test_slot_offsets() {
        assert_eq!(DaySlot::Historic5.day_offset(), -5);
        assert_eq!(DaySlot::Today.day_offset(), 0);
        assert_eq!(DaySlot::Forecast4.day_offset(), 4);
        for (index, slot) in DaySlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), index);
        }
    }

    #[test]
    fn test_slots_are_write_once() {
        let mut series = CityTemperatureSeries::new("IT", "Milan", run_date());
        let range = TemperatureRange { min: 1.0, max: 2.0 };
        series.fill(DaySlot::Today, range).unwrap();
        assert_eq!(
            series.fill(DaySlot::Today, range),
            Err(SeriesError::SlotAlreadyFilled(DaySlot::Today))
        );
        assert_eq!(series.get(DaySlot::Today), Some(range));
        assert!(!series.is_complete());
        assert!(series.day_ranges().is_none());
    }

    #[test]
    fn test_day_ranges_in_order() {
        let mut series = CityTemperatureSeries::new("IT", "Milan", run_date());
        for slot in DaySlot::ALL {
            let base = slot.day_offset() as f64;
            series
                .fill(slot, TemperatureRange { min: base, max: base + 1.0 })
                .unwrap();
        }
        let ranges = series.day_ranges().unwrap();
        assert_eq!(ranges[0].min, -5.0);
        assert_eq!(ranges[9].max, 5.0);
        assert!(series.is_current(run_date()));
        assert!(!series.is_current(run_date().succ_opt().unwrap()));
    }
}
