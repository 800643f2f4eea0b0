//! Local day boundaries expressed as UTC unix timestamps

use crate::models::DaySlot;

use super::ForecastSample;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// How far behind "now" the partial-day historic query is placed
pub const NOW_MARGIN_SECONDS: i64 = 5;

pub const FORECAST_DAYS: usize = 4;

/// Three-hour forecast samples per day
pub const SAMPLES_PER_FORECAST_DAY: usize = 8;

/// Today's boundaries for a city, derived from its UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    now: i64,
    today_start: i64,
    today_end: i64,
}

/// Forecast samples split at the end of the local day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSplit {
    /// Samples for the remainder of today
    pub today_tail: Vec<f64>,
    /// One chunk of up to eight samples per coming day
    pub days: [Vec<f64>; FORECAST_DAYS],
}

impl DayWindow {
    /// Shift `now` into local time, truncate to midnight and shift back
    #[must_use]
    pub fn new(now: i64, utc_offset: i64) -> Self {
        let local_now = now + utc_offset;
        let local_midnight = local_now - local_now.rem_euclid(SECONDS_PER_DAY);
        let today_start = local_midnight - utc_offset;
        Self {
            now,
            today_start,
            today_end: today_start + SECONDS_PER_DAY,
        }
    }

    /// UTC timestamp of the local midnight that started today
    #[must_use]
    pub fn today_start(&self) -> i64 {
        self.today_start
    }

    #[must_use]
    pub fn today_end(&self) -> i64 {
        self.today_end
    }

    /// Point-in-time used for the historic query of a slot.
    ///
    /// Past days use the last second of that local day. Today uses a moment
    /// just before now so the partial day is captured. Forecast slots have
    /// no historic query.
    #[must_use]
    pub fn historic_query_time(&self, slot: DaySlot) -> Option<i64> {
        match slot.day_offset() {
            0 => Some(self.now - NOW_MARGIN_SECONDS),
            offset if offset < 0 => {
                Some(self.today_start - 1 + SECONDS_PER_DAY * (offset + 1))
            }
            _ => None,
        }
    }

    /// Partition forecast samples by the end of today.
    ///
    /// Samples strictly before the boundary form today's tail. The rest, in
    /// time order, are chunked into eight-sample days; anything past the
    /// fourth day is dropped.
    #[must_use]
    pub fn split_forecast(&self, mut samples: Vec<ForecastSample>) -> ForecastSplit {
        samples.sort_by_key(|sample| sample.timestamp);
        let boundary = samples.partition_point(|sample| sample.timestamp < self.today_end);
        let (today, coming) = samples.split_at(boundary);

        let mut split = ForecastSplit {
            today_tail: today.iter().map(|sample| sample.temperature).collect(),
            ..ForecastSplit::default()
        };
        for (day, chunk) in split
            .days
            .iter_mut()
            .zip(coming.chunks(SAMPLES_PER_FORECAST_DAY))
        {
            *day = chunk.iter().map(|sample| sample.temperature).collect();
        }
        split
    }
}
