//! Per-city hotel CSV export

use std::fs;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::Result;
use crate::models::HotelRecord;

/// Position of the chunked writer within one city's output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterState {
    /// 1-based number of the file being written, 0 before the first file
    pub current_file: usize,
    /// Records written to the current file
    pub record_count: usize,
}

impl WriterState {
    fn start_file(self) -> Self {
        Self {
            current_file: self.current_file + 1,
            record_count: 0,
        }
    }
}

#[derive(Debug, Serialize)]
struct HotelRow<'a> {
    hotel: &'a str,
    address: &'a str,
    latitude: f64,
    longitude: f64,
}

impl<'a> From<&'a HotelRecord> for HotelRow<'a> {
    fn from(hotel: &'a HotelRecord) -> Self {
        Self {
            hotel: &hotel.name,
            address: hotel.address.as_deref().unwrap_or_default(),
            latitude: hotel.latitude,
            longitude: hotel.longitude,
        }
    }
}

/// Directory holding one city's files: `<base>/<country>/<city>`
#[must_use]
pub fn city_directory(base: &Path, country: &str, city: &str) -> PathBuf {
    base.join(path_component(country)).join(path_component(city))
}

/// A single normal path component; separators and the `.`/`..` names are replaced
fn path_component(part: &str) -> String {
    let clean = part.replace(['/', '\\'], "_");
    match clean.as_str() {
        "" | "." | ".." => "_".repeat(clean.len().max(1)),
        _ => clean,
    }
}

/// Write a city's hotels as `hotels_<n>.csv`, at most `records_per_file`
/// rows per file. Numbering starts at 1 for every city.
#[instrument(level = "debug", skip(hotels), fields(hotels = hotels.len()))]
pub fn write_city_hotels(
    directory: &Path,
    hotels: &[HotelRecord],
    records_per_file: usize,
) -> Result<WriterState> {
    let mut state = WriterState::default();
    if hotels.is_empty() {
        return Ok(state);
    }
    fs::create_dir_all(directory)?;

    for chunk in hotels.chunks(records_per_file.max(1)) {
        state = write_chunk(directory, state.start_file(), chunk)?;
    }
    Ok(state)
}

fn write_chunk(directory: &Path, mut state: WriterState, hotels: &[HotelRecord]) -> Result<WriterState> {
    let path = directory.join(format!("hotels_{}.csv", state.current_file));
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .quote_style(QuoteStyle::Necessary)
        .from_path(&path)?;

    for hotel in hotels {
        writer.serialize(HotelRow::from(hotel))?;
        state.record_count += 1;
    }
    writer.flush()?;
    debug!("Wrote {} records to {}", state.record_count, path.display());
    Ok(state)
}
