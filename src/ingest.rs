//! Hotel record ingestion
//!
//! Reads raw hotel CSV files and yields only rows that pass validation.
//! Invalid rows are dropped and counted, never raised.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::models::HotelRecord;

/// Leading bytes of a zip archive's first local file header
const ZIP_SIGNATURE: [u8; 4] = *b"PK\x03\x04";

/// Number of columns in a raw hotel row: id, name, country, city, latitude, longitude
const RAW_FIELD_COUNT: usize = 6;

/// ISO 3166-1 alpha-2 country codes
const ISO_ALPHA2: [&str; 249] = [
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX", "AZ",
    "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ", "BR", "BS",
    "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN",
    "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE",
    "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR", "GA", "GB", "GD", "GE", "GF",
    "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS", "GT", "GU", "GW", "GY", "HK", "HM",
    "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN", "IO", "IQ", "IR", "IS", "IT", "JE", "JM",
    "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC",
    "LI", "LK", "LR", "LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK",
    "ML", "MM", "MN", "MO", "MP", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA",
    "NC", "NE", "NF", "NG", "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG",
    "PH", "PK", "PL", "PM", "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW",
    "SA", "SB", "SC", "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS",
    "ST", "SV", "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO",
    "TR", "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];

/// Reasons a raw row is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Expected 6 fields, got {0}")]
    FieldCount(usize),

    #[error("Hotel name is empty")]
    EmptyName,

    #[error("Unknown country code '{0}'")]
    Country(String),

    #[error("City is empty")]
    EmptyCity,

    #[error("Invalid coordinate '{0}'")]
    Coordinate(String),
}

/// Check whether the code is an ISO 3166-1 alpha-2 country code
#[must_use]
pub fn is_country(code: &str) -> bool {
    ISO_ALPHA2.binary_search(&code).is_ok()
}

/// Check whether the string parses as a coordinate with absolute value at most 180
#[must_use]
pub fn is_coordinate(value: &str) -> bool {
    parse_coordinate(value).is_some()
}

fn parse_coordinate(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.abs() <= 180.0)
}

/// Validate a raw CSV row and build an unsaved hotel record (id 0)
pub fn parse_record(record: &StringRecord) -> Result<HotelRecord, ValidationError> {
    if record.len() != RAW_FIELD_COUNT {
        return Err(ValidationError::FieldCount(record.len()));
    }

    let name = record[1].trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let country = record[2].trim();
    if !is_country(country) {
        return Err(ValidationError::Country(country.to_string()));
    }

    let city = record[3].trim();
    if city.is_empty() {
        return Err(ValidationError::EmptyCity);
    }

    let latitude =
        parse_coordinate(&record[4]).ok_or_else(|| ValidationError::Coordinate(record[4].to_string()))?;
    let longitude =
        parse_coordinate(&record[5]).ok_or_else(|| ValidationError::Coordinate(record[5].to_string()))?;

    Ok(HotelRecord::new(0, name, country, city, latitude, longitude))
}

/// Outcome of ingesting one or more source files
#[derive(Debug, Default, Clone)]
pub struct IngestSummary {
    pub hotels: Vec<HotelRecord>,
    pub accepted: usize,
    pub rejected: usize,
    pub files: usize,
}

impl IngestSummary {
    fn absorb(&mut self, other: IngestSummary) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.files += other.files;
        self.hotels.extend(other.hotels);
    }
}

/// Read every valid hotel row from a CSV source.
///
/// The first line is a header. Rows with the wrong shape or invalid
/// values are skipped.
pub fn read_valid_records<R: Read>(source: R) -> IngestSummary {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let mut summary = IngestSummary {
        files: 1,
        ..IngestSummary::default()
    };

    for (line, result) in reader.records().enumerate() {
        let parsed = match result {
            Ok(record) => parse_record(&record).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(hotel) => {
                summary.accepted += 1;
                summary.hotels.push(hotel);
            }
            Err(reason) => {
                summary.rejected += 1;
                debug!("Skipping row {}: {}", line + 2, reason);
            }
        }
    }

    summary
}

/// Ingest hotel records from `source`.
///
/// The source is a zip archive whose top-level `*.csv` entries are read, a
/// single CSV file, or a directory whose `*.csv` files are read. Archive
/// entries and directory files are processed in name order.
#[instrument(skip_all, fields(source = %source.display()))]
pub fn ingest_path(source: &Path) -> std::io::Result<IngestSummary> {
    let summary = if is_zip_archive(source)? {
        ingest_zip(source)?
    } else {
        ingest_files(source)?
    };
    if summary.files == 0 {
        warn!("No CSV files found in {}", source.display());
    }

    info!(
        "Ingested {} hotel records from {} files ({} rejected)",
        summary.accepted, summary.files, summary.rejected
    );
    Ok(summary)
}

fn ingest_files(source: &Path) -> std::io::Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    for file in csv_files(source)? {
        let handle = fs::File::open(&file)?;
        let file_summary = read_valid_records(handle);
        debug!(
            "Read {}: {} accepted, {} rejected",
            file.display(),
            file_summary.accepted,
            file_summary.rejected
        );
        summary.absorb(file_summary);
    }
    Ok(summary)
}

fn ingest_zip(source: &Path) -> std::io::Result<IngestSummary> {
    let mut archive = ZipArchive::new(fs::File::open(source)?)?;
    let mut entries: Vec<String> = archive
        .file_names()
        .filter(|name| !name.contains('/') && has_csv_extension(Path::new(name)))
        .map(String::from)
        .collect();
    entries.sort();

    let mut summary = IngestSummary::default();
    for name in entries {
        let entry = archive.by_name(&name)?;
        let entry_summary = read_valid_records(entry);
        debug!(
            "Read {} from archive: {} accepted, {} rejected",
            name, entry_summary.accepted, entry_summary.rejected
        );
        summary.absorb(entry_summary);
    }
    Ok(summary)
}

/// A regular file starting with the zip signature, whatever its extension
fn is_zip_archive(source: &Path) -> std::io::Result<bool> {
    if !source.is_file() {
        return Ok(false);
    }
    let mut signature = [0u8; 4];
    match fs::File::open(source)?.read_exact(&mut signature) {
        Ok(()) => Ok(signature == ZIP_SIGNATURE),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn csv_files(source: &Path) -> std::io::Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = fs::read_dir(source)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_csv_extension(path))
        .collect();
    files.sort();
    Ok(files)
}
