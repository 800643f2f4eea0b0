//! File outputs: per-city hotel CSVs and the analytics document

pub mod hotels;
pub mod report;

pub use hotels::{WriterState, city_directory, write_city_hotels};
pub use report::{ANALYTICS_FILE_NAME, write_analytics};
