//! Data models for the hotel climate pipeline
//!
//! Plain data records, organized by concern:
//! - Hotel: validated hotel locations and their optional address
//! - City: major city selection results and city centers
//! - Temperature: per-day ranges and the ten-day city series

pub mod city;
pub mod hotel;
pub mod temperature;

pub use city::{CityCenter, MajorCities, MajorCity};
pub use hotel::{HotelId, HotelRecord};
pub use temperature::{CityTemperatureSeries, DaySlot, SeriesError, TemperatureRange};
