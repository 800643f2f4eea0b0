//! Record store abstraction
//!
//! Every stage reads committed records and stages its writes; nothing a
//! stage writes is visible to queries until `commit`.

pub mod memory;

use thiserror::Error;

use crate::models::{CityCenter, CityTemperatureSeries, HotelId, HotelRecord, MajorCities};

pub use memory::MemoryStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Hotel {0} does not exist")]
    UnknownHotel(HotelId),

    #[error("Hotel {id} already has address '{existing}'")]
    AddressAlreadySet { id: HotelId, existing: String },

    #[error("Hotel {id} in {city} ({country}) is not in a major city")]
    OutsideMajorCity {
        id: HotelId,
        country: String,
        city: String,
    },
}

/// Selects hotels by location
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HotelFilter {
    pub country: Option<String>,
    pub city: Option<String>,
}

impl HotelFilter {
    /// Matches every hotel
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn in_city(country: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            city: Some(city.into()),
        }
    }

    #[must_use]
    pub fn matches(&self, hotel: &HotelRecord) -> bool {
        self.country.as_ref().is_none_or(|c| *c == hotel.country)
            && self.city.as_ref().is_none_or(|c| *c == hotel.city)
    }
}

/// Persistence for hotels, major cities, centers and temperature series
pub trait RecordStore: Send {
    /// Committed hotels matching `filter`, in id order
    fn query_hotels(&self, filter: &HotelFilter) -> Result<Vec<HotelRecord>, StoreError>;

    /// Stage new hotels; the store assigns their ids, which are returned
    fn insert_hotels(&mut self, hotels: Vec<HotelRecord>) -> Result<Vec<HotelId>, StoreError>;

    /// Stage address updates. Addresses are write-once and limited to
    /// major-city hotels; a batch with any invalid update is rejected whole.
    fn update_hotels(&mut self, hotels: &[HotelRecord]) -> Result<(), StoreError>;

    fn query_major_cities(&self) -> Result<MajorCities, StoreError>;

    fn replace_major_cities(&mut self, cities: MajorCities) -> Result<(), StoreError>;

    fn insert_city_centers(&mut self, centers: Vec<CityCenter>) -> Result<(), StoreError>;

    /// Committed centers in (country, city) order
    fn query_city_centers(&self) -> Result<Vec<CityCenter>, StoreError>;

    /// Stage series, replacing any stored series of the same city
    fn store_temperature_series(
        &mut self,
        series: Vec<CityTemperatureSeries>,
    ) -> Result<(), StoreError>;

    /// Committed series in (country, city) order
    fn query_temperature_series(&self) -> Result<Vec<CityTemperatureSeries>, StoreError>;

    /// Make every staged write visible
    fn commit(&mut self) -> Result<(), StoreError>;
}
