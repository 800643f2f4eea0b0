//! Major city and city center models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::HotelRecord;

/// The representative city of one country
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MajorCity {
    pub country: String,
    pub city: String,
}

/// Country code to major city mapping, one entry per country
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct MajorCities(BTreeMap<String, String>);

impl MajorCities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, country: impl Into<String>, city: impl Into<String>) {
        self.0.insert(country.into(), city.into());
    }

    /// Major city of the given country, if the country is known
    #[must_use]
    pub fn city_of(&self, country: &str) -> Option<&str> {
        self.0.get(country).map(String::as_str)
    }

    /// True when the hotel lies in its country's major city
    #[must_use]
    pub fn contains_hotel(&self, hotel: &HotelRecord) -> bool {
        self.city_of(&hotel.country) == Some(hotel.city.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in country order
    pub fn iter(&self) -> impl Iterator<Item = MajorCity> + '_ {
        self.0.iter().map(|(country, city)| MajorCity {
            country: country.clone(),
            city: city.clone(),
        })
    }
}

impl FromIterator<(String, String)> for MajorCities {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Geographic center of a major city
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CityCenter {
    pub country: String,
    pub city: String,
    /// Mean latitude of the city's hotels
    pub latitude: f64,
    /// Mean longitude of the city's hotels
    pub longitude: f64,
}
