//! Hotel record model

use serde::{Deserialize, Serialize};

/// Identifier assigned to a hotel by the record store
pub type HotelId = u64;

/// One validated hotel location record
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HotelRecord {
    /// Store-assigned identifier
    pub id: HotelId,
    /// Hotel name (never empty)
    pub name: String,
    /// Country code (ISO 3166-1 alpha-2)
    pub country: String,
    /// City name
    pub city: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Reverse-geocoded address, set at most once
    pub address: Option<String>,
}

impl HotelRecord {
    /// Create a record without an address
    #[must_use]
    pub fn new(
        id: HotelId,
        name: impl Into<String>,
        country: impl Into<String>,
        city: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            country: country.into(),
            city: city.into(),
            latitude,
            longitude,
            address: None,
        }
    }

    /// True when an address is present and not blank
    #[must_use]
    pub fn has_address(&self) -> bool {
        self.address
            .as_deref()
            .is_some_and(|address| !address.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_address_counts_as_missing() {
        let mut hotel = HotelRecord::new(1, "Hotel Roma", "IT", "Milan", 45.46, 9.19);
        assert!(!hotel.has_address());

        hotel.address = Some("   ".to_string());
        assert!(!hotel.has_address());

        hotel.address = Some("Via Roma 1, Milan".to_string());
        assert!(hotel.has_address());
    }
}
