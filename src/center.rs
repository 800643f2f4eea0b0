//! City center calculation

use thiserror::Error;

use crate::models::{CityCenter, HotelRecord};

/// Raised when a center is requested for a city without any hotels
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot compute the center of {city} ({country}): no hotel coordinates")]
pub struct EmptyInputError {
    pub country: String,
    pub city: String,
}

/// Arithmetic mean of a list of (latitude, longitude) pairs. `None` when empty.
#[must_use]
pub fn find_city_center(coordinates: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut lat_sum = 0.0;
    let mut lon_sum = 0.0;
    let mut count = 0usize;
    for (latitude, longitude) in coordinates {
        lat_sum += latitude;
        lon_sum += longitude;
        count += 1;
    }

    if count == 0 {
        return None;
    }
    Some((lat_sum / count as f64, lon_sum / count as f64))
}

/// Center of one city computed from the hotels located there
pub fn city_center(
    country: &str,
    city: &str,
    hotels: &[HotelRecord],
) -> Result<CityCenter, EmptyInputError> {
    let coordinates: Vec<(f64, f64)> = hotels
        .iter()
        .filter(|hotel| hotel.country == country && hotel.city == city)
        .map(|hotel| (hotel.latitude, hotel.longitude))
        .collect();

    let (latitude, longitude) =
        find_city_center(&coordinates).ok_or_else(|| EmptyInputError {
            country: country.to_string(),
            city: city.to_string(),
        })?;

    Ok(CityCenter {
        country: country.to_string(),
        city: city.to_string(),
        latitude,
        longitude,
    })
}
