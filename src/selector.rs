//! Major city selection
//!
//! Picks, for every country, the city holding the most hotel records.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::models::{HotelRecord, MajorCities};

/// Select one major city per country.
///
/// Hotels are grouped by (country, city) and counted. Within a country the
/// city with the strictly greatest count wins; equal counts resolve to the
/// lexicographically smallest city name so the result never depends on
/// input order.
pub fn select_major_cities<'a, I>(hotels: I) -> MajorCities
where
    I: IntoIterator<Item = &'a HotelRecord>,
{
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for hotel in hotels {
        *counts
            .entry((hotel.country.as_str(), hotel.city.as_str()))
            .or_insert(0) += 1;
    }

    let mut best: BTreeMap<&str, (&str, usize)> = BTreeMap::new();
    for ((country, city), count) in counts {
        best.entry(country)
            .and_modify(|current| {
                if count > current.1 || (count == current.1 && city < current.0) {
                    *current = (city, count);
                }
            })
            .or_insert((city, count));
    }

    for (country, (city, count)) in &best {
        debug!("Major city of {}: {} ({} hotels)", country, city, count);
    }
    info!("Selected {} major cities", best.len());

    best.into_iter()
        .map(|(country, (city, _))| (country.to_string(), city.to_string()))
        .collect()
}
