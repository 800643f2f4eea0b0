//! In-memory record store with staged commits

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use super::{HotelFilter, RecordStore, StoreError};
use crate::models::{CityCenter, CityTemperatureSeries, HotelId, HotelRecord, MajorCities};

type CityKey = (String, String);

#[derive(Debug, Clone, Default)]
struct Tables {
    hotels: BTreeMap<HotelId, HotelRecord>,
    next_id: HotelId,
    major_cities: MajorCities,
    centers: BTreeMap<CityKey, CityCenter>,
    series: BTreeMap<CityKey, CityTemperatureSeries>,
}

/// Record store held entirely in memory.
///
/// Writes go to a staging copy that replaces the committed copy on
/// `commit`, so readers never see a half-written stage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: Tables,
    staged: Tables,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_address_update(&self, update: &HotelRecord) -> Result<(), StoreError> {
        let current = self
            .staged
            .hotels
            .get(&update.id)
            .ok_or(StoreError::UnknownHotel(update.id))?;

        if !update.has_address() {
            return Ok(());
        }
        if !self.staged.major_cities.contains_hotel(current) {
            return Err(StoreError::OutsideMajorCity {
                id: current.id,
                country: current.country.clone(),
                city: current.city.clone(),
            });
        }
        match &current.address {
            Some(existing) if current.has_address() && current.address != update.address => {
                Err(StoreError::AddressAlreadySet {
                    id: current.id,
                    existing: existing.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl RecordStore for MemoryStore {
    fn query_hotels(&self, filter: &HotelFilter) -> Result<Vec<HotelRecord>, StoreError> {
        Ok(self
            .committed
            .hotels
            .values()
            .filter(|hotel| filter.matches(hotel))
            .cloned()
            .collect())
    }

    #[instrument(level = "debug", skip_all, fields(count = hotels.len()))]
    fn insert_hotels(&mut self, hotels: Vec<HotelRecord>) -> Result<Vec<HotelId>, StoreError> {
        let mut ids = Vec::with_capacity(hotels.len());
        for mut hotel in hotels {
            self.staged.next_id += 1;
            hotel.id = self.staged.next_id;
            ids.push(hotel.id);
            self.staged.hotels.insert(hotel.id, hotel);
        }
        Ok(ids)
    }

    #[instrument(level = "debug", skip_all, fields(count = hotels.len()))]
    fn update_hotels(&mut self, hotels: &[HotelRecord]) -> Result<(), StoreError> {
        for hotel in hotels {
            self.check_address_update(hotel)?;
        }
        for hotel in hotels.iter().filter(|hotel| hotel.has_address()) {
            if let Some(current) = self.staged.hotels.get_mut(&hotel.id) {
                current.address.clone_from(&hotel.address);
            }
        }
        Ok(())
    }

    fn query_major_cities(&self) -> Result<MajorCities, StoreError> {
        Ok(self.committed.major_cities.clone())
    }

    fn replace_major_cities(&mut self, cities: MajorCities) -> Result<(), StoreError> {
        self.staged.major_cities = cities;
        Ok(())
    }

    fn insert_city_centers(&mut self, centers: Vec<CityCenter>) -> Result<(), StoreError> {
        for center in centers {
            self.staged
                .centers
                .insert((center.country.clone(), center.city.clone()), center);
        }
        Ok(())
    }

    fn query_city_centers(&self) -> Result<Vec<CityCenter>, StoreError> {
        Ok(self.committed.centers.values().cloned().collect())
    }

    fn store_temperature_series(
        &mut self,
        series: Vec<CityTemperatureSeries>,
    ) -> Result<(), StoreError> {
        for city in series {
            self.staged
                .series
                .insert((city.country.clone(), city.city.clone()), city);
        }
        Ok(())
    }

    fn query_temperature_series(&self) -> Result<Vec<CityTemperatureSeries>, StoreError> {
        Ok(self.committed.series.values().cloned().collect())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        debug!(
            "Committing {} hotels, {} major cities, {} centers, {} series",
            self.staged.hotels.len(),
            self.staged.major_cities.len(),
            self.staged.centers.len(),
            self.staged.series.len()
        );
        self.committed = self.staged.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DaySlot, TemperatureRange};

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .insert_hotels(vec![
                HotelRecord::new(0, "Duomo", "IT", "Milan", 45.46, 9.19),
                HotelRecord::new(0, "Navigli", "IT", "Milan", 45.45, 9.17),
                HotelRecord::new(0, "Colosseo", "IT", "Rome", 41.89, 12.49),
            ])
            .unwrap();
        let mut cities = MajorCities::new();
        cities.insert("IT", "Milan");
        store.replace_major_cities(cities).unwrap();
        store.commit().unwrap();
        store
    }

    fn with_address(mut hotel: HotelRecord, address: &str) -> HotelRecord {
        hotel.address = Some(address.to_string());
        hotel
    }

    #[test]
    fn test_ids_are_assigned_sequentially() {
        let store = seeded_store();
        let ids: Vec<HotelId> = store
            .query_hotels(&HotelFilter::all())
            .unwrap()
            .iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_writes_are_invisible_until_commit() {
        let mut store = seeded_store();
        store
            .insert_hotels(vec![HotelRecord::new(0, "Brera", "IT", "Milan", 45.47, 9.18)])
            .unwrap();
        assert_eq!(store.query_hotels(&HotelFilter::all()).unwrap().len(), 3);

        store.commit().unwrap();
        assert_eq!(store.query_hotels(&HotelFilter::all()).unwrap().len(), 4);
    }

    #[test]
    fn test_addresses_are_write_once() {
        let mut store = seeded_store();
        let duomo = store.query_hotels(&HotelFilter::all()).unwrap()[0].clone();

        store
            .update_hotels(&[with_address(duomo.clone(), "Piazza del Duomo")])
            .unwrap();
        // same value again is a no-op
        store
            .update_hotels(&[with_address(duomo.clone(), "Piazza del Duomo")])
            .unwrap();

        let err = store
            .update_hotels(&[with_address(duomo, "Elsewhere")])
            .unwrap_err();
        assert!(matches!(err, StoreError::AddressAlreadySet { id: 1, .. }));
    }

    #[test]
    fn test_only_major_city_hotels_get_addresses() {
        let mut store = seeded_store();
        let hotels = store.query_hotels(&HotelFilter::all()).unwrap();
        let milan = with_address(hotels[1].clone(), "Naviglio Grande");
        let rome = with_address(hotels[2].clone(), "Via Sacra");

        let err = store.update_hotels(&[milan, rome]).unwrap_err();
        assert!(matches!(err, StoreError::OutsideMajorCity { id: 3, .. }));

        // the valid update in the rejected batch was not applied either
        store.commit().unwrap();
        let hotels = store.query_hotels(&HotelFilter::all()).unwrap();
        assert!(hotels.iter().all(|hotel| !hotel.has_address()));
    }

    #[test]
    fn test_unknown_hotel_update() {
        let mut store = seeded_store();
        let ghost = with_address(HotelRecord::new(42, "Ghost", "IT", "Milan", 0.0, 0.0), "Nowhere");
        assert_eq!(
            store.update_hotels(&[ghost]),
            Err(StoreError::UnknownHotel(42))
        );
    }

    #[test]
    fn test_series_replace_by_city() {
        let mut store = seeded_store();
        let run_date = chrono::NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let mut partial = CityTemperatureSeries::new("IT", "Milan", run_date);
        partial
            .fill(DaySlot::Historic1, TemperatureRange { min: 1.0, max: 2.0 })
            .unwrap();
        store.store_temperature_series(vec![partial]).unwrap();

        let mut full = CityTemperatureSeries::new("IT", "Milan", run_date);
        for slot in DaySlot::ALL {
            full.fill(slot, TemperatureRange { min: 3.0, max: 4.0 }).unwrap();
        }
        store.store_temperature_series(vec![full]).unwrap();
        store.commit().unwrap();

        let series = store.query_temperature_series().unwrap();
        assert_eq!(series.len(), 1);
        assert!(series[0].is_complete());
    }
}
