//! Rows of the saved-city list.
//!
//! The list holds no rows of its own: every call to `rows()` reads the
//! store again, so a reload after an upsert or delete always shows what is
//! persisted.

use weathervk_store::{CityRecord, StoreResult, WeatherStore};
use weathervk_weather::UnitSystem;

/// One saved city as displayed in the list
#[derive(Debug, Clone, PartialEq)]
pub struct CityRow {
    pub city: String,
    pub temperature: i32,
    pub humidity: u8,
    pub wind_speed: f64,
    pub icon: Option<String>,
    pub units: UnitSystem,
}

impl CityRow {
    pub fn from_record(record: &CityRecord, units: UnitSystem) -> Self {
        Self {
            city: record.city.clone(),
            temperature: record.temperature,
            humidity: record.humidity,
            wind_speed: record.wind_speed,
            icon: record.icon.clone(),
            units,
        }
    }

    pub fn temperature_label(&self) -> String {
        format!("{}{}", self.temperature, self.units.temperature_suffix())
    }
}

impl std::fmt::Display for CityRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<24} {:>6}  humidity {:>3}%  wind {:.1} {}",
            self.city,
            self.temperature_label(),
            self.humidity,
            self.wind_speed,
            self.units.speed_suffix()
        )?;
        if let Some(icon) = &self.icon {
            write!(f, "  [{}]", icon)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CityListModel {
    units: UnitSystem,
}

impl CityListModel {
    pub fn new(units: UnitSystem) -> Self {
        Self { units }
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// All saved cities, ordered by name
    pub fn rows(&self, store: &WeatherStore) -> StoreResult<Vec<CityRow>> {
        Ok(store
            .cities()?
            .iter()
            .map(|record| CityRow::from_record(record, self.units))
            .collect())
    }

    pub fn row_count(&self, store: &WeatherStore) -> StoreResult<usize> {
        store.count()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use weathervk_weather::WeatherMainCast;

    fn cast(name: &str, temp: f64) -> WeatherMainCast {
        serde_json::from_value(serde_json::json!({
            "coord": {"lon": 49.12, "lat": 55.79},
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": temp, "humidity": 40},
            "wind": {"speed": 2.5},
            "name": name
        }))
        .unwrap()
    }

    #[test]
    fn rows_follow_store_contents() {
        let store = WeatherStore::in_memory().unwrap();
        let model = CityListModel::new(UnitSystem::Metric);
        assert!(model.rows(&store).unwrap().is_empty());

        store.update_city(&cast("Samara", 11.6)).unwrap();
        store.update_city(&cast("Kazan", -3.4)).unwrap();

        let rows = model.rows(&store).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].city, "Kazan");
        assert_eq!(rows[0].temperature, -3);
        assert_eq!(rows[1].temperature, 12);
        assert_eq!(model.row_count(&store).unwrap(), 2);

        store.delete_city("Kazan").unwrap();
        assert_eq!(model.rows(&store).unwrap().len(), 1);
    }

    #[test]
    fn row_display_uses_unit_suffixes() {
        let store = WeatherStore::in_memory().unwrap();
        let record = store.update_city(&cast("Kazan", 20.2)).unwrap();

        let metric = CityRow::from_record(&record, UnitSystem::Metric).to_string();
        assert!(metric.contains("Kazan"));
        assert!(metric.contains("20°C"));
        assert!(metric.contains("40%"));
        assert!(metric.contains("m/s"));
        assert!(metric.contains("[01d]"));

        let imperial = CityRow::from_record(&record, UnitSystem::Imperial);
        assert_eq!(imperial.temperature_label(), "20°F");
    }
}
