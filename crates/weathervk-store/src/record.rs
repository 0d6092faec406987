use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weathervk_weather::Coordinate;

/// A saved city with its latest current weather
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub id: i64,
    /// Place name as reported by the weather API; unique across records
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Rounded to whole degrees in the unit system the data was fetched with
    pub temperature: i32,
    pub humidity: u8,
    pub wind_speed: f64,
    pub icon: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CityRecord {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Whether a forecast is the city's single "current" entry or one day of the
/// future collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastKind {
    Current,
    Future,
}

impl ForecastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastKind::Current => "current",
            ForecastKind::Future => "future",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "current" => Some(ForecastKind::Current),
            "future" => Some(ForecastKind::Future),
            _ => None,
        }
    }
}

/// One day's forecast attached to a saved city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastRecord {
    pub id: i64,
    pub city_id: i64,
    pub kind: ForecastKind,
    pub date: DateTime<Utc>,
    pub temperature: Option<i32>,
    /// Short condition text such as "Rain"
    pub description: Option<String>,
    pub icon: Option<String>,
}
