use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit system understood by the OpenWeatherMap API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    Standard,
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Value of the `units` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    /// Suffix used when displaying a temperature
    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Self::Standard => "K",
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }

    /// Suffix used when displaying a wind speed
    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Self::Standard | Self::Metric => "m/s",
            Self::Imperial => "mph",
        }
    }
}

/// Weather condition categories mapped from OpenWeatherMap condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_id(id: i64) -> Self {
        match id {
            200..=299 => Self::Thunderstorm,
            300..=399 => Self::Drizzle,
            502..=504 | 522 | 531 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            500..=599 => Self::Rain,
            611..=616 => Self::Sleet,
            600..=699 => Self::Snow,
            700..=799 => Self::Fog, // Mist, haze, dust, fog
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // 800 and unknown ids
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Geographic location of the device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub city_name: Option<String>,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl From<Coordinate> for Location {
    fn from(c: Coordinate) -> Self {
        Self {
            latitude: c.latitude,
            longitude: c.longitude,
            accuracy_meters: None,
            city_name: None,
        }
    }
}

/// `coord` object shared by both response shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

impl From<Coord> for Coordinate {
    fn from(c: Coord) -> Self {
        Coordinate::new(c.lat, c.lon)
    }
}

/// One entry of the `weather` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: Option<i64>,
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl Condition {
    pub fn category(&self) -> WeatherCondition {
        self.id.map(WeatherCondition::from_owm_id).unwrap_or_default()
    }
}

/// `main` measurements object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainMeasurements {
    pub temp: f64,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub pressure: Option<i64>,
    pub humidity: u8,
}

/// `wind` object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    /// Direction in degrees
    pub deg: Option<i64>,
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    pub all: i64,
}

/// Current weather for a place, as returned by `GET /weather`.
///
/// Only the fields the app persists are required; the rest are optional
/// because the API omits them for some stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherMainCast {
    pub coord: Coord,
    pub weather: Vec<Condition>,
    pub base: Option<String>,
    pub main: MainMeasurements,
    pub visibility: Option<i64>,
    pub wind: Wind,
    pub clouds: Option<Clouds>,
    pub dt: Option<i64>,
    pub timezone: Option<i64>,
    pub id: Option<i64>,
    pub name: String,
    pub cod: Option<i64>,
    /// Present when the endpoint also returns forecast data
    pub current: Option<CurrentForecast>,
    #[serde(rename = "weeklyForecast", default)]
    pub weekly_forecast: Vec<FutureForecast>,
}

impl WeatherMainCast {
    pub fn coordinate(&self) -> Coordinate {
        self.coord.into()
    }

    /// Icon of the first reported condition
    pub fn icon(&self) -> Option<&str> {
        self.weather.first().map(|w| w.icon.as_str())
    }

    pub fn has_forecast(&self) -> bool {
        self.current.is_some() || !self.weekly_forecast.is_empty()
    }
}

/// Common view over the two forecast entry shapes.
pub trait ForecastEntry {
    fn date(&self) -> DateTime<Utc>;
    fn temperature(&self) -> Option<f64>;
    fn conditions(&self) -> &[Condition];

    fn condition(&self) -> Option<&Condition> {
        self.conditions().first()
    }
}

/// Weather for a single day, `current` in the forecast shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentForecast {
    #[serde(rename = "dt", with = "chrono::serde::ts_seconds")]
    pub date: DateTime<Utc>,
    pub temp: Option<f64>,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

impl ForecastEntry for CurrentForecast {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }

    fn temperature(&self) -> Option<f64> {
        self.temp
    }

    fn conditions(&self) -> &[Condition] {
        &self.weather
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub max: Option<f64>,
    pub min: Option<f64>,
}

/// One day of the future forecast; temperature is the day's maximum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureForecast {
    #[serde(rename = "dt", with = "chrono::serde::ts_seconds")]
    pub date: DateTime<Utc>,
    pub temp: DailyTemperature,
    pub weather: Vec<Condition>,
}

impl ForecastEntry for FutureForecast {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }

    fn temperature(&self) -> Option<f64> {
        self.temp.max
    }

    fn conditions(&self) -> &[Condition] {
        &self.weather
    }
}

/// "Current + forecast" response shape used for current-location weather
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForCity {
    pub coord: Coord,
    pub name: String,
    pub weather: Vec<Condition>,
    pub main: Option<MainMeasurements>,
    pub wind: Option<Wind>,
    pub current: Option<CurrentForecast>,
    #[serde(rename = "weeklyForecast", default)]
    pub weekly_forecast: Vec<FutureForecast>,
}

impl WeatherForCity {
    pub fn coordinate(&self) -> Coordinate {
        self.coord.into()
    }

    pub fn has_forecast(&self) -> bool {
        self.current.is_some() || !self.weekly_forecast.is_empty()
    }

    /// Best available current temperature: `main.temp`, then `current.temp`
    pub fn temperature(&self) -> Option<f64> {
        self.main
            .as_ref()
            .map(|m| m.temp)
            .or_else(|| self.current.as_ref().and_then(|c| c.temp))
    }
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Empty response body")]
    EmptyBody,
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Geocoding failed: {0}")]
    Geocode(String),
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
}

impl WeatherError {
    /// Failures worth trying again later without changing the request
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_owm_id_thunderstorm() {
        assert_eq!(WeatherCondition::from_owm_id(200), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_owm_id(232), WeatherCondition::Thunderstorm);
    }

    #[test]
    fn test_owm_id_drizzle() {
        assert_eq!(WeatherCondition::from_owm_id(300), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_owm_id(321), WeatherCondition::Drizzle);
    }

    #[test]
    fn test_owm_id_rain() {
        assert_eq!(WeatherCondition::from_owm_id(500), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_id(520), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_id(502), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_owm_id(531), WeatherCondition::HeavyRain);
    }

    #[test]
    fn test_owm_id_sleet_and_snow() {
        assert_eq!(WeatherCondition::from_owm_id(511), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_owm_id(612), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_owm_id(600), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_owm_id(622), WeatherCondition::Snow);
    }

    #[test]
    fn test_owm_id_atmosphere_and_clouds() {
        assert_eq!(WeatherCondition::from_owm_id(741), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_owm_id(800), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_id(801), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_owm_id(804), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_owm_id_unknown_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_owm_id(999), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_id(-1), WeatherCondition::Clear);
    }

    #[test]
    fn test_condition_without_id_is_clear() {
        let c = Condition {
            id: None,
            main: "Clouds".into(),
            description: "few clouds".into(),
            icon: "02d".into(),
        };
        assert_eq!(c.category(), WeatherCondition::Clear);
    }

    #[test]
    fn test_unit_system_query_values() {
        assert_eq!(UnitSystem::Standard.as_query(), "standard");
        assert_eq!(UnitSystem::Metric.as_query(), "metric");
        assert_eq!(UnitSystem::Imperial.as_query(), "imperial");
        assert_eq!(UnitSystem::Imperial.speed_suffix(), "mph");
    }

    #[test]
    fn test_coordinate_display() {
        let c = Coordinate::new(55.755826, 37.6173);
        assert_eq!(c.to_string(), "55.7558, 37.6173");
    }

    #[test]
    fn test_transient_status() {
        let e = WeatherError::Status {
            status: 503,
            body: String::new(),
        };
        assert!(e.is_transient());
        assert!(!WeatherError::InvalidApiKey.is_transient());
        assert!(!WeatherError::EmptyBody.is_transient());
    }
}
