//! Current-weather client for the OpenWeatherMap `/weather` endpoint.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::retry::{with_retry, RetryConfig};
use crate::types::{Coordinate, UnitSystem, WeatherError, WeatherForCity, WeatherMainCast};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for [`WeatherProvider`]
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    pub units: UnitSystem,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            units: UnitSystem::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    settings: ProviderSettings,
}

impl WeatherProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            settings,
        })
    }

    pub fn units(&self) -> UnitSystem {
        self.settings.units
    }

    fn endpoint(&self) -> String {
        format!("{}/weather", self.settings.base_url.trim_end_matches('/'))
    }

    /// Fetch current weather for a coordinate in the persisted-city shape.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_city(&self, coordinate: Coordinate) -> Result<WeatherMainCast, WeatherError> {
        let weather: WeatherMainCast = self.get_decoded(coordinate).await?;
        tracing::info!(
            "Fetched weather for {} ({:.1}, humidity {}%)",
            weather.name,
            weather.main.temp,
            weather.main.humidity
        );
        Ok(weather)
    }

    /// Fetch weather for the device position in the "current + forecast" shape.
    /// The caller displays the value; nothing is persisted.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_location_weather(
        &self,
        coordinate: Coordinate,
    ) -> Result<WeatherForCity, WeatherError> {
        let weather: WeatherForCity = self.get_decoded(coordinate).await?;
        tracing::info!(
            "Fetched current-location weather for {:?} (forecast: {})",
            weather.name,
            weather.has_forecast()
        );
        Ok(weather)
    }

    async fn get_decoded<T: DeserializeOwned>(&self, coordinate: Coordinate) -> Result<T, WeatherError> {
        let url = self.endpoint();
        let query = [
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
            ("appid", self.settings.api_key.clone()),
            ("units", self.settings.units.as_query().to_string()),
        ];

        let response = with_retry(&self.settings.retry, || {
            self.client.get(&url).query(&query).send()
        })
        .await
        .map_err(|e| {
            tracing::warn!("Weather request to {} failed: {}", url, e);
            WeatherError::Network(e)
        })?;

        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            tracing::warn!("Weather API returned status {}", status);
            return Err(status_error(status, &body));
        }

        decode(&body)
    }
}

/// Decode a response body, distinguishing an empty body from malformed JSON.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, WeatherError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(WeatherError::EmptyBody);
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Failed to decode response body: {}", e);
        WeatherError::Decode(e)
    })
}

/// The API reports errors as `{"cod": "...", "message": "..."}`
fn status_error(status: StatusCode, body: &[u8]) -> WeatherError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    match status {
        StatusCode::UNAUTHORIZED => WeatherError::InvalidApiKey,
        StatusCode::NOT_FOUND => WeatherError::NotFound(message),
        _ => WeatherError::Status {
            status: status.as_u16(),
            body: message,
        },
    }
}
