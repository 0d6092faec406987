//! Glue between the synchronous UI thread and the async weather services.
//!
//! Holds the process-wide tokio runtime and turns core configuration into
//! service settings.

use std::sync::OnceLock;
use std::time::Duration;

use weathervk_core::{Config, Units};
use weathervk_weather::{
    Coordinate, GeocoderSettings, LocationSource, ProviderSettings, RetryConfig, UnitSystem,
};

// Static tokio runtime that lives for the duration of the application
static RUNTIME: OnceLock<Option<tokio::runtime::Runtime>> = OnceLock::new();

/// Handle to the shared runtime, building it on first use.
/// Returns `None` if the runtime could not be created.
pub fn get_runtime() -> Option<tokio::runtime::Handle> {
    RUNTIME
        .get_or_init(|| {
            match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("weathervk-tokio")
                .build()
            {
                Ok(rt) => Some(rt),
                Err(e) => {
                    tracing::error!("Failed to create tokio runtime: {}", e);
                    None
                }
            }
        })
        .as_ref()
        .map(|rt| rt.handle().clone())
}

pub fn unit_system(units: Units) -> UnitSystem {
    match units {
        Units::Standard => UnitSystem::Standard,
        Units::Metric => UnitSystem::Metric,
        Units::Imperial => UnitSystem::Imperial,
    }
}

pub fn provider_settings(config: &Config) -> ProviderSettings {
    let weather = &config.weather;
    ProviderSettings {
        base_url: weather.base_url.clone(),
        api_key: weather.api_key.clone(),
        units: unit_system(weather.units),
        timeout: Duration::from_secs(weather.request_timeout_secs),
        retry: RetryConfig {
            max_retries: weather.max_retries,
            ..RetryConfig::default()
        },
    }
}

pub fn geocoder_settings(config: &Config) -> GeocoderSettings {
    GeocoderSettings {
        base_url: config.geocoding.base_url.clone(),
        user_agent: config.geocoding.user_agent.clone(),
        timeout: Duration::from_secs(config.geocoding.request_timeout_secs),
    }
}

pub fn location_source(config: &Config) -> LocationSource {
    let coordinate = config
        .location
        .coordinate()
        .map(|(lat, lon)| Coordinate::new(lat, lon));
    LocationSource::new(config.location.enabled, coordinate)
}

/// Upper bound on how long a single request can take, retries included
pub fn request_budget(config: &Config) -> Duration {
    let retries = config.weather.max_retries;
    let per_attempt = Duration::from_secs(config.weather.request_timeout_secs);
    let geocode = Duration::from_secs(config.geocoding.request_timeout_secs);
    per_attempt * retries.saturating_add(1) + RetryConfig::default().max_delay * retries + geocode
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_runtime_is_shared() {
        let handle = get_runtime().unwrap();
        assert_eq!(handle.block_on(async { 21 * 2 }), 42);
        assert!(get_runtime().is_some());
    }

    #[test]
    fn test_provider_settings_follow_config() {
        let mut config = Config::default();
        config.weather.api_key = "abc".into();
        config.weather.units = Units::Imperial;
        config.weather.max_retries = 0;

        let settings = provider_settings(&config);
        assert_eq!(settings.api_key, "abc");
        assert_eq!(settings.units, UnitSystem::Imperial);
        assert_eq!(settings.retry.max_retries, 0);
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_location_source_follows_config() {
        let mut config = Config::default();
        assert!(!location_source(&config).is_available());

        config.location.enabled = true;
        config.location.latitude = Some(43.6);
        config.location.longitude = Some(39.7);
        assert!(location_source(&config).is_available());
    }

    #[test]
    fn test_request_budget_grows_with_retries() {
        let mut config = Config::default();
        config.weather.max_retries = 0;
        let short = request_budget(&config);
        config.weather.max_retries = 3;
        assert!(request_budget(&config) > short);
    }
}
