//! Geocoding through Nominatim (OpenStreetMap) - free, no API key required.
//!
//! Forward lookups turn a typed city name into coordinates; reverse lookups
//! label a bare coordinate with a place name.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::provider::decode;
use crate::types::{Coordinate, Location, WeatherError};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "WeatherVK/0.1.0";

/// Connection settings for [`Geocoder`]
#[derive(Debug, Clone)]
pub struct GeocoderSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: NOMINATIM_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(settings: GeocoderSettings) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a free-text address or city name to a coordinate.
    ///
    /// Single attempt; no caching of repeated lookups.
    #[instrument(skip(self), level = "info")]
    pub async fn geocode(&self, address: &str) -> Result<Coordinate, WeatherError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(WeatherError::Geocode("empty address".to_string()));
        }

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Geocode(format!(
                "geocoder returned status {}",
                status
            )));
        }

        let body = response.bytes().await?;
        let places: Vec<NominatimPlace> = decode(&body)?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Geocode(format!("no match for {:?}", address)))?;

        let latitude = parse_degrees(&place.lat)?;
        let longitude = parse_degrees(&place.lon)?;
        let coordinate = Coordinate::new(latitude, longitude);

        tracing::info!(
            "Geocoded {:?} to {} ({})",
            address,
            coordinate,
            place.display_name.as_deref().unwrap_or("unnamed")
        );
        Ok(coordinate)
    }

    /// Reverse geocode a location to a human-readable place name (e.g. "Kazan, Tatarstan").
    /// Returns `None` on failure or timeout; the caller can fall back to coordinates.
    pub async fn reverse(&self, location: &Location) -> Option<String> {
        if location.city_name.is_some() {
            return location.city_name.clone();
        }

        let lat = location.latitude.to_string();
        let lon = location.longitude.to_string();
        let response = match self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
                ("zoom", "10"),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return None;
        }

        let body: NominatimResponse = match response.bytes().await {
            Ok(bytes) => match decode(&bytes) {
                Ok(b) => b,
                Err(e) => {
                    tracing::debug!("Reverse geocode parse error: {}", e);
                    return None;
                }
            },
            Err(e) => {
                tracing::debug!("Reverse geocode body error: {}", e);
                return None;
            }
        };

        let result = place_label(body.address?)?;
        tracing::info!("Reverse geocoded to: {}", result);
        Some(result)
    }
}

fn parse_degrees(value: &str) -> Result<f64, WeatherError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| WeatherError::Geocode(format!("invalid coordinate {:?}: {}", value, e)))
}

/// Prefer city > town > village > municipality, then add state or country
/// for disambiguation when it differs from the place itself.
fn place_label(addr: NominatimAddress) -> Option<String> {
    let state = addr.state.clone();
    let country = addr.country.clone();

    let place = addr
        .city
        .or(addr.town)
        .or(addr.village)
        .or(addr.municipality)
        .or(addr.state_district)
        .or(addr.county)
        .or(addr.state)
        .or(addr.country)?;

    let suffix = state
        .filter(|s| !s.is_empty() && *s != place)
        .or_else(|| country.filter(|c| !c.is_empty() && *c != place));

    Some(match suffix {
        Some(s) => format!("{}, {}", place, s),
        None => place,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn address() -> NominatimAddress {
        NominatimAddress {
            city: None,
            town: None,
            village: None,
            municipality: None,
            state_district: None,
            state: None,
            county: None,
            country: None,
        }
    }

    #[test]
    fn test_place_label_city_with_state() {
        let addr = NominatimAddress {
            city: Some("Kazan".into()),
            state: Some("Tatarstan".into()),
            country: Some("Russia".into()),
            ..address()
        };
        assert_eq!(place_label(addr).as_deref(), Some("Kazan, Tatarstan"));
    }

    #[test]
    fn test_place_label_falls_back_to_country_suffix() {
        let addr = NominatimAddress {
            town: Some("Zelenogradsk".into()),
            country: Some("Russia".into()),
            ..address()
        };
        assert_eq!(place_label(addr).as_deref(), Some("Zelenogradsk, Russia"));
    }

    #[test]
    fn test_place_label_skips_duplicate_suffix() {
        let addr = NominatimAddress {
            state: Some("Moscow".into()),
            country: Some("Moscow".into()),
            ..address()
        };
        assert_eq!(place_label(addr).as_deref(), Some("Moscow"));
    }

    #[test]
    fn test_place_label_empty_address() {
        assert_eq!(place_label(address()), None);
    }

    #[test]
    fn test_parse_degrees() {
        assert_eq!(parse_degrees(" 55.7504461 ").unwrap(), 55.7504461);
        assert!(matches!(parse_degrees("north"), Err(WeatherError::Geocode(_))));
    }

    #[tokio::test]
    async fn test_reverse_preserves_existing_city() {
        let geocoder = Geocoder::new(GeocoderSettings::default()).unwrap();
        let loc = Location {
            latitude: 55.75,
            longitude: 37.62,
            accuracy_meters: None,
            city_name: Some("Moscow".to_string()),
        };
        assert_eq!(geocoder.reverse(&loc).await.as_deref(), Some("Moscow"));
    }

    #[tokio::test]
    async fn test_geocode_rejects_blank_input_without_request() {
        let geocoder = Geocoder::new(GeocoderSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            ..GeocoderSettings::default()
        })
        .unwrap();
        assert!(matches!(
            geocoder.geocode("   ").await,
            Err(WeatherError::Geocode(_))
        ));
    }
}
