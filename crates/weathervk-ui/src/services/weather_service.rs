//! Weather backend: async city and current-location fetching.
//! All network work runs off the UI thread; results sent via mpsc.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use tokio::runtime::Handle;
use weathervk_core::{NetworkError, ReqwestErrorExt};
use weathervk_weather::{
    Coordinate, Geocoder, Location, WeatherForCity, WeatherMainCast, WeatherProvider,
};

/// Error type for weather operations
#[derive(Debug, Clone)]
pub enum WeatherError {
    /// Transport failure before any response arrived
    Network(String),
    Timeout,
    /// Provider answered with an unexpected HTTP status
    Server { status: u16, message: String },
    /// Response body was empty or could not be decoded
    InvalidResponse(String),
    Geocode(String),
    Location(String),
    InvalidApiKey,
    NotFound(String),
    NotInitialized,
}

impl std::fmt::Display for WeatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherError::Network(s) => write!(f, "Weather error: {}", s),
            WeatherError::Timeout => write!(f, "Weather request timed out"),
            WeatherError::Server { status, message } => {
                write!(f, "Weather server returned {}: {}", status, message)
            }
            WeatherError::InvalidResponse(s) => write!(f, "Invalid weather response: {}", s),
            WeatherError::Geocode(s) => write!(f, "Geocoding error: {}", s),
            WeatherError::Location(s) => write!(f, "Location error: {}", s),
            WeatherError::InvalidApiKey => write!(f, "Weather API key rejected"),
            WeatherError::NotFound(s) => write!(f, "Not found: {}", s),
            WeatherError::NotInitialized => write!(f, "Weather service not initialized"),
        }
    }
}

impl std::error::Error for WeatherError {}

impl From<NetworkError> for WeatherError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::Timeout => WeatherError::Timeout,
            NetworkError::ServerError { status, message } => {
                WeatherError::Server { status, message }
            }
            NetworkError::InvalidResponse(s) => WeatherError::InvalidResponse(s),
            NetworkError::ConnectionFailed(s) => WeatherError::Network(s),
        }
    }
}

impl From<weathervk_weather::WeatherError> for WeatherError {
    fn from(e: weathervk_weather::WeatherError) -> Self {
        use weathervk_weather::WeatherError as Source;
        match e {
            Source::Network(e) => e.into_network_error().into(),
            Source::Status { status, body } => WeatherError::Server {
                status,
                message: body,
            },
            Source::EmptyBody => WeatherError::InvalidResponse("empty body".into()),
            Source::Decode(e) => WeatherError::InvalidResponse(e.to_string()),
            Source::InvalidApiKey => WeatherError::InvalidApiKey,
            Source::NotFound(s) => WeatherError::NotFound(s),
            Source::Geocode(s) => WeatherError::Geocode(s),
            Source::Location(e) => WeatherError::Location(e.to_string()),
        }
    }
}

/// Messages sent from async operations back to the UI thread.
/// `seq` is the request sequence number assigned by the controller.
#[derive(Debug)]
pub enum WeatherServiceMessage {
    /// Result of fetching weather for a saved or searched city
    CityFetched {
        seq: u64,
        result: Result<WeatherMainCast, WeatherError>,
    },
    /// Result of fetching weather for the device position
    LocationFetched {
        seq: u64,
        result: Result<WeatherForCity, WeatherError>,
    },
}

impl WeatherServiceMessage {
    pub fn seq(&self) -> u64 {
        match self {
            Self::CityFetched { seq, .. } | Self::LocationFetched { seq, .. } => *seq,
        }
    }
}

/// Request weather for a city at a known coordinate.
/// Sends `CityFetched` on the channel when complete.
pub fn request_city_fetch(
    tx: &Sender<WeatherServiceMessage>,
    runtime: &Handle,
    provider: Arc<WeatherProvider>,
    seq: u64,
    coordinate: Coordinate,
) {
    let tx = tx.clone();
    runtime.spawn(async move {
        let result = provider
            .fetch_city(coordinate)
            .await
            .map_err(WeatherError::from);
        let _ = tx.send(WeatherServiceMessage::CityFetched { seq, result });
    });
}

/// Geocode free text, then fetch weather for the first match.
/// Sends `CityFetched` on the channel when complete.
pub fn request_search(
    tx: &Sender<WeatherServiceMessage>,
    runtime: &Handle,
    geocoder: Arc<Geocoder>,
    provider: Arc<WeatherProvider>,
    seq: u64,
    text: String,
) {
    let tx = tx.clone();
    runtime.spawn(async move {
        let coordinate = match geocoder.geocode(&text).await {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(WeatherServiceMessage::CityFetched {
                    seq,
                    result: Err(e.into()),
                });
                return;
            }
        };

        let result = provider
            .fetch_city(coordinate)
            .await
            .map_err(WeatherError::from);
        let _ = tx.send(WeatherServiceMessage::CityFetched { seq, result });
    });
}

/// Fetch current weather and forecast for the device position.
/// An empty place name in the response is filled in by reverse geocoding.
pub fn request_location_fetch(
    tx: &Sender<WeatherServiceMessage>,
    runtime: &Handle,
    provider: Arc<WeatherProvider>,
    geocoder: Arc<Geocoder>,
    seq: u64,
    location: Location,
) {
    let tx = tx.clone();
    runtime.spawn(async move {
        tracing::info!("Got location: {}, {}", location.latitude, location.longitude);

        let result = match provider.fetch_location_weather(location.coordinate()).await {
            Ok(mut weather) => {
                if weather.name.trim().is_empty() {
                    if let Some(label) = geocoder.reverse(&location).await {
                        weather.name = label;
                    }
                }
                Ok(weather)
            }
            Err(e) => Err(WeatherError::from(e)),
        };
        let _ = tx.send(WeatherServiceMessage::LocationFetched { seq, result });
    });
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn weather_error_display() {
        assert!(format!("{}", WeatherError::Network("timeout".into())).contains("Weather"));
        assert!(format!("{}", WeatherError::Geocode("no match".into())).contains("Geocoding"));
        assert!(format!("{}", WeatherError::Location("failed".into())).contains("Location"));
        assert!(format!("{}", WeatherError::NotInitialized).contains("not initialized"));
        assert!(format!("{}", WeatherError::Timeout).contains("timed out"));
    }

    #[test]
    fn transport_errors_keep_their_kind() {
        let e: WeatherError = NetworkError::Timeout.into();
        assert!(matches!(e, WeatherError::Timeout));

        let e: WeatherError = NetworkError::ConnectionFailed("refused".into()).into();
        assert!(matches!(e, WeatherError::Network(ref s) if s == "refused"));
    }

    #[test]
    fn weather_error_from_provider_error() {
        let e: WeatherError = weathervk_weather::WeatherError::InvalidApiKey.into();
        assert!(matches!(e, WeatherError::InvalidApiKey));

        let e: WeatherError = weathervk_weather::WeatherError::EmptyBody.into();
        assert!(matches!(e, WeatherError::InvalidResponse(_)));

        let e: WeatherError = weathervk_weather::WeatherError::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        assert!(matches!(e, WeatherError::Server { status: 502, .. }));

        let e: WeatherError =
            weathervk_weather::WeatherError::Location(weathervk_weather::LocationError::PermissionDenied)
                .into();
        assert!(matches!(e, WeatherError::Location(_)));
    }

    #[test]
    fn message_carries_sequence() {
        let msg = WeatherServiceMessage::CityFetched {
            seq: 7,
            result: Err(WeatherError::NotInitialized),
        };
        assert_eq!(msg.seq(), 7);
    }
}
