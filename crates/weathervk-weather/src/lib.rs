//! Weather service for WeatherVK
//!
//! Provides current weather via the OpenWeatherMap API, Nominatim geocoding,
//! and a configurable device location source.

pub mod geocode;
pub mod location;
pub mod provider;
pub mod retry;
pub mod types;

pub use geocode::{Geocoder, GeocoderSettings};
pub use location::{LocationSource, LocationUpdate, PermissionStatus};
pub use provider::{ProviderSettings, WeatherProvider};
pub use retry::RetryConfig;
pub use types::*;
