//! Presentation layer for WeatherVK: the controller that owns the store and
//! the weather services, the list models it renders, and the bridge that
//! runs network work off the UI thread.

pub mod bridge;
pub mod controller;
pub mod error_mapping;
pub mod models;
pub mod services;

pub use controller::{ReloadDelegate, WeatherController};
pub use models::{CityListModel, CityRow, CurrentLocationModel, CurrentLocationRow, ForecastLine};
pub use services::{WeatherError, WeatherServiceMessage};
