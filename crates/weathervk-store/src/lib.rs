//! Local persistence for saved cities and their forecasts.

pub mod error;
pub mod record;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use record::{CityRecord, DailyForecastRecord, ForecastKind};
pub use store::WeatherStore;
