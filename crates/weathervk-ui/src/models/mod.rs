mod city_list_model;
mod current_location_model;

pub use city_list_model::{CityListModel, CityRow};
pub use current_location_model::{CurrentLocationModel, CurrentLocationRow, ForecastLine};
