pub mod weather_service;

pub use weather_service::{
    request_city_fetch, request_location_fetch, request_search, WeatherError,
    WeatherServiceMessage,
};
