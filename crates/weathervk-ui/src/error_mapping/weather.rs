use crate::services::weather_service::WeatherError as UiWeatherError;
use weathervk_core::{AppError, NetworkError, WeatherError};

impl From<UiWeatherError> for AppError {
    fn from(e: UiWeatherError) -> Self {
        match e {
            UiWeatherError::Network(s) => AppError::Network(NetworkError::ConnectionFailed(s)),
            UiWeatherError::Timeout => AppError::Network(NetworkError::Timeout),
            UiWeatherError::Server { status, message } if status >= 500 => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            UiWeatherError::Server { status, message } => {
                AppError::Weather(WeatherError::ApiError(format!("{status}: {message}")))
            }
            UiWeatherError::InvalidResponse(s) => {
                AppError::Network(NetworkError::InvalidResponse(s))
            }
            UiWeatherError::Geocode(s) => AppError::Weather(WeatherError::LocationNotFound(s)),
            UiWeatherError::NotFound(s) => AppError::Weather(WeatherError::LocationNotFound(s)),
            UiWeatherError::Location(s) => AppError::Weather(WeatherError::LocationUnavailable(s)),
            UiWeatherError::InvalidApiKey => AppError::Weather(WeatherError::InvalidApiKey),
            UiWeatherError::NotInitialized => AppError::Weather(WeatherError::ServiceUnavailable),
        }
    }
}
