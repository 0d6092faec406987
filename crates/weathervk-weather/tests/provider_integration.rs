//! Integration tests for WeatherProvider and Geocoder using wiremock.

use std::time::Duration;

use weathervk_weather::{
    Coordinate, Geocoder, GeocoderSettings, ProviderSettings, RetryConfig, UnitSystem,
    WeatherError, WeatherProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn weather_json(name: &str, temp: f64, humidity: u8) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": 37.6156, "lat": 55.7522},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "base": "stations",
        "main": {"temp": temp, "feels_like": temp, "temp_min": temp, "temp_max": temp, "pressure": 1015, "humidity": humidity},
        "visibility": 10000,
        "wind": {"speed": 3.0, "deg": 180},
        "clouds": {"all": 0},
        "dt": 1711285200,
        "timezone": 10800,
        "id": 524901,
        "name": name,
        "cod": 200
    })
}

fn provider(server: &MockServer, retries: u32) -> WeatherProvider {
    let settings = ProviderSettings::new("test-key")
        .with_base_url(server.uri())
        .with_units(UnitSystem::Metric)
        .with_retry(RetryConfig::new(retries, 1, 5));
    WeatherProvider::new(settings).unwrap()
}

#[tokio::test]
async fn test_fetch_city_sends_expected_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "55.7522"))
        .and(query_param("lon", "37.6156"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json("Moscow", 15.3, 60)))
        .expect(1)
        .mount(&server)
        .await;

    let weather = provider(&server, 0)
        .fetch_city(Coordinate::new(55.7522, 37.6156))
        .await
        .unwrap();

    assert_eq!(weather.name, "Moscow");
    assert_eq!(weather.main.temp, 15.3);
    assert_eq!(weather.main.humidity, 60);
}

#[tokio::test]
async fn test_fetch_city_invalid_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key."
        })))
        .mount(&server)
        .await;

    let err = provider(&server, 0)
        .fetch_city(Coordinate::new(1.0, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::InvalidApiKey), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_city_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = provider(&server, 0)
        .fetch_city(Coordinate::new(1.0, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::EmptyBody), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_city_malformed_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"name\": 42"))
        .mount(&server)
        .await;

    let err = provider(&server, 0)
        .fetch_city(Coordinate::new(1.0, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_city_non_ok_success_status_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = provider(&server, 0)
        .fetch_city(Coordinate::new(1.0, 2.0))
        .await
        .unwrap_err();
    assert!(
        matches!(err, WeatherError::Status { status: 204, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_fetch_city_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json("Kazan", 9.0, 70)))
        .mount(&server)
        .await;

    let weather = provider(&server, 2)
        .fetch_city(Coordinate::new(55.79, 49.12))
        .await
        .unwrap();
    assert_eq!(weather.name, "Kazan");
}

#[tokio::test]
async fn test_fetch_city_does_not_retry_client_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server, 3)
        .fetch_city(Coordinate::new(1.0, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_location_weather_decodes_forecast_shape() {
    let server = MockServer::start().await;

    let mut body = weather_json("Moscow", 4.6, 81);
    body["current"] = serde_json::json!({"dt": 1711285200, "temp": 4.6, "weather": []});
    body["weeklyForecast"] = serde_json::json!([
        {"dt": 1711371600, "temp": {"max": 7.0}, "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}]}
    ]);

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let weather = provider(&server, 0)
        .fetch_location_weather(Coordinate::new(55.75, 37.61))
        .await
        .unwrap();

    assert_eq!(weather.name, "Moscow");
    assert!(weather.has_forecast());
    assert_eq!(weather.weekly_forecast.len(), 1);
    assert_eq!(weather.temperature(), Some(4.6));
}

#[tokio::test]
async fn test_fetch_city_transport_failure() {
    // Nothing listens on the discard port
    let settings = ProviderSettings::new("k")
        .with_base_url("http://127.0.0.1:9")
        .with_retry(RetryConfig::none());
    let provider = WeatherProvider::new(settings).unwrap();

    let err = provider
        .fetch_city(Coordinate::new(1.0, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::Network(_)), "got {err:?}");
}

fn geocoder(server: &MockServer) -> Geocoder {
    Geocoder::new(GeocoderSettings {
        base_url: server.uri(),
        user_agent: "weathervk-tests".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_geocode_returns_first_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Kazan"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"lat": "55.7823547", "lon": "49.1242266", "display_name": "Kazan, Tatarstan, Russia"}
        ])))
        .mount(&server)
        .await;

    let coordinate = geocoder(&server).geocode("  Kazan ").await.unwrap();
    assert_eq!(coordinate, Coordinate::new(55.7823547, 49.1242266));
}

#[tokio::test]
async fn test_geocode_no_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let err = geocoder(&server).geocode("Atlantis").await.unwrap_err();
    assert!(matches!(err, WeatherError::Geocode(ref m) if m.contains("Atlantis")), "got {err:?}");
}

#[tokio::test]
async fn test_geocode_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;

    let err = geocoder(&server).geocode("Kazan").await.unwrap_err();
    assert!(matches!(err, WeatherError::Decode(_)), "got {err:?}");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_reverse_geocode_labels_coordinate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "display_name": "Kazan, Tatarstan, Russia",
            "address": {"city": "Kazan", "state": "Tatarstan", "country": "Russia"}
        })))
        .mount(&server)
        .await;

    let location = Coordinate::new(55.78, 49.12).into();
    let label = geocoder(&server).reverse(&location).await;
    assert_eq!(label.as_deref(), Some("Kazan, Tatarstan"));
}
