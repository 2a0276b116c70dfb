//! End-to-end: location fix -> Open-Meteo fetch -> projections.

use chrono::Utc;
use std::sync::Arc;
use weatherfast_core::{
    Config, Coordinate, CoordinateSource, FetchStatus, TemperatureUnit, WeatherSession,
    display, location::StaticLocationSource, provider::open_meteo::OpenMeteoProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 30 hourly entries: 10 in the past, 20 ahead of `now`.
fn forecast_body(now: i64) -> serde_json::Value {
    let times: Vec<i64> = (-10..=20).filter(|k| *k != 0).map(|k| now + k * 3600).collect();
    let temps: Vec<f64> = (0..times.len()).map(|i| 25.0 + i as f64 * 0.1).collect();
    let codes: Vec<i32> = vec![1; times.len()];
    let chances: Vec<u8> = vec![10; times.len()];

    let days: Vec<i64> = (0..10).map(|d| now + d * 86_400).collect();

    serde_json::json!({
        "utc_offset_seconds": 0,
        "current": {
            "time": now,
            "temperature_2m": 18.2,
            "relative_humidity_2m": 81,
            "apparent_temperature": 17.5,
            "weather_code": 61,
            "pressure_msl": 1016.2,
            "wind_speed_10m": 21.0,
            "wind_direction_10m": 250,
            "dew_point_2m": 14.9,
            "uv_index": 1.2,
            "visibility": 16000.0
        },
        "hourly": {
            "time": times,
            "temperature_2m": temps,
            "weather_code": codes,
            "precipitation_probability": chances
        },
        "daily": {
            "time": days,
            "weather_code": vec![3; 10],
            "temperature_2m_max": vec![20.0; 10],
            "temperature_2m_min": vec![11.0; 10],
            "precipitation_probability_max": vec![30; 10]
        }
    })
}

#[tokio::test]
async fn device_fix_to_rendered_rows() {
    let now = Utc::now().timestamp();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "51.5"))
        .and(query_param("longitude", "-0.12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(now)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenMeteoProvider::with_base_url(mock_server.uri()).unwrap();
    let source = StaticLocationSource::at(Coordinate::new(51.5, -0.12));
    let config = Config { coordinate: CoordinateSource::Device, ..Config::default() };

    let session = WeatherSession::start(Arc::new(source), Arc::new(provider), &config);
    let state = session.wait_for_forecast().await;

    assert_eq!(state.status, FetchStatus::Ready);
    let bundle = state.bundle.expect("bundle after ready");

    let upcoming = bundle.upcoming_hourly();
    assert_eq!(bundle.hourly.len(), 30);
    assert_eq!(upcoming.len(), 20);

    let hourly = display::hourly_rows(&upcoming, bundle.utc_offset(), TemperatureUnit::Celsius);
    assert_eq!(hourly.len(), 20);
    assert!(hourly.iter().all(|r| r.icon == "cloud.sun"));
    assert!(hourly.iter().all(|r| r.time_label.ends_with("AM") || r.time_label.ends_with("PM")));

    let daily = display::daily_rows(&bundle.daily, TemperatureUnit::Fahrenheit);
    assert_eq!(daily.len(), 10);
    assert_eq!(daily[0].low, "52°F");
    assert_eq!(daily[0].high, "68°F");
}

#[tokio::test]
async fn failed_fetch_reports_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let provider = OpenMeteoProvider::with_base_url(mock_server.uri()).unwrap();
    let source = StaticLocationSource::at(Coordinate::new(51.5, -0.12));

    let session = WeatherSession::start(Arc::new(source), Arc::new(provider), &Config::default());
    let state = session.wait_for_forecast().await;

    assert!(state.bundle.is_none());
    match state.status {
        FetchStatus::Unavailable(reason) => assert!(reason.contains("503")),
        other => panic!("expected unavailable, got {other:?}"),
    }
}
