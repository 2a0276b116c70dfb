//! Integration tests for WeatherApiProvider using wiremock.

use chrono::NaiveDate;
use weatherfast_core::{
    Coordinate, ForecastRequest, WeatherProvider, model::WeatherCondition,
    provider::weatherapi::WeatherApiProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// 2023-04-02 04:00:00 UTC, noon in Singapore.
const NOW: i64 = 1_680_408_000;

fn hour(epoch: i64, temp: f64, code: i32, dew: f64) -> serde_json::Value {
    serde_json::json!({
        "time_epoch": epoch,
        "time": "ignored",
        "temp_c": temp,
        "dewpoint_c": dew,
        "chance_of_rain": 40,
        "condition": { "text": "whatever", "code": code }
    })
}

fn forecast_body(with_current_dewpoint: bool) -> serde_json::Value {
    let mut current = serde_json::json!({
        "last_updated_epoch": NOW,
        "temp_c": 30.0,
        "feelslike_c": 35.2,
        "humidity": 70,
        "pressure_mb": 1009.0,
        "uv": 7.0,
        "wind_kph": 14.4,
        "wind_degree": 200,
        "vis_km": 10.0,
        "condition": { "text": "Partly cloudy", "code": 1003 }
    });
    if with_current_dewpoint {
        current["dewpoint_c"] = serde_json::json!(23.9);
    }

    serde_json::json!({
        "location": {
            "name": "Singapore",
            "country": "Singapore",
            "tz_id": "Asia/Singapore",
            "localtime_epoch": NOW,
            "localtime": "2023-04-02 12:00"
        },
        "current": current,
        "forecast": {
            "forecastday": [
                {
                    "date": "2023-04-02",
                    "date_epoch": NOW - 4 * 3600,
                    "day": {
                        "maxtemp_c": 32.0,
                        "mintemp_c": 25.0,
                        "daily_chance_of_rain": 87,
                        "condition": { "text": "Moderate rain", "code": 1189 }
                    },
                    "hour": [
                        hour(NOW - 3600, 29.5, 1003, 22.0),
                        hour(NOW, 30.0, 1003, 24.5),
                    ]
                },
                {
                    "date": "2023-04-03",
                    "date_epoch": NOW + 20 * 3600,
                    "day": {
                        "maxtemp_c": 31.0,
                        "mintemp_c": 24.0,
                        "condition": { "text": "Thundery outbreaks", "code": 1087 }
                    },
                    "hour": [hour(NOW + 86_400, 26.0, 1276, 23.0)]
                }
            ]
        }
    })
}

#[tokio::test]
async fn test_forecast_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .and(query_param("key", "SECRET"))
        .and(query_param("q", "1.30437,103.82458"))
        .and(query_param("days", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(true)))
        .mount(&mock_server)
        .await;

    let provider = WeatherApiProvider::with_base_url("SECRET".into(), mock_server.uri()).unwrap();
    let request = ForecastRequest::new(Coordinate::new(1.30437, 103.82458));

    let bundle = provider.get_forecast(&request).await.unwrap();

    assert_eq!(bundle.provider, "weatherapi");
    assert_eq!(bundle.location_name.as_deref(), Some("Singapore, Singapore"));
    assert_eq!(bundle.utc_offset_seconds, 8 * 3600);
    assert_eq!(bundle.current.condition, WeatherCondition::PartlyCloudy);
    assert_eq!(bundle.current.dew_point_c, 23.9);
    assert_eq!(bundle.current.visibility_m, 10_000.0);
    assert_eq!(bundle.current.wind.compass_direction(), "SSW");

    // Hours from every forecast day, flattened in order.
    assert_eq!(bundle.hourly.len(), 3);
    assert_eq!(bundle.hourly[2].condition, WeatherCondition::Thunderstorm);
    assert!(bundle.hourly.windows(2).all(|w| w[0].time < w[1].time));

    assert_eq!(bundle.daily.len(), 2);
    assert_eq!(bundle.daily[0].date, NaiveDate::from_ymd_opt(2023, 4, 2).unwrap());
    assert_eq!(bundle.daily[0].condition, WeatherCondition::Rain);
    assert_eq!(bundle.daily[0].precipitation_chance_pct, 87);
    assert_eq!(bundle.daily[1].precipitation_chance_pct, 0);
}

#[tokio::test]
async fn test_dew_point_falls_back_to_nearest_hour() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(false)))
        .mount(&mock_server)
        .await;

    let provider = WeatherApiProvider::with_base_url("KEY".into(), mock_server.uri()).unwrap();
    let bundle = provider
        .get_forecast(&ForecastRequest::new(Coordinate::new(1.0, 1.0)))
        .await
        .unwrap();

    assert_eq!(bundle.current.dew_point_c, 24.5);
}

#[tokio::test]
async fn test_invalid_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": 2006, "message": "API key is invalid." }
        })))
        .mount(&mock_server)
        .await;

    let provider = WeatherApiProvider::with_base_url("BAD".into(), mock_server.uri()).unwrap();
    let err = provider
        .get_forecast(&ForecastRequest::new(Coordinate::new(1.0, 1.0)))
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("401"));
    assert!(msg.contains("API key is invalid."));
}

#[tokio::test]
async fn test_empty_forecast_rejected() {
    let mock_server = MockServer::start().await;

    let mut body = forecast_body(true);
    body["forecast"]["forecastday"] = serde_json::json!([]);

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let provider = WeatherApiProvider::with_base_url("KEY".into(), mock_server.uri()).unwrap();
    let err = provider
        .get_forecast(&ForecastRequest::new(Coordinate::new(1.0, 1.0)))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("no forecastday data"));
}
