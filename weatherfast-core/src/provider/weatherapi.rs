use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{REQUEST_TIMEOUT, WeatherProvider, truncate_body, unix_to_utc};
use crate::model::{
    CurrentConditions, DailySnapshot, ForecastBundle, ForecastRequest, HourlySnapshot, UvIndex,
    WeatherCondition, Wind,
};

const WEATHERAPI_URL: &str = "http://api.weatherapi.com";

/// WeatherAPI.com forecast endpoint. Needs an API key; free plans cap `days` at 3.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, WEATHERAPI_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for WeatherAPI.com")?;

        Ok(Self { api_key, base_url: base_url.into(), http })
    }

    async fn fetch(&self, request: &ForecastRequest) -> Result<WaForecastResponse> {
        let url = format!("{}/v1/forecast.json", self.base_url.trim_end_matches('/'));
        let q = format!("{},{}", request.coordinate.latitude, request.coordinate.longitude);
        let days = request.days.to_string();

        let res = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", q.as_str()),
                ("days", days.as_str()),
                ("aqi", "no"),
                ("alerts", "no"),
            ])
            .send()
            .await
            .context("Failed to send request to WeatherAPI.com (forecast)")?;

        let status = res.status();
        let body =
            res.text().await.context("Failed to read WeatherAPI forecast response body")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "WeatherAPI forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).context("Failed to parse WeatherAPI forecast JSON")
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
    localtime_epoch: i64,
    /// Wall-clock time at the location, "YYYY-MM-DD H:MM".
    localtime: String,
}

impl WaLocation {
    /// WeatherAPI has no offset field; derive it from local wall time vs epoch,
    /// rounded to the nearest quarter hour.
    fn utc_offset_seconds(&self) -> i32 {
        let Ok(local) = NaiveDateTime::parse_from_str(&self.localtime, "%Y-%m-%d %H:%M") else {
            return 0;
        };
        let raw = local.and_utc().timestamp() - self.localtime_epoch;
        let quarter = 15 * 60;
        ((raw as f64 / quarter as f64).round() as i64 * quarter) as i32
    }
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    code: i32,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    last_updated_epoch: i64,
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    pressure_mb: f64,
    dewpoint_c: Option<f64>,
    uv: f64,
    wind_kph: f64,
    wind_degree: f64,
    vis_km: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastHour {
    time_epoch: i64,
    temp_c: f64,
    dewpoint_c: Option<f64>,
    chance_of_rain: Option<u8>,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    maxtemp_c: f64,
    mintemp_c: f64,
    daily_chance_of_rain: Option<u8>,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: NaiveDate,
    day: WaDay,
    hour: Vec<WaForecastHour>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    current: WaCurrent,
    forecast: WaForecast,
}

impl WaForecastResponse {
    fn into_bundle(self) -> Result<ForecastBundle> {
        let utc_offset_seconds = self.location.utc_offset_seconds();
        let location_name = format!("{}, {}", self.location.name, self.location.country);
        let current = self.current;

        let observed_at = unix_to_utc(current.last_updated_epoch).unwrap_or_else(Utc::now);

        // Older API versions omit dew point on `current`; use the closest hour instead.
        let dew_point_c = current
            .dewpoint_c
            .or_else(|| {
                self.forecast
                    .forecastday
                    .iter()
                    .flat_map(|d| d.hour.iter())
                    .min_by_key(|h| (h.time_epoch - current.last_updated_epoch).abs())
                    .and_then(|h| h.dewpoint_c)
            })
            .ok_or_else(|| anyhow::anyhow!("WeatherAPI response contained no dew point"))?;

        let mut hourly = Vec::new();
        let mut daily = Vec::with_capacity(self.forecast.forecastday.len());

        for day in self.forecast.forecastday {
            for h in day.hour {
                let time = unix_to_utc(h.time_epoch)
                    .ok_or_else(|| anyhow::anyhow!("WeatherAPI hourly time out of range"))?;
                hourly.push(HourlySnapshot {
                    time,
                    temperature_c: h.temp_c,
                    condition: WeatherCondition::from_weatherapi_code(h.condition.code),
                    precipitation_chance_pct: h.chance_of_rain.unwrap_or(0),
                });
            }

            daily.push(DailySnapshot {
                date: day.date,
                low_c: day.day.mintemp_c,
                high_c: day.day.maxtemp_c,
                condition: WeatherCondition::from_weatherapi_code(day.day.condition.code),
                precipitation_chance_pct: day.day.daily_chance_of_rain.unwrap_or(0),
            });
        }

        if daily.is_empty() {
            return Err(anyhow::anyhow!("WeatherAPI response contained no forecastday data"));
        }

        Ok(ForecastBundle {
            provider: "weatherapi".to_string(),
            location_name: Some(location_name),
            utc_offset_seconds,
            fetched_at: Utc::now(),
            current: CurrentConditions {
                observed_at,
                temperature_c: current.temp_c,
                apparent_temperature_c: current.feelslike_c,
                condition: WeatherCondition::from_weatherapi_code(current.condition.code),
                humidity_pct: current.humidity,
                pressure_hpa: current.pressure_mb,
                dew_point_c,
                uv_index: UvIndex(current.uv),
                wind: Wind { speed_kph: current.wind_kph, direction_deg: current.wind_degree },
                visibility_m: current.vis_km * 1000.0,
            },
            hourly,
            daily,
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn get_forecast(&self, request: &ForecastRequest) -> Result<ForecastBundle> {
        self.fetch(request).await?.into_bundle()
    }
}
