use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{REQUEST_TIMEOUT, WeatherProvider, truncate_body, unix_to_utc};
use crate::model::{
    CurrentConditions, DailySnapshot, ForecastBundle, ForecastRequest, HourlySnapshot, UvIndex,
    WeatherCondition, Wind,
};

const OPEN_METEO_URL: &str = "https://api.open-meteo.com";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
weather_code,pressure_msl,wind_speed_10m,wind_direction_10m,dew_point_2m,uv_index,visibility";
const HOURLY_FIELDS: &str = "temperature_2m,weather_code,precipitation_probability";
const DAILY_FIELDS: &str =
    "weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max";

/// Open-Meteo forecast API. Free, no key required.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new() -> Result<Self> {
        Self::with_base_url(OPEN_METEO_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for Open-Meteo")?;

        Ok(Self { base_url: base_url.into(), http })
    }

    async fn fetch(&self, request: &ForecastRequest) -> Result<OmResponse> {
        let url = format!("{}/v1/forecast", self.base_url.trim_end_matches('/'));

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", request.coordinate.latitude.to_string()),
                ("longitude", request.coordinate.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("forecast_days", request.days.to_string()),
                ("timezone", "auto".to_string()),
                ("timeformat", "unixtime".to_string()),
                ("wind_speed_unit", "kmh".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo (forecast)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Open-Meteo forecast response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).context("Failed to parse Open-Meteo forecast JSON")
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: i64,
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    weather_code: i32,
    pressure_msl: f64,
    wind_speed_10m: f64,
    wind_direction_10m: f64,
    dew_point_2m: f64,
    uv_index: f64,
    visibility: f64,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<i64>,
    temperature_2m: Vec<f64>,
    weather_code: Vec<i32>,
    precipitation_probability: Vec<Option<u8>>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<i64>,
    weather_code: Vec<i32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    precipitation_probability_max: Vec<Option<u8>>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    utc_offset_seconds: i32,
    current: OmCurrent,
    hourly: OmHourly,
    daily: OmDaily,
}

impl OmResponse {
    fn into_bundle(self) -> Result<ForecastBundle> {
        let OmResponse { utc_offset_seconds, current, hourly, daily } = self;

        let n = hourly.time.len();
        if hourly.temperature_2m.len() != n
            || hourly.weather_code.len() != n
            || hourly.precipitation_probability.len() != n
        {
            return Err(anyhow!("Open-Meteo hourly arrays have mismatched lengths"));
        }

        let d = daily.time.len();
        if daily.weather_code.len() != d
            || daily.temperature_2m_max.len() != d
            || daily.temperature_2m_min.len() != d
            || daily.precipitation_probability_max.len() != d
        {
            return Err(anyhow!("Open-Meteo daily arrays have mismatched lengths"));
        }

        let observed_at = unix_to_utc(current.time)
            .ok_or_else(|| anyhow!("Open-Meteo current time {} out of range", current.time))?;

        let hourly = (0..n)
            .map(|i| {
                let time = unix_to_utc(hourly.time[i])
                    .ok_or_else(|| anyhow!("Open-Meteo hourly time out of range"))?;
                Ok(HourlySnapshot {
                    time,
                    temperature_c: hourly.temperature_2m[i],
                    condition: WeatherCondition::from_wmo_code(hourly.weather_code[i]),
                    precipitation_chance_pct: hourly.precipitation_probability[i].unwrap_or(0),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Daily timestamps are local midnight; shift by the offset to get the local date.
        let offset = Duration::seconds(utc_offset_seconds.into());
        let daily = (0..d)
            .map(|i| {
                let midnight = unix_to_utc(daily.time[i])
                    .ok_or_else(|| anyhow!("Open-Meteo daily time out of range"))?;
                Ok(DailySnapshot {
                    date: (midnight + offset).date_naive(),
                    low_c: daily.temperature_2m_min[i],
                    high_c: daily.temperature_2m_max[i],
                    condition: WeatherCondition::from_wmo_code(daily.weather_code[i]),
                    precipitation_chance_pct: daily.precipitation_probability_max[i].unwrap_or(0),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ForecastBundle {
            provider: "open-meteo".to_string(),
            location_name: None,
            utc_offset_seconds,
            fetched_at: Utc::now(),
            current: CurrentConditions {
                observed_at,
                temperature_c: current.temperature_2m,
                apparent_temperature_c: current.apparent_temperature,
                condition: WeatherCondition::from_wmo_code(current.weather_code),
                humidity_pct: current.relative_humidity_2m.round().clamp(0.0, 100.0) as u8,
                pressure_hpa: current.pressure_msl,
                dew_point_c: current.dew_point_2m,
                uv_index: UvIndex(current.uv_index),
                wind: Wind {
                    speed_kph: current.wind_speed_10m,
                    direction_deg: current.wind_direction_10m,
                },
                visibility_m: current.visibility,
            },
            hourly,
            daily,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn get_forecast(&self, request: &ForecastRequest) -> Result<ForecastBundle> {
        self.fetch(request).await?.into_bundle()
    }
}
