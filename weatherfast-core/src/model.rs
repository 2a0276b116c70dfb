use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::projection;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

impl std::str::FromStr for Coordinate {
    type Err = anyhow::Error;

    /// Parses `"lat,lon"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("Expected coordinate as LAT,LON, got '{s}'"))?;

        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid latitude '{}'", lat.trim()))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid longitude '{}'", lon.trim()))?;

        if !(-90.0..=90.0).contains(&latitude) {
            anyhow::bail!("Latitude {latitude} out of range (-90..=90)");
        }
        if !(-180.0..=180.0).contains(&longitude) {
            anyhow::bail!("Longitude {longitude} out of range (-180..=180)");
        }

        Ok(Self { latitude, longitude })
    }
}

/// A single reported position from a location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub coordinate: Coordinate,
    pub horizontal_accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    pub fn new(coordinate: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self { coordinate, horizontal_accuracy_m: None, timestamp }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForecastRequest {
    pub coordinate: Coordinate,
    /// Number of daily entries to request, including today.
    pub days: u8,
}

impl ForecastRequest {
    pub const DEFAULT_DAYS: u8 = 10;

    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate, days: Self::DEFAULT_DAYS }
    }
}

/// Normalized weather condition shared by all providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert a WMO weather interpretation code.
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet,
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    /// Convert a WeatherAPI.com condition code.
    /// See: https://www.weatherapi.com/docs/weather_conditions.json
    pub fn from_weatherapi_code(code: i32) -> Self {
        match code {
            1000 => Self::Clear,
            1003 => Self::PartlyCloudy,
            1006 | 1009 => Self::Cloudy,
            1030 | 1135 | 1147 => Self::Fog,
            1150 | 1153 | 1180 | 1183 => Self::Drizzle,
            1063 | 1186 | 1189 | 1240 => Self::Rain,
            1192 | 1195 | 1243 | 1246 => Self::HeavyRain,
            1069 | 1072 | 1168 | 1171 | 1198 | 1201 | 1204 | 1207 | 1237 | 1249 | 1252
            | 1261 | 1264 => Self::Sleet,
            1066 | 1114 | 1117 | 1210 | 1213 | 1216 | 1219 | 1222 | 1225 | 1255 | 1258 => {
                Self::Snow
            }
            1087 | 1273 | 1276 | 1279 | 1282 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    /// Symbol identifier handed to renderers.
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun.max",
            Self::PartlyCloudy => "cloud.sun",
            Self::Cloudy => "cloud",
            Self::Fog => "cloud.fog",
            Self::Drizzle => "cloud.drizzle",
            Self::Rain => "cloud.rain",
            Self::HeavyRain => "cloud.heavyrain",
            Self::Snow => "cloud.snow",
            Self::Sleet => "cloud.sleet",
            Self::Thunderstorm => "cloud.bolt.rain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvCategory {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UvCategory::Low => "Low",
            UvCategory::Moderate => "Moderate",
            UvCategory::High => "High",
            UvCategory::VeryHigh => "Very High",
            UvCategory::Extreme => "Extreme",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UvIndex(pub f64);

impl UvIndex {
    /// Rounded index as shown to users.
    pub fn value(&self) -> u8 {
        self.0.round().clamp(0.0, u8::MAX as f64) as u8
    }

    /// WHO exposure category.
    pub fn category(&self) -> UvCategory {
        match self.value() {
            0..=2 => UvCategory::Low,
            3..=5 => UvCategory::Moderate,
            6..=7 => UvCategory::High,
            8..=10 => UvCategory::VeryHigh,
            _ => UvCategory::Extreme,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed_kph: f64,
    /// Meteorological direction the wind blows from, degrees clockwise from north.
    pub direction_deg: f64,
}

impl Wind {
    pub fn compass_direction(&self) -> &'static str {
        const POINTS: [&str; 16] = [
            "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W",
            "WNW", "NW", "NNW",
        ];
        let normalized = self.direction_deg.rem_euclid(360.0);
        let index = ((normalized / 22.5).round() as usize) % POINTS.len();
        POINTS[index]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub observed_at: DateTime<Utc>,
    pub temperature_c: f64,
    pub apparent_temperature_c: f64,
    pub condition: WeatherCondition,
    pub humidity_pct: u8,
    pub pressure_hpa: f64,
    pub dew_point_c: f64,
    pub uv_index: UvIndex,
    pub wind: Wind,
    pub visibility_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySnapshot {
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub condition: WeatherCondition,
    pub precipitation_chance_pct: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub low_c: f64,
    pub high_c: f64,
    pub condition: WeatherCondition,
    pub precipitation_chance_pct: u8,
}

/// Everything one fetch returns. Replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub provider: String,
    pub location_name: Option<String>,
    /// Offset of the forecast location's local time from UTC.
    pub utc_offset_seconds: i32,
    pub fetched_at: DateTime<Utc>,
    pub current: CurrentConditions,
    pub hourly: Vec<HourlySnapshot>,
    pub daily: Vec<DailySnapshot>,
}

impl ForecastBundle {
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    /// Hourly entries from the fetch moment on, at most 24.
    pub fn upcoming_hourly(&self) -> Vec<&HourlySnapshot> {
        projection::upcoming_hourly(&self.hourly, self.fetched_at)
    }
}
