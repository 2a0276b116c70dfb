//! Read-only projections for renderers.
//!
//! Every function here is pure: same input, same rows. Renderers decide
//! layout and styling; they never see raw provider data.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CurrentConditions, DailySnapshot, HourlySnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    pub fn convert(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Whole degrees with the unit suffix, e.g. `31°C`.
pub fn format_temperature(celsius: f64, unit: TemperatureUnit) -> String {
    let value = unit.convert(celsius).round();
    // Avoid "-0°C".
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:.0}{}", unit.symbol())
}

/// Hour of day on a 12-hour clock, e.g. `3PM`, `12AM`.
pub fn format_hour(time: DateTime<Utc>, offset: FixedOffset) -> String {
    time.with_timezone(&offset).format("%-I%p").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyRow {
    pub time_label: String,
    pub icon: &'static str,
    pub temperature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRow {
    pub weekday: String,
    pub icon: &'static str,
    pub low: String,
    pub high: String,
}

pub fn hourly_rows(
    hours: &[&HourlySnapshot],
    offset: FixedOffset,
    unit: TemperatureUnit,
) -> Vec<HourlyRow> {
    hours
        .iter()
        .map(|h| HourlyRow {
            time_label: format_hour(h.time, offset),
            icon: h.condition.icon_name(),
            temperature: format_temperature(h.temperature_c, unit),
        })
        .collect()
}

pub fn daily_rows(days: &[DailySnapshot], unit: TemperatureUnit) -> Vec<DailyRow> {
    days.iter()
        .map(|d| DailyRow {
            weekday: d.date.format("%a").to_string(),
            icon: d.condition.icon_name(),
            low: format_temperature(d.low_c, unit),
            high: format_temperature(d.high_c, unit),
        })
        .collect()
}

/// Labelled values for the current-conditions panel, in display order.
pub fn current_panel(
    current: &CurrentConditions,
    offset: FixedOffset,
    unit: TemperatureUnit,
) -> Vec<(&'static str, String)> {
    let observed = current.observed_at.with_timezone(&offset);
    let uv = current.uv_index;

    vec![
        ("Observed", observed.format("%a %-d %b, %-I:%M %p").to_string()),
        ("Condition", current.condition.description().to_string()),
        ("Temperature", format_temperature(current.temperature_c, unit)),
        ("Feels like", format_temperature(current.apparent_temperature_c, unit)),
        ("Humidity", format!("{}%", current.humidity_pct)),
        ("Pressure", format!("{:.0} hPa", current.pressure_hpa)),
        ("Dew point", format_temperature(current.dew_point_c, unit)),
        ("UV index", format!("{} - {}", uv.value(), uv.category().as_str())),
        ("Wind speed", format!("{:.0} km/h", current.wind.speed_kph)),
        ("Wind direction", current.wind.compass_direction().to_string()),
        ("Visibility", format!("{:.1} km", current.visibility_m / 1000.0)),
    ]
}
