//! Fixtures shared by unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc, time::Duration};

use crate::{
    model::{
        Coordinate, CurrentConditions, DailySnapshot, Fix, ForecastBundle, ForecastRequest,
        HourlySnapshot, UvIndex, WeatherCondition, Wind,
    },
    provider::WeatherProvider,
};

pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 4, 2, 4, 0, 0).single().expect("valid timestamp")
}

pub(crate) fn fix(latitude: f64, longitude: f64) -> Fix {
    Fix::new(Coordinate::new(latitude, longitude), epoch())
}

/// Deterministic bundle; `tag` is the current temperature so bundles compare distinct.
pub(crate) fn bundle(tag: f64) -> ForecastBundle {
    let start = epoch() - ChronoDuration::hours(6);
    let first_day = NaiveDate::from_ymd_opt(2023, 4, 2).expect("valid date");

    ForecastBundle {
        provider: "mock".to_string(),
        location_name: Some("Testville".to_string()),
        utc_offset_seconds: 8 * 3600,
        fetched_at: epoch(),
        current: CurrentConditions {
            observed_at: epoch(),
            temperature_c: tag,
            apparent_temperature_c: tag + 2.0,
            condition: WeatherCondition::PartlyCloudy,
            humidity_pct: 70,
            pressure_hpa: 1010.0,
            dew_point_c: 22.0,
            uv_index: UvIndex(5.0),
            wind: Wind { speed_kph: 12.0, direction_deg: 90.0 },
            visibility_m: 10_000.0,
        },
        hourly: (0..30)
            .map(|i| HourlySnapshot {
                time: start + ChronoDuration::hours(i),
                temperature_c: tag + i as f64 / 10.0,
                condition: WeatherCondition::Clear,
                precipitation_chance_pct: 10,
            })
            .collect(),
        daily: (0..10)
            .map(|i| DailySnapshot {
                date: first_day + ChronoDuration::days(i),
                low_c: tag - 5.0,
                high_c: tag + 5.0,
                condition: WeatherCondition::Rain,
                precipitation_chance_pct: 50,
            })
            .collect(),
    }
}

/// Weather provider that replays scripted responses in order.
#[derive(Debug, Default)]
pub(crate) struct MockProvider {
    responses: Mutex<VecDeque<(Result<ForecastBundle, String>, Duration)>>,
    requested: Mutex<Vec<Coordinate>>,
}

impl MockProvider {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_ok(&self, bundle: ForecastBundle) {
        self.responses.lock().push_back((Ok(bundle), Duration::ZERO));
    }

    pub(crate) fn push_ok_after(&self, bundle: ForecastBundle, delay: Duration) {
        self.responses.lock().push_back((Ok(bundle), delay));
    }

    pub(crate) fn push_err(&self, message: &str) {
        self.responses.lock().push_back((Err(message.to_string()), Duration::ZERO));
    }

    pub(crate) fn calls(&self) -> usize {
        self.requested.lock().len()
    }

    pub(crate) fn requested(&self) -> Vec<Coordinate> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl WeatherProvider for MockProvider {
    async fn get_forecast(&self, request: &ForecastRequest) -> anyhow::Result<ForecastBundle> {
        self.requested.lock().push(request.coordinate);
        let next = self.responses.lock().pop_front();

        let Some((response, delay)) = next else {
            anyhow::bail!("no scripted response");
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        response.map_err(|message| anyhow::anyhow!(message))
    }
}
