use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{Authorization, AuthorizationStatus, LocationError, LocationSource, UpdateSettings};
use crate::model::{Coordinate, Fix};

/// Replays a fixed list of update batches.
///
/// Used for `--at LAT,LON` and anywhere a position is known up front.
#[derive(Debug, Clone)]
pub struct StaticLocationSource {
    batches: Vec<Vec<Fix>>,
    interval: Duration,
    authorization: AuthorizationStatus,
}

impl StaticLocationSource {
    pub fn new(batches: Vec<Vec<Fix>>) -> Self {
        Self { batches, interval: Duration::ZERO, authorization: AuthorizationStatus::Granted }
    }

    /// A single exact fix at `coordinate`, stamped with the current time.
    pub fn at(coordinate: Coordinate) -> Self {
        let fix = Fix { coordinate, horizontal_accuracy_m: Some(0.0), timestamp: Utc::now() };
        Self::new(vec![vec![fix]])
    }

    /// Delay between consecutive batches.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_authorization(mut self, status: AuthorizationStatus) -> Self {
        self.authorization = status;
        self
    }
}

#[async_trait]
impl LocationSource for StaticLocationSource {
    async fn request_authorization(&self, _level: Authorization) -> AuthorizationStatus {
        self.authorization
    }

    async fn start_updates(
        &self,
        _settings: &UpdateSettings,
    ) -> Result<mpsc::Receiver<Vec<Fix>>, LocationError> {
        if self.authorization == AuthorizationStatus::Denied {
            return Err(LocationError::PermissionDenied);
        }

        let (tx, rx) = mpsc::channel(self.batches.len().max(1));
        let batches = self.batches.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            for (i, batch) in batches.into_iter().enumerate() {
                if i > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                if tx.send(batch).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}
