use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{
    Accuracy, Authorization, AuthorizationStatus, LocationError, LocationSource, UpdateSettings,
};
use crate::model::{Coordinate, Fix};

const IP_API_URL: &str = "http://ip-api.com/json/";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// City-level accuracy is the best an IP lookup can claim.
const IP_ACCURACY_M: f64 = 5_000.0;

/// Approximates the device position from its public IP address.
///
/// Polls the lookup endpoint and emits a one-fix batch per successful lookup.
#[derive(Debug, Clone)]
pub struct IpLocationSource {
    http: Client,
    endpoint: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpLocationSource {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(IP_API_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client for IP geolocation")?;

        Ok(Self { http, endpoint: endpoint.into(), poll_interval: DEFAULT_POLL_INTERVAL })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn lookup(&self) -> Result<Fix> {
        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("fields", "status,message,lat,lon")])
            .send()
            .await
            .context("Failed to send IP geolocation request")?;

        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("IP geolocation request failed with status {status}"));
        }

        let body: IpApiResponse =
            res.json().await.context("Failed to parse IP geolocation JSON")?;

        if body.status != "success" {
            return Err(anyhow!(
                "IP geolocation lookup failed: {}",
                body.message.as_deref().unwrap_or("no reason given")
            ));
        }

        let (Some(latitude), Some(longitude)) = (body.lat, body.lon) else {
            return Err(anyhow!("IP geolocation response had no coordinates"));
        };

        Ok(Fix {
            coordinate: Coordinate::new(latitude, longitude),
            horizontal_accuracy_m: Some(IP_ACCURACY_M),
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl LocationSource for IpLocationSource {
    async fn request_authorization(&self, _level: Authorization) -> AuthorizationStatus {
        // Public-IP lookups need no user permission.
        AuthorizationStatus::Granted
    }

    async fn start_updates(
        &self,
        settings: &UpdateSettings,
    ) -> Result<mpsc::Receiver<Vec<Fix>>, LocationError> {
        if settings.accuracy == Accuracy::Best {
            tracing::debug!("IP geolocation is city-level; best accuracy not available");
        }

        let (tx, rx) = mpsc::channel(1);
        let source = self.clone();

        tokio::spawn(async move {
            loop {
                match source.lookup().await {
                    Ok(fix) => {
                        if tx.send(vec![fix]).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!("IP geolocation failed: {err:#}"),
                }

                tokio::select! {
                    _ = tx.closed() => break,
                    _ = tokio::time::sleep(source.poll_interval) => {}
                }
            }
        });

        Ok(rx)
    }
}
