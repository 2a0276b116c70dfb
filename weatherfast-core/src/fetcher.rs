//! Location-triggered forecast fetching.
//!
//! The fetcher watches a [`LocationState`] channel. Every distinct change
//! cancels whatever fetch is still running and, if a fix is known, starts one
//! new fetch. Results land in a [`ForecastState`] that observers subscribe to.
//! A failed fetch is logged and marks the state unavailable; the last good
//! bundle stays in place.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    config::CoordinateSource,
    location::LocationState,
    model::{Fix, ForecastBundle, ForecastRequest},
    provider::WeatherProvider,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// No forecast could be obtained; the message says why.
    Unavailable(String),
}

impl FetchStatus {
    /// `Ready` or `Unavailable`: nothing further happens without a new trigger.
    pub fn is_settled(&self) -> bool {
        matches!(self, FetchStatus::Ready | FetchStatus::Unavailable(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForecastState {
    /// Last successfully fetched bundle. Only ever replaced whole.
    pub bundle: Option<Arc<ForecastBundle>>,
    pub status: FetchStatus,
}

#[derive(Debug)]
struct Inner {
    provider: Arc<dyn WeatherProvider>,
    coordinate: CoordinateSource,
    days: u8,
    state: watch::Sender<ForecastState>,
    in_flight: Mutex<Option<CancellationToken>>,
}

/// Issues forecast requests through an injected [`WeatherProvider`].
///
/// Cheap to clone; clones share state and the in-flight slot.
#[derive(Debug, Clone)]
pub struct ForecastFetcher {
    inner: Arc<Inner>,
}

impl ForecastFetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>, coordinate: CoordinateSource) -> Self {
        let (state, _) = watch::channel(ForecastState::default());

        Self {
            inner: Arc::new(Inner {
                provider,
                coordinate,
                days: ForecastRequest::DEFAULT_DAYS,
                state,
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ForecastState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> ForecastState {
        self.inner.state.borrow().clone()
    }

    /// Follows `location` until its sender goes away.
    ///
    /// A fetch still running when the location channel closes is left to finish.
    pub fn spawn(&self, location: watch::Receiver<LocationState>) -> JoinHandle<()> {
        tokio::spawn(self.clone().follow(location))
    }

    /// Fetches now for `fix`, cancelling any fetch in progress.
    ///
    /// This is the retry path after an unavailable forecast. Returns the fetch
    /// error, if any; state is updated either way. A fetch that gets
    /// superseded before completing returns `Ok(())` without touching state.
    pub async fn refresh(&self, fix: Fix) -> anyhow::Result<()> {
        let token = self.supersede();
        self.fetch(fix, token).await
    }

    async fn follow(self, mut location: watch::Receiver<LocationState>) {
        let mut last: Option<LocationState> = None;

        loop {
            let current = location.borrow_and_update().clone();

            if last.as_ref() != Some(&current) {
                match &current {
                    LocationState::Pending => {}
                    LocationState::Fixed(fix) => {
                        let token = self.supersede();
                        let fetcher = self.clone();
                        let fix = *fix;
                        tokio::spawn(async move {
                            // Failures are logged and recorded in state by `fetch`.
                            let _ = fetcher.fetch(fix, token).await;
                        });
                    }
                    LocationState::Unavailable(err) => {
                        self.cancel_in_flight();
                        tracing::warn!("forecast unavailable: {err}");
                        self.inner.state.send_modify(|s| {
                            s.status = FetchStatus::Unavailable(err.to_string());
                        });
                    }
                }
                last = Some(current);
            }

            if location.changed().await.is_err() {
                break;
            }
        }
    }

    /// Installs a fresh token for a new fetch and cancels the one it replaces.
    fn supersede(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.inner.in_flight.lock().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    fn cancel_in_flight(&self) {
        if let Some(previous) = self.inner.in_flight.lock().take() {
            previous.cancel();
        }
    }

    async fn fetch(&self, fix: Fix, token: CancellationToken) -> anyhow::Result<()> {
        let coordinate = self.inner.coordinate.resolve(fix.coordinate);
        let request = ForecastRequest { coordinate, days: self.inner.days };

        self.inner.state.send_modify(|s| s.status = FetchStatus::Loading);

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(%coordinate, "forecast fetch cancelled");
                return Ok(());
            }
            result = self.inner.provider.get_forecast(&request) => result,
        };

        if token.is_cancelled() {
            return Ok(());
        }

        match result {
            Ok(bundle) => {
                tracing::info!(
                    %coordinate,
                    provider = %bundle.provider,
                    hourly = bundle.hourly.len(),
                    daily = bundle.daily.len(),
                    "forecast updated"
                );
                let bundle = Arc::new(bundle);
                self.inner.state.send_modify(|s| {
                    s.bundle = Some(bundle);
                    s.status = FetchStatus::Ready;
                });
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%coordinate, "forecast fetch failed: {err:#}");
                let message = format!("{err:#}");
                self.inner.state.send_modify(|s| s.status = FetchStatus::Unavailable(message));
                Err(err)
            }
        }
    }
}
