use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    config::Config,
    fetcher::{ForecastFetcher, ForecastState},
    location::{LocationProvider, LocationSource},
    provider::WeatherProvider,
};

/// One location provider wired to one forecast fetcher.
///
/// Location updates start as soon as the session is created; the first fix
/// triggers the first fetch.
#[derive(Debug)]
pub struct WeatherSession {
    location: LocationProvider,
    fetcher: ForecastFetcher,
    driver: JoinHandle<()>,
}

impl WeatherSession {
    /// Must be called from within a tokio runtime.
    pub fn start(
        source: Arc<dyn LocationSource>,
        provider: Arc<dyn WeatherProvider>,
        config: &Config,
    ) -> Self {
        let location = LocationProvider::start(source, config.location_timeout());
        let fetcher = ForecastFetcher::new(provider, config.coordinate.clone());
        let driver = fetcher.spawn(location.subscribe());

        Self { location, fetcher, driver }
    }

    pub fn location(&self) -> &LocationProvider {
        &self.location
    }

    pub fn fetcher(&self) -> &ForecastFetcher {
        &self.fetcher
    }

    pub fn forecast(&self) -> watch::Receiver<ForecastState> {
        self.fetcher.subscribe()
    }

    /// Waits until the first fetch settles as ready or unavailable.
    ///
    /// A location timeout settles as unavailable, so this never waits longer
    /// than the location timeout plus one request.
    pub async fn wait_for_forecast(&self) -> ForecastState {
        let mut rx = self.fetcher.subscribe();
        match rx.wait_for(|s| s.status.is_settled()).await {
            Ok(state) => state.clone(),
            Err(_) => self.fetcher.state(),
        }
    }

    /// Fetches again for the already-acquired fix.
    pub async fn retry(&self) -> anyhow::Result<()> {
        let fix = self
            .location
            .current()
            .ok_or_else(|| anyhow::anyhow!("No location fix yet; nothing to retry"))?;
        self.fetcher.refresh(fix).await
    }
}

impl Drop for WeatherSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
