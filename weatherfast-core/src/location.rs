//! Location acquisition.
//!
//! A [`LocationSource`] pushes batches of fixes from whatever backs it. The
//! [`LocationProvider`] listens to one source, keeps the first usable fix in a
//! single-assignment cell, and publishes it once through a `watch` channel.
//! If no fix arrives (authorization denied, stream closed, or timeout) it
//! publishes [`LocationState::Unavailable`] instead of waiting forever.

use async_trait::async_trait;
use std::{
    fmt::Debug,
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::model::Fix;

pub mod fixed;
pub mod ip;

pub use fixed::StaticLocationSource;
pub use ip::IpLocationSource;

/// How long a provider waits for its first fix by default.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Best,
    Kilometer,
    Reduced,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceFilter {
    /// Report every update regardless of movement.
    None,
    Meters(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    WhenInUse,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Granted,
    Denied,
    /// The user has not answered yet; updates may still start.
    NotDetermined,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateSettings {
    pub accuracy: Accuracy,
    pub distance_filter: DistanceFilter,
    pub authorization: Authorization,
}

impl UpdateSettings {
    /// Highest accuracy, no distance filtering, always-on authorization.
    pub const fn best() -> Self {
        Self {
            accuracy: Accuracy::Best,
            distance_filter: DistanceFilter::None,
            authorization: Authorization::Always,
        }
    }
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self::best()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationState {
    Pending,
    Fixed(Fix),
    Unavailable(LocationError),
}

impl LocationState {
    pub fn fix(&self) -> Option<Fix> {
        match self {
            LocationState::Fixed(fix) => Some(*fix),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LocationState::Pending)
    }
}

/// A push source of position fixes.
///
/// Each item on the returned channel is one update batch, oldest fix first.
/// Sources stop producing once the receiver is dropped.
#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    async fn request_authorization(&self, level: Authorization) -> AuthorizationStatus;

    async fn start_updates(
        &self,
        settings: &UpdateSettings,
    ) -> Result<mpsc::Receiver<Vec<Fix>>, LocationError>;
}

/// Publishes the first fix a source reports, exactly once.
#[derive(Debug)]
pub struct LocationProvider {
    current: Arc<OnceLock<Fix>>,
    state: watch::Receiver<LocationState>,
    listener: JoinHandle<()>,
}

impl LocationProvider {
    /// Starts listening immediately with [`UpdateSettings::best`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(source: Arc<dyn LocationSource>, acquire_timeout: Duration) -> Self {
        let current = Arc::new(OnceLock::new());
        let (tx, state) = watch::channel(LocationState::Pending);

        let listener = tokio::spawn(listen(
            source,
            UpdateSettings::best(),
            acquire_timeout,
            Arc::clone(&current),
            tx,
        ));

        Self { current, state, listener }
    }

    /// The published fix, if any. Never changes once set.
    pub fn current(&self) -> Option<Fix> {
        self.current.get().copied()
    }

    pub fn state(&self) -> LocationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LocationState> {
        self.state.clone()
    }

    /// Resolves once the provider has either a fix or a definite failure.
    pub async fn wait_for_fix(&self) -> Result<Fix, LocationError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| !s.is_pending())
            .await
            .map_err(|_| LocationError::ServiceUnavailable)?
            .clone();

        match state {
            LocationState::Fixed(fix) => Ok(fix),
            LocationState::Unavailable(err) => Err(err),
            LocationState::Pending => Err(LocationError::ServiceUnavailable),
        }
    }
}

impl Drop for LocationProvider {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(
    source: Arc<dyn LocationSource>,
    settings: UpdateSettings,
    acquire_timeout: Duration,
    current: Arc<OnceLock<Fix>>,
    tx: watch::Sender<LocationState>,
) {
    let outcome = tokio::time::timeout(acquire_timeout, acquire(source, settings, &current)).await;

    let state = match outcome {
        Ok(Ok(fix)) => {
            tracing::info!(
                latitude = fix.coordinate.latitude,
                longitude = fix.coordinate.longitude,
                "location acquired"
            );
            LocationState::Fixed(fix)
        }
        Ok(Err(err)) => {
            tracing::warn!("location unavailable: {err}");
            LocationState::Unavailable(err)
        }
        Err(_) => {
            tracing::warn!(timeout_secs = acquire_timeout.as_secs(), "no location fix in time");
            LocationState::Unavailable(LocationError::Timeout)
        }
    };

    tx.send_replace(state);
}

/// Waits for the first batch carrying a fix and stores its most recent entry.
///
/// Returning drops the update receiver, which stops the source.
async fn acquire(
    source: Arc<dyn LocationSource>,
    settings: UpdateSettings,
    current: &OnceLock<Fix>,
) -> Result<Fix, LocationError> {
    match source.request_authorization(settings.authorization).await {
        AuthorizationStatus::Denied => return Err(LocationError::PermissionDenied),
        status => tracing::debug!(?status, "location authorization"),
    }

    let mut updates = source.start_updates(&settings).await?;

    while let Some(batch) = updates.recv().await {
        let Some(latest) = batch.last().copied() else {
            continue;
        };

        if let Err(rejected) = current.set(latest) {
            tracing::debug!(?rejected, "location already set, ignoring fix");
        }
        return current.get().copied().ok_or(LocationError::ServiceUnavailable);
    }

    Err(LocationError::ServiceUnavailable)
}
