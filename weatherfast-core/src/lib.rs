//! Core library for the `weatherfast` CLI.
//!
//! This crate defines:
//! - Location acquisition with a set-once published fix
//! - A forecast fetcher triggered by location changes
//! - Abstraction over weather providers
//! - Shared domain models and display projections
//! - Configuration & credentials handling
//!
//! It is used by `weatherfast-cli`, but can also be reused by other front ends.

pub mod config;
pub mod display;
pub mod fetcher;
pub mod location;
pub mod model;
pub mod projection;
pub mod provider;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, CoordinateSource, ProviderConfig};
pub use display::TemperatureUnit;
pub use fetcher::{FetchStatus, ForecastFetcher, ForecastState};
pub use location::{LocationError, LocationProvider, LocationSource, LocationState};
pub use model::{Coordinate, Fix, ForecastBundle, ForecastRequest};
pub use provider::{ProviderId, WeatherProvider};
pub use session::WeatherSession;
