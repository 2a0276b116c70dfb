use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use weatherfast_core::{
    Config, Coordinate, CoordinateSource, FetchStatus, LocationSource, ProviderId,
    TemperatureUnit, WeatherProvider, WeatherSession,
    location::{IpLocationSource, StaticLocationSource},
    provider::provider_from_config,
};

use crate::render::render_forecast;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherfast", version, about = "Current conditions, hourly and 10-day forecast")]
pub struct Cli {
    /// Log progress to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a provider and make it the default.
    Configure {
        /// Provider short name, "open-meteo" or "weatherapi".
        provider: String,
    },

    /// Acquire a location and show the forecast.
    Show {
        /// Use this position as the device location and query it, e.g. `--at 1.3,103.8`.
        #[arg(long, value_name = "LAT,LON", allow_hyphen_values = true)]
        at: Option<Coordinate>,

        /// Query the detected device location instead of the configured coordinate.
        #[arg(long, conflicts_with = "at")]
        device: bool,

        /// Provider to use instead of the configured default.
        #[arg(long)]
        provider: Option<String>,

        /// Seconds to wait for a location fix.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Show temperatures in Fahrenheit.
        #[arg(long)]
        fahrenheit: bool,
    },

    /// Print the config file location.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show { at, device, provider, timeout, fahrenheit } => {
                let mut config = Config::load()?;
                apply_overrides(&mut config, at, device, timeout, fahrenheit);
                show(config, at, provider.as_deref()).await
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    if id.requires_api_key() {
        let key = inquire::Password::new(&format!("API key for {id}:"))
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?;

        let key = key.trim();
        if key.is_empty() {
            bail!("API key must not be empty");
        }
        config.upsert_provider_api_key(id, key.to_string());
    }

    config.set_default_provider(id);
    config.save()?;

    println!(
        "Default provider set to {id}. Config saved to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

fn apply_overrides(
    config: &mut Config,
    at: Option<Coordinate>,
    device: bool,
    timeout: Option<u64>,
    fahrenheit: bool,
) {
    if at.is_some() || device {
        config.coordinate = CoordinateSource::Device;
    }
    if let Some(secs) = timeout {
        config.location_timeout_secs = secs;
    }
    if fahrenheit {
        config.temperature_unit = TemperatureUnit::Fahrenheit;
    }
}

async fn show(config: Config, at: Option<Coordinate>, provider: Option<&str>) -> anyhow::Result<()> {
    let id = match provider {
        Some(name) => ProviderId::try_from(name)?,
        None => config.default_provider_id()?,
    };
    let weather: Arc<dyn WeatherProvider> = Arc::from(provider_from_config(id, &config)?);

    let source: Arc<dyn LocationSource> = match at {
        Some(coordinate) => Arc::new(StaticLocationSource::at(coordinate)),
        None => Arc::new(IpLocationSource::new()?),
    };

    eprintln!("Waiting for location (up to {}s)...", config.location_timeout_secs);
    let session = WeatherSession::start(source, weather, &config);
    let mut state = session.wait_for_forecast().await;

    while let FetchStatus::Unavailable(reason) = &state.status {
        eprintln!("Forecast unavailable: {reason}");

        if session.location().current().is_none() || !confirm_retry() {
            bail!("No forecast available.\nHint: rerun `weatherfast show` to try again.");
        }

        // Outcome is recorded in the fetcher state either way.
        let _ = session.retry().await;
        state = session.fetcher().state();
    }

    let bundle = state.bundle.context("Forecast settled without data")?;
    let title = config
        .coordinate
        .label()
        .map(str::to_string)
        .or_else(|| bundle.location_name.clone())
        .or_else(|| session.location().current().map(|fix| fix.coordinate.to_string()))
        .unwrap_or_else(|| "Current location".to_string());

    print!("{}", render_forecast(&bundle, &title, config.temperature_unit));
    Ok(())
}

/// Asks whether to try the fetch again. Non-interactive sessions answer no.
fn confirm_retry() -> bool {
    inquire::Confirm::new("Retry?").with_default(true).prompt().unwrap_or(false)
}
