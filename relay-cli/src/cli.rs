use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Select, Text};
use tokio::task::JoinHandle;
use weather_relay_core::{
    Config, Coordinates, HostEvent, LocationSource, PipelineOutcome, WeatherRelay, dispatch,
    is_weather_request, request_tuples,
};

use crate::channel::StdoutChannel;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-relay", version, about = "Relay current weather to a paired device")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively edit the weather endpoint and location settings.
    Configure,

    /// Print the config file path and the effective configuration.
    Config,

    /// Act as the host: signal ready, then request weather `count` times.
    Trigger {
        /// Latitude override; uses a fixed location for this run.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude override; uses a fixed location for this run.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Number of overlapping requests to fire.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Config => show_config(),
            Command::Trigger { lat, lon, count } => {
                let mut cfg = Config::load()?;
                if let (Some(lat), Some(lon)) = (lat, lon) {
                    cfg.set_fixed_location(Coordinates::new(lat, lon));
                }
                trigger(&cfg, count).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let base_url = Text::new("Weather endpoint:")
        .with_default(&cfg.weather.base_url)
        .prompt()
        .context("Failed to read weather endpoint")?;
    cfg.weather.base_url = base_url;

    let source = Select::new("Location source:", LocationSource::all().to_vec())
        .with_starting_cursor(source_cursor(cfg.location.source))
        .prompt()
        .context("Failed to read location source")?;

    match source {
        LocationSource::Fixed => {
            let latitude = prompt_degrees("Latitude:", cfg.location.latitude)?;
            let longitude = prompt_degrees("Longitude:", cfg.location.longitude)?;
            cfg.set_fixed_location(Coordinates::new(latitude, longitude));
        }
        LocationSource::Ip => {
            cfg.location.source = LocationSource::Ip;
            cfg.location.ip_lookup_url = Text::new("IP lookup URL:")
                .with_default(&cfg.location.ip_lookup_url)
                .prompt()
                .context("Failed to read IP lookup URL")?;
        }
    }

    cfg.location.timeout_ms = CustomType::<u64>::new("Location timeout (ms):")
        .with_default(cfg.location.timeout_ms)
        .prompt()
        .context("Failed to read location timeout")?;

    cfg.location.maximum_age_ms = CustomType::<u64>::new("Maximum position age (ms):")
        .with_default(cfg.location.maximum_age_ms)
        .prompt()
        .context("Failed to read maximum position age")?;

    cfg.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

/// Index of `current` in the location source list, so the prompt opens on it.
fn source_cursor(current: LocationSource) -> usize {
    LocationSource::all()
        .iter()
        .position(|s| *s == current)
        .unwrap_or_default()
}

fn prompt_degrees(message: &str, current: Option<f64>) -> anyhow::Result<f64> {
    let mut prompt = CustomType::<f64>::new(message).with_error_message("Please enter a number");
    if let Some(value) = current {
        prompt = prompt.with_default(value);
    }
    let value = prompt
        .prompt()
        .with_context(|| format!("Failed to read {}", message.trim_end_matches(':')))?;

    if !value.is_finite() {
        return Err(anyhow!("{value} is not a valid coordinate"));
    }
    Ok(value)
}

fn show_config() -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    let cfg = Config::load()?;
    let toml = toml::to_string_pretty(&cfg).context("Failed to serialize configuration to TOML")?;

    println!("# {}", path.display());
    print!("{toml}");

    Ok(())
}

async fn trigger(cfg: &Config, count: usize) -> anyhow::Result<()> {
    let relay = WeatherRelay::new(
        cfg.location_provider()?,
        Arc::new(cfg.weather_client()),
        Arc::new(StdoutChannel),
    )
    .with_location_options(cfg.location.options());

    dispatch(&relay, HostEvent::Ready);

    // Each simulated watch request carries the request key, as the device sends it.
    let handles: Vec<_> = (0..count)
        .map(|_| request_tuples())
        .filter(|entries| is_weather_request(entries))
        .filter_map(|_| dispatch(&relay, HostEvent::DataRequested))
        .collect();

    let failed = report_outcomes(handles).await;
    if failed > 0 {
        return Err(anyhow!("{failed} of {count} weather requests failed"));
    }

    Ok(())
}

/// Await every pipeline, logging how each ended. Returns the number that
/// failed, including tasks that panicked.
async fn report_outcomes(handles: Vec<JoinHandle<PipelineOutcome>>) -> usize {
    let mut failed = 0;

    for (i, handle) in handles.into_iter().enumerate() {
        let n = i + 1;
        match handle.await {
            Ok(PipelineOutcome::Done { reading, delivery }) => tracing::info!(
                "Pipeline {n}: done ({} / {}, delivery {:?})",
                reading.temperature,
                reading.conditions,
                delivery
            ),
            Ok(PipelineOutcome::Failed { at, error }) => {
                failed += 1;
                tracing::info!("Pipeline {n}: failed while {at}: {error}");
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Pipeline {n} did not run to completion: {e}");
            }
        }
    }

    failed
}
