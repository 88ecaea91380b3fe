//! The location → weather → device pipeline.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    channel::MessagingChannel,
    error::{DeliveryError, RelayError},
    location::LocationProvider,
    model::{Coordinates, LocationOptions, RelayMessage, WeatherReading},
    weather::WeatherSource,
};

/// Lifecycle of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    LocationPending,
    WeatherPending,
    RelayPending,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::LocationPending => "location-pending",
            PipelineState::WeatherPending => "weather-pending",
            PipelineState::RelayPending => "relay-pending",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported by the messaging channel. Either way the pipeline is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Acknowledged,
    Rejected(DeliveryError),
}

/// How a pipeline run ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    Done {
        reading: WeatherReading,
        delivery: Delivery,
    },
    Failed {
        /// Last state entered before the failure.
        at: PipelineState,
        error: RelayError,
    },
}

impl PipelineOutcome {
    pub fn state(&self) -> PipelineState {
        match self {
            PipelineOutcome::Done { .. } => PipelineState::Done,
            PipelineOutcome::Failed { .. } => PipelineState::Failed,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state() == PipelineState::Done
    }
}

/// Lifecycle callbacks the host runtime invokes.
pub trait HostHandler {
    /// The messaging channel to the device is open.
    fn on_ready(&self);

    /// The device asked for fresh data.
    fn on_trigger_requested(&self) -> JoinHandle<PipelineOutcome>;
}

/// Events a host dispatcher can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Ready,
    DataRequested,
}

/// Route one host event. Returns the spawned pipeline for `DataRequested`.
pub fn dispatch<H: HostHandler + ?Sized>(
    handler: &H,
    event: HostEvent,
) -> Option<JoinHandle<PipelineOutcome>> {
    match event {
        HostEvent::Ready => {
            handler.on_ready();
            None
        }
        HostEvent::DataRequested => Some(handler.on_trigger_requested()),
    }
}

/// Relays current weather at the device's position to the device.
///
/// Collaborators are shared read-only between runs. Every trigger performs a
/// full round trip; nothing is cached, deduplicated or retried.
#[derive(Debug, Clone)]
pub struct WeatherRelay {
    location: Arc<dyn LocationProvider>,
    weather: Arc<dyn WeatherSource>,
    channel: Arc<dyn MessagingChannel>,
    options: LocationOptions,
}

impl WeatherRelay {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        weather: Arc<dyn WeatherSource>,
        channel: Arc<dyn MessagingChannel>,
    ) -> Self {
        Self {
            location,
            weather,
            channel,
            options: LocationOptions::default(),
        }
    }

    pub fn with_location_options(mut self, options: LocationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn location_options(&self) -> LocationOptions {
        self.options
    }

    pub async fn fetch_weather(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherReading, RelayError> {
        self.weather.fetch_weather(coordinates).await
    }

    /// Submit a reading to the device and log what the channel reports.
    pub async fn relay(&self, reading: &WeatherReading) -> Delivery {
        let message = RelayMessage::from(reading);

        match self.channel.send_message(&message).await {
            Ok(()) => {
                tracing::info!("Weather info sent");
                Delivery::Acknowledged
            }
            Err(e) => {
                tracing::warn!("Failed to send weather info: {}", e.reason);
                Delivery::Rejected(e)
            }
        }
    }

    /// Run one pipeline to completion on the current task.
    pub async fn run_pipeline(&self) -> PipelineOutcome {
        let mut run = Run::new();

        run.advance(PipelineState::LocationPending);
        let coordinates = match self.location.current_position(&self.options).await {
            Ok(c) => c,
            Err(e) => return run.fail(e.into()),
        };

        run.advance(PipelineState::WeatherPending);
        let reading = match self.fetch_weather(coordinates).await {
            Ok(r) => r,
            Err(e) => return run.fail(e),
        };

        run.advance(PipelineState::RelayPending);
        let delivery = self.relay(&reading).await;

        run.advance(PipelineState::Done);
        PipelineOutcome::Done { reading, delivery }
    }
}

impl HostHandler for WeatherRelay {
    fn on_ready(&self) {
        tracing::info!("Weather relay ready");
    }

    /// Spawns an independent pipeline and returns without waiting for it.
    ///
    /// Must be called from within a Tokio runtime.
    fn on_trigger_requested(&self) -> JoinHandle<PipelineOutcome> {
        tracing::info!("Weather requested");
        let relay = self.clone();
        tokio::spawn(async move { relay.run_pipeline().await })
    }
}

/// Per-invocation state tracker.
struct Run {
    state: PipelineState,
}

impl Run {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        tracing::debug!("Pipeline {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(self, error: RelayError) -> PipelineOutcome {
        match &error {
            RelayError::Location(e) => tracing::error!("Error finding position: {e}"),
            e if e.is_parse() => tracing::error!("Could not read weather response: {e}"),
            e => tracing::error!("Weather request failed: {e}"),
        }
        tracing::debug!("Pipeline {} -> {}", self.state, PipelineState::Failed);

        PipelineOutcome::Failed {
            at: self.state,
            error,
        }
    }
}
