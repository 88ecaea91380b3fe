//! Core library for the weather relay.
//!
//! This crate defines:
//! - The relay pipeline (position → current weather → device message)
//! - Collaborator traits for location, weather and the device channel
//! - The OpenWeatherMap client and location providers
//! - Device-side decoding of relay messages
//! - Configuration handling
//!
//! It is used by the `weather-relay` binary, but hosts can embed
//! [`WeatherRelay`] directly and supply their own collaborators.

pub mod channel;
pub mod config;
pub mod device;
pub mod error;
pub mod location;
pub mod model;
pub mod relay;
pub mod weather;

pub use channel::MessagingChannel;
pub use config::{Config, LocationConfig, LocationSource, WeatherConfig};
pub use device::{
    CachedReading, DeviceReading, MessageKey, TupleValue, is_weather_request, request_tuples,
};
pub use error::{DeliveryError, LocationError, RelayError};
pub use location::{
    FixedLocationProvider, GuardedLocationProvider, IpLocationProvider, LocationProvider,
};
pub use model::{Coordinates, LocationOptions, RelayMessage, WeatherReading};
pub use relay::{
    Delivery, HostEvent, HostHandler, PipelineOutcome, PipelineState, WeatherRelay, dispatch,
};
pub use weather::{OpenWeatherClient, WeatherSource, parse_reading};
