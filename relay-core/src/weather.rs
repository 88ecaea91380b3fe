use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt::Debug;

use crate::{
    error::RelayError,
    model::{Coordinates, WeatherReading},
};

pub const DEFAULT_WEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Source of current conditions for a position.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_weather(&self, coordinates: Coordinates) -> Result<WeatherReading, RelayError>;
}

/// Client for an OpenWeatherMap-compatible `current weather` endpoint.
///
/// No authentication, retries or explicit timeout are applied; each call is a
/// single GET.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url?lat=<latitude>&lon=<longitude>`
    pub fn request_url(&self, coordinates: Coordinates) -> Result<Url, RelayError> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
            ],
        )
        .map_err(|e| RelayError::Url(format!("{}: {e}", self.base_url)))
    }
}

impl Default for OpenWeatherClient {
    fn default() -> Self {
        Self::new(DEFAULT_WEATHER_URL)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch_weather(&self, coordinates: Coordinates) -> Result<WeatherReading, RelayError> {
        tracing::info!("Fetching weather for {coordinates}");

        let url = self.request_url(coordinates)?;
        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(RelayError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let reading = parse_reading(&body)?;
        tracing::info!(
            "Got temperature = {} & conditions = {}",
            reading.temperature,
            reading.conditions
        );

        Ok(reading)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: Option<OwMain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

/// Extract `main.temp` and `weather[0].main` from a response body.
///
/// Every other field is ignored. Absent fields are an error, never a default.
pub fn parse_reading(body: &str) -> Result<WeatherReading, RelayError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;

    let temperature = parsed
        .main
        .and_then(|m| m.temp)
        .ok_or(RelayError::MissingField("main.temp"))?;

    let conditions = parsed
        .weather
        .into_iter()
        .next()
        .and_then(|w| w.main)
        .ok_or(RelayError::MissingField("weather[0].main"))?;

    Ok(WeatherReading {
        temperature,
        conditions,
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
