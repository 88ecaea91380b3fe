use std::{fmt::Debug, time::Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    error::LocationError,
    model::{Coordinates, LocationOptions},
};

pub const DEFAULT_IP_LOOKUP_URL: &str = "http://ip-api.com/json";

/// Supplies the device's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    async fn current_position(
        &self,
        options: &LocationOptions,
    ) -> Result<Coordinates, LocationError>;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationProvider {
    coordinates: Coordinates,
}

impl FixedLocationProvider {
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_position(&self, _: &LocationOptions) -> Result<Coordinates, LocationError> {
        Ok(self.coordinates)
    }
}

/// Approximate position from an IP geolocation service.
#[derive(Debug, Clone)]
pub struct IpLocationProvider {
    url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpLocationProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }
}

impl Default for IpLocationProvider {
    fn default() -> Self {
        Self::new(DEFAULT_IP_LOOKUP_URL)
    }
}

#[async_trait]
impl LocationProvider for IpLocationProvider {
    async fn current_position(
        &self,
        options: &LocationOptions,
    ) -> Result<Coordinates, LocationError> {
        let res = self
            .http
            .get(&self.url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LocationError::Timeout(options.timeout)
                } else {
                    LocationError::Unavailable(e.to_string())
                }
            })?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LocationError::PermissionDenied);
        }
        if !status.is_success() {
            return Err(LocationError::Unavailable(format!(
                "lookup service answered with status {status}"
            )));
        }

        let parsed: IpLookupResponse = res
            .json()
            .await
            .map_err(|e| LocationError::Unavailable(format!("invalid lookup response: {e}")))?;

        match parsed.status.as_deref() {
            None | Some("success") => {}
            Some(s) => {
                return Err(LocationError::Unavailable(
                    parsed.message.unwrap_or_else(|| format!("lookup status {s}")),
                ));
            }
        }

        match (parsed.lat, parsed.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(LocationError::Unavailable(
                "lookup response has no coordinates".to_string(),
            )),
        }
    }
}

/// Applies [`LocationOptions`] around any provider.
///
/// A request that takes longer than `timeout` fails with
/// [`LocationError::Timeout`]. A fix younger than `maximum_age` is returned
/// without asking the inner provider again.
#[derive(Debug)]
pub struct GuardedLocationProvider<P> {
    inner: P,
    last_fix: Mutex<Option<(Instant, Coordinates)>>,
}

impl<P: LocationProvider> GuardedLocationProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            last_fix: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<P: LocationProvider> LocationProvider for GuardedLocationProvider<P> {
    async fn current_position(
        &self,
        options: &LocationOptions,
    ) -> Result<Coordinates, LocationError> {
        let cached = *self.last_fix.lock().await;
        if let Some((at, coords)) = cached {
            if at.elapsed() <= options.maximum_age {
                tracing::debug!("Reusing cached position {coords}");
                return Ok(coords);
            }
        }

        let coords = tokio::time::timeout(options.timeout, self.inner.current_position(options))
            .await
            .map_err(|_| LocationError::Timeout(options.timeout))??;

        *self.last_fix.lock().await = Some((Instant::now(), coords));
        Ok(coords)
    }
}
