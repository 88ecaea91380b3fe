use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// The two fields pulled out of a provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// `main.temp`, exactly as the provider reported it.
    pub temperature: f64,
    /// `weather[0].main`, the primary category label.
    pub conditions: String,
}

/// Payload delivered to the paired device.
///
/// Serializes to a flat object with exactly two entries:
/// `{"KEY_TEMPERATURE": <number>, "KEY_CONDITIONS": <string>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    #[serde(rename = "KEY_TEMPERATURE")]
    pub temperature: f64,
    #[serde(rename = "KEY_CONDITIONS")]
    pub conditions: String,
}

impl From<WeatherReading> for RelayMessage {
    fn from(reading: WeatherReading) -> Self {
        Self {
            temperature: reading.temperature,
            conditions: reading.conditions,
        }
    }
}

impl From<&WeatherReading> for RelayMessage {
    fn from(reading: &WeatherReading) -> Self {
        Self::from(reading.clone())
    }
}

/// Options handed to a [`crate::LocationProvider`] on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationOptions {
    /// How long the provider may take before failing the request.
    pub timeout: Duration,
    /// How old a previously acquired position may be and still be served.
    pub maximum_age: Duration,
}

impl LocationOptions {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);
    pub const DEFAULT_MAXIMUM_AGE: Duration = Duration::from_millis(60_000);
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            maximum_age: Self::DEFAULT_MAXIMUM_AGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_message_copies_fields_verbatim() {
        let reading = WeatherReading {
            temperature: 288.35,
            conditions: "Clouds".to_string(),
        };

        let msg = RelayMessage::from(&reading);

        assert_eq!(msg.temperature, 288.35);
        assert_eq!(msg.conditions, "Clouds");
    }

    #[test]
    fn relay_message_serializes_to_two_device_keys() {
        let msg = RelayMessage {
            temperature: -3.5,
            conditions: "Snow".to_string(),
        };

        let value = serde_json::to_value(&msg).expect("message must serialize");
        let obj = value.as_object().expect("flat object");

        assert_eq!(obj.len(), 2);
        assert_eq!(obj["KEY_TEMPERATURE"], serde_json::json!(-3.5));
        assert_eq!(obj["KEY_CONDITIONS"], serde_json::json!("Snow"));
    }

    #[test]
    fn default_location_options() {
        let opts = LocationOptions::default();
        assert_eq!(opts.timeout, Duration::from_secs(15));
        assert_eq!(opts.maximum_age, Duration::from_secs(60));
    }
}
