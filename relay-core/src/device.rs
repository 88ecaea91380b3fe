//! Watch-side view of the relay messages.
//!
//! The device addresses dictionary entries by small integer keys rather than
//! the string names used on the companion side. This module maps between the
//! two and applies the device's defaults and its reading cache policy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::RelayMessage;

/// Longest conditions label the device stores, in bytes.
pub const MAX_CONDITIONS_LEN: usize = 15;

/// A stored reading is reused for this long before asking for a new one.
pub const CACHE_FRESHNESS_MINUTES: i64 = 29;

pub const UNKNOWN_TEMPERATURE: i32 = -1;
pub const UNKNOWN_CONDITIONS: &str = "Unknown";

/// Dictionary keys understood by the watch app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Request = 0,
    Temperature = 1,
    Conditions = 2,
}

impl MessageKey {
    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKey::Request => "KEY_REQUEST",
            MessageKey::Temperature => "KEY_TEMPERATURE",
            MessageKey::Conditions => "KEY_CONDITIONS",
        }
    }
}

impl TryFrom<u32> for MessageKey {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageKey::Request),
            1 => Ok(MessageKey::Temperature),
            2 => Ok(MessageKey::Conditions),
            other => Err(other),
        }
    }
}

/// Dictionary the watch sends when it has no fresh cached reading.
pub fn request_tuples() -> Vec<(u32, TupleValue)> {
    vec![(MessageKey::Request.id(), TupleValue::Int(0))]
}

/// Whether a dictionary received from the watch asks for fresh weather.
pub fn is_weather_request(entries: &[(u32, TupleValue)]) -> bool {
    entries
        .iter()
        .any(|(key, _)| MessageKey::try_from(*key) == Ok(MessageKey::Request))
}

/// A value in a device dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum TupleValue {
    Int(i32),
    Float(f64),
    Text(String),
}

impl RelayMessage {
    /// Entries as the device's dictionary carries them.
    pub fn to_tuples(&self) -> Vec<(u32, TupleValue)> {
        vec![
            (MessageKey::Temperature.id(), TupleValue::Float(self.temperature)),
            (MessageKey::Conditions.id(), TupleValue::Text(self.conditions.clone())),
        ]
    }
}

/// What the watch displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub temperature: i32,
    pub conditions: String,
}

impl Default for DeviceReading {
    fn default() -> Self {
        Self {
            temperature: UNKNOWN_TEMPERATURE,
            conditions: UNKNOWN_CONDITIONS.to_string(),
        }
    }
}

impl DeviceReading {
    /// Decode a received dictionary.
    ///
    /// Missing entries keep their defaults; unknown keys are skipped.
    pub fn decode<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, TupleValue)>,
    {
        let mut reading = Self::default();

        for (key, value) in entries {
            match (MessageKey::try_from(key), value) {
                (Ok(MessageKey::Temperature), TupleValue::Int(t)) => reading.temperature = t,
                (Ok(MessageKey::Temperature), TupleValue::Float(t)) => {
                    reading.temperature = t.round() as i32
                }
                (Ok(MessageKey::Conditions), TupleValue::Text(s)) => {
                    reading.conditions = truncate(&s, MAX_CONDITIONS_LEN).to_string()
                }
                (Ok(k), v) => tracing::warn!("Unexpected value for {}: {v:?}", k.name()),
                (Err(unknown), _) => tracing::warn!("Unknown dictionary key: {unknown}"),
            }
        }

        tracing::debug!(
            "Temperature: {}C, Conditions: {}",
            reading.temperature,
            reading.conditions
        );
        reading
    }
}

/// A reading the device persisted, with the time it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedReading {
    pub reading: DeviceReading,
    pub stored_at: DateTime<Utc>,
}

impl CachedReading {
    pub fn new(reading: DeviceReading, stored_at: DateTime<Utc>) -> Self {
        Self { reading, stored_at }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.stored_at < Duration::minutes(CACHE_FRESHNESS_MINUTES)
    }

    /// The cached reading if it may still be shown, otherwise `None` and the
    /// device should send a request.
    pub fn fresh_reading(&self, now: DateTime<Utc>) -> Option<&DeviceReading> {
        if self.is_fresh(now) {
            Some(&self.reading)
        } else {
            None
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
