use std::io::Write;

use async_trait::async_trait;
use weather_relay_core::{DeliveryError, MessagingChannel, RelayMessage};

/// Stands in for the device link: each message is written to stdout as one
/// JSON line.
#[derive(Debug, Default)]
pub struct StdoutChannel;

#[async_trait]
impl MessagingChannel for StdoutChannel {
    async fn send_message(&self, message: &RelayMessage) -> Result<(), DeliveryError> {
        let line = serde_json::to_string(message).map_err(|e| DeliveryError::new(e.to_string()))?;

        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}").map_err(|e| DeliveryError::new(e.to_string()))?;
        out.flush().map_err(|e| DeliveryError::new(e.to_string()))
    }
}
