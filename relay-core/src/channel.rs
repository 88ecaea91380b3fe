use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::DeliveryError, model::RelayMessage};

/// Delivers a [`RelayMessage`] to the paired device.
///
/// Resolves once, with the acknowledgement or the failure the host reported.
#[async_trait]
pub trait MessagingChannel: Send + Sync + Debug {
    async fn send_message(&self, message: &RelayMessage) -> Result<(), DeliveryError>;
}
