//! Buddy-to-radio bridge: one byte in, one BLE write out.

use std::sync::Arc;

use ble_integration::{ROBOT_COMMAND_CHARACTERISTIC_UUID, ROBOT_SERVICE_UUID};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ble_link::BleLink;

pub struct RadioBridge {
    link: Arc<BleLink>,
    service: Uuid,
    characteristic: Uuid,
}

impl RadioBridge {
    pub fn new(link: Arc<BleLink>) -> Self {
        Self::with_characteristic(link, ROBOT_SERVICE_UUID, ROBOT_COMMAND_CHARACTERISTIC_UUID)
    }

    pub fn with_characteristic(link: Arc<BleLink>, service: Uuid, characteristic: Uuid) -> Self {
        Self {
            link,
            service,
            characteristic,
        }
    }

    pub fn link(&self) -> &Arc<BleLink> {
        &self.link
    }

    pub fn service(&self) -> Uuid {
        self.service
    }

    pub fn characteristic(&self) -> Uuid {
        self.characteristic
    }

    /// Issues a single write of `[value]`. Not retried.
    pub async fn forward(&self, value: u8) -> bool {
        let issued = self
            .link
            .write_characteristic(self.service, self.characteristic, &[value])
            .await;
        if issued {
            debug!(value, characteristic = %self.characteristic, "bridge: forwarded command byte");
        } else {
            let error = self.link.connection_error().await;
            warn!(value, ?error, "bridge: radio write not issued");
        }
        issued
    }
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
