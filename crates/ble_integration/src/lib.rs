//! Bluetooth Low Energy capability boundary.
//!
//! The session never reaches for a global Bluetooth stack. It is handed a
//! [`BlePlatform`] and walks the GATT model through the traits below:
//! platform → device → server → service → characteristic.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::{uuid, Uuid};

mod simulated;

pub use simulated::{SimulatedBlePlatform, SimulatedPeripheral};

/// Service exposed by the robot's onboard controller.
pub const ROBOT_SERVICE_UUID: Uuid = uuid!("4fafc201-1fb5-459e-8fcc-c5c9c331914b");
/// Characteristic that accepts single-byte drive commands.
pub const ROBOT_COMMAND_CHARACTERISTIC_UUID: Uuid =
    uuid!("beb5483e-36e1-4688-b7f5-ea07361b26a8");
pub const GENERIC_ACCESS_SERVICE_UUID: Uuid = uuid!("00001800-0000-1000-8000-00805f9b34fb");
pub const GENERIC_ATTRIBUTE_SERVICE_UUID: Uuid = uuid!("00001801-0000-1000-8000-00805f9b34fb");

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceFilter {
    pub services: Vec<Uuid>,
    pub name_prefix: Option<String>,
}

impl DeviceFilter {
    pub fn matches(&self, name: Option<&str>, advertised_services: &[Uuid]) -> bool {
        let services_match = self
            .services
            .iter()
            .all(|service| advertised_services.contains(service));
        let name_matches = match (&self.name_prefix, name) {
            (None, _) => true,
            (Some(prefix), Some(name)) => name.starts_with(prefix.as_str()),
            (Some(_), None) => false,
        };
        services_match && name_matches
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDeviceOptions {
    pub filters: Vec<DeviceFilter>,
    pub accept_all_devices: bool,
    pub optional_services: Vec<Uuid>,
}

impl RequestDeviceOptions {
    pub fn for_service(service: Uuid) -> Self {
        Self {
            filters: vec![DeviceFilter {
                services: vec![service],
                name_prefix: None,
            }],
            accept_all_devices: false,
            optional_services: Vec::new(),
        }
    }

    pub fn matches(&self, name: Option<&str>, advertised_services: &[Uuid]) -> bool {
        self.accept_all_devices
            || self
                .filters
                .iter()
                .any(|filter| filter.matches(name, advertised_services))
    }
}

impl Default for RequestDeviceOptions {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            accept_all_devices: true,
            optional_services: vec![GENERIC_ACCESS_SERVICE_UUID, GENERIC_ATTRIBUTE_SERVICE_UUID],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleDeviceEvent {
    GattServerDisconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BleError {
    #[error("Bluetooth is not supported on this platform")]
    Unsupported,
    #[error("no device selected")]
    NoDeviceSelected,
    #[error("device does not support GATT")]
    GattUnavailable,
    #[error("not connected to any device")]
    NotConnected,
    #[error("service {0} not found")]
    ServiceNotFound(Uuid),
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),
    #[error("GATT operation failed: {0}")]
    Gatt(String),
}

#[async_trait]
pub trait BlePlatform: Send + Sync {
    fn is_supported(&self) -> bool;
    /// Asks the platform to pick a device matching `options`.
    async fn request_device(
        &self,
        options: RequestDeviceOptions,
    ) -> Result<Arc<dyn BleDevice>, BleError>;
}

#[async_trait]
pub trait BleDevice: Send + Sync {
    fn id(&self) -> String;
    fn name(&self) -> Option<String>;
    fn has_gatt(&self) -> bool;
    async fn connect_gatt(&self) -> Result<Arc<dyn GattServer>, BleError>;
    fn subscribe_events(&self) -> broadcast::Receiver<BleDeviceEvent>;
}

#[async_trait]
pub trait GattServer: Send + Sync {
    fn is_connected(&self) -> bool;
    async fn primary_service(&self, service: Uuid) -> Result<Arc<dyn GattService>, BleError>;
    async fn disconnect(&self);
}

#[async_trait]
pub trait GattService: Send + Sync {
    fn uuid(&self) -> Uuid;
    async fn characteristic(
        &self,
        characteristic: Uuid,
    ) -> Result<Arc<dyn GattCharacteristic>, BleError>;
}

#[async_trait]
pub trait GattCharacteristic: Send + Sync {
    fn uuid(&self) -> Uuid;
    async fn write_without_response(&self, value: &[u8]) -> Result<(), BleError>;
    async fn read_value(&self) -> Result<Vec<u8>, BleError>;
    async fn start_notifications(&self) -> Result<broadcast::Receiver<Vec<u8>>, BleError>;
    async fn stop_notifications(&self) -> Result<(), BleError>;
}

/// Platform without a Bluetooth stack. Every request fails with
/// [`BleError::Unsupported`].
pub struct UnsupportedBlePlatform;

#[async_trait]
impl BlePlatform for UnsupportedBlePlatform {
    fn is_supported(&self) -> bool {
        false
    }

    async fn request_device(
        &self,
        _options: RequestDeviceOptions,
    ) -> Result<Arc<dyn BleDevice>, BleError> {
        Err(BleError::Unsupported)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
