//! BLE link manager.
//!
//! Wraps an injected [`BlePlatform`] with the small API the session needs:
//! choose a device, connect its GATT server, resolve characteristics (cached
//! per `service:characteristic`), and read/write/notify. Failures never
//! propagate as errors: operations return `None`/`false` and leave a
//! human-readable message in [`BleLink::connection_error`].

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use ble_integration::{
    BleDevice, BleDeviceEvent, BleError, BlePlatform, GattCharacteristic, GattServer,
    RequestDeviceOptions,
};
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, Mutex},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_BLE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleDeviceInfo {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BleLinkEvent {
    /// The connected device dropped its GATT server on its own.
    Disconnected { device_id: String },
}

#[derive(Default)]
struct BleLinkState {
    scanning: bool,
    device: Option<Arc<dyn BleDevice>>,
    server: Option<Arc<dyn GattServer>>,
    characteristics: HashMap<String, Arc<dyn GattCharacteristic>>,
    error: Option<String>,
    watcher: Option<JoinHandle<()>>,
    generation: u64,
}

impl BleLinkState {
    fn teardown(&mut self) -> Option<Arc<dyn GattServer>> {
        self.generation += 1;
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.characteristics.clear();
        self.device = None;
        self.server.take()
    }
}

fn cache_key(service: Uuid, characteristic: Uuid) -> String {
    format!("{service}:{characteristic}")
}

pub struct BleLink {
    platform: Arc<dyn BlePlatform>,
    timeout: Duration,
    inner: Mutex<BleLinkState>,
    events: broadcast::Sender<BleLinkEvent>,
}

impl BleLink {
    pub fn new(platform: Arc<dyn BlePlatform>, timeout: Duration) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            platform,
            timeout,
            inner: Mutex::new(BleLinkState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BleLinkEvent> {
        self.events.subscribe()
    }

    pub fn is_supported(&self) -> bool {
        self.platform.is_supported()
    }

    pub async fn is_scanning(&self) -> bool {
        self.inner.lock().await.scanning
    }

    pub async fn connected_device(&self) -> Option<BleDeviceInfo> {
        let guard = self.inner.lock().await;
        let device = guard.device.as_ref()?;
        Some(BleDeviceInfo {
            id: device.id(),
            name: device.name(),
        })
    }

    pub async fn connection_error(&self) -> Option<String> {
        self.inner.lock().await.error.clone()
    }

    async fn fail(&self, message: String) {
        warn!(error = %message, "ble: operation failed");
        self.inner.lock().await.error = Some(message);
    }

    pub async fn scan_for_devices(
        &self,
        options: RequestDeviceOptions,
    ) -> Option<Arc<dyn BleDevice>> {
        if !self.is_supported() {
            self.fail(BleError::Unsupported.to_string()).await;
            return None;
        }
        {
            let mut guard = self.inner.lock().await;
            guard.scanning = true;
            guard.error = None;
        }
        debug!(?options, "ble: requesting device");
        let outcome = timeout(self.timeout, self.platform.request_device(options)).await;
        self.inner.lock().await.scanning = false;
        match outcome {
            Ok(Ok(device)) => {
                info!(device_id = %device.id(), name = ?device.name(), "ble: device selected");
                Some(device)
            }
            Ok(Err(err)) => {
                self.fail(err.to_string()).await;
                None
            }
            Err(_) => {
                self.fail(format!(
                    "Bluetooth scan timed out after {:?}",
                    self.timeout
                ))
                .await;
                None
            }
        }
    }

    pub async fn connect_to_device(self: &Arc<Self>, device: Arc<dyn BleDevice>) -> bool {
        if !device.has_gatt() {
            self.fail(BleError::GattUnavailable.to_string()).await;
            return false;
        }
        self.disconnect().await;
        let events = device.subscribe_events();
        let server = match timeout(self.timeout, device.connect_gatt()).await {
            Ok(Ok(server)) => server,
            Ok(Err(err)) => {
                self.fail(err.to_string()).await;
                return false;
            }
            Err(_) => {
                self.fail(format!(
                    "Bluetooth GATT connect timed out after {:?}",
                    self.timeout
                ))
                .await;
                return false;
            }
        };

        {
            let mut guard = self.inner.lock().await;
            guard.teardown();
            let generation = guard.generation;
            guard.watcher = Some(self.spawn_disconnect_watcher(events, generation));
            guard.device = Some(Arc::clone(&device));
            guard.server = Some(server);
            guard.error = None;
        }
        info!(device_id = %device.id(), "ble: gatt connected");
        true
    }

    fn spawn_disconnect_watcher(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<BleDeviceEvent>,
        generation: u64,
    ) -> JoinHandle<()> {
        let link: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(BleDeviceEvent::GattServerDisconnected) => break,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return,
                }
            }
            if let Some(link) = link.upgrade() {
                link.on_gatt_disconnected(generation).await;
            }
        })
    }

    async fn on_gatt_disconnected(&self, generation: u64) {
        let device_id = {
            let mut guard = self.inner.lock().await;
            if guard.generation != generation {
                return;
            }
            let device_id = guard.device.as_ref().map(|device| device.id());
            guard.watcher = None;
            guard.teardown();
            device_id
        };
        let device_id = device_id.unwrap_or_default();
        warn!(%device_id, "ble: gatt server disconnected");
        let _ = self.events.send(BleLinkEvent::Disconnected { device_id });
    }

    pub async fn disconnect(&self) {
        let server = self.inner.lock().await.teardown();
        if let Some(server) = server {
            server.disconnect().await;
            info!("ble: disconnected");
        }
    }

    pub async fn get_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Option<Arc<dyn GattCharacteristic>> {
        let key = cache_key(service, characteristic);
        let (server, generation) = {
            let guard = self.inner.lock().await;
            if let Some(cached) = guard.characteristics.get(&key) {
                return Some(Arc::clone(cached));
            }
            (guard.server.clone(), guard.generation)
        };
        let Some(server) = server else {
            self.fail(BleError::NotConnected.to_string()).await;
            return None;
        };

        let resolved = match server.primary_service(service).await {
            Ok(primary) => primary.characteristic(characteristic).await,
            Err(err) => Err(err),
        };
        match resolved {
            Ok(handle) => {
                debug!(%key, "ble: characteristic resolved");
                let mut guard = self.inner.lock().await;
                if guard.server.is_some() && guard.generation == generation {
                    guard.characteristics.insert(key, Arc::clone(&handle));
                }
                Some(handle)
            }
            Err(err) => {
                self.fail(err.to_string()).await;
                None
            }
        }
    }

    /// Writes without response. Returns whether the write was issued.
    pub async fn write_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> bool {
        let Some(handle) = self.get_characteristic(service, characteristic).await else {
            return false;
        };
        match handle.write_without_response(value).await {
            Ok(()) => true,
            Err(err) => {
                self.fail(err.to_string()).await;
                false
            }
        }
    }

    pub async fn read_characteristic(&self, service: Uuid, characteristic: Uuid) -> Option<Vec<u8>> {
        let handle = self.get_characteristic(service, characteristic).await?;
        match handle.read_value().await {
            Ok(value) => Some(value),
            Err(err) => {
                self.fail(err.to_string()).await;
                None
            }
        }
    }

    pub async fn subscribe_to_notifications(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Option<broadcast::Receiver<Vec<u8>>> {
        let handle = self.get_characteristic(service, characteristic).await?;
        match handle.start_notifications().await {
            Ok(values) => Some(values),
            Err(err) => {
                self.fail(err.to_string()).await;
                None
            }
        }
    }

    pub async fn unsubscribe_from_notifications(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> bool {
        let Some(handle) = self.get_characteristic(service, characteristic).await else {
            return false;
        };
        match handle.stop_notifications().await {
            Ok(()) => true,
            Err(err) => {
                self.fail(err.to_string()).await;
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/ble_link_tests.rs"]
mod tests;
