//! In-process Bluetooth platform used for dry runs and tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    BleDevice, BleDeviceEvent, BleError, BlePlatform, GattCharacteristic, GattServer, GattService,
    RequestDeviceOptions, ROBOT_COMMAND_CHARACTERISTIC_UUID, ROBOT_SERVICE_UUID,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Picks the first registered peripheral that matches the request options,
/// the way a user would in a device chooser.
pub struct SimulatedBlePlatform {
    peripherals: Vec<SimulatedPeripheral>,
}

impl SimulatedBlePlatform {
    pub fn new(peripherals: Vec<SimulatedPeripheral>) -> Self {
        Self { peripherals }
    }

    /// A platform with a single robot controller in range.
    pub fn with_robot() -> (Self, SimulatedPeripheral) {
        let robot = SimulatedPeripheral::robot("robot-controller");
        (Self::new(vec![robot.clone()]), robot)
    }
}

#[async_trait]
impl BlePlatform for SimulatedBlePlatform {
    fn is_supported(&self) -> bool {
        true
    }

    async fn request_device(
        &self,
        options: RequestDeviceOptions,
    ) -> Result<Arc<dyn BleDevice>, BleError> {
        let chosen = self.peripherals.iter().find(|peripheral| {
            let services: Vec<Uuid> = peripheral.services.keys().copied().collect();
            options.matches(peripheral.name.as_deref(), &services)
        });
        match chosen {
            Some(peripheral) => {
                debug!(device_id = %peripheral.id, "ble: simulated device chosen");
                Ok(Arc::new(peripheral.clone()))
            }
            None => Err(BleError::NoDeviceSelected),
        }
    }
}

#[derive(Default)]
struct PeripheralState {
    connected: AtomicBool,
    fail_writes: AtomicBool,
    writes: Mutex<Vec<(Uuid, Vec<u8>)>>,
    values: Mutex<HashMap<Uuid, Vec<u8>>>,
    notifiers: Mutex<HashMap<Uuid, broadcast::Sender<Vec<u8>>>>,
    notifying: Mutex<HashSet<Uuid>>,
}

/// A fake peripheral. Clones share connection state and the write log.
#[derive(Clone)]
pub struct SimulatedPeripheral {
    id: String,
    name: Option<String>,
    services: HashMap<Uuid, Vec<Uuid>>,
    connect_failure: Option<String>,
    state: Arc<PeripheralState>,
    events: broadcast::Sender<BleDeviceEvent>,
}

impl SimulatedPeripheral {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            id: id.into(),
            name,
            services: HashMap::new(),
            connect_failure: None,
            state: Arc::new(PeripheralState::default()),
            events,
        }
    }

    pub fn robot(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(format!("sim-{name}"), Some(name))
            .with_characteristic(ROBOT_SERVICE_UUID, ROBOT_COMMAND_CHARACTERISTIC_UUID)
    }

    pub fn with_characteristic(mut self, service: Uuid, characteristic: Uuid) -> Self {
        self.services.entry(service).or_default().push(characteristic);
        self
    }

    pub fn with_connect_failure(mut self, reason: impl Into<String>) -> Self {
        self.connect_failure = Some(reason.into());
        self
    }

    pub fn set_write_failure(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_value(&self, characteristic: Uuid, value: Vec<u8>) {
        lock(&self.state.values).insert(characteristic, value);
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    /// Every value written so far, with the characteristic it went to.
    pub fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        lock(&self.state.writes).clone()
    }

    /// Pushes a notification to subscribers. Returns how many received it.
    pub fn notify(&self, characteristic: Uuid, value: Vec<u8>) -> usize {
        if !lock(&self.state.notifying).contains(&characteristic) {
            return 0;
        }
        lock(&self.state.notifiers)
            .get(&characteristic)
            .and_then(|sender| sender.send(value).ok())
            .unwrap_or(0)
    }

    /// Simulates the radio link dropping.
    pub fn drop_connection(&self) {
        if self.state.connected.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(BleDeviceEvent::GattServerDisconnected);
        }
    }

    fn has_characteristic(&self, service: Uuid, characteristic: Uuid) -> bool {
        self.services
            .get(&service)
            .is_some_and(|characteristics| characteristics.contains(&characteristic))
    }
}

#[async_trait]
impl BleDevice for SimulatedPeripheral {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn has_gatt(&self) -> bool {
        !self.services.is_empty()
    }

    async fn connect_gatt(&self) -> Result<Arc<dyn GattServer>, BleError> {
        if let Some(reason) = &self.connect_failure {
            return Err(BleError::Gatt(reason.clone()));
        }
        self.state.connected.store(true, Ordering::SeqCst);
        info!(device_id = %self.id, "ble: simulated gatt connected");
        Ok(Arc::new(SimulatedGattServer {
            peripheral: self.clone(),
        }))
    }

    fn subscribe_events(&self) -> broadcast::Receiver<BleDeviceEvent> {
        self.events.subscribe()
    }
}

struct SimulatedGattServer {
    peripheral: SimulatedPeripheral,
}

#[async_trait]
impl GattServer for SimulatedGattServer {
    fn is_connected(&self) -> bool {
        self.peripheral.is_connected()
    }

    async fn primary_service(&self, service: Uuid) -> Result<Arc<dyn GattService>, BleError> {
        if !self.is_connected() {
            return Err(BleError::NotConnected);
        }
        if !self.peripheral.services.contains_key(&service) {
            return Err(BleError::ServiceNotFound(service));
        }
        Ok(Arc::new(SimulatedGattService {
            peripheral: self.peripheral.clone(),
            uuid: service,
        }))
    }

    async fn disconnect(&self) {
        self.peripheral.drop_connection();
    }
}

struct SimulatedGattService {
    peripheral: SimulatedPeripheral,
    uuid: Uuid,
}

#[async_trait]
impl GattService for SimulatedGattService {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn characteristic(
        &self,
        characteristic: Uuid,
    ) -> Result<Arc<dyn GattCharacteristic>, BleError> {
        if !self.peripheral.has_characteristic(self.uuid, characteristic) {
            return Err(BleError::CharacteristicNotFound(characteristic));
        }
        Ok(Arc::new(SimulatedCharacteristic {
            peripheral: self.peripheral.clone(),
            uuid: characteristic,
        }))
    }
}

struct SimulatedCharacteristic {
    peripheral: SimulatedPeripheral,
    uuid: Uuid,
}

impl SimulatedCharacteristic {
    fn ensure_connected(&self) -> Result<(), BleError> {
        if self.peripheral.is_connected() {
            Ok(())
        } else {
            Err(BleError::NotConnected)
        }
    }
}

#[async_trait]
impl GattCharacteristic for SimulatedCharacteristic {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn write_without_response(&self, value: &[u8]) -> Result<(), BleError> {
        self.ensure_connected()?;
        if self.peripheral.state.fail_writes.load(Ordering::SeqCst) {
            return Err(BleError::Gatt("write rejected by peripheral".into()));
        }
        info!(characteristic = %self.uuid, ?value, "ble: simulated write");
        lock(&self.peripheral.state.writes).push((self.uuid, value.to_vec()));
        Ok(())
    }

    async fn read_value(&self) -> Result<Vec<u8>, BleError> {
        self.ensure_connected()?;
        Ok(lock(&self.peripheral.state.values)
            .get(&self.uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn start_notifications(&self) -> Result<broadcast::Receiver<Vec<u8>>, BleError> {
        self.ensure_connected()?;
        lock(&self.peripheral.state.notifying).insert(self.uuid);
        let receiver = lock(&self.peripheral.state.notifiers)
            .entry(self.uuid)
            .or_insert_with(|| broadcast::channel(32).0)
            .subscribe();
        Ok(receiver)
    }

    async fn stop_notifications(&self) -> Result<(), BleError> {
        self.ensure_connected()?;
        lock(&self.peripheral.state.notifying).remove(&self.uuid);
        Ok(())
    }
}
