use std::time::Duration;

use ble_integration::{
    SimulatedBlePlatform, SimulatedPeripheral, UnsupportedBlePlatform,
    ROBOT_COMMAND_CHARACTERISTIC_UUID, ROBOT_SERVICE_UUID,
};
use async_trait::async_trait;
use ble_integration::GattService;
use tokio::time::{sleep, timeout};

use super::*;

const SENSOR_CHARACTERISTIC: Uuid = uuid::uuid!("0000ffe1-0000-1000-8000-00805f9b34fb");

fn robot_link() -> (Arc<BleLink>, SimulatedPeripheral) {
    let robot = SimulatedPeripheral::robot("rover")
        .with_characteristic(ROBOT_SERVICE_UUID, SENSOR_CHARACTERISTIC);
    let platform = SimulatedBlePlatform::new(vec![robot.clone()]);
    (BleLink::new(Arc::new(platform), Duration::from_secs(5)), robot)
}

async fn connected_robot_link() -> (Arc<BleLink>, SimulatedPeripheral) {
    let (link, robot) = robot_link();
    let device = link
        .scan_for_devices(RequestDeviceOptions::for_service(ROBOT_SERVICE_UUID))
        .await
        .expect("robot in range");
    assert!(link.connect_to_device(device).await);
    (link, robot)
}

#[tokio::test]
async fn unsupported_platform_yields_null_and_error() {
    let link = BleLink::new(Arc::new(UnsupportedBlePlatform), Duration::from_secs(1));
    assert!(!link.is_supported());
    assert!(link
        .scan_for_devices(RequestDeviceOptions::default())
        .await
        .is_none());
    assert_eq!(
        link.connection_error().await.as_deref(),
        Some("Bluetooth is not supported on this platform")
    );
    assert!(!link.is_scanning().await);
}

#[tokio::test]
async fn scan_and_connect_reports_the_device() {
    let (link, robot) = connected_robot_link().await;
    assert!(robot.is_connected());
    assert_eq!(
        link.connected_device().await,
        Some(BleDeviceInfo {
            id: "sim-rover".into(),
            name: Some("rover".into()),
        })
    );
    assert_eq!(link.connection_error().await, None);
}

#[tokio::test]
async fn scan_without_match_records_error() {
    let (link, _robot) = robot_link();
    let options = RequestDeviceOptions {
        filters: vec![ble_integration::DeviceFilter {
            services: Vec::new(),
            name_prefix: Some("drone".into()),
        }],
        accept_all_devices: false,
        optional_services: Vec::new(),
    };
    assert!(link.scan_for_devices(options).await.is_none());
    assert_eq!(
        link.connection_error().await.as_deref(),
        Some("no device selected")
    );
}

#[tokio::test]
async fn failed_gatt_connect_returns_false() {
    let robot = SimulatedPeripheral::robot("rover").with_connect_failure("radio busy");
    let link = BleLink::new(
        Arc::new(SimulatedBlePlatform::new(vec![robot.clone()])),
        Duration::from_secs(5),
    );
    let device = link
        .scan_for_devices(RequestDeviceOptions::default())
        .await
        .expect("device");
    assert!(!link.connect_to_device(device).await);
    assert_eq!(
        link.connection_error().await.as_deref(),
        Some("GATT operation failed: radio busy")
    );
    assert_eq!(link.connected_device().await, None);
}

#[tokio::test]
async fn characteristic_handles_are_cached() {
    let (link, _robot) = connected_robot_link().await;
    let first = link
        .get_characteristic(ROBOT_SERVICE_UUID, ROBOT_COMMAND_CHARACTERISTIC_UUID)
        .await
        .expect("characteristic");
    let second = link
        .get_characteristic(ROBOT_SERVICE_UUID, ROBOT_COMMAND_CHARACTERISTIC_UUID)
        .await
        .expect("characteristic");
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn unknown_characteristic_is_reported() {
    let (link, _robot) = connected_robot_link().await;
    let missing = uuid::uuid!("00000000-0000-0000-0000-000000000001");
    assert!(link
        .get_characteristic(ROBOT_SERVICE_UUID, missing)
        .await
        .is_none());
    assert_eq!(
        link.connection_error().await,
        Some(format!("characteristic {missing} not found"))
    );
}

#[tokio::test]
async fn write_read_and_notify_through_the_link() {
    let (link, robot) = connected_robot_link().await;

    assert!(
        link.write_characteristic(ROBOT_SERVICE_UUID, ROBOT_COMMAND_CHARACTERISTIC_UUID, &[0x2a])
            .await
    );
    assert_eq!(
        robot.writes(),
        vec![(ROBOT_COMMAND_CHARACTERISTIC_UUID, vec![0x2a])]
    );

    robot.set_value(SENSOR_CHARACTERISTIC, vec![1, 2, 3]);
    assert_eq!(
        link.read_characteristic(ROBOT_SERVICE_UUID, SENSOR_CHARACTERISTIC)
            .await,
        Some(vec![1, 2, 3])
    );

    let mut values = link
        .subscribe_to_notifications(ROBOT_SERVICE_UUID, SENSOR_CHARACTERISTIC)
        .await
        .expect("notifications");
    assert_eq!(robot.notify(SENSOR_CHARACTERISTIC, vec![9]), 1);
    assert_eq!(values.recv().await.expect("value"), vec![9]);

    assert!(
        link.unsubscribe_from_notifications(ROBOT_SERVICE_UUID, SENSOR_CHARACTERISTIC)
            .await
    );
    assert_eq!(robot.notify(SENSOR_CHARACTERISTIC, vec![10]), 0);
}

#[tokio::test]
async fn rejected_write_returns_false() {
    let (link, robot) = connected_robot_link().await;
    robot.set_write_failure(true);
    assert!(
        !link
            .write_characteristic(ROBOT_SERVICE_UUID, ROBOT_COMMAND_CHARACTERISTIC_UUID, &[1])
            .await
    );
    assert!(robot.writes().is_empty());
}

#[tokio::test]
async fn device_drop_clears_the_link_and_notifies() {
    let (link, robot) = connected_robot_link().await;
    let mut events = link.subscribe_events();
    link.get_characteristic(ROBOT_SERVICE_UUID, ROBOT_COMMAND_CHARACTERISTIC_UUID)
        .await
        .expect("characteristic");

    robot.drop_connection();

    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event in time")
        .expect("event");
    assert_eq!(
        event,
        BleLinkEvent::Disconnected {
            device_id: "sim-rover".into()
        }
    );
    assert_eq!(link.connected_device().await, None);
    assert!(
        !link
            .write_characteristic(ROBOT_SERVICE_UUID, ROBOT_COMMAND_CHARACTERISTIC_UUID, &[1])
            .await
    );
    assert_eq!(
        link.connection_error().await.as_deref(),
        Some("not connected to any device")
    );
}

#[tokio::test]
async fn explicit_disconnect_is_silent() {
    let (link, robot) = connected_robot_link().await;
    let mut events = link.subscribe_events();

    link.disconnect().await;

    assert!(!robot.is_connected());
    assert_eq!(link.connected_device().await, None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.try_recv().is_err());
}

/// Wraps a simulated peripheral so service discovery takes a while.
struct SlowDiscoveryDevice {
    inner: SimulatedPeripheral,
    delay: Duration,
}

struct SlowDiscoveryServer {
    inner: Arc<dyn GattServer>,
    delay: Duration,
}

#[async_trait]
impl BleDevice for SlowDiscoveryDevice {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn name(&self) -> Option<String> {
        self.inner.name()
    }

    fn has_gatt(&self) -> bool {
        self.inner.has_gatt()
    }

    async fn connect_gatt(&self) -> Result<Arc<dyn GattServer>, BleError> {
        let inner = self.inner.connect_gatt().await?;
        Ok(Arc::new(SlowDiscoveryServer {
            inner,
            delay: self.delay,
        }))
    }

    fn subscribe_events(&self) -> broadcast::Receiver<BleDeviceEvent> {
        self.inner.subscribe_events()
    }
}

#[async_trait]
impl GattServer for SlowDiscoveryServer {
    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn primary_service(&self, service: Uuid) -> Result<Arc<dyn GattService>, BleError> {
        sleep(self.delay).await;
        self.inner.primary_service(service).await
    }

    async fn disconnect(&self) {
        self.inner.disconnect().await;
    }
}

#[tokio::test]
async fn characteristic_resolved_across_a_reconnect_is_not_cached() {
    let link = BleLink::new(Arc::new(UnsupportedBlePlatform), Duration::from_secs(5));
    let device: Arc<dyn BleDevice> = Arc::new(SlowDiscoveryDevice {
        inner: SimulatedPeripheral::robot("rover"),
        delay: Duration::from_millis(100),
    });
    assert!(link.connect_to_device(Arc::clone(&device)).await);

    let resolving = tokio::spawn({
        let link = Arc::clone(&link);
        async move {
            link.get_characteristic(ROBOT_SERVICE_UUID, ROBOT_COMMAND_CHARACTERISTIC_UUID)
                .await
                .is_some()
        }
    });
    sleep(Duration::from_millis(20)).await;
    link.disconnect().await;
    assert!(link.connect_to_device(device).await);

    assert!(resolving.await.expect("resolve task"));
    assert!(link.inner.lock().await.characteristics.is_empty());
}
