//! Session runtime: the single owner of [`Session`] state.
//!
//! A spawned task drains one inbox serially. User intents and the completions
//! of asynchronous work (transport connects, transport frames, BLE scans, BLE
//! disconnects, radio write failures) all arrive through it, are folded into
//! the reducer, and the resulting [`SessionAction`]s are executed here.

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use ble_integration::{BlePlatform, RequestDeviceOptions};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    ble_link::{BleLink, BleLinkEvent, DEFAULT_BLE_TIMEOUT},
    bridge::RadioBridge,
    session::{Session, SessionAction, SessionConfig, SessionEvent, SessionSnapshot},
    transport::{GameServerConnection, GameServerConnector, TransportEvent},
};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub session: SessionConfig,
    pub connect_timeout: Duration,
    pub ble_timeout: Duration,
    pub ble_service: Uuid,
    pub ble_characteristic: Uuid,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ble_timeout: DEFAULT_BLE_TIMEOUT,
            ble_service: ble_integration::ROBOT_SERVICE_UUID,
            ble_characteristic: ble_integration::ROBOT_COMMAND_CHARACTERISTIC_UUID,
        }
    }
}

enum RuntimeMessage {
    Event(SessionEvent),
    TransportReady {
        generation: u64,
        result: Result<Arc<dyn GameServerConnection>, String>,
    },
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Cloneable front-end handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    inbox: mpsc::UnboundedSender<RuntimeMessage>,
    snapshots: broadcast::Sender<SessionSnapshot>,
}

impl SessionHandle {
    pub fn dispatch(&self, event: SessionEvent) -> Result<()> {
        self.inbox
            .send(RuntimeMessage::Event(event))
            .map_err(|_| anyhow!("session runtime has stopped"))
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(RuntimeMessage::Snapshot(tx))
            .map_err(|_| anyhow!("session runtime has stopped"))?;
        rx.await
            .map_err(|_| anyhow!("session runtime has stopped"))
    }

    /// Receives a fresh snapshot after every processed message.
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }
}

pub struct SessionRuntime {
    session: Session,
    connector: Arc<dyn GameServerConnector>,
    ble: Arc<BleLink>,
    ble_options: RequestDeviceOptions,
    radio: mpsc::UnboundedSender<u8>,
    inbox: mpsc::UnboundedSender<RuntimeMessage>,
    snapshots: broadcast::Sender<SessionSnapshot>,
    connection: Option<Arc<dyn GameServerConnection>>,
    generation: u64,
    connect_timeout: Duration,
    ble_timeout: Duration,
}

impl SessionRuntime {
    /// Starts the runtime task and its helpers.
    pub fn spawn(
        config: RuntimeConfig,
        connector: Arc<dyn GameServerConnector>,
        platform: Arc<dyn BlePlatform>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let (snapshots, _) = broadcast::channel(64);
        let ble = BleLink::new(platform, config.ble_timeout);
        let bridge = RadioBridge::with_characteristic(
            Arc::clone(&ble),
            config.ble_service,
            config.ble_characteristic,
        );

        let radio = spawn_radio_writer(bridge, inbox.clone());
        spawn_ble_watcher(&ble, inbox.clone());

        let runtime = Self {
            session: Session::new(config.session),
            connector,
            ble,
            ble_options: RequestDeviceOptions::for_service(config.ble_service),
            radio,
            inbox: inbox.clone(),
            snapshots: snapshots.clone(),
            connection: None,
            generation: 0,
            connect_timeout: config.connect_timeout,
            ble_timeout: config.ble_timeout,
        };
        let task = tokio::spawn(runtime.run(inbox_rx));
        (SessionHandle { inbox, snapshots }, task)
    }

    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<RuntimeMessage>) {
        info!(role = ?self.session.config().role, "runtime: session started");
        while let Some(message) = inbox.recv().await {
            let shutdown = matches!(message, RuntimeMessage::Event(SessionEvent::Shutdown));
            match message {
                RuntimeMessage::Event(event) => self.apply(event).await,
                RuntimeMessage::TransportReady { generation, result } => {
                    self.on_transport_ready(generation, result).await;
                }
                RuntimeMessage::Transport { generation, event } => {
                    self.on_transport_event(generation, event).await;
                }
                RuntimeMessage::Snapshot(reply) => {
                    let _ = reply.send(self.session.snapshot());
                    continue;
                }
            }
            if shutdown {
                self.settle_ble_connect(&mut inbox).await;
                let _ = self.snapshots.send(self.session.snapshot());
                break;
            }
            let _ = self.snapshots.send(self.session.snapshot());
        }
        info!("runtime: session stopped");
    }

    /// Waits for an in-flight BLE connect so a link opened after shutdown is
    /// still closed.
    async fn settle_ble_connect(&mut self, inbox: &mut mpsc::UnboundedReceiver<RuntimeMessage>) {
        if !self.session.ble_scanning() {
            return;
        }
        debug!("runtime: waiting for in-flight BLE connect");
        // Scan and connect are each bounded by the BLE timeout.
        let limit = self.ble_timeout * 2;
        let settled = timeout(limit, async {
            while let Some(message) = inbox.recv().await {
                match message {
                    RuntimeMessage::Event(
                        event @ (SessionEvent::BleConnected { .. } | SessionEvent::BleFailed(_)),
                    ) => {
                        self.apply(event).await;
                        return;
                    }
                    RuntimeMessage::Snapshot(reply) => {
                        let _ = reply.send(self.session.snapshot());
                    }
                    _ => {}
                }
            }
        })
        .await;
        if settled.is_err() {
            warn!(?limit, "runtime: BLE connect did not settle; tearing down");
            self.ble.disconnect().await;
        }
    }

    async fn apply(&mut self, event: SessionEvent) {
        let actions = self.session.apply(event);
        for action in actions {
            self.execute(action).await;
        }
    }

    async fn execute(&mut self, action: SessionAction) {
        match action {
            SessionAction::OpenTransport { url } => self.open_transport(url),
            SessionAction::CloseTransport => self.close_transport(),
            SessionAction::Send(request) => match &self.connection {
                Some(connection) => {
                    if let Err(err) = connection.send(request) {
                        warn!(error = %err, "runtime: failed to send request");
                    }
                }
                None => warn!(?request, "runtime: no transport; request dropped"),
            },
            SessionAction::ConnectBle => self.connect_ble(),
            SessionAction::DisconnectBle => self.ble.disconnect().await,
            SessionAction::ForwardToRadio(value) => {
                if self.radio.send(value).is_err() {
                    warn!(value, "runtime: radio writer has stopped");
                }
            }
        }
    }

    fn open_transport(&mut self, url: String) {
        self.generation += 1;
        let generation = self.generation;
        let connector = Arc::clone(&self.connector);
        let inbox = self.inbox.clone();
        let connect_timeout = self.connect_timeout;
        debug!(generation, %url, "runtime: opening transport");
        tokio::spawn(async move {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let result = match timeout(connect_timeout, connector.connect(&url, tx)).await {
                Ok(Ok(connection)) => Ok(connection),
                Ok(Err(err)) => Err(format!("{err:#}")),
                Err(_) => Err(format!(
                    "game server connect timed out after {connect_timeout:?}"
                )),
            };
            let connected = result.is_ok();
            if inbox
                .send(RuntimeMessage::TransportReady { generation, result })
                .is_err()
                || !connected
            {
                return;
            }
            while let Some(event) = rx.recv().await {
                if inbox
                    .send(RuntimeMessage::Transport { generation, event })
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    fn close_transport(&mut self) {
        self.generation += 1;
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
    }

    async fn on_transport_ready(
        &mut self,
        generation: u64,
        result: Result<Arc<dyn GameServerConnection>, String>,
    ) {
        if generation != self.generation {
            debug!(generation, "runtime: stale transport completion");
            if let Ok(connection) = result {
                connection.close();
            }
            return;
        }
        match result {
            Ok(connection) => {
                self.connection = Some(connection);
                self.apply(SessionEvent::ServerConnected).await;
            }
            Err(reason) => self.apply(SessionEvent::ServerConnectFailed(reason)).await,
        }
    }

    async fn on_transport_event(&mut self, generation: u64, event: TransportEvent) {
        if generation != self.generation {
            debug!(generation, "runtime: stale transport event dropped");
            return;
        }
        match event {
            TransportEvent::Event(event) => self.apply(SessionEvent::Server(event)).await,
            TransportEvent::Malformed(reason) => {
                self.apply(SessionEvent::MalformedServerFrame(reason)).await;
            }
            TransportEvent::Closed(reason) => {
                self.connection = None;
                self.apply(SessionEvent::ServerClosed(reason)).await;
            }
        }
    }

    fn connect_ble(&self) {
        let ble = Arc::clone(&self.ble);
        let options = self.ble_options.clone();
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let event = match ble.scan_for_devices(options).await {
                Some(device) => {
                    let name = device.name();
                    if ble.connect_to_device(device).await {
                        SessionEvent::BleConnected { device_name: name }
                    } else {
                        SessionEvent::BleFailed(ble_failure(&ble).await)
                    }
                }
                None => SessionEvent::BleFailed(ble_failure(&ble).await),
            };
            let _ = inbox.send(RuntimeMessage::Event(event));
        });
    }
}

async fn ble_failure(ble: &BleLink) -> String {
    ble.connection_error()
        .await
        .unwrap_or_else(|| "Bluetooth connection failed".to_string())
}

/// Writes forwarded bytes in order, reporting failures back to the session.
fn spawn_radio_writer(
    bridge: RadioBridge,
    inbox: mpsc::UnboundedSender<RuntimeMessage>,
) -> mpsc::UnboundedSender<u8> {
    let (tx, mut rx) = mpsc::unbounded_channel::<u8>();
    tokio::spawn(async move {
        while let Some(value) = rx.recv().await {
            if bridge.forward(value).await {
                continue;
            }
            let reason = ble_failure(bridge.link()).await;
            if inbox
                .send(RuntimeMessage::Event(SessionEvent::RadioWriteFailed(reason)))
                .is_err()
            {
                break;
            }
        }
    });
    tx
}

fn spawn_ble_watcher(ble: &BleLink, inbox: mpsc::UnboundedSender<RuntimeMessage>) {
    let mut events = ble.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(BleLinkEvent::Disconnected { device_id }) => {
                    debug!(%device_id, "runtime: BLE device dropped");
                    if inbox
                        .send(RuntimeMessage::Event(SessionEvent::BleDisconnected))
                        .is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
