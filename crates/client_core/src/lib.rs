//! Client core for the robot teleoperation dashboard: session reducer,
//! game-server transport, BLE link, radio bridge and the runtime that ties
//! them together.

pub mod ble_link;
pub mod bridge;
pub mod camera;
pub mod catalog;
pub mod console;
pub mod error;
pub mod runtime;
pub mod session;
pub mod transport;

pub use ble_link::{BleDeviceInfo, BleLink, BleLinkEvent};
pub use bridge::RadioBridge;
pub use camera::CameraFeed;
pub use catalog::ProtocolCatalog;
pub use console::{Console, ConsoleMessage, MessageKind};
pub use error::{describe_connection_failure, CatalogError, ConnectionErrorCategory};
pub use runtime::{RuntimeConfig, SessionHandle, SessionRuntime};
pub use session::{Session, SessionAction, SessionConfig, SessionEvent, SessionSnapshot};
pub use transport::{
    GameServerConnection, GameServerConnector, MissingGameServerConnector, TransportEvent,
    WebSocketConnector,
};
