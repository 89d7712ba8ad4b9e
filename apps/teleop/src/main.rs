mod commands;
mod config;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use ble_integration::{BlePlatform, SimulatedBlePlatform, UnsupportedBlePlatform};
use clap::{Parser, ValueEnum};
use client_core::{
    CameraFeed, ConsoleMessage, ProtocolCatalog, RuntimeConfig, SessionConfig, SessionEvent, SessionHandle,
    SessionRuntime, SessionSnapshot, WebSocketConnector,
};
use drive::Joystick;
use shared::domain::{GuestRole, RoomId};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    commands::{ConsoleCommand, HELP},
    config::{load_settings, Settings, DEFAULT_CONFIG_PATH},
};

/// On-screen joystick size used to turn `drive` readings into pointer drags.
const JOYSTICK_SIZE: f64 = 150.0;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Role {
    Operator,
    Robot,
}

impl From<Role> for GuestRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Operator => GuestRole::Operator,
            Role::Robot => GuestRole::Robot,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Robot teleoperation console")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    zone: Option<String>,
    #[arg(long, value_enum, default_value_t = Role::Operator)]
    role: Role,
    /// Room joined once it appears in the room list.
    #[arg(long)]
    room: Option<i64>,
    /// Participant paired with once the room is joined.
    #[arg(long)]
    target: Option<String>,
    /// Protocol catalog file path or http(s) URL.
    #[arg(long)]
    catalog: Option<String>,
    /// Use an in-process simulated robot instead of a Bluetooth stack.
    #[arg(long)]
    simulate_ble: bool,
}

impl Args {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(v) = &self.server_url {
            settings.server_url = v.clone();
        }
        if let Some(v) = &self.zone {
            settings.zone = v.clone();
        }
        if self.catalog.is_some() {
            settings.catalog_url = self.catalog.clone();
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let settings = args.apply(load_settings(&args.config));
    info!(
        server_url = %settings.server_url,
        zone = %settings.zone,
        role = ?args.role,
        "teleop: starting"
    );

    let platform: Arc<dyn BlePlatform> = if args.simulate_ble {
        Arc::new(SimulatedBlePlatform::with_robot().0)
    } else {
        Arc::new(UnsupportedBlePlatform)
    };
    let runtime_config = RuntimeConfig {
        session: SessionConfig {
            server_url: settings.server_url.clone(),
            zone: settings.zone.clone(),
            role: args.role.into(),
            auto_join_room: args.room.map(RoomId),
            auto_target: args.target.clone(),
        },
        connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
        ble_timeout: Duration::from_secs(settings.ble_timeout_secs),
        ble_service: settings.ble_service_uuid,
        ble_characteristic: settings.ble_characteristic_uuid,
    };
    let (handle, runtime_task) =
        SessionRuntime::spawn(runtime_config, Arc::new(WebSocketConnector), platform);

    spawn_console_printer(&handle);
    if let Some(source) = settings.catalog_url.clone() {
        spawn_catalog_loader(handle.clone(), source);
    }

    let mut console = OperatorConsole {
        handle: handle.clone(),
        joystick: Joystick::new(JOYSTICK_SIZE),
        camera: CameraFeed::default(),
        camera_host: settings.camera_host.clone(),
    };
    let mut lines = BufReader::new(stdin()).lines();
    println!("{HELP}");
    while let Some(line) = lines.next_line().await? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err:#}");
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }
        if let Err(err) = console.run(command).await {
            warn!(error = %err, "teleop: command failed");
        }
    }

    handle.dispatch(SessionEvent::Shutdown)?;
    runtime_task.await?;
    Ok(())
}

struct OperatorConsole {
    handle: SessionHandle,
    joystick: Joystick,
    camera: CameraFeed,
    camera_host: Option<String>,
}

impl OperatorConsole {
    async fn run(&mut self, command: ConsoleCommand) -> Result<()> {
        let event = match command {
            ConsoleCommand::Connect => SessionEvent::Connect,
            ConsoleCommand::Disconnect => SessionEvent::Disconnect,
            ConsoleCommand::Rooms => SessionEvent::RequestRoomList,
            ConsoleCommand::Join(room_id) => SessionEvent::JoinRoom(room_id),
            ConsoleCommand::Target(name) | ConsoleCommand::Pair(name) => {
                SessionEvent::TargetParticipantByName(name)
            }
            ConsoleCommand::Unpair(name) => SessionEvent::RemoveBuddy(name),
            ConsoleCommand::Cmd { name, value } => {
                SessionEvent::SendRobotCommand { cmd: name, value }
            }
            ConsoleCommand::Drive { angle, distance } => {
                let pointer = self.joystick.pointer_at(angle, distance);
                let vector = match self.joystick.drag(pointer) {
                    Some(vector) => vector,
                    None => self.joystick.press(pointer),
                };
                SessionEvent::Drive(vector)
            }
            ConsoleCommand::Release => match self.joystick.release() {
                Some(vector) => SessionEvent::Drive(vector),
                None => return Ok(()),
            },
            ConsoleCommand::BleScan => SessionEvent::ConnectBle,
            ConsoleCommand::BleDisconnect => SessionEvent::DisconnectBle,
            ConsoleCommand::Protocol(name) => SessionEvent::SelectProtocol(name),
            ConsoleCommand::Clear => SessionEvent::ClearConsole,
            ConsoleCommand::Raw(text) => SessionEvent::ConsoleInput(text),
            ConsoleCommand::Status => {
                print_status(&self.handle.snapshot().await?);
                if let Some(host) = &self.camera_host {
                    if let Ok(url) = self.camera.stream_url(host) {
                        println!("camera stream: {url}");
                    }
                }
                return Ok(());
            }
            ConsoleCommand::Protocols => {
                let snapshot = self.handle.snapshot().await?;
                for name in &snapshot.protocols {
                    let marker = if snapshot.active_protocol.as_ref() == Some(name) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{marker} {name}");
                }
                return Ok(());
            }
            ConsoleCommand::Log => {
                for entry in self.handle.snapshot().await?.console {
                    println!("{}", entry.render());
                }
                return Ok(());
            }
            ConsoleCommand::Camera(host) => {
                match self.camera.stream_url(&host) {
                    Ok(url) => {
                        println!("camera stream: {url}");
                        self.camera_host = Some(host);
                    }
                    Err(err) => println!("{err:#}"),
                }
                return Ok(());
            }
            ConsoleCommand::Help => {
                println!("{HELP}");
                return Ok(());
            }
            ConsoleCommand::Quit => return Ok(()),
        };
        self.handle.dispatch(event)
    }
}

fn print_status(snapshot: &SessionSnapshot) {
    println!(
        "server: {:?}  buddy: {:?}  ble: {:?}{}",
        snapshot.server_link,
        snapshot.buddy_link,
        snapshot.ble_link,
        if snapshot.ble_scanning { " (scanning)" } else { "" }
    );
    if let Some(me) = &snapshot.me {
        println!("me: {} (#{})", me.name, me.participant_id.0);
    }
    if let Some(room) = &snapshot.joined_room {
        println!(
            "room: {} (#{}) {}/{}",
            room.name, room.room_id.0, room.user_count, room.max_users
        );
        for participant in &snapshot.participants {
            let target = if snapshot.target == Some(participant.participant_id) {
                " <- target"
            } else {
                ""
            };
            println!(
                "  #{} {}{target}",
                participant.participant_id.0, participant.name
            );
        }
    } else {
        for room in &snapshot.rooms {
            println!(
                "  room #{} {} {}/{}",
                room.room_id.0, room.name, room.user_count, room.max_users
            );
        }
    }
    println!(
        "joystick: {:.0} deg @ {:.2}  wheels: L{} R{}",
        snapshot.joystick.angle,
        snapshot.joystick.distance,
        snapshot.wheels.left,
        snapshot.wheels.right
    );
    if let Some(name) = &snapshot.ble_device_name {
        println!("robot radio: {name}");
    }
    if let Some(error) = &snapshot.connection_error {
        println!("last error: {error}");
    }
}

/// Echoes new console entries as they are published.
fn spawn_console_printer(handle: &SessionHandle) {
    let mut snapshots = handle.subscribe_snapshots();
    tokio::spawn(async move {
        let mut last_seen = 0;
        loop {
            let snapshot = match snapshots.recv().await {
                Ok(snapshot) => snapshot,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };
            for entry in unseen_entries(&snapshot.console, last_seen) {
                println!("{}", entry.render());
                last_seen = entry.id;
            }
        }
    });
}

/// Console entries newer than `last_seen`, oldest first.
fn unseen_entries(
    entries: &[ConsoleMessage],
    last_seen: u64,
) -> impl Iterator<Item = &ConsoleMessage> {
    entries.iter().filter(move |entry| entry.id > last_seen)
}

fn spawn_catalog_loader(handle: SessionHandle, source: String) {
    tokio::spawn(async move {
        let event = match ProtocolCatalog::load(&source).await {
            Ok(catalog) => SessionEvent::CatalogLoaded(catalog),
            Err(err) => SessionEvent::CatalogFailed(err.to_string()),
        };
        let _ = handle.dispatch(event);
    });
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
