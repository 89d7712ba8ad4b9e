//! Session state reducer.
//!
//! Every state change of the teleoperation session goes through
//! [`Session::apply`]: user intents and transport notifications arrive as
//! [`SessionEvent`]s, the reducer updates its state and returns the
//! [`SessionAction`]s the runtime has to carry out. The reducer itself performs
//! no I/O.

use drive::{DriveDirection, JoystickVector, WheelCommand};
use shared::{
    domain::{
        BuddySummary, GuestRole, LinkState, ParticipantId, ParticipantSummary, RoomId,
        RoomSummary, ServerLinkState,
    },
    error::ApiException,
    protocol::{BuddyPayload, ClientRequest, ServerEvent},
};
use tracing::{debug, info, warn};

use crate::{
    catalog::ProtocolCatalog,
    console::{Console, ConsoleMessage, MessageKind},
    error::describe_connection_failure,
};

/// Command name used for joystick-derived robot commands.
pub const DRIVE_COMMAND: &str = "drive";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub server_url: String,
    pub zone: String,
    pub role: GuestRole,
    /// Room joined as soon as it shows up in the room list.
    pub auto_join_room: Option<RoomId>,
    /// Participant targeted (and paired) as soon as the room is joined.
    pub auto_target: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/ws".into(),
            zone: "RobotZone".into(),
            role: GuestRole::Operator,
            auto_join_room: None,
            auto_target: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connect,
    Disconnect,
    RequestRoomList,
    JoinRoom(RoomId),
    TargetParticipant(Option<ParticipantId>),
    TargetParticipantByName(String),
    AddBuddy(String),
    RemoveBuddy(String),
    SendRobotCommand { cmd: String, value: i64 },
    Drive(JoystickVector),
    ConsoleInput(String),
    ClearConsole,
    CatalogLoaded(ProtocolCatalog),
    CatalogFailed(String),
    SelectProtocol(String),
    ConnectBle,
    DisconnectBle,
    Shutdown,

    ServerConnected,
    ServerConnectFailed(String),
    ServerClosed(Option<String>),
    Server(ServerEvent),
    MalformedServerFrame(String),
    BleConnected { device_name: Option<String> },
    BleFailed(String),
    BleDisconnected,
    RadioWriteFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    OpenTransport { url: String },
    CloseTransport,
    Send(ClientRequest),
    ConnectBle,
    DisconnectBle,
    /// Write this byte to the robot's command characteristic.
    ForwardToRadio(u8),
}

/// Read-only view of the session published to front ends.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub server_link: ServerLinkState,
    pub buddy_link: LinkState,
    pub ble_link: LinkState,
    pub ble_scanning: bool,
    pub ble_device_name: Option<String>,
    pub logged_in: bool,
    pub me: Option<ParticipantSummary>,
    pub target: Option<ParticipantId>,
    pub connection_error: Option<String>,
    pub rooms: Vec<RoomSummary>,
    pub joined_room: Option<RoomSummary>,
    pub participants: Vec<ParticipantSummary>,
    pub buddies: Vec<BuddySummary>,
    pub joystick: JoystickVector,
    pub wheels: WheelCommand,
    pub active_protocol: Option<String>,
    pub protocols: Vec<String>,
    pub console: Vec<ConsoleMessage>,
}

pub struct Session {
    config: SessionConfig,
    server_link: ServerLinkState,
    buddy_link: LinkState,
    ble_link: LinkState,
    ble_scanning: bool,
    /// Disconnect requested while a connect was still in flight.
    ble_disconnect_pending: bool,
    ble_device_name: Option<String>,
    logged_in: bool,
    me: Option<ParticipantSummary>,
    target: Option<ParticipantId>,
    connection_error: Option<String>,
    rooms: Vec<RoomSummary>,
    joined_room: Option<RoomSummary>,
    participants: Vec<ParticipantSummary>,
    buddies: Vec<BuddySummary>,
    joystick: JoystickVector,
    wheels: WheelCommand,
    last_direction: DriveDirection,
    catalog: ProtocolCatalog,
    active_protocol: Option<String>,
    console: Console,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let mut console = Console::new();
        console.push(MessageKind::Info, "Robot control interface initialized");
        Self {
            config,
            server_link: ServerLinkState::Disconnected,
            buddy_link: LinkState::Disconnected,
            ble_link: LinkState::Disconnected,
            ble_scanning: false,
            ble_disconnect_pending: false,
            ble_device_name: None,
            logged_in: false,
            me: None,
            target: None,
            connection_error: None,
            rooms: Vec::new(),
            joined_room: None,
            participants: Vec::new(),
            buddies: Vec::new(),
            joystick: JoystickVector::ZERO,
            wheels: WheelCommand::STOP,
            last_direction: DriveDirection::Stop,
            catalog: ProtocolCatalog::default(),
            active_protocol: None,
            console,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn server_link(&self) -> ServerLinkState {
        self.server_link
    }

    pub fn buddy_link(&self) -> LinkState {
        self.buddy_link
    }

    pub fn ble_link(&self) -> LinkState {
        self.ble_link
    }

    /// True while a BLE scan or connect is in flight.
    pub fn ble_scanning(&self) -> bool {
        self.ble_scanning
    }

    pub fn target(&self) -> Option<ParticipantId> {
        self.target
    }

    pub fn connection_error(&self) -> Option<&str> {
        self.connection_error.as_deref()
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            server_link: self.server_link,
            buddy_link: self.buddy_link,
            ble_link: self.ble_link,
            ble_scanning: self.ble_scanning,
            ble_device_name: self.ble_device_name.clone(),
            logged_in: self.logged_in,
            me: self.me.clone(),
            target: self.target,
            connection_error: self.connection_error.clone(),
            rooms: self.rooms.clone(),
            joined_room: self.joined_room.clone(),
            participants: self.participants.clone(),
            buddies: self.buddies.clone(),
            joystick: self.joystick,
            wheels: self.wheels,
            active_protocol: self.active_protocol.clone(),
            protocols: self.catalog.protocol_names().map(str::to_string).collect(),
            console: self.console.entries().to_vec(),
        }
    }

    pub fn apply(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        match event {
            SessionEvent::Connect => self.on_connect(&mut actions),
            SessionEvent::Disconnect => self.on_disconnect(&mut actions),
            SessionEvent::RequestRoomList => self.request(ClientRequest::ListRooms, &mut actions),
            SessionEvent::JoinRoom(room_id) => {
                self.request(ClientRequest::JoinRoom { room_id }, &mut actions)
            }
            SessionEvent::TargetParticipant(target) => self.set_target(target),
            SessionEvent::TargetParticipantByName(name) => {
                self.target_by_name(&name, &mut actions)
            }
            SessionEvent::AddBuddy(name) => {
                self.request(ClientRequest::AddBuddy { name }, &mut actions)
            }
            SessionEvent::RemoveBuddy(name) => {
                self.request(ClientRequest::RemoveBuddy { name }, &mut actions)
            }
            SessionEvent::SendRobotCommand { cmd, value } => {
                self.send_robot_command(&cmd, value, &mut actions);
            }
            SessionEvent::Drive(vector) => self.on_drive(vector, &mut actions),
            SessionEvent::ConsoleInput(text) => self.on_console_input(&text, &mut actions),
            SessionEvent::ClearConsole => self.console.clear(),
            SessionEvent::CatalogLoaded(catalog) => self.on_catalog_loaded(catalog),
            SessionEvent::CatalogFailed(reason) => {
                warn!(%reason, "session: protocol catalog unavailable");
                self.console.push(
                    MessageKind::Warning,
                    format!("Protocol catalog unavailable: {reason}"),
                );
            }
            SessionEvent::SelectProtocol(name) => self.select_protocol(&name),
            SessionEvent::ConnectBle => self.on_connect_ble(&mut actions),
            SessionEvent::DisconnectBle => self.on_disconnect_ble(&mut actions),
            SessionEvent::Shutdown => {
                self.on_disconnect(&mut actions);
                self.on_disconnect_ble(&mut actions);
            }
            SessionEvent::ServerConnected => self.on_server_connected(&mut actions),
            SessionEvent::ServerConnectFailed(reason) => self.on_server_connect_failed(&reason),
            SessionEvent::ServerClosed(reason) => self.on_server_closed(reason),
            SessionEvent::Server(event) => self.on_server_event(event, &mut actions),
            SessionEvent::MalformedServerFrame(reason) => {
                warn!(%reason, "session: dropping malformed game server frame");
            }
            SessionEvent::BleConnected { device_name } => {
                self.on_ble_connected(device_name, &mut actions)
            }
            SessionEvent::BleFailed(reason) => self.on_ble_failed(&reason),
            SessionEvent::BleDisconnected => self.on_ble_disconnected(),
            SessionEvent::RadioWriteFailed(reason) => {
                warn!(%reason, "session: radio write failed");
                self.console
                    .push(MessageKind::Error, format!("Robot write failed: {reason}"));
            }
        }
        actions
    }

    fn on_connect(&mut self, actions: &mut Vec<SessionAction>) {
        if self.server_link != ServerLinkState::Disconnected {
            debug!(state = ?self.server_link, "session: connect ignored");
            return;
        }
        info!(url = %self.config.server_url, "session: connecting to game server");
        self.server_link = ServerLinkState::Connecting;
        self.connection_error = None;
        actions.push(SessionAction::OpenTransport {
            url: self.config.server_url.clone(),
        });
    }

    fn on_disconnect(&mut self, actions: &mut Vec<SessionAction>) {
        if self.server_link == ServerLinkState::Disconnected {
            return;
        }
        info!("session: disconnecting from game server");
        actions.push(SessionAction::CloseTransport);
        self.reset_server_state();
        self.console
            .push(MessageKind::Info, "Disconnected from game server");
    }

    fn reset_server_state(&mut self) {
        self.server_link = ServerLinkState::Disconnected;
        self.buddy_link = LinkState::Disconnected;
        self.logged_in = false;
        self.me = None;
        self.rooms.clear();
        self.joined_room = None;
        self.participants.clear();
        self.buddies.clear();
    }

    fn on_server_connected(&mut self, actions: &mut Vec<SessionAction>) {
        if self.server_link != ServerLinkState::Connecting {
            warn!(state = ?self.server_link, "session: unexpected transport open; closing it");
            actions.push(SessionAction::CloseTransport);
            return;
        }
        self.server_link = ServerLinkState::Connected;
        info!(zone = %self.config.zone, "session: connected; logging in as guest");
        self.console
            .push(MessageKind::Info, "Connected to game server");
        actions.push(SessionAction::Send(ClientRequest::Login {
            zone: self.config.zone.clone(),
            username: String::new(),
        }));
    }

    fn on_server_connect_failed(&mut self, reason: &str) {
        if self.server_link != ServerLinkState::Connecting {
            debug!(%reason, "session: stale connect failure ignored");
            return;
        }
        warn!(%reason, "session: game server connection failed");
        self.reset_server_state();
        self.record_error(describe_connection_failure(reason));
    }

    fn on_server_closed(&mut self, reason: Option<String>) {
        if self.server_link == ServerLinkState::Disconnected {
            return;
        }
        warn!(?reason, "session: game server link dropped");
        self.reset_server_state();
        match reason {
            Some(reason) => self.record_error(describe_connection_failure(&reason)),
            None => {
                self.console
                    .push(MessageKind::Warning, "Game server closed the connection");
            }
        }
    }

    fn on_server_event(&mut self, event: ServerEvent, actions: &mut Vec<SessionAction>) {
        match event {
            ServerEvent::LoginOk { participant, zone } => {
                info!(
                    participant_id = participant.participant_id.0,
                    %zone,
                    "session: logged in"
                );
                self.logged_in = true;
                self.me = Some(ParticipantSummary {
                    is_self: true,
                    ..participant
                });
                self.console
                    .push(MessageKind::Info, format!("Logged in to zone {zone}"));
                self.request(ClientRequest::ListRooms, actions);
            }
            ServerEvent::LoginError { reason } => {
                warn!(%reason, "session: login rejected");
                actions.push(SessionAction::CloseTransport);
                self.reset_server_state();
                self.record_error(format!("Login rejected: {reason}"));
            }
            ServerEvent::RoomListUpdated { rooms } => {
                debug!(count = rooms.len(), "session: room list updated");
                self.rooms = rooms;
                self.maybe_auto_join(actions);
            }
            ServerEvent::RoomJoined { room, participants } => {
                info!(room_id = room.room_id.0, name = %room.name, "session: joined room");
                self.console
                    .push(MessageKind::Info, format!("Joined room {}", room.name));
                self.joined_room = Some(room);
                self.participants = participants
                    .into_iter()
                    .map(|participant| self.mark_self(participant))
                    .collect();
                self.request(ClientRequest::InitBuddyList, actions);
                if let Some(name) = self.config.auto_target.clone() {
                    self.target_by_name(&name, actions);
                }
            }
            ServerEvent::RoomJoinError { reason } => {
                warn!(%reason, "session: room join rejected");
                self.record_error(format!("Room join rejected: {reason}"));
            }
            ServerEvent::UserEnteredRoom {
                room_id,
                participant,
            } => {
                if !self.in_room(room_id) {
                    return;
                }
                let participant = self.mark_self(participant);
                self.participants
                    .retain(|existing| existing.participant_id != participant.participant_id);
                self.console
                    .push(MessageKind::Info, format!("{} entered the room", participant.name));
                self.participants.push(participant);
                self.sync_occupancy();
            }
            ServerEvent::UserExitedRoom {
                room_id,
                participant_id,
            } => {
                if !self.in_room(room_id) {
                    return;
                }
                self.participants
                    .retain(|existing| existing.participant_id != participant_id);
                self.sync_occupancy();
            }
            ServerEvent::BuddyListInitialized { buddies } => {
                debug!(count = buddies.len(), "session: buddy list initialized");
                self.buddies = buddies;
                self.refresh_buddy_link();
            }
            ServerEvent::BuddyAdded { buddy } => {
                info!(participant_id = buddy.participant_id.0, name = %buddy.name, "session: buddy added");
                self.buddies
                    .retain(|existing| existing.participant_id != buddy.participant_id);
                if Some(buddy.participant_id) == self.target {
                    self.console
                        .push(MessageKind::Info, format!("Paired with {}", buddy.name));
                }
                self.buddies.push(buddy);
                self.refresh_buddy_link();
            }
            ServerEvent::BuddyRemoved { buddy } => {
                info!(participant_id = buddy.participant_id.0, "session: buddy removed");
                self.buddies
                    .retain(|existing| existing.participant_id != buddy.participant_id);
                if Some(buddy.participant_id) == self.target {
                    self.console
                        .push(MessageKind::Warning, format!("Unpaired from {}", buddy.name));
                }
                self.refresh_buddy_link();
            }
            ServerEvent::BuddyError { reason } => {
                warn!(%reason, "session: buddy request failed");
                self.record_error(format!("Pairing failed: {reason}"));
            }
            ServerEvent::BuddyMessage { sender, payload } => {
                self.on_buddy_message(sender, payload, actions);
            }
            ServerEvent::Error(error) => {
                let error = ApiException::from(error);
                warn!(%error, "session: game server reported an error");
                self.record_error(describe_connection_failure(&error.to_string()));
            }
        }
    }

    fn on_buddy_message(
        &mut self,
        sender: ParticipantId,
        payload: BuddyPayload,
        actions: &mut Vec<SessionAction>,
    ) {
        let Some(me) = self.me.as_ref().map(|me| me.participant_id) else {
            debug!(sender = sender.0, "session: buddy message before login dropped");
            return;
        };
        if !payload.is_addressed_to(me) {
            debug!(
                sender = sender.0,
                target_id = payload.target_id,
                "session: buddy message for another participant dropped"
            );
            return;
        }
        let Some(byte) = payload.radio_byte() else {
            warn!(cmd = %payload.cmd, value = payload.value, "session: command value does not fit a byte");
            self.console.push(
                MessageKind::Warning,
                format!("Dropped {} with out-of-range value {}", payload.cmd, payload.value),
            );
            return;
        };
        if !self.ble_link.is_connected() {
            warn!(cmd = %payload.cmd, value = byte, "session: robot radio not connected; command dropped");
            self.console.push(
                MessageKind::Warning,
                format!("BLE not connected; dropped {} {}", payload.cmd, byte),
            );
            return;
        }
        debug!(cmd = %payload.cmd, value = byte, "session: forwarding command to radio");
        self.console.push(
            MessageKind::Response,
            format!("{} {} forwarded to robot", payload.cmd, byte),
        );
        actions.push(SessionAction::ForwardToRadio(byte));
    }

    fn on_drive(&mut self, vector: JoystickVector, actions: &mut Vec<SessionAction>) {
        self.joystick = vector;
        self.wheels = vector.wheel_command();
        let direction = DriveDirection::classify(self.wheels);
        if direction == self.last_direction {
            return;
        }
        let Some(protocol) = self.active_protocol.clone() else {
            debug!(?direction, "session: no protocol selected; drive kept local");
            return;
        };
        let Some(value) = self.catalog.lookup(&protocol, direction.as_str()) else {
            debug!(%protocol, ?direction, "session: protocol has no drive mapping");
            return;
        };
        // Only a delivered direction counts; a dropped one is retried on the next reading.
        if self.send_robot_command(DRIVE_COMMAND, value, actions) {
            self.last_direction = direction;
        }
    }

    fn on_console_input(&mut self, text: &str, actions: &mut Vec<SessionAction>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.console.push(MessageKind::Command, text);

        let mut parts = text.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        let explicit = parts.next().and_then(|raw| raw.parse::<i64>().ok());
        let value = explicit.or_else(|| {
            let protocol = self.active_protocol.as_deref()?;
            self.catalog.lookup(protocol, cmd)
        });

        match value {
            Some(value) => {
                if self.send_robot_command(cmd, value, actions) {
                    self.console
                        .push(MessageKind::Response, format!("Command \"{text}\" processed"));
                }
            }
            None => {
                self.console.push(
                    MessageKind::Warning,
                    format!("Command \"{text}\" has no value and no protocol mapping"),
                );
            }
        }
    }

    /// Queues a buddy message to the targeted robot. Dropped with a warning
    /// while no robot is paired.
    fn send_robot_command(
        &mut self,
        cmd: &str,
        value: i64,
        actions: &mut Vec<SessionAction>,
    ) -> bool {
        let target = match (self.buddy_link, self.target) {
            (LinkState::Connected, Some(target)) => target,
            _ => {
                warn!(%cmd, value, "session: no paired robot; command dropped");
                self.console.push(
                    MessageKind::Warning,
                    format!("Cannot send {cmd}: not paired with a robot"),
                );
                return false;
            }
        };
        debug!(%cmd, value, target = target.0, "session: sending robot command");
        actions.push(SessionAction::Send(ClientRequest::BuddyMessage {
            recipient: target,
            payload: BuddyPayload::new(cmd, target, value),
        }));
        true
    }

    fn set_target(&mut self, target: Option<ParticipantId>) {
        self.target = target;
        self.refresh_buddy_link();
    }

    fn target_by_name(&mut self, name: &str, actions: &mut Vec<SessionAction>) {
        let Some(participant) = self
            .participants
            .iter()
            .find(|participant| participant.name == name)
            .cloned()
        else {
            warn!(%name, "session: no participant with that name in the room");
            self.console.push(
                MessageKind::Warning,
                format!("No participant named {name} in this room"),
            );
            return;
        };
        self.set_target(Some(participant.participant_id));
        if !self.buddy_link.is_connected() {
            self.request(
                ClientRequest::AddBuddy {
                    name: participant.name,
                },
                actions,
            );
        }
    }

    fn refresh_buddy_link(&mut self) {
        let paired = self.target.is_some_and(|target| {
            self.buddies
                .iter()
                .any(|buddy| buddy.participant_id == target)
        });
        self.buddy_link = if paired {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        };
    }

    fn on_catalog_loaded(&mut self, catalog: ProtocolCatalog) {
        info!(protocols = catalog.len(), "session: protocol catalog loaded");
        self.catalog = catalog;
        let still_valid = self
            .active_protocol
            .as_deref()
            .is_some_and(|name| self.catalog.table(name).is_some());
        if !still_valid {
            self.active_protocol = self.catalog.protocol_names().next().map(str::to_string);
        }
    }

    fn select_protocol(&mut self, name: &str) {
        if self.catalog.table(name).is_none() {
            self.console
                .push(MessageKind::Warning, format!("Unknown protocol {name}"));
            return;
        }
        self.active_protocol = Some(name.to_string());
        self.console
            .push(MessageKind::Info, format!("Using protocol {name}"));
    }

    fn on_connect_ble(&mut self, actions: &mut Vec<SessionAction>) {
        if self.config.role != GuestRole::Robot {
            self.console.push(
                MessageKind::Warning,
                "Bluetooth pairing is only available in the robot role",
            );
            return;
        }
        if self.ble_scanning && self.ble_disconnect_pending {
            debug!("session: pending BLE cancel withdrawn");
            self.ble_disconnect_pending = false;
            return;
        }
        if self.ble_link.is_connected() || self.ble_scanning {
            debug!("session: BLE connect ignored");
            return;
        }
        self.ble_scanning = true;
        actions.push(SessionAction::ConnectBle);
    }

    fn on_disconnect_ble(&mut self, actions: &mut Vec<SessionAction>) {
        if self.ble_scanning {
            if !self.ble_disconnect_pending {
                info!("session: BLE connect in flight; disconnecting once it settles");
                self.ble_disconnect_pending = true;
                self.console.push(MessageKind::Info, "BLE connect cancelled");
            }
            return;
        }
        if !self.ble_link.is_connected() {
            return;
        }
        actions.push(SessionAction::DisconnectBle);
        self.ble_link = LinkState::Disconnected;
        self.ble_device_name = None;
        self.console.push(MessageKind::Info, "BLE disconnected");
    }

    fn on_ble_connected(
        &mut self,
        device_name: Option<String>,
        actions: &mut Vec<SessionAction>,
    ) {
        self.ble_scanning = false;
        if std::mem::take(&mut self.ble_disconnect_pending) {
            info!(device = ?device_name, "session: closing BLE link connected after cancel");
            actions.push(SessionAction::DisconnectBle);
            return;
        }
        self.ble_link = LinkState::Connected;
        let label = device_name.as_deref().unwrap_or("unnamed device");
        info!(device = %label, "session: BLE connected");
        self.console
            .push(MessageKind::Info, format!("BLE connected to {label}"));
        self.ble_device_name = device_name;
    }

    fn on_ble_failed(&mut self, reason: &str) {
        self.ble_scanning = false;
        self.ble_link = LinkState::Disconnected;
        if std::mem::take(&mut self.ble_disconnect_pending) {
            debug!(%reason, "session: cancelled BLE connect failed");
            return;
        }
        warn!(%reason, "session: BLE connect failed");
        self.record_error(describe_connection_failure(reason));
    }

    fn on_ble_disconnected(&mut self) {
        if !self.ble_link.is_connected() {
            return;
        }
        self.ble_link = LinkState::Disconnected;
        self.ble_device_name = None;
        warn!("session: BLE link dropped");
        self.console
            .push(MessageKind::Warning, "BLE device disconnected");
    }

    /// Pushes a server request, or warns when the game server is not connected.
    fn request(&mut self, request: ClientRequest, actions: &mut Vec<SessionAction>) {
        if self.server_link != ServerLinkState::Connected {
            warn!(?request, "session: game server not connected; request dropped");
            self.console
                .push(MessageKind::Warning, "Not connected to game server");
            return;
        }
        actions.push(SessionAction::Send(request));
    }

    fn maybe_auto_join(&mut self, actions: &mut Vec<SessionAction>) {
        let Some(room_id) = self.config.auto_join_room else {
            return;
        };
        if self.joined_room.is_some() {
            return;
        }
        if self.rooms.iter().any(|room| room.room_id == room_id) {
            self.request(ClientRequest::JoinRoom { room_id }, actions);
        }
    }

    fn in_room(&self, room_id: RoomId) -> bool {
        self.joined_room
            .as_ref()
            .is_some_and(|room| room.room_id == room_id)
    }

    fn sync_occupancy(&mut self) {
        let count = self.participants.len() as u32;
        if let Some(room) = self.joined_room.as_mut() {
            room.user_count = count;
            let room_id = room.room_id;
            if let Some(listed) = self.rooms.iter_mut().find(|room| room.room_id == room_id) {
                listed.user_count = count;
            }
        }
    }

    fn mark_self(&self, participant: ParticipantSummary) -> ParticipantSummary {
        let is_self = self
            .me
            .as_ref()
            .is_some_and(|me| me.participant_id == participant.participant_id);
        ParticipantSummary {
            is_self,
            ..participant
        }
    }

    fn record_error(&mut self, message: String) {
        self.console.push(MessageKind::Error, message.clone());
        self.connection_error = Some(message);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
