use serde::{Deserialize, Serialize};

use crate::{
    domain::{BuddySummary, ParticipantId, ParticipantSummary, RoomId, RoomSummary},
    error::ApiError,
};

/// Structured body of a buddy message: a named robot command, the participant
/// it is addressed to, and its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuddyPayload {
    pub cmd: String,
    #[serde(rename = "targetid")]
    pub target_id: i64,
    pub value: i64,
}

impl BuddyPayload {
    pub fn new(cmd: impl Into<String>, target_id: ParticipantId, value: i64) -> Self {
        Self {
            cmd: cmd.into(),
            target_id: target_id.0,
            value,
        }
    }

    pub fn is_addressed_to(&self, participant_id: ParticipantId) -> bool {
        self.target_id == participant_id.0
    }

    /// The value as the single byte written to the robot, if it fits.
    pub fn radio_byte(&self) -> Option<u8> {
        u8::try_from(self.value).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Anonymous login when `username` is empty.
    Login {
        zone: String,
        #[serde(default)]
        username: String,
    },
    ListRooms,
    JoinRoom {
        room_id: RoomId,
    },
    InitBuddyList,
    AddBuddy {
        name: String,
    },
    RemoveBuddy {
        name: String,
    },
    BuddyMessage {
        recipient: ParticipantId,
        payload: BuddyPayload,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    LoginOk {
        participant: ParticipantSummary,
        zone: String,
    },
    LoginError {
        reason: String,
    },
    RoomListUpdated {
        rooms: Vec<RoomSummary>,
    },
    RoomJoined {
        room: RoomSummary,
        participants: Vec<ParticipantSummary>,
    },
    RoomJoinError {
        reason: String,
    },
    UserEnteredRoom {
        room_id: RoomId,
        participant: ParticipantSummary,
    },
    UserExitedRoom {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    BuddyListInitialized {
        buddies: Vec<BuddySummary>,
    },
    BuddyAdded {
        buddy: BuddySummary,
    },
    BuddyRemoved {
        buddy: BuddySummary,
    },
    BuddyError {
        reason: String,
    },
    BuddyMessage {
        sender: ParticipantId,
        payload: BuddyPayload,
    },
    Error(ApiError),
}
