use serde_json::json;

use crate::{
    domain::{ParticipantId, RoomId},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{BuddyPayload, ClientRequest, ServerEvent},
};

#[test]
fn buddy_payload_uses_targetid_on_the_wire() {
    let payload = BuddyPayload::new("switch1", ParticipantId(42), 1);
    let value = serde_json::to_value(&payload).expect("serialize");
    assert_eq!(value, json!({ "cmd": "switch1", "targetid": 42, "value": 1 }));
}

#[test]
fn client_requests_are_adjacently_tagged() {
    let request = ClientRequest::JoinRoom { room_id: RoomId(3) };
    let value = serde_json::to_value(&request).expect("serialize");
    assert_eq!(
        value,
        json!({ "type": "join_room", "payload": { "room_id": 3 } })
    );

    let value = serde_json::to_value(ClientRequest::ListRooms).expect("serialize");
    assert_eq!(value, json!({ "type": "list_rooms" }));
}

#[test]
fn anonymous_login_omits_username_when_parsing() {
    let raw = r#"{"type":"login","payload":{"zone":"RobotZone"}}"#;
    let request: ClientRequest = serde_json::from_str(raw).expect("parse");
    assert_eq!(
        request,
        ClientRequest::Login {
            zone: "RobotZone".into(),
            username: String::new(),
        }
    );
}

#[test]
fn inbound_buddy_message_parses_from_server_shape() {
    let raw = r#"{
        "type": "buddy_message",
        "payload": {
            "sender": 7,
            "payload": { "cmd": "drive", "targetid": 9, "value": 7 }
        }
    }"#;
    let event: ServerEvent = serde_json::from_str(raw).expect("parse");
    let ServerEvent::BuddyMessage { sender, payload } = event else {
        panic!("expected buddy message");
    };
    assert_eq!(sender, ParticipantId(7));
    assert!(payload.is_addressed_to(ParticipantId(9)));
    assert_eq!(payload.radio_byte(), Some(7));
}

#[test]
fn radio_byte_rejects_values_outside_a_byte() {
    assert_eq!(BuddyPayload::new("x", ParticipantId(1), 255).radio_byte(), Some(255));
    assert_eq!(BuddyPayload::new("x", ParticipantId(1), 256).radio_byte(), None);
    assert_eq!(BuddyPayload::new("x", ParticipantId(1), -1).radio_byte(), None);
}

#[test]
fn api_exception_formats_code_and_message() {
    let err = ApiException::from(ApiError::new(ErrorCode::RoomFull, "room is full"));
    assert_eq!(err.to_string(), "RoomFull: room is full");
}
