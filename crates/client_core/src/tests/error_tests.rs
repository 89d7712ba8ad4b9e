use super::*;

#[test]
fn refused_connections_are_transport_failures() {
    let message = "failed to connect websocket: ws://127.0.0.1:9/ws: Connection refused (os error 111)";
    assert_eq!(
        classify_connection_failure(message),
        ConnectionErrorCategory::Transport
    );
    assert!(describe_connection_failure(message).starts_with("Game server unreachable"));
}

#[test]
fn missing_bluetooth_reads_as_unsupported() {
    assert_eq!(
        classify_connection_failure("Bluetooth is not supported on this platform"),
        ConnectionErrorCategory::Unsupported
    );
}

#[test]
fn gatt_failures_are_bluetooth_errors() {
    assert_eq!(
        classify_connection_failure("GATT operation failed: link lost"),
        ConnectionErrorCategory::Bluetooth
    );
    assert_eq!(
        describe_connection_failure("characteristic beb5 not found"),
        "Bluetooth error: characteristic beb5 not found"
    );
}

#[test]
fn login_and_room_rejections_are_grouped() {
    assert_eq!(
        classify_connection_failure("login rejected: zone closed"),
        ConnectionErrorCategory::Rejected
    );
    assert_eq!(
        classify_connection_failure("RoomFull: room is full"),
        ConnectionErrorCategory::Rejected
    );
}

#[test]
fn unknown_failures_keep_the_raw_message() {
    assert_eq!(
        describe_connection_failure("something odd"),
        "Connection error: something odd"
    );
}
