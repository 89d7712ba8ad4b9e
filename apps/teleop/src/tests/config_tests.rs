use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_target_the_robot_controller() {
    let settings = Settings::default();
    assert_eq!(settings.ble_service_uuid, ROBOT_SERVICE_UUID);
    assert_eq!(
        settings.ble_characteristic_uuid,
        ROBOT_COMMAND_CHARACTERISTIC_UUID
    );
    assert_eq!(settings.zone, "RobotZone");
    assert_eq!(settings.catalog_url, None);
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
server_url = "wss://game.example/ws"
zone = "Arena"
camera_host = "192.168.4.1"
connect_timeout_secs = 3
"#,
    );
    assert_eq!(settings.server_url, "wss://game.example/ws");
    assert_eq!(settings.zone, "Arena");
    assert_eq!(settings.camera_host.as_deref(), Some("192.168.4.1"));
    assert_eq!(settings.connect_timeout_secs, 3);
    assert_eq!(settings.ble_timeout_secs, 20);
}

#[test]
fn malformed_file_is_ignored() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "server_url = [1, 2");
    assert_eq!(settings, Settings::default());
}

#[test]
fn env_overrides_file_and_app_prefix_wins() {
    let mut settings = Settings::default();
    apply_file(&mut settings, r#"server_url = "ws://from-file/ws""#);
    apply_env(
        &mut settings,
        env_from(&[
            ("TELEOP_SERVER_URL", "ws://teleop-env/ws"),
            ("APP__SERVER_URL", "ws://app-env/ws"),
            ("TELEOP_CATALOG_URL", "http://robot.local/jsonprotocols.json"),
            ("TELEOP_BLE_TIMEOUT_SECS", "45"),
        ]),
    );
    assert_eq!(settings.server_url, "ws://app-env/ws");
    assert_eq!(
        settings.catalog_url.as_deref(),
        Some("http://robot.local/jsonprotocols.json")
    );
    assert_eq!(settings.ble_timeout_secs, 45);
}

#[test]
fn invalid_uuid_and_timeouts_keep_defaults() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("TELEOP_BLE_SERVICE_UUID", "not-a-uuid"),
            (
                "TELEOP_BLE_CHARACTERISTIC_UUID",
                "0000ffe1-0000-1000-8000-00805f9b34fb",
            ),
            ("TELEOP_CONNECT_TIMEOUT_SECS", "soon"),
            ("TELEOP_BLE_TIMEOUT_SECS", "0"),
        ]),
    );
    assert_eq!(settings.ble_service_uuid, ROBOT_SERVICE_UUID);
    assert_eq!(
        settings.ble_characteristic_uuid,
        Uuid::parse_str("0000ffe1-0000-1000-8000-00805f9b34fb").expect("uuid")
    );
    assert_eq!(settings.connect_timeout_secs, 10);
    assert_eq!(settings.ble_timeout_secs, 20);
}

#[test]
fn load_settings_reads_the_given_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("teleop_settings_test_{suffix}.toml"));
    fs::write(&path, "zone = \"FromFile\"\n").expect("write settings");

    let settings = load_settings(&path);
    fs::remove_file(&path).expect("cleanup");

    if env::var("TELEOP_ZONE").is_err() {
        assert_eq!(settings.zone, "FromFile");
    }
}
