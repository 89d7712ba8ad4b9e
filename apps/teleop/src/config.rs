use std::{fs, path::Path};

use ble_integration::{ROBOT_COMMAND_CHARACTERISTIC_UUID, ROBOT_SERVICE_UUID};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

pub const DEFAULT_CONFIG_PATH: &str = "teleop.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub zone: String,
    pub ble_service_uuid: Uuid,
    pub ble_characteristic_uuid: Uuid,
    pub catalog_url: Option<String>,
    pub camera_host: Option<String>,
    pub connect_timeout_secs: u64,
    pub ble_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/ws".into(),
            zone: "RobotZone".into(),
            ble_service_uuid: ROBOT_SERVICE_UUID,
            ble_characteristic_uuid: ROBOT_COMMAND_CHARACTERISTIC_UUID,
            catalog_url: None,
            camera_host: None,
            connect_timeout_secs: 10,
            ble_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    zone: Option<String>,
    ble_service_uuid: Option<String>,
    ble_characteristic_uuid: Option<String>,
    catalog_url: Option<String>,
    camera_host: Option<String>,
    connect_timeout_secs: Option<u64>,
    ble_timeout_secs: Option<u64>,
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(error = %err, "config: ignoring malformed settings file");
            return;
        }
    };
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.zone {
        settings.zone = v;
    }
    if let Some(v) = file_cfg.ble_service_uuid {
        set_uuid(&mut settings.ble_service_uuid, "ble_service_uuid", &v);
    }
    if let Some(v) = file_cfg.ble_characteristic_uuid {
        set_uuid(
            &mut settings.ble_characteristic_uuid,
            "ble_characteristic_uuid",
            &v,
        );
    }
    if file_cfg.catalog_url.is_some() {
        settings.catalog_url = file_cfg.catalog_url;
    }
    if file_cfg.camera_host.is_some() {
        settings.camera_host = file_cfg.camera_host;
    }
    if let Some(v) = file_cfg.connect_timeout_secs {
        set_timeout(&mut settings.connect_timeout_secs, "connect_timeout_secs", v);
    }
    if let Some(v) = file_cfg.ble_timeout_secs {
        set_timeout(&mut settings.ble_timeout_secs, "ble_timeout_secs", v);
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("TELEOP_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("TELEOP_ZONE") {
        settings.zone = v;
    }
    if let Some(v) = var("TELEOP_BLE_SERVICE_UUID") {
        set_uuid(&mut settings.ble_service_uuid, "TELEOP_BLE_SERVICE_UUID", &v);
    }
    if let Some(v) = var("TELEOP_BLE_CHARACTERISTIC_UUID") {
        set_uuid(
            &mut settings.ble_characteristic_uuid,
            "TELEOP_BLE_CHARACTERISTIC_UUID",
            &v,
        );
    }
    if let Some(v) = var("TELEOP_CATALOG_URL") {
        settings.catalog_url = Some(v);
    }
    if let Some(v) = var("TELEOP_CAMERA_HOST") {
        settings.camera_host = Some(v);
    }
    if let Some(v) = var("TELEOP_CONNECT_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => set_timeout(
                &mut settings.connect_timeout_secs,
                "TELEOP_CONNECT_TIMEOUT_SECS",
                parsed,
            ),
            Err(_) => warn!(value = %v, "config: TELEOP_CONNECT_TIMEOUT_SECS is not a number"),
        }
    }
    if let Some(v) = var("TELEOP_BLE_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => set_timeout(
                &mut settings.ble_timeout_secs,
                "TELEOP_BLE_TIMEOUT_SECS",
                parsed,
            ),
            Err(_) => warn!(value = %v, "config: TELEOP_BLE_TIMEOUT_SECS is not a number"),
        }
    }
}

fn set_uuid(slot: &mut Uuid, key: &str, raw: &str) {
    match Uuid::parse_str(raw.trim()) {
        Ok(parsed) => *slot = parsed,
        Err(err) => warn!(key, value = raw, error = %err, "config: invalid UUID; keeping default"),
    }
}

fn set_timeout(slot: &mut u64, key: &str, secs: u64) {
    if secs == 0 {
        warn!(key, "config: timeout must be positive; keeping default");
        return;
    }
    *slot = secs;
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
