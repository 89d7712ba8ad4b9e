//! Connection error modeling: raw transport/platform failures turned into the
//! short strings shown as the session's connection error.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorCategory {
    Unsupported,
    Transport,
    Rejected,
    Bluetooth,
    Validation,
    Unknown,
}

pub fn classify_connection_failure(message: &str) -> ConnectionErrorCategory {
    let lower = message.to_ascii_lowercase();
    if lower.contains("not supported") || lower.contains("unsupported") {
        ConnectionErrorCategory::Unsupported
    } else if lower.contains("gatt")
        || lower.contains("bluetooth")
        || lower.contains("characteristic")
        || lower.contains("no device selected")
    {
        ConnectionErrorCategory::Bluetooth
    } else if lower.contains("login")
        || lower.contains("rejected")
        || lower.contains("unauthorized")
        || lower.contains("room is full")
        || lower.contains("room_full")
        || lower.contains("roomfull")
    {
        ConnectionErrorCategory::Rejected
    } else if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("dns")
        || lower.contains("timed out")
        || lower.contains("websocket")
        || lower.contains("network")
    {
        ConnectionErrorCategory::Transport
    } else if lower.contains("invalid") || lower.contains("malformed") || lower.contains("missing")
    {
        ConnectionErrorCategory::Validation
    } else {
        ConnectionErrorCategory::Unknown
    }
}

/// Human-readable connection error for a raw failure message.
pub fn describe_connection_failure(message: &str) -> String {
    match classify_connection_failure(message) {
        ConnectionErrorCategory::Unsupported => {
            format!("Bluetooth is not available on this platform ({message})")
        }
        ConnectionErrorCategory::Transport => {
            format!("Game server unreachable; check the server URL/network and retry ({message})")
        }
        ConnectionErrorCategory::Rejected => format!("Request rejected by game server: {message}"),
        ConnectionErrorCategory::Bluetooth => format!("Bluetooth error: {message}"),
        ConnectionErrorCategory::Validation => format!("Invalid request: {message}"),
        ConnectionErrorCategory::Unknown => format!("Connection error: {message}"),
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to fetch protocol catalog from {url}: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },
    #[error("failed to read protocol catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed protocol catalog: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
