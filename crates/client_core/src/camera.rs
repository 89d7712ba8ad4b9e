//! Robot camera feed: a motion-JPEG stream served by the robot over HTTP.

use anyhow::{Context, Result};
use url::Url;

pub const DEFAULT_STREAM_PORT: u16 = 81;
pub const DEFAULT_STREAM_PATH: &str = "/stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFeed {
    pub port: u16,
    pub path: String,
}

impl Default for CameraFeed {
    fn default() -> Self {
        Self {
            port: DEFAULT_STREAM_PORT,
            path: DEFAULT_STREAM_PATH.to_string(),
        }
    }
}

impl CameraFeed {
    /// `http://<host>:<port><path>` for the device at `host`.
    pub fn stream_url(&self, host: &str) -> Result<Url> {
        let host = host.trim();
        if host.is_empty() {
            anyhow::bail!("camera host must not be empty");
        }
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        Url::parse(&format!("http://{host}:{}{path}", self.port))
            .with_context(|| format!("invalid camera host: {host}"))
    }
}

#[cfg(test)]
#[path = "tests/camera_tests.rs"]
mod tests;
