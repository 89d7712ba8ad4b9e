//! Operator console line parsing.

use anyhow::{bail, Context, Result};
use shared::domain::RoomId;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Connect,
    Disconnect,
    Rooms,
    Join(RoomId),
    Target(String),
    Pair(String),
    Unpair(String),
    Cmd { name: String, value: i64 },
    Drive { angle: f64, distance: f64 },
    Release,
    BleScan,
    BleDisconnect,
    Status,
    Camera(String),
    Protocols,
    Protocol(String),
    Clear,
    Log,
    Quit,
    Help,
    /// Free text, recorded as an operator command.
    Raw(String),
}

pub const HELP: &str = "\
connect | disconnect | rooms | join <id> | target <name> | pair <name> | unpair <name>
cmd <name> <value> | drive <angle> <distance> | release
ble scan | ble disconnect | status | camera <ip> | protocols | protocol <name>
clear | log | help | quit   (anything else is sent as a console command)";

impl ConsoleCommand {
    /// `None` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();

        let command = match (head, rest.as_slice()) {
            ("connect", []) => Self::Connect,
            ("disconnect", []) => Self::Disconnect,
            ("rooms", []) => Self::Rooms,
            ("join", [id]) => Self::Join(RoomId(
                id.parse().with_context(|| format!("invalid room id: {id}"))?,
            )),
            ("join", _) => bail!("usage: join <room id>"),
            ("target", [_, ..]) => Self::Target(rest.join(" ")),
            ("pair", [_, ..]) => Self::Pair(rest.join(" ")),
            ("unpair", [_, ..]) => Self::Unpair(rest.join(" ")),
            ("target" | "pair" | "unpair", []) => bail!("usage: {head} <participant name>"),
            ("cmd", [name, value]) => Self::Cmd {
                name: name.to_string(),
                value: value
                    .parse()
                    .with_context(|| format!("invalid command value: {value}"))?,
            },
            ("cmd", _) => bail!("usage: cmd <name> <value>"),
            ("drive", [angle, distance]) => Self::Drive {
                angle: parse_number(angle, "angle")?,
                distance: parse_number(distance, "distance")?,
            },
            ("drive", _) => bail!("usage: drive <angle degrees> <distance 0..1>"),
            ("release", []) => Self::Release,
            ("ble", ["scan"]) => Self::BleScan,
            ("ble", ["disconnect"]) => Self::BleDisconnect,
            ("ble", _) => bail!("usage: ble scan | ble disconnect"),
            ("status", []) => Self::Status,
            ("camera", [host]) => Self::Camera(host.to_string()),
            ("camera", _) => bail!("usage: camera <device ip>"),
            ("protocols", []) => Self::Protocols,
            ("protocol", [name]) => Self::Protocol(name.to_string()),
            ("clear", []) => Self::Clear,
            ("log", []) => Self::Log,
            ("quit" | "exit", []) => Self::Quit,
            ("help", []) => Self::Help,
            _ => Self::Raw(line.to_string()),
        };
        Ok(Some(command))
    }
}

fn parse_number(raw: &str, what: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("invalid {what}: {raw}"))?;
    if !value.is_finite() {
        bail!("invalid {what}: {raw}");
    }
    Ok(value)
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
