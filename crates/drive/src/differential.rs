use serde::{Deserialize, Serialize};

/// Differential-drive motor speeds as percentages in `-100..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WheelCommand {
    pub left: i32,
    pub right: i32,
}

impl WheelCommand {
    pub const STOP: Self = Self { left: 0, right: 0 };

    pub fn is_stop(&self) -> bool {
        *self == Self::STOP
    }
}

/// Maps a joystick angle (degrees, 0 = right, 90 = up) and distance (0..=1)
/// onto left/right wheel speeds.
///
/// `x = cos(angle)` is the turn component and `y = sin(angle)` the
/// forward/backward component; they are mixed as `left = y + x`,
/// `right = y - x`, normalised so neither side exceeds full scale, then
/// scaled by the distance again (so half travel forward is 25%). A distance
/// of zero (or anything that is not a positive finite number) is a stop and
/// never reaches the trig path.
pub fn differential_drive(angle: f64, distance: f64) -> WheelCommand {
    if !distance.is_finite() || distance <= 0.0 || !angle.is_finite() {
        return WheelCommand::STOP;
    }
    let distance = distance.min(1.0);

    let rad = angle.to_radians();
    let x = rad.cos() * distance;
    let y = rad.sin() * distance;

    let left = y + x;
    let right = y - x;

    let max = left.abs().max(right.abs()).max(1.0);
    WheelCommand {
        left: to_percent(left / max * distance),
        right: to_percent(right / max * distance),
    }
}

fn to_percent(unit: f64) -> i32 {
    (unit * 100.0).round().clamp(-100.0, 100.0) as i32
}

/// Coarse direction of a wheel command, used to pick a command value out of a
/// protocol lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveDirection {
    Stop,
    Forward,
    Backward,
    Left,
    Right,
}

impl DriveDirection {
    pub fn classify(command: WheelCommand) -> Self {
        let WheelCommand { left, right } = command;
        if left == 0 && right == 0 {
            Self::Stop
        } else if left > 0 && right > 0 {
            Self::Forward
        } else if left < 0 && right < 0 {
            Self::Backward
        } else if left > right {
            Self::Right
        } else {
            Self::Left
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[cfg(test)]
#[path = "tests/differential_tests.rs"]
mod tests;
