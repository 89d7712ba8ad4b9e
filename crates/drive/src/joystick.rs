use serde::{Deserialize, Serialize};

use crate::differential::{differential_drive, WheelCommand};

/// Knob diameter as a fraction of the control size.
pub const KNOB_RATIO: f64 = 0.3;

/// Normalised joystick reading.
///
/// `x`/`y` are in `-1..=1` with `y` pointing up, `distance` is the radial
/// travel in `0..=1` and `angle` is in degrees `0..360`, 0 = right, 90 = up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JoystickVector {
    pub x: f64,
    pub y: f64,
    pub distance: f64,
    pub angle: f64,
}

impl JoystickVector {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        distance: 0.0,
        angle: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        self.distance == 0.0
    }

    pub fn wheel_command(&self) -> WheelCommand {
        differential_drive(self.angle, self.distance)
    }
}

/// Pointer position relative to the centre of the control, in screen units
/// with `y` growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerOffset {
    pub x: f64,
    pub y: f64,
}

impl PointerOffset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Tracks a drag on an on-screen joystick and turns pointer offsets into
/// [`JoystickVector`]s.
#[derive(Debug, Clone)]
pub struct Joystick {
    size: f64,
    knob: PointerOffset,
    dragging: bool,
}

impl Joystick {
    pub fn new(size: f64) -> Self {
        Self {
            size: size.max(0.0),
            knob: PointerOffset::default(),
            dragging: false,
        }
    }

    pub fn knob_size(&self) -> f64 {
        self.size * KNOB_RATIO
    }

    /// How far the knob centre may travel from the control centre.
    pub fn travel_radius(&self) -> f64 {
        (self.size - self.knob_size()) / 2.0
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Knob offset after clamping to the travel radius.
    pub fn knob_offset(&self) -> PointerOffset {
        self.knob
    }

    /// Pointer offset that puts the knob at `angle` degrees and `distance`
    /// of full travel.
    pub fn pointer_at(&self, angle: f64, distance: f64) -> PointerOffset {
        let reach = distance.clamp(0.0, 1.0) * self.travel_radius();
        let rad = angle.to_radians();
        PointerOffset::new(rad.cos() * reach, -rad.sin() * reach)
    }

    pub fn press(&mut self, pointer: PointerOffset) -> JoystickVector {
        self.dragging = true;
        self.track(pointer)
    }

    /// Moves the knob; ignored unless a drag is in progress.
    pub fn drag(&mut self, pointer: PointerOffset) -> Option<JoystickVector> {
        if !self.dragging {
            return None;
        }
        Some(self.track(pointer))
    }

    /// Ends the drag. Yields the zero vector exactly once per drag.
    pub fn release(&mut self) -> Option<JoystickVector> {
        if !self.dragging {
            return None;
        }
        self.dragging = false;
        self.knob = PointerOffset::default();
        Some(JoystickVector::ZERO)
    }

    fn track(&mut self, pointer: PointerOffset) -> JoystickVector {
        let radius = self.travel_radius();
        let raw_distance = pointer.x.hypot(pointer.y);
        if radius <= 0.0 || raw_distance == 0.0 || !raw_distance.is_finite() {
            self.knob = PointerOffset::default();
            return JoystickVector::ZERO;
        }

        let knob = if raw_distance > radius {
            let ratio = radius / raw_distance;
            PointerOffset::new(pointer.x * ratio, pointer.y * ratio)
        } else {
            pointer
        };
        self.knob = knob;

        let mut angle = (-knob.y).atan2(knob.x).to_degrees();
        if angle < 0.0 {
            angle += 360.0;
        }
        if angle >= 360.0 {
            angle = 0.0;
        }

        JoystickVector {
            x: knob.x / radius,
            y: -knob.y / radius,
            distance: (raw_distance / radius).min(1.0),
            angle,
        }
    }
}

#[cfg(test)]
#[path = "tests/joystick_tests.rs"]
mod tests;
