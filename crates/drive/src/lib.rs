//! Operator input math: the joystick pointer tracker and the differential-drive
//! mapping from a joystick vector to wheel speeds.

mod differential;
mod joystick;

pub use differential::{differential_drive, DriveDirection, WheelCommand};
pub use joystick::{Joystick, JoystickVector, PointerOffset, KNOB_RATIO};
