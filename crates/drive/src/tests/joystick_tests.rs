use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn travel_radius_accounts_for_knob() {
    let joystick = Joystick::new(200.0);
    assert!(approx(joystick.knob_size(), 60.0));
    assert!(approx(joystick.travel_radius(), 70.0));
}

#[test]
fn pointer_up_reads_as_forward() {
    let mut joystick = Joystick::new(200.0);
    let vector = joystick.press(PointerOffset::new(0.0, -35.0));
    assert!(approx(vector.x, 0.0));
    assert!(approx(vector.y, 0.5));
    assert!(approx(vector.distance, 0.5));
    assert!(approx(vector.angle, 90.0));
}

#[test]
fn pointer_beyond_radius_is_clamped() {
    let mut joystick = Joystick::new(200.0);
    let vector = joystick.press(PointerOffset::new(0.0, 500.0));
    assert!(approx(vector.distance, 1.0));
    assert!(approx(vector.y, -1.0));
    assert!(approx(vector.angle, 270.0));
    assert!(approx(joystick.knob_offset().y, 70.0));
    assert_eq!(
        vector.wheel_command(),
        WheelCommand {
            left: -100,
            right: -100
        }
    );
}

#[test]
fn angles_are_normalised_into_full_circle() {
    let mut joystick = Joystick::new(200.0);
    // Down-right quadrant: atan2 is negative before normalising.
    let vector = joystick.press(PointerOffset::new(10.0, 10.0));
    assert!(approx(vector.angle, 315.0));
}

#[test]
fn drag_without_press_is_ignored() {
    let mut joystick = Joystick::new(150.0);
    assert_eq!(joystick.drag(PointerOffset::new(10.0, 0.0)), None);
    assert!(!joystick.is_dragging());
}

#[test]
fn release_emits_exactly_one_zero_vector() {
    let mut joystick = Joystick::new(150.0);
    joystick.press(PointerOffset::new(20.0, -20.0));
    joystick.drag(PointerOffset::new(30.0, -5.0));

    let released = joystick.release();
    assert_eq!(released, Some(JoystickVector::ZERO));
    assert_eq!(joystick.release(), None);
    assert_eq!(joystick.knob_offset(), PointerOffset::default());
    assert!(JoystickVector::ZERO.wheel_command().is_stop());
}

#[test]
fn centre_press_and_degenerate_control_read_as_zero() {
    let mut joystick = Joystick::new(150.0);
    assert_eq!(joystick.press(PointerOffset::default()), JoystickVector::ZERO);

    let mut tiny = Joystick::new(0.0);
    assert_eq!(tiny.press(PointerOffset::new(5.0, 5.0)), JoystickVector::ZERO);
}

#[test]
fn vector_serializes_with_plain_field_names() {
    let value = serde_json::to_value(JoystickVector::ZERO).expect("serialize");
    assert_eq!(
        value,
        serde_json::json!({ "x": 0.0, "y": 0.0, "distance": 0.0, "angle": 0.0 })
    );
}

#[test]
fn pointer_at_reproduces_the_requested_reading() {
    let mut joystick = Joystick::new(200.0);
    let pointer = joystick.pointer_at(90.0, 0.5);
    assert!(approx(pointer.x, 0.0));
    assert!(approx(pointer.y, -35.0));

    let vector = joystick.press(joystick.pointer_at(135.0, 2.0));
    assert!(approx(vector.distance, 1.0));
    assert!((vector.angle - 135.0).abs() < 1e-6);
}
