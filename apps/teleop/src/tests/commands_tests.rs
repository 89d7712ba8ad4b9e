use super::*;

fn parse(line: &str) -> ConsoleCommand {
    ConsoleCommand::parse(line)
        .expect("parses")
        .expect("not blank")
}

#[test]
fn blank_lines_are_skipped() {
    assert_eq!(ConsoleCommand::parse("   ").expect("parses"), None);
}

#[test]
fn session_commands() {
    assert_eq!(parse("connect"), ConsoleCommand::Connect);
    assert_eq!(parse("join 42"), ConsoleCommand::Join(RoomId(42)));
    assert_eq!(
        parse("target Robot One"),
        ConsoleCommand::Target("Robot One".into())
    );
    assert_eq!(parse("unpair rover"), ConsoleCommand::Unpair("rover".into()));
    assert_eq!(parse("ble scan"), ConsoleCommand::BleScan);
    assert_eq!(parse("quit"), ConsoleCommand::Quit);
}

#[test]
fn robot_commands_carry_values() {
    assert_eq!(
        parse("cmd forward 1"),
        ConsoleCommand::Cmd {
            name: "forward".into(),
            value: 1
        }
    );
    assert_eq!(
        parse("drive 90 0.5"),
        ConsoleCommand::Drive {
            angle: 90.0,
            distance: 0.5
        }
    );
    assert_eq!(parse("release"), ConsoleCommand::Release);
}

#[test]
fn malformed_arguments_are_errors() {
    assert!(ConsoleCommand::parse("join lobby").is_err());
    assert!(ConsoleCommand::parse("cmd forward").is_err());
    assert!(ConsoleCommand::parse("drive NaN 1").is_err());
    assert!(ConsoleCommand::parse("ble pair").is_err());
    assert!(ConsoleCommand::parse("pair").is_err());
}

#[test]
fn anything_else_is_raw_console_text() {
    assert_eq!(parse("  horn 3 "), ConsoleCommand::Raw("horn 3".into()));
    assert_eq!(parse("status now"), ConsoleCommand::Raw("status now".into()));
}
