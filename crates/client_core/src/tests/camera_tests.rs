use super::*;

#[test]
fn default_feed_points_at_port_81_stream() {
    let url = CameraFeed::default()
        .stream_url("192.168.4.1")
        .expect("url");
    assert_eq!(url.as_str(), "http://192.168.4.1:81/stream");
}

#[test]
fn custom_port_and_relative_path() {
    let feed = CameraFeed {
        port: 8080,
        path: "video".into(),
    };
    assert_eq!(
        feed.stream_url("robot.local").expect("url").as_str(),
        "http://robot.local:8080/video"
    );
}

#[test]
fn rejects_empty_and_malformed_hosts() {
    let feed = CameraFeed::default();
    assert!(feed.stream_url("  ").is_err());
    assert!(feed.stream_url("bad host").is_err());
}
