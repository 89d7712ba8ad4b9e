use super::*;
use axum::{routing::get, Router};
use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;

const SAMPLE: &str = r#"{
    "tank": { "stop": 0, "forward": 1, "backward": 2, "left": 3, "right": 4 },
    "arm": { "grip": 10, "release": 11 }
}"#;

#[test]
fn parses_protocol_tables() {
    let catalog = ProtocolCatalog::from_json(SAMPLE).expect("parse");
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.protocol_names().collect::<Vec<_>>(), vec!["arm", "tank"]);
    assert_eq!(catalog.lookup("tank", "backward"), Some(2));
    assert_eq!(catalog.lookup("tank", "jump"), None);
    assert_eq!(catalog.lookup("missing", "stop"), None);
}

#[test]
fn malformed_documents_are_reported() {
    let err = ProtocolCatalog::from_json(r#"{"tank": ["not", "a", "table"]}"#)
        .expect_err("must reject");
    assert!(matches!(err, CatalogError::Malformed(_)));
}

#[tokio::test]
async fn loads_catalog_from_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("teleop_catalog_test_{suffix}.json"));
    fs::write(&path, SAMPLE).expect("write sample");

    let catalog = ProtocolCatalog::load(path.to_string_lossy().as_ref())
        .await
        .expect("load");
    assert_eq!(catalog.lookup("arm", "grip"), Some(10));

    fs::remove_file(path).expect("cleanup");
}

#[tokio::test]
async fn missing_file_is_a_read_error() {
    let err = ProtocolCatalog::load("/definitely/not/here/jsonprotocols.json")
        .await
        .expect_err("missing file");
    assert!(matches!(err, CatalogError::Read { .. }));
}

#[tokio::test]
async fn fetches_catalog_over_http() {
    let app = Router::new().route(DEFAULT_CATALOG_PATH, get(|| async { SAMPLE }));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let url = format!("http://{addr}{DEFAULT_CATALOG_PATH}");
    let catalog = ProtocolCatalog::load(&url).await.expect("fetch");
    assert_eq!(catalog.lookup("tank", "forward"), Some(1));
}

#[tokio::test]
async fn http_errors_are_fetch_errors() {
    let app = Router::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let url = format!("http://{addr}{DEFAULT_CATALOG_PATH}");
    let err = ProtocolCatalog::load(&url).await.expect_err("404");
    assert!(matches!(err, CatalogError::Fetch { .. }));
}
