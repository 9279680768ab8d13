//! Tests the client against a local axum host.

use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use eitmirror_client::{ClientError, Endpoint, MirrorClient, MirrorSource};
use eitmirror_core::{DecodeError, ElectrodesConfig};
use url::Url;

const VERTICES: [u8; 12] = [0, 0, 128, 63, 0, 0, 0, 64, 0, 0, 64, 64];

/// Serves a fake host under `/eit/` and returns its address.
async fn spawn_host() -> Url {
    let app = Router::new()
        .route(
            "/eit/electrodes-config",
            get(|| async { r#"{"count": 16, "length": 0.05}"# }),
        )
        .route("/eit/vertices-config", get(|| async { VERTICES.to_vec() }))
        .route("/eit/vertices-update", get(|| async { Vec::<u8>::new() }))
        .route("/eit/colors-config", get(|| async { vec![7u8; 16] }))
        .route(
            "/eit/colors-update",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        )
        .route(
            "/slow/vertices-update",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Vec::<u8>::new()
            }),
        )
        .route("/bad/electrodes-config", get(|| async { "sixteen" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Url::parse(&format!("http://{address}/eit")).unwrap()
}

#[tokio::test]
async fn test_electrodes_config() {
    let client = MirrorClient::new(spawn_host().await).unwrap();
    let config = client.request_electrodes_config().await.unwrap();
    assert_eq!(
        config,
        ElectrodesConfig {
            count: 16,
            length: 0.05
        }
    );
}

#[tokio::test]
async fn test_byte_payloads() {
    let client = MirrorClient::new(spawn_host().await).unwrap();
    assert_eq!(client.request_vertices_config().await.unwrap(), VERTICES);
    assert!(client.request_vertices_update().await.unwrap().is_empty());
    assert_eq!(client.request_color_config().await.unwrap(), vec![7u8; 16]);
}

#[tokio::test]
async fn test_error_status_is_surfaced() {
    let client = MirrorClient::new(spawn_host().await).unwrap();
    let err = client.request_color_update().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Status {
            endpoint: Endpoint::ColorsUpdate,
            status: 503
        }
    ));
}

#[tokio::test]
async fn test_missing_route_is_status_error() {
    let mut client = MirrorClient::new(spawn_host().await).unwrap();
    let other = client.host_address().join("../elsewhere").unwrap();
    client.set_host_address(other);

    let err = client.request_vertices_config().await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_invalid_electrodes_payload() {
    let mut client = MirrorClient::new(spawn_host().await).unwrap();
    let bad = client.host_address().join("../bad").unwrap();
    client.set_host_address(bad);

    let err = client.request_electrodes_config().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Payload(DecodeError::InvalidElectrodesConfig(_))
    ));
}

#[tokio::test]
async fn test_timeout() {
    let host = spawn_host().await;
    let slow = host.join("../slow").unwrap();
    let client = MirrorClient::with_timeout(slow, Duration::from_millis(100)).unwrap();

    let err = client.request_vertices_update().await.unwrap_err();
    assert!(matches!(err, ClientError::Http(e) if e.is_timeout()));
}

#[tokio::test]
async fn test_unreachable_host() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = MirrorClient::new(Url::parse(&format!("http://{address}")).unwrap()).unwrap();
    assert!(matches!(
        client.request_vertices_config().await,
        Err(ClientError::Http(_))
    ));
}

#[tokio::test]
async fn test_source_trait_delegates() {
    let client = MirrorClient::new(spawn_host().await).unwrap();
    let source: &dyn MirrorSource = &client;
    assert_eq!(source.electrodes_config().await.unwrap().count, 16);
    assert_eq!(source.vertices_config().await.unwrap(), VERTICES);
}
