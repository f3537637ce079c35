use std::path::PathBuf;

use hyper::StatusCode;
use tempfile::TempDir;
use wirebench::benchmarks::verify_transport;
use wirebench::certs::{generate_self_signed_cert, DEFAULT_SUBJECT_NAMES};
use wirebench::grpc::AgentRpcClient;
use wirebench::http::HttpBenchClient;
use wirebench::rpc::binary::BinaryRpcClient;
use wirebench::rpc::http::dial_http;
use wirebench::rpc::json::JsonRpcClient;
use wirebench::rpc::{Reply, RECORD_METHOD, SERVE_METHOD};
use wirebench::{generate_record, BenchConfig, BenchError, ServerRegistry, TransportKind};

fn ephemeral_registry() -> ServerRegistry {
    ServerRegistry::new(BenchConfig::ephemeral())
}

/// Registry whose HTTPS server uses a freshly generated self-signed pair.
fn tls_registry() -> (ServerRegistry, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cert_path: PathBuf = dir.path().join("https-server.crt");
    let key_path: PathBuf = dir.path().join("https-server.key");
    generate_self_signed_cert(&cert_path, &key_path, &DEFAULT_SUBJECT_NAMES).unwrap();

    let config = BenchConfig {
        cert_path,
        key_path,
        ..BenchConfig::ephemeral()
    };
    (ServerRegistry::new(config), dir)
}

#[tokio::test]
async fn binary_rpc_serves_control_and_data_handlers() {
    let registry = ephemeral_registry();
    let addr = registry.start(TransportKind::TcpRpc).await.unwrap();

    let mut client = BinaryRpcClient::dial(addr).await.unwrap();
    assert_eq!(
        client.call(SERVE_METHOD, 1).await.unwrap(),
        Reply::Text("OK.\n".to_string())
    );
    assert_eq!(
        client.call(RECORD_METHOD, 2).await.unwrap(),
        Reply::Record(generate_record())
    );
}

#[tokio::test]
async fn json_rpc_returns_fixture() {
    let registry = ephemeral_registry();
    let addr = registry.start(TransportKind::JsonRpc).await.unwrap();

    let mut client = JsonRpcClient::dial(addr).await.unwrap();
    let text = client.call(SERVE_METHOD, 0).await.unwrap().into_text().unwrap();
    assert_eq!(text, "OK.\n");
    let record = client.call(RECORD_METHOD, 0).await.unwrap().into_record().unwrap();
    assert_eq!(record, generate_record());
}

#[tokio::test]
async fn http_rpc_bridge_returns_fixture() {
    let registry = ephemeral_registry();
    let addr = registry.start(TransportKind::HttpRpc).await.unwrap();

    let mut client = dial_http(addr).await.unwrap();
    for n in 0..5 {
        let text = client.call(SERVE_METHOD, n).await.unwrap().into_text().unwrap();
        assert_eq!(text, "OK.\n");
    }
    let record = client.call(RECORD_METHOD, 0).await.unwrap().into_record().unwrap();
    assert_eq!(record, generate_record());
}

#[tokio::test]
async fn grpc_fetch_returns_fixture() {
    let registry = ephemeral_registry();
    let addr = registry.start(TransportKind::Grpc).await.unwrap();

    let mut client = AgentRpcClient::connect(addr).await.unwrap();
    assert_eq!(client.fetch().await.unwrap(), generate_record());
    assert_eq!(client.fetch().await.unwrap(), generate_record());
}

#[tokio::test]
async fn plain_http_get_returns_ok_body() {
    let registry = ephemeral_registry();
    let addr = registry.start(TransportKind::Http).await.unwrap();

    for keep_alive in [true, false] {
        let client = HttpBenchClient::plain(keep_alive);
        for _ in 0..3 {
            let body = client.get(&format!("http://{}/", addr)).await.unwrap();
            assert_eq!(&body[..], b"OK.\n");
        }
    }
}

#[tokio::test]
async fn plain_http_post_to_any_path_returns_ok_body() {
    let registry = ephemeral_registry();
    let addr = registry.start(TransportKind::Http).await.unwrap();

    let client = hyper::Client::new();
    let req = hyper::Request::post(format!("http://{}/anything", addr))
        .body(hyper::Body::from("ignored"))
        .unwrap();
    let res = client.request(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
    assert_eq!(&body[..], b"OK.\n");
}

#[tokio::test]
async fn plain_http_non_200_is_an_error() {
    let registry = ephemeral_registry();
    let addr = registry.start(TransportKind::HttpRpc).await.unwrap();

    let client = HttpBenchClient::plain(true);
    match client.get(&format!("http://{}/other", addr)).await {
        Err(BenchError::UnexpectedStatus(status)) => assert_eq!(status, StatusCode::NOT_FOUND),
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn https_get_without_verification_succeeds() {
    let (registry, _dir) = tls_registry();
    let addr = registry.start(TransportKind::Https).await.unwrap();

    let client = HttpBenchClient::insecure_tls(false).unwrap();
    let body = client.get(&format!("https://{}/", addr)).await.unwrap();
    assert_eq!(&body[..], b"OK.\n");
}

#[tokio::test]
async fn https_without_certificate_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ServerRegistry::new(BenchConfig {
        cert_path: dir.path().join("absent.crt"),
        key_path: dir.path().join("absent.key"),
        ..BenchConfig::ephemeral()
    });

    assert!(matches!(
        registry.start(TransportKind::Https).await,
        Err(BenchError::MissingTlsMaterial(_))
    ));
}

#[tokio::test]
async fn start_is_idempotent() {
    let registry = ephemeral_registry();
    for kind in [
        TransportKind::Http,
        TransportKind::TcpRpc,
        TransportKind::JsonRpc,
        TransportKind::HttpRpc,
        TransportKind::Grpc,
    ] {
        let first = registry.start(kind).await.unwrap();
        let second = registry.start(kind).await.unwrap();
        assert_eq!(first, second, "{}", kind.label());
    }
}

#[tokio::test]
async fn concurrent_first_start_binds_once() {
    let registry = ephemeral_registry();
    let (a, b, c) = tokio::join!(
        registry.start(TransportKind::TcpRpc),
        registry.start(TransportKind::TcpRpc),
        registry.start(TransportKind::TcpRpc),
    );
    let a = a.unwrap();
    assert_eq!(a, b.unwrap());
    assert_eq!(a, c.unwrap());
}

#[tokio::test]
async fn fixed_port_cannot_be_bound_by_second_registry() {
    let first = ephemeral_registry();
    let addr = first.start(TransportKind::TcpRpc).await.unwrap();

    let second = ServerRegistry::new(BenchConfig {
        tcp_rpc_port: addr.port(),
        ..BenchConfig::ephemeral()
    });
    assert!(matches!(
        second.start(TransportKind::TcpRpc).await,
        Err(BenchError::Io(_))
    ));
    // the original server is untouched
    assert_eq!(first.start(TransportKind::TcpRpc).await.unwrap(), addr);
}

#[tokio::test]
async fn every_transport_verifies_against_fixture() {
    let (registry, _dir) = tls_registry();
    for kind in TransportKind::ALL {
        verify_transport(&registry, kind)
            .await
            .unwrap_or_else(|e| panic!("{} failed: {}", kind.label(), e));
    }
}

#[tokio::test]
async fn shutdown_stops_accepting_new_connections() {
    let registry = ephemeral_registry();
    let addr = registry.start(TransportKind::TcpRpc).await.unwrap();
    registry.shutdown();

    // give the accept loop a moment to observe the signal and drop the listener
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let result = async {
        let mut client = BinaryRpcClient::dial(addr).await?;
        client.call(SERVE_METHOD, 0).await
    }
    .await;
    assert!(result.is_err());
}
