//! HTTP transport against a wiremock server.

mod common;

use std::time::Duration;

use aclsync_core::transport::{Transport, TransportConfig, TransportError};
use aclsync_core::{Error, Format, KeyStore, Pipeline, Verification};
use bytes::Bytes;
use common::TestKeys;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> Transport {
    Transport::new(&TransportConfig {
        http_timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .expect("failed to create transport")
}

#[tokio::test]
async fn test_fetch_reads_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acl/site.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"archive-bytes".to_vec()))
        .mount(&mock_server)
        .await;

    let uri = format!("{}/acl/site.tar.gz", mock_server.uri());
    let data = transport().fetch(&uri).await.expect("fetch failed");
    assert_eq!(data.as_ref(), b"archive-bytes");
}

#[tokio::test]
async fn test_store_puts_octet_stream_to_given_uri() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/upload/site.zip"))
        .and(header("content-type", "binary/octet-stream"))
        .and(body_bytes(b"zip-bytes".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = format!("{}/upload/site.zip", mock_server.uri());
    transport()
        .store(&uri, Bytes::from_static(b"zip-bytes"))
        .await
        .expect("store failed");
}

#[tokio::test]
async fn test_non_2xx_is_transport_error_with_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such acl"))
        .mount(&mock_server)
        .await;

    let uri = format!("{}/missing.tar.gz", mock_server.uri());
    let err = transport().fetch(&uri).await.unwrap_err();
    match err {
        TransportError::Transport { uri: got, message } => {
            assert!(got.ends_with("/missing.tar.gz"));
            assert!(message.contains("404"), "{message}");
            assert!(message.contains("no such acl"), "{message}");
        }
        other => panic!("expected Transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_large_error_body_is_cut_short() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(4 * 1024 * 1024)))
        .mount(&mock_server)
        .await;

    let uri = format!("{}/site.tar.gz", mock_server.uri());
    let err = transport()
        .store(&uri, Bytes::from_static(b"bundle"))
        .await
        .unwrap_err();
    match err {
        TransportError::Transport { message, .. } => {
            assert!(message.starts_with("HTTP 500"), "{message}");
            assert!(message.len() < 300, "message is {} bytes", message.len());
        }
        other => panic!("expected Transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let transport = Transport::new(&TransportConfig {
        http_timeout: Duration::from_millis(200),
        ..Default::default()
    })
    .unwrap();
    let err = transport
        .fetch(&format!("{}/slow.tar.gz", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Transport { .. }));
}

#[tokio::test]
async fn test_pipeline_fetch_over_http() {
    let keys = TestKeys::generate("svc-a");
    let bundle = aclsync_core::Bundle::new("site.acl", b"1,Alice,101\n".to_vec(), keys.identity())
        .with_signature(keys.signer().sign(b"1,Alice,101\n").unwrap());

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/site.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bundle.pack(Format::Zip).unwrap()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/site.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bundle.pack(Format::Zip).unwrap()))
        .mount(&mock_server)
        .await;

    let pipeline = Pipeline::new(transport(), KeyStore::new(keys.keys_dir()));

    let got = pipeline
        .fetch(&format!("{}/site.zip", mock_server.uri()), Verification::Required)
        .await
        .expect("fetch failed");
    assert_eq!(got.payload, b"1,Alice,101\n");

    // zip bytes behind a tar.gz name are decoded as tar.gz and rejected
    let err = pipeline
        .fetch(&format!("{}/site.tar.gz", mock_server.uri()), Verification::Required)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Bundle(_)));
    assert_eq!(err.exit_code(), 3);
}
