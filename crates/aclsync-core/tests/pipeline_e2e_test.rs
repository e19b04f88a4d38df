//! End-to-end: sign → pack → store → fetch → unpack → verify over file://
//! and an in-memory S3 store.

mod common;

use std::io::Read;
use std::sync::Arc;

use aclsync_core::auth::{verify_with_key, AuthError};
use aclsync_core::transport::{S3Backend, Transport, TransportConfig, TransportError};
use aclsync_core::{Error, KeyStore, Pipeline, ReportTemplate, Verification};
use common::TestKeys;
use object_store::memory::InMemory;
use tempfile::TempDir;

const ACL: &[u8] = b"1,Alice,101\n";

fn pipeline(keys: &TestKeys) -> Pipeline {
    let transport = Transport::new(&TransportConfig::default())
        .unwrap()
        .with_s3_backend(Arc::new(S3Backend::with_store(Arc::new(InMemory::new()))));
    Pipeline::new(transport, KeyStore::new(keys.keys_dir()))
}

fn file_uri(dir: &TempDir, name: &str) -> String {
    format!("file://{}", dir.path().join(name).display())
}

#[tokio::test]
async fn test_file_targz_roundtrip() {
    let keys = TestKeys::generate("svc-a");
    let out = TempDir::new().unwrap();
    let uri = file_uri(&out, "site.tar.gz");
    let pipeline = pipeline(&keys);

    pipeline.store_acl(&uri, "site", ACL.to_vec(), &keys.signer()).await.unwrap();
    let bundle = pipeline.fetch(&uri, Verification::Required).await.unwrap();

    assert_eq!(bundle.payload_name, "site.acl");
    assert_eq!(bundle.payload, ACL);
    assert_eq!(bundle.identity.as_str(), "svc-a");
    assert!(bundle.extras.is_empty());
}

#[tokio::test]
async fn test_zip_destination_produces_zip() {
    let keys = TestKeys::generate("svc-a");
    let out = TempDir::new().unwrap();
    let uri = file_uri(&out, "site.zip");
    let pipeline = pipeline(&keys);

    pipeline.store_acl(&uri, "site.acl", ACL.to_vec(), &keys.signer()).await.unwrap();
    let raw = std::fs::read(out.path().join("site.zip")).unwrap();
    assert_eq!(&raw[..2], b"PK");

    let bundle = pipeline.fetch(&uri, Verification::Required).await.unwrap();
    assert_eq!(bundle.payload, ACL);
}

#[tokio::test]
async fn test_s3_roundtrip_in_memory() {
    let keys = TestKeys::generate("svc-a");
    let pipeline = pipeline(&keys);
    let uri = "s3://acls/site/north/site.tar.gz";

    pipeline.store_acl(uri, "north", ACL.to_vec(), &keys.signer()).await.unwrap();
    let bundle = pipeline.fetch(uri, Verification::Required).await.unwrap();
    assert_eq!(bundle.payload, ACL);
}

#[tokio::test]
async fn test_malformed_s3_uri_fails_before_signing() {
    let keys = TestKeys::generate("svc-a");
    let err = pipeline(&keys)
        .store_acl("s3://acls", "site", ACL.to_vec(), &keys.signer())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::InvalidUri { .. })));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_tampered_bundle_rejected() {
    let keys = TestKeys::generate("svc-a");
    let out = TempDir::new().unwrap();
    let uri = file_uri(&out, "site.tar.gz");
    let pipeline = pipeline(&keys);

    let signature = keys.signer().sign(b"1,Alice,999\n").unwrap();
    let forged = aclsync_core::Bundle::new("site.acl", ACL.to_vec(), keys.identity())
        .with_signature(signature);
    std::fs::write(
        out.path().join("site.tar.gz"),
        forged.pack(aclsync_core::Format::TarGz).unwrap(),
    )
    .unwrap();

    let err = pipeline.fetch(&uri, Verification::Required).await.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::InvalidSignature { .. })));
    assert_eq!(err.exit_code(), 4);

    let bundle = pipeline.fetch(&uri, Verification::Disabled).await.unwrap();
    assert_eq!(bundle.payload, ACL);
}

#[tokio::test]
async fn test_report_is_signed_with_timestamped_name() {
    let keys = TestKeys::generate("svc-a");
    let out = TempDir::new().unwrap();
    let uri = file_uri(&out, "report.tar.gz");

    let report = pipeline(&keys)
        .publish_report(&uri, &ReportTemplate::default(), "+ 2,Bob,102", &keys.signer())
        .await
        .unwrap();
    assert!(report.name.starts_with("acl-") && report.name.ends_with(".rpt"));
    assert!(report.text.starts_with("ACL DIFF REPORT "));
    assert!(report.text.contains("+ 2,Bob,102"));

    let raw = std::fs::read(out.path().join("report.tar.gz")).unwrap();
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(raw.as_slice()));
    let mut payload = None;
    let mut signature = None;
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let owner = entry.header().username().unwrap().map(str::to_owned);
        let mut body = Vec::new();
        entry.read_to_end(&mut body).unwrap();
        if name == report.name {
            assert_eq!(owner.as_deref(), Some("svc-a"));
            payload = Some(body);
        } else if name == "signature" {
            signature = Some(body);
        }
    }
    let payload = payload.expect("report entry");
    assert_eq!(payload, report.text.as_bytes());
    verify_with_key(
        &keys.key.to_public_key(),
        &keys.identity(),
        &payload,
        &signature.expect("signature entry"),
    )
    .unwrap();
}
