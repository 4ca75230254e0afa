//! Signals client against an in-process vendor.

mod common;

use std::sync::Arc;

use common::{spawn_vendor, REJECTED_KEY, VENDOR_KEY};
use signals_relay::config::SignalsConfig;
use signals_relay::signals::{BlocklistKind, ReputationSource, SignalsClient};
use signals_relay::RelayError;
use tokio::net::TcpListener;
use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

fn client(api_url: &str) -> SignalsClient {
    let config = SignalsConfig {
        api_url: api_url.to_string(),
        user_agent: "relay-tests".to_string(),
        timeout_ms: 2000,
        ..Default::default()
    };
    SignalsClient::new(&config).unwrap()
}

#[tokio::test]
async fn lookup_returns_record_and_sends_headers() {
    let (vendor, url) = spawn_vendor().await;
    let client = client(&url);

    let record = client.lookup(VENDOR_KEY, "1.1.1.1").await.unwrap().unwrap();
    assert_eq!(record.score, -1);
    assert_eq!(record.badip.blacklists, vec!["UCEPROTECT-LEVEL1"]);

    let hits = vendor.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "/ip/1.1.1.1");
    assert_eq!(hits[0].token.as_deref(), Some(VENDOR_KEY));
    assert_eq!(hits[0].user_agent.as_deref(), Some("relay-tests"));
    assert_eq!(hits[0].accept.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn lookup_bad_request_and_not_found_are_empty() {
    let (_vendor, url) = spawn_vendor().await;
    let client = client(&url);

    assert!(client.lookup(VENDOR_KEY, "bad-ip-format").await.unwrap().is_none());
    assert!(client.lookup(VENDOR_KEY, "192.0.2.1").await.unwrap().is_none());
}

#[tokio::test]
async fn lookup_value_stays_one_path_segment() {
    let (vendor, url) = spawn_vendor().await;
    let client = client(&url);

    assert!(client.lookup(VENDOR_KEY, "../ip/1.1.1.1").await.unwrap().is_none());
    assert!(client.lookup(VENDOR_KEY, "9.9.9.9?x=#").await.unwrap().is_none());

    let hits = vendor.hits();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].path, "/ip/../ip/1.1.1.1");
    assert_eq!(hits[0].raw_path, "/ip/..%2Fip%2F1.1.1.1");
    assert_eq!(hits[1].path, "/ip/9.9.9.9?x=#");
    assert_eq!(hits[1].query, None);
}

#[tokio::test]
async fn lookup_dot_segment_skips_vendor() {
    let (vendor, url) = spawn_vendor().await;
    let client = client(&url);

    assert!(client.lookup(VENDOR_KEY, "..").await.unwrap().is_none());
    assert!(vendor.hits().is_empty());
}

#[tokio::test]
async fn lookup_tolerates_empty_list_shapes() {
    let (_vendor, url) = spawn_vendor().await;
    let client = client(&url);

    let record = client.lookup(VENDOR_KEY, "1.1.1.8").await.unwrap().unwrap();
    assert_eq!(record.score, -1);
    assert!(record.memberships().is_empty());
}

#[tokio::test]
async fn lookup_without_score_is_invalid() {
    let (_vendor, url) = spawn_vendor().await;
    let client = client(&url);

    let err = client.lookup(VENDOR_KEY, "1.1.1.7").await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidResponse(_)), "got: {err:?}");
    assert_eq!(err.code(), "unknown");
}

#[tokio::test]
async fn lookup_unauthorized() {
    let (_vendor, url) = spawn_vendor().await;
    let client = client(&url);

    let err = client.lookup(REJECTED_KEY, "1.1.1.1").await.unwrap_err();
    assert!(matches!(err, RelayError::Unauthorized { .. }), "got: {err:?}");
    assert_eq!(err.code(), "unauthorized");
    assert_eq!(
        err.to_string(),
        "Unexpected response from Auth0 Signals: Unauthorized. API Key not found."
    );
}

#[tokio::test]
async fn lookup_server_error_is_critical() {
    let (_vendor, url) = spawn_vendor().await;
    let client = client(&url);

    let err = client.lookup(VENDOR_KEY, "1.1.1.5").await.unwrap_err();
    assert_eq!(err.code(), "internal server error");
    assert_eq!(err.to_string(), "Unexpected response from Auth0 Signals: boom");
}

#[tokio::test]
async fn lookup_unparseable_body() {
    let (_vendor, url) = spawn_vendor().await;
    let client = client(&url);

    let err = client.lookup(VENDOR_KEY, "1.1.1.6").await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidResponse(_)), "got: {err:?}");
    assert_eq!(err.code(), "unknown");
}

#[tokio::test]
async fn connection_failure_is_unknown() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}/"));
    let err = client.lookup(VENDOR_KEY, "1.1.1.1").await.unwrap_err();
    assert!(matches!(err, RelayError::Transport(_)), "got: {err:?}");
    assert_eq!(err.code(), "unknown");
}

/// HTTPS listener presenting a self-signed certificate; it only completes
/// handshakes, so any client that trusts public roots fails to connect.
async fn spawn_self_signed() -> String {
    let _ = tokio_rustls::rustls::crypto::ring::default_provider().install_default();

    let certs = CertificateDer::pem_slice_iter(include_bytes!("fixtures/self-signed.crt"))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = PrivateKeyDer::from_pem_slice(include_bytes!("fixtures/self-signed.key")).unwrap();
    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let _ = acceptor.accept(stream).await;
            });
        }
    });

    format!("https://{addr}/")
}

#[tokio::test]
async fn untrusted_certificate_is_ssl_error() {
    let url = spawn_self_signed().await;
    let client = client(&url);

    let err = client.lookup(VENDOR_KEY, "1.1.1.1").await.unwrap_err();
    assert!(matches!(err, RelayError::Ssl(_)), "got: {err:?}");
    assert_eq!(err.code(), "unknown");
    assert!(
        err.to_string()
            .starts_with("Unable to verify SSL certificate: "),
        "got: {err}"
    );

    let err = client.check_health(VENDOR_KEY).await.unwrap_err();
    assert!(matches!(err, RelayError::Ssl(_)), "got: {err:?}");
}

#[tokio::test]
async fn health_check() {
    let (vendor, url) = spawn_vendor().await;
    let client = client(&url);

    client.check_health(VENDOR_KEY).await.unwrap();
    assert_eq!(vendor.hits()[0].path, "/ip");

    let err = client.check_health(REJECTED_KEY).await.unwrap_err();
    assert_eq!(err.code(), "unauthorized");
}

#[tokio::test]
async fn blocklist_detail_lookup() {
    let (vendor, url) = spawn_vendor().await;
    let client = client(&url);

    let detail = client
        .blocklist_detail(VENDOR_KEY, BlocklistKind::BadIp, "UCEPROTECT-LEVEL1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.name.as_deref(), Some("UCEPROTECT Level 1"));
    assert_eq!(detail.sensitivity.as_deref(), Some("5"));
    assert_eq!(detail.tags.as_deref(), Some("spam,email"));

    let detail = client
        .blocklist_detail(VENDOR_KEY, BlocklistKind::BadDomain, "SPAMHAUS-DBL")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.sensitivity.as_deref(), Some("1"));

    let missing = client
        .blocklist_detail(VENDOR_KEY, BlocklistKind::BadIp, "NOPE")
        .await
        .unwrap();
    assert!(missing.is_none());

    let paths: Vec<_> = vendor.hits().into_iter().map(|h| h.path).collect();
    assert_eq!(
        paths,
        vec![
            "/metadata/badip/lists/UCEPROTECT-LEVEL1",
            "/metadata/baddomain/lists/SPAMHAUS-DBL",
            "/metadata/badip/lists/NOPE",
        ]
    );
}
