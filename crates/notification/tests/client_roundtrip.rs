//! Client against a real bound server (plain HTTP on an ephemeral port).

use docwatch_core::{RpcServerConfig, ServiceKey, TlsConfig};
use docwatch_notification::{
    build_server, ClientError, DocumentExpiryRequest, MockBackend, NotificationClient,
    NotificationService, UserCreatedRequest,
};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

const KEY: &str = "roundtrip-service-key";

struct Harness {
    backend: Arc<MockBackend>,
    base_url: Url,
    handle: actix_web::dev::ServerHandle,
}

fn start_server() -> Harness {
    let backend = Arc::new(MockBackend::new());
    let config = RpcServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: TlsConfig::disabled(),
    };

    let rpc = build_server(
        &config,
        ServiceKey::new(KEY).unwrap(),
        NotificationService::new(backend.clone()),
    )
    .unwrap();

    let addr = rpc.local_addrs[0];
    let handle = rpc.server.handle();
    actix_web::rt::spawn(rpc.server);

    Harness {
        backend,
        base_url: Url::parse(&format!("http://{}", addr)).unwrap(),
        handle,
    }
}

fn client(base_url: &Url, key: &str) -> NotificationClient {
    NotificationClient::new(
        base_url.clone(),
        ServiceKey::new(key).unwrap(),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn expired_request() -> DocumentExpiryRequest {
    DocumentExpiryRequest {
        user_uuid: "d1c4a0c2-6b55-4a3e-9f0e-0b6f4c2e7a11".to_string(),
        email: "driver@example.com".to_string(),
        document_name: "Pollution Certificate".to_string(),
        document_category: "pollution_certificate".to_string(),
        expiry_date: Some("2026-10-13T09:00:00+00:00".to_string()),
        days_until_expiry: -5,
        is_expired: true,
        message: "Your document 'Pollution Certificate' (Category: pollution_certificate) has expired on 2026-10-13. Please renew it immediately.".to_string(),
    }
}

#[actix_web::test]
async fn test_document_expiry_round_trip() {
    let harness = start_server();
    let client = client(&harness.base_url, KEY);

    let reply = client
        .notify_document_expiry(&expired_request())
        .await
        .unwrap();
    assert!(reply.success);

    let attempts = harness.backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].recipient, "driver@example.com");
    assert_eq!(attempts[0].subject, "Document Expired: Pollution Certificate");
    assert_eq!(attempts[0].payload["is_expired"], true);

    harness.handle.stop(true).await;
}

#[actix_web::test]
async fn test_user_created_round_trip() {
    let harness = start_server();
    let client = client(&harness.base_url, KEY);

    let reply = client
        .notify_user_created(&UserCreatedRequest {
            user_uuid: "d1c4a0c2-6b55-4a3e-9f0e-0b6f4c2e7a11".to_string(),
            email: "welcome@example.com".to_string(),
            username: "welcome".to_string(),
        })
        .await
        .unwrap();
    assert!(reply.success);
    assert_eq!(harness.backend.attempts()[0].subject, "Welcome to our platform!");

    harness.handle.stop(true).await;
}

#[actix_web::test]
async fn test_wrong_key_surfaces_as_unauthenticated() {
    let harness = start_server();
    let client = client(&harness.base_url, "wrong-key");

    let err = client
        .notify_document_expiry(&expired_request())
        .await
        .unwrap_err();

    match err {
        ClientError::Unauthenticated(message) => assert_eq!(message, "invalid service key"),
        other => panic!("expected unauthenticated error, got {:?}", other),
    }
    assert!(!ClientError::Unauthenticated(String::new()).is_retriable());
    assert_eq!(harness.backend.attempt_count(), 0);

    harness.handle.stop(true).await;
}

#[actix_web::test]
async fn test_delivery_failure_is_retriable_rejection() {
    let harness = start_server();
    harness
        .backend
        .set_failure(Some("provider unavailable".to_string()));
    let client = client(&harness.base_url, KEY);

    let err = client
        .notify_document_expiry(&expired_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 502, .. }));
    assert!(err.is_retriable());

    harness.handle.stop(true).await;
}

#[actix_web::test]
async fn test_unreachable_server_is_transport_error() {
    let harness = start_server();
    let base_url = harness.base_url.clone();
    harness.handle.stop(true).await;

    let client = client(&base_url, KEY);
    let err = client
        .notify_document_expiry(&expired_request())
        .await
        .unwrap_err();
    assert!(err.is_retriable());
}

/// Log sink shared between a test and its subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish()
    }

    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn test_plaintext_client_warns() {
    let logs = CapturedLogs::default();
    tracing::subscriber::with_default(logs.subscriber(), || {
        client(&Url::parse("http://127.0.0.1:9").unwrap(), KEY);
    });
    let output = logs.contents();
    assert!(output.contains("WARN"), "no warning logged: {}", output);
    assert!(output.contains("Notification client is not using TLS"));

    let logs = CapturedLogs::default();
    tracing::subscriber::with_default(logs.subscriber(), || {
        client(&Url::parse("https://notifications.internal:8443").unwrap(), KEY);
    });
    assert!(!logs.contents().contains("not using TLS"));
}

#[actix_web::test]
async fn test_plaintext_server_warns() {
    let logs = CapturedLogs::default();
    let harness = {
        let _guard = tracing::subscriber::set_default(logs.subscriber());
        start_server()
    };

    let output = logs.contents();
    assert!(output.contains("WARN"), "no warning logged: {}", output);
    assert!(output.contains("RPC server TLS is disabled"));

    harness.handle.stop(true).await;
}
