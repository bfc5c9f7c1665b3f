//! RPC server exposing the notification service
//!
//! Each RPC is a `POST` of a JSON message to
//! `/notification.v1.NotificationService/<Method>`; the reply is a
//! [`NotificationResponse`] or an error body produced by
//! [`NotificationError`]. Every RPC route sits behind [`ServiceKeyAuth`].

use crate::auth::ServiceKeyAuth;
use crate::error::{NotificationError, Result};
use crate::service::NotificationService;
use crate::types::{DocumentExpiryRequest, NotificationResponse, UserCreatedRequest};
use actix_web::{dev::Server, web, App, HttpResponse, HttpServer};
use docwatch_core::{RpcServerConfig, ServiceKey, TlsConfig};
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

pub const RPC_SCOPE: &str = "/notification.v1.NotificationService";
pub const NOTIFY_USER_CREATED_PATH: &str = "/notification.v1.NotificationService/NotifyUserCreated";
pub const NOTIFY_DOCUMENT_EXPIRY_PATH: &str =
    "/notification.v1.NotificationService/NotifyDocumentExpiry";

async fn notify_user_created(
    service: web::Data<NotificationService>,
    body: web::Json<UserCreatedRequest>,
) -> Result<HttpResponse> {
    service.notify_user_created(&body).await?;
    Ok(HttpResponse::Ok().json(NotificationResponse::sent("User creation notification sent")))
}

async fn notify_document_expiry(
    service: web::Data<NotificationService>,
    body: web::Json<DocumentExpiryRequest>,
) -> Result<HttpResponse> {
    service.notify_document_expiry(&body).await?;
    Ok(HttpResponse::Ok().json(NotificationResponse::sent("Document expiry notification sent")))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Register the RPC methods. Mount under [`RPC_SCOPE`].
pub fn configure_rpc(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/NotifyUserCreated", web::post().to(notify_user_created))
        .route("/NotifyDocumentExpiry", web::post().to(notify_document_expiry));
}

/// Register the unauthenticated health probe.
pub fn configure_health(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            NotificationError::Validation {
                field: "body".to_string(),
                message: format!("malformed request body: {}", err),
            }
            .into()
        })
}

/// A bound server plus the addresses it listens on.
pub struct RpcServer {
    pub server: Server,
    pub local_addrs: Vec<SocketAddr>,
}

/// Bind the RPC server. The returned [`Server`] must be awaited (or spawned)
/// to start accepting connections.
pub fn build_server(
    config: &RpcServerConfig,
    service_key: ServiceKey,
    service: NotificationService,
) -> Result<RpcServer> {
    let data = web::Data::new(service);
    let backend = data.backend_name();

    let http = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(configure_health)
            .service(
                web::scope(RPC_SCOPE)
                    .wrap(ServiceKeyAuth::new(service_key.clone()))
                    .configure(configure_rpc),
            )
    })
    .shutdown_timeout(30);

    let address = config.bind_address();
    let bound = if config.tls.enabled {
        let tls = load_rustls_config(&config.tls)?;
        http.bind_rustls_0_23(&address, tls)
    } else {
        warn!(address = %address, "RPC server TLS is disabled; traffic is unencrypted");
        http.bind(&address)
    };
    let http = bound.map_err(|e| {
        NotificationError::Configuration(format!("failed to bind {}: {}", address, e))
    })?;

    let local_addrs = http.addrs();
    info!(
        address = %address,
        tls = config.tls.enabled,
        backend = backend,
        "Notification RPC server listening"
    );

    Ok(RpcServer {
        server: http.run(),
        local_addrs,
    })
}

/// Load the PEM certificate chain and private key into a rustls server config.
pub fn load_rustls_config(tls: &TlsConfig) -> Result<rustls::ServerConfig> {
    let tls_error = |message: String| NotificationError::Configuration(message);

    let cert_file = File::open(&tls.cert_file).map_err(|e| {
        tls_error(format!(
            "failed to open TLS certificate {}: {}",
            tls.cert_file.display(),
            e
        ))
    })?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| tls_error(format!("failed to parse TLS certificate: {}", e)))?;
    if certs.is_empty() {
        return Err(tls_error(format!(
            "no certificates found in {}",
            tls.cert_file.display()
        )));
    }

    let key_file = File::open(&tls.key_file).map_err(|e| {
        tls_error(format!(
            "failed to open TLS key {}: {}",
            tls.key_file.display(),
            e
        ))
    })?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .map_err(|e| tls_error(format!("failed to parse TLS key: {}", e)))?
        .ok_or_else(|| tls_error(format!("no private key found in {}", tls.key_file.display())))?;

    rustls::ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error(format!("invalid TLS protocol configuration: {}", e)))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| tls_error(format!("invalid TLS certificate or key: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_paths_share_scope() {
        assert!(NOTIFY_USER_CREATED_PATH.starts_with(RPC_SCOPE));
        assert!(NOTIFY_DOCUMENT_EXPIRY_PATH.starts_with(RPC_SCOPE));
    }

    #[test]
    fn test_missing_tls_material_is_configuration_error() {
        let tls = TlsConfig {
            enabled: true,
            cert_file: PathBuf::from("/nonexistent/server.crt"),
            key_file: PathBuf::from("/nonexistent/server.key"),
        };
        let err = load_rustls_config(&tls).unwrap_err();
        assert!(matches!(err, NotificationError::Configuration(_)));
        assert!(err.to_string().contains("server.crt"));
    }

    #[test]
    fn test_non_pem_certificate_rejected() {
        let dir = std::env::temp_dir().join(format!("docwatch-tls-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let cert = dir.join("server.crt");
        let key = dir.join("server.key");
        std::fs::write(&cert, "not a certificate").unwrap();
        std::fs::write(&key, "not a key").unwrap();

        let tls = TlsConfig {
            enabled: true,
            cert_file: cert,
            key_file: key,
        };
        let err = load_rustls_config(&tls).unwrap_err();
        assert!(err.to_string().contains("no certificates found"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
