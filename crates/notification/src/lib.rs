//! # Docwatch Notification
//!
//! The notification service and the authenticated RPC used to reach it.
//!
//! - `backend`: delivery backends (email, console, mock)
//! - `factory`: selects a backend from configuration
//! - `service`: request validation and dispatch to the backend
//! - `auth`: service-key middleware
//! - `server`: actix-web RPC server with optional TLS
//! - `client`: reqwest-based RPC client

pub mod auth;
pub mod backend;
pub mod client;
pub mod error;
pub mod factory;
pub mod server;
pub mod service;
pub mod types;

pub use auth::{ServiceKeyAuth, SERVICE_KEY_HEADER};
pub use backend::{
    ConsoleBackend, DeliveryBackend, DeliveryBackendKind, DeliveryConfig, DeliveryRecord,
    EmailBackend, MockBackend,
};
pub use client::{ClientConfig, ClientError, NotificationClient};
pub use error::{DeliveryError, NotificationError, Result};
pub use factory::build_backend;
pub use server::{build_server, RpcServer};
pub use service::NotificationService;
pub use types::{DocumentExpiryRequest, NotificationResponse, UserCreatedRequest};
