use anyhow::Context;
use docwatch_core::{
    init_logging, load_dotenv, wait_for_signal, AuthConfig, ConfigLoader, LogConfig,
    RpcServerConfig,
};
use docwatch_notification::{build_server, DeliveryConfig, NotificationService};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let log_config = LogConfig::from_env("notification-service")?;
    init_logging(&log_config)?;

    let rpc_config = RpcServerConfig::from_env().context("loading RPC server configuration")?;
    rpc_config.validate()?;
    let auth_config = AuthConfig::from_env().context("loading service key")?;
    auth_config.validate()?;
    let delivery_config = DeliveryConfig::from_env().context("loading delivery configuration")?;

    let service = NotificationService::from_config(&delivery_config)?;
    let rpc = build_server(&rpc_config, auth_config.service_key, service)?;
    let handle = rpc.server.handle();

    info!(addrs = ?rpc.local_addrs, "Notification service started");

    tokio::select! {
        result = rpc.server => {
            result.context("RPC server terminated")?;
        }
        signal = wait_for_signal() => {
            if let Err(e) = signal {
                error!(error = %e, "Signal handler failed, shutting down");
            }
            handle.stop(true).await;
        }
    }

    info!("Notification service stopped");
    Ok(())
}
