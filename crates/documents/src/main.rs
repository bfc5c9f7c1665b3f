use anyhow::Context;
use docwatch_core::{
    init_logging, load_dotenv, wait_for_signal, AuthConfig, ConfigLoader, DatabaseConfig,
    LogConfig, RpcServerConfig,
};
use docwatch_documents::{
    DocumentStore, ExpiryNotifier, ExpiryScheduler, PostgresDocumentStore, SchedulerConfig,
};
use docwatch_notification::{
    build_server, ClientConfig, DeliveryConfig, NotificationClient, NotificationService,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let log_config = LogConfig::from_env("docwatch-server")?;
    init_logging(&log_config)?;

    let rpc_config = RpcServerConfig::from_env().context("loading RPC server configuration")?;
    rpc_config.validate()?;
    let auth_config = AuthConfig::from_env().context("loading service key")?;
    auth_config.validate()?;
    let delivery_config = DeliveryConfig::from_env().context("loading delivery configuration")?;
    let client_config =
        ClientConfig::from_env().context("loading notification client configuration")?;
    client_config.validate()?;
    let scheduler_config = SchedulerConfig::from_env().context("loading scheduler configuration")?;
    scheduler_config.validate()?;
    let database_config = DatabaseConfig::from_env().context("loading database configuration")?;
    database_config.validate()?;

    // RPC server task
    let service = NotificationService::from_config(&delivery_config)?;
    let rpc = build_server(&rpc_config, auth_config.service_key.clone(), service)?;
    let server_handle = rpc.server.handle();
    let server_task = actix_web::rt::spawn(rpc.server);

    let notifier = NotificationClient::from_config(&client_config, auth_config.service_key)?
        .map(|client| Arc::new(client) as Arc<dyn ExpiryNotifier>);

    let scheduler = if database_config.url.is_some() {
        let store = PostgresDocumentStore::connect(&database_config).await?;
        store.ensure_schema().await?;
        let store: Arc<dyn DocumentStore> = Arc::new(store);

        let scheduler = ExpiryScheduler::new(store, notifier, scheduler_config);
        scheduler.start()?;
        Some(scheduler)
    } else {
        warn!("Database URL not configured; expiry scheduler is disabled");
        None
    };

    info!(addrs = ?rpc.local_addrs, "Docwatch server started");

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Ok(())) => info!("RPC server exited"),
                Ok(Err(e)) => error!(error = %e, "RPC server failed"),
                Err(e) => error!(error = %e, "RPC server task panicked"),
            }
        }
        signal = wait_for_signal() => {
            if let Err(e) = signal {
                error!(error = %e, "Signal handler failed, shutting down");
            }
        }
    }

    if let Some(scheduler) = &scheduler {
        scheduler.shutdown().await;
    }
    server_handle.stop(true).await;

    info!("Docwatch server stopped");
    Ok(())
}
