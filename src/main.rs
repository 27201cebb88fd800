use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;

use patientdb::api::RestApi;
use patientdb::config::load_config;
use patientdb::records::RecordService;
use patientdb::storage::PatientStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let config = load_config(&config_path)?;
    let addr = config.api.socket_addr()?;

    let store = Arc::new(PatientStore::new(&config.storage)?);
    let service = Arc::new(RecordService::new(Arc::clone(&store)));
    let api = RestApi::new(Arc::clone(&service));

    log::info!("Starting server on {}", addr);

    // Create a channel for shutdown signal
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let (_, server) = warp::serve(api.routes())
        .try_bind_with_graceful_shutdown(addr, async move {
            shutdown_rx.await.ok();
            log::info!("Shutting down server...");
        })?;

    let server_handle = tokio::spawn(server);

    signal::ctrl_c().await?;
    log::info!("Ctrl+C received, starting graceful shutdown");

    shutdown_tx.send(()).ok();
    server_handle.await?;

    // Every write already reached disk, nothing to flush
    log::info!("Server shutdown complete");
    Ok(())
}
