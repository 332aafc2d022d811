use cloud_build_notifier::config::NotifierConfig;
use cloud_build_notifier::logging::{FileLogger, setup_logging};
use cloud_build_notifier::notifier::Notifier;
use cloud_build_notifier::{AppState, api};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config = match NotifierConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let file_logger = config.log_dir.clone().map(FileLogger::new);
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(Notifier::new(&config)));
    let app = api::router(state);

    info!("Listening on {}", config.bind_address);
    info!(
        "Failure channel {}",
        if config.failure_webhook_url.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );

    let listener = match tokio::net::TcpListener::bind(&config.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind_address, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
