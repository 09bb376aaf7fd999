use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use webreg_planner::schedule::PlannerConfig;
use webreg_planner::server::create_router;
use webreg_planner::types::PlannerState;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    // Config path: first argument, else PLANNER_CONFIG, else defaults
    let config_path = std::env::args().nth(1);
    let config = match PlannerConfig::resolve(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let state = match PlannerState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to open course catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let address = state.config.socket_address();
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", address, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Schedule planner listening on http://{}", address);
    let router = create_router(state);
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Schedule planner stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
