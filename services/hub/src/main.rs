use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use dispatch_core::HubProvider;
use hub::hue_provider::HueHubProvider;
use hub::state::AppState;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(shared_secret) = env::var("HUB_SHARED_SECRET") else {
        error!("HUB_SHARED_SECRET is required");
        return ExitCode::FAILURE;
    };
    let bind_addr = env::var("HUB_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());

    let state = Arc::new(AppState::new(shared_secret));
    let providers: Vec<Arc<dyn HubProvider>> = vec![Arc::new(HueHubProvider::new(
        Arc::clone(&state.hue),
        Arc::clone(&state.hue_gauges),
    ))];
    state.install_providers(providers).await;

    let router = hub::build_router(Arc::clone(&state));

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = %bind_addr, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %bind_addr, "hub listening");

    if let Err(err) = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %err, "server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
