use std::process::ExitCode;
use std::sync::Arc;

use dispatch_core::{dispatch_worker_frame, run_ping_round, Bus, WorkerCapability};
use futures_util::StreamExt;
use hue_domain::ReqwestHueClient;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};
use worker::backoff;
use worker::bus_client;
use worker::config::WorkerConfig;
use worker::providers::hue::HueWorkerProvider;
use worker::providers::stub::StubProvider;

/// Why the connected-session loop in [`run_connection`] returned.
enum SessionExit {
    /// The bus reader saw a close frame, an error, or ran out, or a send
    /// failed — the caller should reconnect with backoff.
    Disconnected,
    /// `ctrl_c` fired — the caller should exit the process.
    Shutdown,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let hue_client = ReqwestHueClient::new(&config.bridge_ip, &config.bridge_username);
    let hue_provider = Arc::new(HueWorkerProvider::new(hue_client));

    if let Some(path) = &config.hue_config_path {
        let declarative_config = match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<hue_domain::DeclarativeConfig>(&text).map_err(|e| e.to_string()))
        {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, path = %path, "failed to read declarative config file");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = hue_provider.configure_from_file(&declarative_config).await {
            error!(error = %err, "declarative config startup failed");
            return ExitCode::FAILURE;
        }
    }

    let providers: Vec<Arc<dyn WorkerCapability>> = vec![
        hue_provider,
        Arc::new(StubProvider::netatmo()),
        Arc::new(StubProvider::sonos()),
        Arc::new(StubProvider::dyson()),
    ];

    let mut attempt: u32 = 0;
    loop {
        let (bus, reader) = tokio::select! {
            result = bus_client::connect(&config.bus_url, &config.shared_secret) => {
                match result {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(error = %err, attempt, "failed to connect to bus, retrying");
                        backoff::sleep(attempt).await;
                        attempt = attempt.saturating_add(1);
                        continue;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received while connecting");
                return ExitCode::SUCCESS;
            }
        };
        attempt = 0;
        info!("connected to bus");

        let bus = Arc::new(bus);
        match run_connection(bus.as_ref(), reader, &providers, &config).await {
            SessionExit::Shutdown => {
                bus.close().await;
                return ExitCode::SUCCESS;
            }
            SessionExit::Disconnected => {
                bus.close().await;
                warn!(attempt, "lost bus connection, reconnecting with backoff");
                backoff::sleep(attempt).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

/// Drive one connected session: dispatch inbound frames, fan out ping
/// rounds, and return why the session ended.
async fn run_connection(
    bus: &dyn Bus,
    mut reader: bus_client::WsReader,
    providers: &[Arc<dyn WorkerCapability>],
    config: &WorkerConfig,
) -> SessionExit {
    let mut ping_interval = tokio::time::interval(dispatch_core::PING_INTERVAL);

    loop {
        tokio::select! {
            frame = reader.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = dispatch_worker_frame(&text, providers).await {
                            if let Err(err) = bus.send(None, &reply).await {
                                warn!(error = %err, "failed to publish reply");
                                return SessionExit::Disconnected;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("bus connection closed");
                        return SessionExit::Disconnected;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "bus read error");
                        return SessionExit::Disconnected;
                    }
                }
            }
            _ = ping_interval.tick() => {
                run_ping_round(bus, providers, &config.publish_topics).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                return SessionExit::Shutdown;
            }
        }
    }
}

