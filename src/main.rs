use std::sync::Arc;

use tokio::signal;
use tokio::sync::oneshot;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use roomrtc_params::config::Config;
use roomrtc_params::http::ReqwestTransport;
use roomrtc_params::{RoomParametersEvents, RoomParametersFetcher, SignalingParameters};

/// Forwards the single outcome of the attempt to `main`
struct OutcomeSender {
    tx: std::sync::Mutex<Option<oneshot::Sender<Result<SignalingParameters, String>>>>,
}

impl OutcomeSender {
    fn send(&self, outcome: Result<SignalingParameters, String>) {
        if let Some(tx) = self.tx.lock().ok().and_then(|mut slot| slot.take()) {
            let _ = tx.send(outcome);
        }
    }
}

impl RoomParametersEvents for OutcomeSender {
    fn on_signaling_parameters_ready(&self, params: SignalingParameters) {
        self.send(Ok(params));
    }

    fn on_signaling_parameters_error(&self, description: String) {
        self.send(Err(description));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        room_url = %config.room_join_url,
        turn_server_request = config.turn_server_request,
        "Configuration loaded"
    );

    let transport = Arc::new(
        ReqwestTransport::new().with_user_agent(concat!("roomrtc-params/", env!("CARGO_PKG_VERSION"))),
    );
    let fetcher = RoomParametersFetcher::new(
        transport,
        config.room_join_url.clone(),
        config.room_message.clone(),
    )
    .with_options(config.fetch_options());

    let (tx, rx) = oneshot::channel();
    let events = Arc::new(OutcomeSender {
        tx: std::sync::Mutex::new(Some(tx)),
    });
    let handle = fetcher.spawn(events);

    tokio::select! {
        outcome = rx => {
            match outcome? {
                Ok(params) => {
                    println!("{}", serde_json::to_string_pretty(&params)?);
                }
                Err(description) => {
                    tracing::error!(error = %description, "Failed to resolve signaling parameters");
                    anyhow::bail!(description);
                }
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, abandoning room join...");
            handle.abort();
        }
    }

    Ok(())
}
