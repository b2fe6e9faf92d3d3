use std::sync::Arc;

use astelco_dome::config::Config;
use astelco_dome::dome_control::{AstelcoDome, DomeEvent};
use astelco_dome::tpl::TplClient;
use eyre::WrapErr;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt::init();

    let config: Config = confy::load_path("config.toml").wrap_err("Couldn't parse configuration")?;

    let client = TplClient::connect(&config.tpl_settings).await?;
    let dome = Arc::new(AstelcoDome::new(
        Arc::new(client),
        config.dome_settings.clone(),
    ));

    tokio::spawn(log_events(dome.subscribe()));
    dome.start().await?;

    let mut keep_alive = time::interval(config.dome_settings.max_idle_time());
    keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = keep_alive.tick() => {
                if let Err(e) = dome.control().await {
                    error!("Keep-alive failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    dome.stop().await?;
    Ok(())
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<DomeEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => info!("{:?}", event),
            Err(RecvError::Lagged(n)) => warn!("Missed {} dome events", n),
            Err(RecvError::Closed) => return,
        }
    }
}
