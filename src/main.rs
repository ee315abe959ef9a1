use std::sync::Arc;

use rust_signal_fusion::api::{run_server, AppState};
use rust_signal_fusion::config::StoreBackend;
use rust_signal_fusion::data::{AlertStore, FileAlertStore, MemoryAlertStore};
use rust_signal_fusion::services::alerts::AlertMonitor;
use rust_signal_fusion::services::pipeline::AnalysisPipeline;
use rust_signal_fusion::services::reporting::SignalReporter;
use rust_signal_fusion::{AppConfig, Event, EventBus};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Signal Fusion...");
    info!("Loaded Configuration: {:?}", config);

    let store: Arc<dyn AlertStore> = match config.alerts.backend {
        StoreBackend::File => Arc::new(FileAlertStore::new(config.alerts.dir.clone())),
        StoreBackend::Memory => Arc::new(MemoryAlertStore::new(config.alerts.history_limit)),
    };
    info!("💾 Alert store: {} (history limit {})", store.name(), config.alerts.history_limit);

    let bus = EventBus::new(config.alerts.bus_capacity);
    let monitor = AlertMonitor::new(store, config.alerts.history_limit).with_bus(bus.clone());
    let pipeline = AnalysisPipeline::new(monitor, SignalReporter::new()).with_bus(bus.clone());

    // Log sink for fan-out; delivery channels subscribe the same way
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Event::RegimeChanged { from, to, .. }) => {
                    warn!("🔄 [BUS] Regime changed: {} → {}", from, to)
                }
                Ok(Event::Alert(alert)) => info!("📣 [BUS] {} alert {}", alert.alert_type, alert.id),
                Ok(Event::Signal(signal)) => info!("📣 [BUS] {} signal for {}", signal.signal, signal.ticker),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("⚠️ [BUS] Log sink lagged by {} events", n)
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let state = Arc::new(AppState { pipeline });
    run_server(state, &config.bind_addr()).await?;

    Ok(())
}
