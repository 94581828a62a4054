use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use session_gate::config::Config;
use session_gate::router::{GateState, gate_router};
use session_gate::service::bootstrap::{HookOptions, StoreSource};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let options = HookOptions::from_config(&cfg).await?;
    let store = match &options.store {
        StoreSource::Remote { table } => format!("remote:{table}"),
        StoreSource::Local(_) => "local:sqlite".to_string(),
    };
    info!(
        listen_addr = %cfg.listen_addr,
        store = %store,
        strategy = ?cfg.gate_strategy,
        default_app_id = %cfg.app_id,
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.loglevel
    );

    let state = GateState::new(options, cfg.app_id.as_str());
    let app = gate_router(state);

    let listener = TcpListener::bind(cfg.listen_addr.as_str()).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
