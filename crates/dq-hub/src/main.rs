use axum::{routing::get, Router};
use clap::Parser;
use dq_core::{Config, DataQueryConfig, Row};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod datasets;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(
    name = "dq-hub",
    version = "0.1.0",
    about = "TABQUERY demo query backend"
)]
struct Args {
    /// Path to config file
    #[arg(long, default_value = "dq.toml")]
    config: PathBuf,

    /// Server bind address (overrides [hub].bind)
    #[arg(long)]
    bind: Option<String>,

    /// Fraction of query calls answered with HTTP 503 (overrides [hub].fail_rate)
    #[arg(long)]
    fail_rate: Option<f64>,

    /// Seed for the sample data and failure injection
    #[arg(long)]
    seed: Option<u64>,
}

// =============================================================================
// Application State
// =============================================================================

struct AppState {
    modules: Vec<DataQueryConfig>,
    datasets: HashMap<String, Arc<Vec<Row>>>,
    fail_rate: f64,
    rng: Mutex<StdRng>,
    start_time: Instant,
    queries_served: AtomicU64,
}

impl AppState {
    fn new(config: &Config) -> Self {
        let hub = &config.hub;
        Self {
            modules: config.modules.clone(),
            datasets: datasets::generate_all(&config.modules, hub.rows_per_dataset, hub.seed),
            fail_rate: hub.fail_rate.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::seed_from_u64(hub.seed.wrapping_add(1))),
            start_time: Instant::now(),
            queries_served: AtomicU64::new(0),
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(api::status))
        .route("/api/modules", get(api::modules))
        .fallback(api::dataset_route)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dq_hub=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match Config::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(bind) = args.bind {
        config.hub.bind = bind;
    }
    if let Some(fail_rate) = args.fail_rate {
        config.hub.fail_rate = fail_rate;
    }
    if let Some(seed) = args.seed {
        config.hub.seed = seed;
    }

    let addr: SocketAddr = match config.hub.bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {}", config.hub.bind, e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(&config));
    let app = router(state);

    tracing::info!(
        "dq-hub serving {} modules on http://{} (fail rate {:.0}%)",
        config.modules.len(),
        addr,
        config.hub.fail_rate.clamp(0.0, 1.0) * 100.0
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Cannot bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
