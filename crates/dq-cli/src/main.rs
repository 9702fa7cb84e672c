//! # dq — The Console of TABQUERY
//!
//! Terminal client for query sessions.
//!
//! - `dq modules` — List the registered data modules.
//! - `dq query --module <id> [conditions]` — One-shot query, printed as a table.
//! - `dq shell` — Interactive session with result tabs and aggregation.
//! - `dq verify` — Run Kani proofs.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dq_core::parser::parse_conditions;
use dq_core::{Config, Row};
use dq_engine::{HttpGateway, QuerySession, Workspace};

mod grid;
mod render;
mod shell;

/// TABQUERY — query result tabs over a remote data backend.
#[derive(Parser)]
#[command(name = "dq", version, about, long_about = None)]
struct Cli {
    /// Path to the config file.
    #[arg(long, global = true, default_value = "dq.toml")]
    config: PathBuf,

    /// Backend base URL (overrides DQ_BASE_URL and [gateway].base_url).
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered modules.
    Modules,

    /// Run one query and print the result.
    Query {
        /// Module id, e.g. `xms`.
        #[arg(long, short)]
        module: String,

        /// Print rows as JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// Conditions, e.g. `currency = USD AND amount > 100`.
        conditions: Vec<String>,
    },

    /// Start an interactive session.
    Shell {
        /// Module to open on start.
        #[arg(long, short)]
        module: Option<String>,
    },

    /// Run Kani formal verification proofs.
    Verify,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dq_cli=info,dq_engine=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Verify = cli.command {
        verify();
    }

    let mut config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(base_url) = cli
        .base_url
        .or_else(|| std::env::var("DQ_BASE_URL").ok())
    {
        config.gateway.base_url = base_url;
    }
    tracing::debug!("Backend at {}", config.gateway.base_url);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to build tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(async_main(cli.command, config)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn async_main(cmd: Commands, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Modules => {
            println!("{}", render::modules_table(&config.modules, &[]));
        }

        Commands::Query {
            module,
            json,
            conditions,
        } => {
            let module = config
                .module(&module)
                .cloned()
                .ok_or_else(|| format!("unknown module '{}'", module))?;
            let conditions = parse_conditions(&conditions.join(" "))?;
            let gateway = Arc::new(HttpGateway::new(&config.gateway)?);

            let mut session = QuerySession::open(module, gateway).await;
            session.submit(conditions);
            session.settle().await;

            let tab = session.active_tab().ok_or("no result tab")?;
            if json {
                println!("{}", serde_json::to_string_pretty(tab.rows())?);
            } else {
                let rows: Vec<(usize, &Row)> = tab.rows().iter().enumerate().collect();
                let columns = render::columns_for(tab, session.config());
                println!("{}", tab.title());
                println!("{}", render::rows_table(&columns, &rows));
                println!("{} rows", rows.len());
            }
        }

        Commands::Shell { module } => {
            let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
            let mut shell = shell::Shell::new(Workspace::new(config.modules, gateway));
            if let Some(module) = module {
                shell.open(&module).await;
            }
            shell.run().await?;
        }

        Commands::Verify => verify(),
    }
    Ok(())
}

fn verify() -> ! {
    eprintln!("TABQUERY: Running formal verification...");
    eprintln!("   Tool: Kani Model Checker");
    eprintln!("   Target: dq-verify (active-tab pointer proofs)");
    eprintln!();

    let status = Command::new("cargo")
        .args(["kani", "--package", "dq-verify"])
        .status();

    match status {
        Ok(status) if status.success() => {
            eprintln!("   dq-verify: ALL PROOFS PASSED");
            std::process::exit(0);
        }
        Ok(_) => {
            eprintln!("   dq-verify: PROOF FAILURE");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("   Kani not found: {}", e);
            eprintln!("   Install with: cargo install kani-verifier && cargo kani setup");
            std::process::exit(1);
        }
    }
}
