//! Sticky HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                    LOAD BALANCER                      │
//!   Client GET       │  ┌──────────┐   ┌──────────────┐   ┌──────────────┐  │
//!   ─────────────────┼─▶│ front end│──▶│ affinity     │──▶│ upstream GET │──┼──▶ Backend
//!                    │  │ (axum)   │   │ router       │   │ (base URL)   │  │
//!   ◀────────────────┼──│          │◀──┴──────┬───────┘◀──┴──────────────┘  │
//!   status + body    │  └────┬─────┘          │ snapshot                     │
//!                    │       │ enqueue   ┌────┴────────┐   ┌──────────────┐  │
//!                    │       ▼           │ backend pool│◀──│health monitor│──┼──▶ probes
//!                    │  ┌──────────┐     └────┬────────┘   └──────────────┘  │
//!                    │  │ dispatch │──▶ workers ─┘ select ──▶ GET url + path ─┼──▶ Backend
//!                    │  │ queue    │                                          │
//!                    │  └──────────┘                                          │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::net::TcpListener;

use sticky_balancer::config::loader::{read_config, ConfigError};
use sticky_balancer::config::validation::validate_config;
use sticky_balancer::config::BalancerConfig;
use sticky_balancer::http::backend_service::serve_backend;
use sticky_balancer::lifecycle::shutdown::trigger_on_ctrl_c;
use sticky_balancer::observability::{logging, metrics};
use sticky_balancer::security::RateLimiter;
use sticky_balancer::{BalancerServer, Shutdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Serve the fixed backend response
    Backend,
    /// Balance across backends
    Balancer,
}

#[derive(Parser)]
#[command(name = "sticky-balancer")]
#[command(about = "Run a simple backend server or a sticky load balancer", long_about = None)]
struct Cli {
    /// Run as a backend server or a load balancer.
    #[arg(long, value_enum)]
    mode: Mode,

    /// Port to run the server on.
    #[arg(long)]
    port: u16,

    /// Ports of local backend servers (balancer mode).
    #[arg(long = "backend-ports", num_args = 1..)]
    backend_ports: Vec<u16>,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merge command line arguments over the file (or default) configuration.
    fn into_config(self) -> Result<(Mode, BalancerConfig), ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => BalancerConfig::default(),
        };

        config.listener.bind_address = format!("0.0.0.0:{}", self.port);
        config
            .backends
            .extend(self.backend_ports.iter().map(|p| format!("http://localhost:{}", p)));

        if self.mode == Mode::Balancer {
            validate_config(&config).map_err(ConfigError::Validation)?;
        }
        Ok((self.mode, config))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let (mode, config) = match cli.into_config() {
        Ok(parsed) => parsed,
        Err(e) => {
            logging::init_logging("info");
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability.log_level);

    match run(mode, config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(mode: Mode, config: BalancerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Shutdown::new();
    tokio::spawn(trigger_on_ctrl_c(shutdown.clone()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    match mode {
        Mode::Backend => {
            let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
            serve_backend(listener, limiter, shutdown).await?;
        }
        Mode::Balancer => {
            tracing::info!(
                backends = ?config.backends,
                health_interval_secs = config.health_check.interval_secs,
                workers = config.dispatch.worker_count(),
                "Configuration loaded"
            );

            if config.observability.metrics_enabled {
                match config.observability.metrics_address.parse() {
                    Ok(addr) => metrics::init_metrics(addr),
                    Err(_) => tracing::error!(
                        metrics_address = %config.observability.metrics_address,
                        "Failed to parse metrics address"
                    ),
                }
            }

            let server = BalancerServer::new(config);
            server.run(listener, shutdown).await?;
        }
    }

    Ok(())
}
