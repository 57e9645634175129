//! # Krystal - Power Structure Mapping
//!
//! The main binary for the Krystal influence network analyser.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for network operations
//! - LittleSis, news and OpenSecrets data-source clients
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    apps/krystal (THE BINARY)                 │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐  │
//! │  │   CLI       │    │   HTTP API  │    │  Data Sources   │  │
//! │  │  (clap)     │    │   (axum)    │    │   (reqwest)     │  │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬────────┘  │
//! │         │                  │                    │           │
//! │         └──────────────────┼────────────────────┘           │
//! │                            ▼                                │
//! │                    ┌───────────────┐                        │
//! │                    │ krystal-core  │                        │
//! │                    │ (THE LOGIC)   │                        │
//! │                    └───────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! krystal server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! krystal sample
//! krystal load -f network.json
//! krystal paths --from 1 --to 4
//! krystal investigate "energy lobbying"
//! ```

use clap::Parser;
use krystal::{cli, config::KrystalConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Configuration errors are reported after logging is up.
    let config = KrystalConfig::load(cli.config.as_deref());
    let level = match (&config, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.log.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    init_tracing(&level);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing. `RUST_LOG` wins over `level`;
/// `KRYSTAL_LOG_FORMAT=json` enables machine-parseable output.
fn init_tracing(level: &str) {
    let log_format = std::env::var("KRYSTAL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("krystal={level},krystal_core={level},tower_http=debug").into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

/// Print the Krystal startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗  ██╗██████╗ ██╗   ██╗███████╗████████╗ █████╗ ██╗
  ██║ ██╔╝██╔══██╗╚██╗ ██╔╝██╔════╝╚══██╔══╝██╔══██╗██║
  █████╔╝ ██████╔╝ ╚████╔╝ ███████╗   ██║   ███████║██║
  ██╔═██╗ ██╔══██╗  ╚██╔╝  ╚════██║   ██║   ██╔══██║██║
  ██║  ██╗██║  ██║   ██║   ███████║   ██║   ██║  ██║███████╗
  ╚═╝  ╚═╝╚═╝  ╚═╝   ╚═╝   ╚══════╝   ╚═╝   ╚═╝  ╚═╝╚══════╝

  Power Structure Mapping v{}

  Entities • Relationships • Influence
"#,
        env!("CARGO_PKG_VERSION")
    );
}
