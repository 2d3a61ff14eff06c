//! # Strand
//!
//! Provenance-aware graph queries over an append-only fact log.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              apps/strand (THE BINARY)        │
//! │                                              │
//! │   ┌─────────────┐        ┌─────────────┐     │
//! │   │    CLI      │        │  HTTP API   │     │
//! │   │   (clap)    │        │   (axum)    │     │
//! │   └──────┬──────┘        └──────┬──────┘     │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │   ┌─────────────┐  ┌───────────────┐         │
//! │   │  JsonlLog   │──│  strand-core  │         │
//! │   │ (.jsonl)    │  │ (THE ENGINE)  │         │
//! │   └─────────────┘  └───────────────┘         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! strand add-edge alice acme -t works_at --source hr --confidence 0.9
//! strand paths alice acme --shortest
//! strand query -f pipeline.json -s alice
//! strand server --port 8080
//! ```

use clap::Parser;
use strand::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // STRAND_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("STRAND_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "strand=info,strand_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  ┌─┐┌┬┐┬─┐┌─┐┌┐┌┌┬┐
  └─┐ │ ├┬┘├─┤│││ ││
  └─┘ ┴ ┴└─┴ ┴┘└┘─┴┘  v{}

  provenance-aware graph queries
"#,
        env!("CARGO_PKG_VERSION")
    );
}
