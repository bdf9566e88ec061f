//! `nodeflow` binary: serve the graph execution backend, or validate a
//! graph file offline.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use engine::{execution_order, Graph, GraphPayload, RuntimeConfig};
use ops::builtin::builtin_registry;

#[derive(Parser)]
#[command(name = "nodeflow", about = "Node graph execution backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP/WebSocket server.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
        /// Per-operation timeout in seconds (unlimited if omitted).
        #[arg(long)]
        op_timeout: Option<u64>,
    },
    /// Validate a graph JSON file and print its execution order.
    Validate {
        /// Path to a graph payload (same JSON the editor submits).
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let registry = Arc::new(builtin_registry());

    match cli.command {
        Command::Serve { bind, op_timeout } => {
            let config = RuntimeConfig {
                op_timeout: op_timeout.map(Duration::from_secs),
            };
            api::serve(bind, registry, config).await
        }
        Command::Validate { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let payload: GraphPayload =
                serde_json::from_str(&text).context("parsing graph JSON")?;

            let order = Graph::build(payload, &registry)
                .and_then(|graph| execution_order(&graph));
            match order {
                Ok(order) => println!("✅ Graph is valid. Execution order: {order:?}"),
                Err(e) => {
                    println!("❌ Validation failed: {e}");
                    exit(1);
                }
            }
            Ok(())
        }
    }
}
