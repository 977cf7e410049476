//! `frcn-bridge` command line.
//!
//! # Usage
//!
//! ```text
//! frcn-bridge hub   [--bind 127.0.0.1:24870]
//! frcn-bridge relay --target-origin <ORIGIN> [--hub ws://127.0.0.1:24870]
//! ```
//!
//! `hub` serves the built-in `echo` and `version` operations over
//! WebSocket. `relay` runs a content bridge whose page is stdio: each stdin
//! line is one window message from the page, each stdout line is one
//! `{ "targetOrigin": .., "data": .. }` posted back.
//!
//! Logs go to stderr. `RUST_LOG` overrides the default `frcn_bridge=info`.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FRCN_HUB_BIND` | `127.0.0.1:24870` | Hub listen address |
//! | `FRCN_HUB_URL` | `ws://127.0.0.1:24870` | Hub URL for the relay |
//! | `FRCN_TARGET_ORIGIN` | none | Origin relay responses are posted to |

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use frcn_bridge::bridge::{BridgeBuilder, BridgeConfig, PendingPolicy};
use frcn_bridge::channel::{PortServer, WsConnector};
use frcn_bridge::hub::Hub;
use frcn_bridge::page::stdio::{LinePage, read_events};

// ============================================================================
// CLI
// ============================================================================

/// Cross-context request/response bridge.
#[derive(Debug, Parser)]
#[command(name = "frcn-bridge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a background hub on a WebSocket listener.
    Hub(HubArgs),
    /// Run a content bridge with a stdio page.
    Relay(RelayArgs),
}

#[derive(Debug, Args)]
struct HubArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:24870", env = "FRCN_HUB_BIND")]
    bind: SocketAddr,
}

#[derive(Debug, Args)]
struct RelayArgs {
    /// Hub WebSocket URL.
    #[arg(long, default_value = "ws://127.0.0.1:24870", env = "FRCN_HUB_URL")]
    hub: String,

    /// Origin responses are posted to. `*` is rejected.
    #[arg(long, env = "FRCN_TARGET_ORIGIN")]
    target_origin: String,

    /// Replay policy for unanswered requests.
    #[arg(long, value_enum, default_value_t = PendingArg::Latest)]
    pending: PendingArg,

    /// Delay after the first failed reconnect, in milliseconds.
    #[arg(long, default_value_t = 100)]
    reconnect_initial_ms: u64,

    /// Reconnect delay ceiling, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    reconnect_max_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PendingArg {
    /// Keep only the latest request; any response clears it.
    Latest,
    /// Keep every request until its own response arrives.
    ById,
}

impl From<PendingArg> for PendingPolicy {
    fn from(arg: PendingArg) -> Self {
        match arg {
            PendingArg::Latest => Self::Latest,
            PendingArg::ById => Self::ById,
        }
    }
}

impl RelayArgs {
    /// Converts the arguments into a bridge configuration.
    fn bridge_config(&self) -> BridgeConfig {
        let mut config = BridgeConfig {
            target_origin: self.target_origin.clone(),
            pending_policy: self.pending.into(),
            ..BridgeConfig::default()
        };
        config.reconnect.initial = Duration::from_millis(self.reconnect_initial_ms);
        config.reconnect.max = Duration::from_millis(self.reconnect_max_ms);
        config
    }
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("frcn_bridge=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Hub(args) => run_hub(args).await,
        Command::Relay(args) => run_relay(args).await,
    }
}

/// Serves the built-in operations until Ctrl+C.
async fn run_hub(args: HubArgs) -> anyhow::Result<()> {
    let server = PortServer::bind_addr(args.bind)
        .await
        .with_context(|| format!("failed to bind hub on {}", args.bind))?;

    let hub = Hub::new();
    hub.register_builtins();

    info!(url = %server.ws_url(), operations = ?hub.operations(), "Hub listening");

    tokio::select! {
        () = hub.serve(server) => {
            error!("Hub listener failed");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("Received Ctrl+C, stopping hub");
        }
    }

    Ok(())
}

/// Relays stdio page traffic until Ctrl+C or stdin EOF.
async fn run_relay(args: RelayArgs) -> anyhow::Result<()> {
    let connector = WsConnector::new(&args.hub)
        .with_context(|| format!("invalid hub URL {:?}", args.hub))?;

    let bridge = BridgeBuilder::from_config(args.bridge_config())
        .build(connector, LinePage::new(io::stdout()))
        .context("invalid relay configuration")?;

    info!(hub = %args.hub, target_origin = %args.target_origin, "Relay starting");

    let page_events = read_events(BufReader::new(tokio::io::stdin()));
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, stopping relay"),
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    bridge.run(page_events, shutdown).await;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
