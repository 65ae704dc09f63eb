// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tessellation service binary: bind, serve sessions, drain on Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use tess_app_core::config::ConfigService;
use tess_app_core::prefs::{EndpointPrefs, ENDPOINT_KEY};
use tess_config_fs::FsConfigStore;
use tess_session_proto::wire::MAX_PAYLOAD;
use tess_session_service::{serve, ServerConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Streaming triangle-fan tessellation service")]
struct Args {
    /// Host to bind (overrides the stored endpoint prefs)
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides the stored endpoint prefs)
    #[arg(long)]
    port: Option<u16>,
    /// Maximum packet payload in bytes
    #[arg(long, default_value_t = MAX_PAYLOAD)]
    max_frame_bytes: usize,
    /// Outbound messages buffered per session
    #[arg(long, default_value_t = 256)]
    outbox_depth: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Config (best-effort)
    let stored = match FsConfigStore::new().map(ConfigService::new) {
        Ok(config) => config
            .load_or_init::<EndpointPrefs>(ENDPOINT_KEY)
            .unwrap_or_else(|err| {
                warn!(?err, "unreadable endpoint prefs; using defaults");
                EndpointPrefs::default()
            }),
        Err(err) => {
            warn!(?err, "no config dir; using default endpoint");
            EndpointPrefs::default()
        }
    };
    let prefs = stored.with_overrides(args.host, args.port);

    let listener = TcpListener::bind(prefs.address())
        .await
        .with_context(|| format!("bind {}", prefs.address()))?;
    info!("tessellation service listening on {}", listener.local_addr()?);

    let config = ServerConfig {
        max_frame_bytes: args.max_frame_bytes,
        outbox_depth: args.outbox_depth,
    };
    serve(listener, config, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(?err, "failed to install ctrl-c handler; running until killed");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    })
    .await
}
