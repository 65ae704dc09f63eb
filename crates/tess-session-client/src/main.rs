// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Renderer CLI: open one session, send polygons (default: the unit square),
//! print each triangle of the fan, exit when the service closes the stream.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tess_app_core::config::ConfigService;
use tess_app_core::prefs::{EndpointPrefs, ENDPOINT_KEY};
use tess_config_fs::FsConfigStore;
use tess_geom::Polygon;
use tess_session_client::{run_session, TextRenderer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send polygons to the tessellation service and render the fans")]
struct Args {
    /// Service host (overrides the stored endpoint prefs)
    #[arg(long)]
    host: Option<String>,
    /// Service port (overrides the stored endpoint prefs)
    #[arg(long)]
    port: Option<u16>,
    /// JSON file holding an array of polygons (`[{"vertex": [{"x":0,"y":0,"z":0}, ...]}]`)
    #[arg(long)]
    polygons: Option<PathBuf>,
}

fn load_polygons(path: Option<&PathBuf>) -> Result<Vec<Polygon>> {
    let Some(path) = path else {
        return Ok(vec![Polygon::unit_square()]);
    };
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let stored = FsConfigStore::new()
        .map(ConfigService::new)
        .ok()
        .and_then(|c| c.load::<EndpointPrefs>(ENDPOINT_KEY).ok().flatten())
        .unwrap_or_default();
    let prefs = stored.with_overrides(args.host, args.port);

    let polygons = load_polygons(args.polygons.as_ref())?;
    info!(polygons = polygons.len(), "connecting to {}", prefs.address());

    let mut renderer = TextRenderer::new(std::io::stdout());
    let report = run_session(&prefs.address(), polygons, &mut renderer)
        .await
        .with_context(|| format!("session with {}", prefs.address()))?;
    if renderer.failed_writes() > 0 {
        warn!(failed = renderer.failed_writes(), "some triangles could not be written");
    }
    renderer.into_inner();

    info!(
        triangles = report.triangles,
        rejected = report.rejected.len(),
        end = ?report.end,
        "session finished"
    );
    Ok(())
}
