// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Real service, real client, loopback TCP.

use std::net::SocketAddr;

use tess_geom::{Polygon, Triangle, Vertex};
use tess_session_client::{run_session, StreamEnd, TextRenderer};
use tess_session_service::{serve, ServerConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn v(x: f64, y: f64, z: f64) -> Vertex {
    Vertex::new(x, y, z)
}

async fn start() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<anyhow::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, ServerConfig::default(), async move {
        let _ = stop_rx.await;
    }));
    (addr, stop_tx, server)
}

async fn stop(stop_tx: oneshot::Sender<()>, server: JoinHandle<anyhow::Result<()>>) {
    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn unit_square_renders_two_triangles() {
    let (addr, stop_tx, server) = start().await;

    let mut seen: Vec<Triangle> = Vec::new();
    let report = run_session(&addr.to_string(), vec![Polygon::unit_square()], &mut seen)
        .await
        .unwrap();

    assert_eq!(
        seen,
        vec![
            Triangle::new(v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 1.0, 0.0)),
            Triangle::new(v(0.0, 0.0, 0.0), v(1.0, 1.0, 0.0), v(0.0, 1.0, 0.0)),
        ]
    );
    assert_eq!(report.end, StreamEnd::Closed);
    assert!(report.rejected.is_empty());
    stop(stop_tx, server).await;
}

#[tokio::test]
async fn polygons_are_answered_in_order_with_rejections_in_place() {
    let (addr, stop_tx, server) = start().await;

    let b = Polygon::new(vec![v(2.0, 0.0, 1.0), v(3.0, 0.0, 1.0), v(2.0, 1.0, 1.0)]);
    let bad = Polygon::new(vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0)]);
    let mut seen: Vec<Triangle> = Vec::new();
    let report = run_session(
        &addr.to_string(),
        vec![Polygon::unit_square(), bad, b.clone(), Polygon::default()],
        &mut seen,
    )
    .await
    .unwrap();

    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2], Triangle::try_from(b).unwrap());
    let counts: Vec<(u64, u64)> = report
        .rejected
        .iter()
        .map(|e| {
            let d = e.as_invalid_polygon().unwrap();
            (d.polygon, d.vertex_count)
        })
        .collect();
    assert_eq!(counts, vec![(1, 2), (3, 0)]);
    assert_eq!(report.end, StreamEnd::Closed);
    stop(stop_tx, server).await;
}

#[tokio::test]
async fn many_polygons_do_not_stall_the_stream() {
    let (addr, stop_tx, server) = start().await;

    let ring: Polygon = (0..64)
        .map(|i| {
            let t = std::f64::consts::TAU * f64::from(i) / 64.0;
            v(t.cos(), t.sin(), 0.0)
        })
        .collect();
    let polygons = vec![ring; 2_000];
    let mut seen: Vec<Triangle> = Vec::new();
    let report = run_session(&addr.to_string(), polygons, &mut seen).await.unwrap();

    assert_eq!(report.triangles, 2_000 * 62);
    assert_eq!(report.end, StreamEnd::Closed);
    stop(stop_tx, server).await;
}

#[tokio::test]
async fn text_renderer_prints_the_fan() {
    let (addr, stop_tx, server) = start().await;

    let mut renderer = TextRenderer::new(Vec::new());
    run_session(&addr.to_string(), vec![Polygon::unit_square()], &mut renderer)
        .await
        .unwrap();
    let text = String::from_utf8(renderer.into_inner()).unwrap();
    assert_eq!(
        text,
        "(+0.00, +0.00, +0.00) -> (+1.00, +0.00, +0.00) -> (+1.00, +1.00, +0.00)\n\
         (+0.00, +0.00, +0.00) -> (+1.00, +1.00, +0.00) -> (+0.00, +1.00, +0.00)\n"
    );
    stop(stop_tx, server).await;
}

#[tokio::test]
async fn empty_session_just_closes() {
    let (addr, stop_tx, server) = start().await;

    let mut seen: Vec<Triangle> = Vec::new();
    let report = run_session(&addr.to_string(), Vec::new(), &mut seen).await.unwrap();
    assert!(seen.is_empty());
    assert_eq!(report.end, StreamEnd::Closed);
    stop(stop_tx, server).await;
}
