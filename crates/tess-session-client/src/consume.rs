// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fan-consumer loop: read the inbound half until the service closes it and
//! render every triangle in receipt order.
//!
//! Transport faults end the loop quietly (no retry, no reopen). A
//! triangle-shaped message without exactly three vertices is a protocol
//! violation and ends the session with an error; it is never rendered.

use tess_geom::{Polygon, Triangle};
use tess_session_proto::{ErrorPayload, Message};
use tokio::io::AsyncRead;
use tracing::{debug, warn};

use crate::{ClientError, RenderPort, SessionClient, TriangleStream};

/// How the inbound half ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Service sent its close.
    Closed,
    /// Stream ended on a packet boundary without a close.
    Eof,
    /// Transport or framing failure; consumption stopped early.
    Aborted,
}

/// What one consumption run saw.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumeReport {
    /// Triangles rendered.
    pub triangles: u64,
    /// Per-polygon errors reported by the service, in order.
    pub rejected: Vec<ErrorPayload>,
    /// How the stream ended.
    pub end: StreamEnd,
}

/// Consume the inbound half, rendering each triangle as it arrives.
pub async fn consume<R, P>(
    stream: &mut TriangleStream<R>,
    renderer: &mut P,
) -> Result<ConsumeReport, ClientError>
where
    R: AsyncRead + Unpin,
    P: RenderPort + ?Sized,
{
    let mut report = ConsumeReport {
        triangles: 0,
        rejected: Vec::new(),
        end: StreamEnd::Aborted,
    };
    loop {
        match stream.poll_message().await {
            Ok(Some(Message::Triangle(polygon))) => {
                let triangle = Triangle::try_from(polygon).map_err(|err| {
                    warn!(%err, "protocol violation from service");
                    err
                })?;
                renderer.render(&triangle);
                report.triangles += 1;
            }
            Ok(Some(Message::Error(payload))) => {
                warn!(code = payload.code, name = %payload.name, "service rejected polygon: {}", payload.message);
                report.rejected.push(payload);
            }
            Ok(Some(Message::Close)) => {
                report.end = StreamEnd::Closed;
                break;
            }
            Ok(Some(other @ Message::Polygon(_))) => {
                warn!(op = other.op_name(), "protocol violation from service");
                return Err(ClientError::UnexpectedOp(other.op_name()));
            }
            Ok(None) => {
                report.end = StreamEnd::Eof;
                break;
            }
            Err(err) => {
                debug!(?err, "inbound stream failed; stopping");
                report.end = StreamEnd::Aborted;
                break;
            }
        }
    }
    Ok(report)
}

/// Full renderer flow: connect, send `polygons` then close, and consume the
/// replies into `renderer`.
///
/// Polygons are written from a separate task so a long input cannot deadlock
/// against an unread stream of triangles.
pub async fn run_session<P>(
    addr: &str,
    polygons: Vec<Polygon>,
    renderer: &mut P,
) -> Result<ConsumeReport, ClientError>
where
    P: RenderPort + ?Sized,
{
    let (mut sink, mut stream) = SessionClient::connect(addr).await?.into_split();
    let sender = tokio::spawn(async move {
        for polygon in &polygons {
            sink.send_polygon(polygon).await?;
        }
        sink.finish().await
    });

    let report = consume(&mut stream, renderer).await;
    if report.is_err() {
        sender.abort();
    }
    match sender.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => debug!(?err, "outbound stream failed"),
        Err(err) if err.is_cancelled() => {}
        Err(err) => warn!(?err, "polygon sender task failed"),
    }
    report
}
