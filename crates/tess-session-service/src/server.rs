// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! TCP accept loop and per-connection driver.
//!
//! Each connection is split: a writer task drains a bounded outbox (so a slow
//! renderer back-pressures the fan), while the read loop turns packets into
//! [`SessionEvent`]s one at a time and feeds the [`Session`].

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tess_session_proto::wire::{decode_message, encode_message, try_extract_frame, MAX_PAYLOAD};
use tess_session_proto::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::session::{Session, SessionEvent, SessionState};

/// Tunables for the accept loop and its sessions.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Largest accepted packet payload.
    pub max_frame_bytes: usize,
    /// Outbound messages buffered per session before the fan waits on the peer.
    pub outbox_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: MAX_PAYLOAD,
            outbox_depth: 256,
        }
    }
}

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause before retrying after `failures` consecutive accept errors.
/// Doubles from 10ms and caps at 1s.
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1u32 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Outcome of one finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Polygons received.
    pub polygons: u64,
    /// Polygons rejected by validation.
    pub rejected: u64,
    /// Triangles handed to the writer.
    pub triangles: u64,
    /// Whether the session ended through the inbound close (vs. an abort).
    pub clean: bool,
}

/// Accept sessions until `shutdown` resolves, then stop accepting and wait for
/// in-flight sessions to drain.
pub async fn serve<F>(listener: TcpListener, config: ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let mut sessions: JoinSet<()> = JoinSet::new();
    let mut next_conn_id: u64 = 0;
    let mut accept_failures: u32 = 0;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => {
                        accept_failures = 0;
                        conn
                    }
                    Err(err) => {
                        accept_failures = accept_failures.saturating_add(1);
                        let delay = accept_backoff(accept_failures);
                        warn!(?err, failures = accept_failures, retry_in = ?delay, "accept failed");
                        tokio::select! {
                            () = &mut shutdown => break,
                            () = tokio::time::sleep(delay) => continue,
                        }
                    }
                };
                let conn_id = next_conn_id;
                next_conn_id += 1;
                let span = info_span!("session", conn = conn_id, %peer);
                sessions.spawn(
                    async move {
                        info!("session opened");
                        match handle_client(stream, config).await {
                            Ok(summary) => info!(
                                polygons = summary.polygons,
                                rejected = summary.rejected,
                                triangles = summary.triangles,
                                clean = summary.clean,
                                "session closed"
                            ),
                            Err(err) => warn!(?err, "session handler error"),
                        }
                    }
                    .instrument(span),
                );
            }
            Some(res) = sessions.join_next(), if !sessions.is_empty() => log_join(res),
        }
    }

    drop(listener);
    info!(in_flight = sessions.len(), "no longer accepting; draining sessions");
    while let Some(res) = sessions.join_next().await {
        log_join(res);
    }
    info!("all sessions drained");
    Ok(())
}

fn log_join(res: Result<(), JoinError>) {
    if let Err(err) = res {
        if err.is_panic() {
            error!(?err, "session task panicked");
        } else if !err.is_cancelled() {
            warn!(?err, "session task failed");
        }
    }
}

/// Drive one session over a duplex byte stream until it reaches `Closed`.
pub async fn handle_client<S>(stream: S, config: ServerConfig) -> Result<SessionSummary>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let (tx, rx) = mpsc::channel::<Message>(config.outbox_depth.max(1));
    let writer_task = tokio::spawn(write_loop(writer, rx).in_current_span());

    let mut session = Session::new();
    let mut triangles: u64 = 0;
    let mut clean = false;
    let mut read_buf = vec![0u8; 16 * 1024];
    let mut acc: Vec<u8> = Vec::with_capacity(32 * 1024);

    while session.state() == SessionState::Open {
        let event = next_event(&mut reader, &mut acc, &mut read_buf, config.max_frame_bytes).await;
        clean = event == SessionEvent::InputClosed;
        let reply = session.handle(event)?;
        for msg in reply {
            if matches!(msg, Message::Triangle(_)) {
                triangles += 1;
            }
            if tx.send(msg).await.is_err() {
                warn!("outbound half gone; tearing session down");
                if session.state() == SessionState::Open {
                    session.handle(SessionEvent::Aborted)?;
                }
                clean = false;
                break;
            }
        }
    }

    drop(tx);
    match writer_task.await {
        Ok(Ok(sent)) => debug!(sent, "writer finished"),
        Ok(Err(err)) => {
            debug!(?err, "writer failed");
            clean = false;
        }
        Err(err) => {
            warn!(?err, "writer task failed");
            clean = false;
        }
    }

    Ok(SessionSummary {
        polygons: session.polygons(),
        rejected: session.rejected(),
        triangles,
        clean,
    })
}

/// Read until one whole inbound event is available.
async fn next_event<R>(
    reader: &mut R,
    acc: &mut Vec<u8>,
    read_buf: &mut [u8],
    max_frame_bytes: usize,
) -> SessionEvent
where
    R: AsyncRead + Unpin,
{
    loop {
        match try_extract_frame(acc, max_frame_bytes) {
            Ok(Some(packet)) => {
                return match decode_message(&packet) {
                    Ok((Message::Polygon(polygon), _ts, _)) => SessionEvent::DataReceived(polygon),
                    Ok((Message::Close, _ts, _)) => SessionEvent::InputClosed,
                    Ok((other, _ts, _)) => {
                        warn!(op = other.op_name(), "unexpected op from renderer");
                        SessionEvent::Aborted
                    }
                    Err(err) => {
                        warn!(?err, "failed to decode packet");
                        SessionEvent::Aborted
                    }
                };
            }
            Ok(None) => {}
            Err(err) => {
                warn!(?err, "bad framing");
                return SessionEvent::Aborted;
            }
        }
        match reader.read(read_buf).await {
            // EOF on a packet boundary is a half-close
            Ok(0) if acc.is_empty() => return SessionEvent::InputClosed,
            Ok(0) => {
                warn!(buffered = acc.len(), "truncated packet at end of stream");
                return SessionEvent::Aborted;
            }
            Ok(n) => acc.extend_from_slice(&read_buf[..n]),
            Err(err) => {
                warn!(?err, "read failed");
                return SessionEvent::Aborted;
            }
        }
    }
}

/// Encode and write outbound messages in order, then shut the write half.
async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<Message>) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut ts: u64 = 0;
    while let Some(msg) = rx.recv().await {
        let pkt = encode_message(&msg, ts)?;
        ts += 1;
        writer.write_all(&pkt).await?;
    }
    writer.shutdown().await?;
    Ok(ts)
}
