// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Client helper for the tessellation service: opens a session over TCP,
//! streams polygons out and triangles back into a [`RenderPort`].

use std::io;

use tess_geom::{NotATriangle, Polygon};
use tess_session_proto::wire::{
    decode_message, encode_message, frame_len, WireError, HEADER_BYTES, MAX_PAYLOAD,
};
use tess_session_proto::Message;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

pub use tess_app_core::render_port::RenderPort;

pub mod consume;
pub mod render;

pub use consume::{consume, run_session, ConsumeReport, StreamEnd};
pub use render::TextRenderer;

/// Client-side failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Socket I/O failed.
    #[error("io: {0}")]
    Io(#[from] io::Error),
    /// Packet framing or CBOR codec failed.
    #[error("wire: {0}")]
    Wire(#[from] WireError),
    /// Service sent a triangle without exactly three vertices.
    #[error("protocol violation: {0}")]
    NotATriangle(#[from] NotATriangle),
    /// Service sent an op renderers never receive.
    #[error("protocol violation: unexpected op {0}")]
    UnexpectedOp(&'static str),
}

impl ClientError {
    /// `true` for errors that end the session because the peer broke the protocol,
    /// as opposed to the transport failing underneath it.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::NotATriangle(_) | Self::UnexpectedOp(_))
    }
}

/// Open session to the tessellation service.
pub struct SessionClient {
    stream: TcpStream,
}

impl SessionClient {
    /// Connect to the service at `addr` (`host:port`).
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Split into the outbound polygon half and the inbound triangle half.
    pub fn into_split(self) -> (PolygonSink<OwnedWriteHalf>, TriangleStream<OwnedReadHalf>) {
        let (reader, writer) = self.stream.into_split();
        (PolygonSink::new(writer), TriangleStream::new(reader))
    }
}

/// Outbound half: polygons, then one close.
pub struct PolygonSink<W> {
    writer: W,
    ts: u64,
}

impl<W: AsyncWrite + Unpin> PolygonSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer, ts: 0 }
    }

    async fn send(&mut self, msg: &Message) -> Result<(), ClientError> {
        let pkt = encode_message(msg, self.ts)?;
        self.ts += 1;
        self.writer.write_all(&pkt).await?;
        Ok(())
    }

    /// Send one polygon.
    pub async fn send_polygon(&mut self, polygon: &Polygon) -> Result<(), ClientError> {
        self.send(&Message::Polygon(polygon.clone())).await
    }

    /// Signal end-of-input and close the write half. Consumes the sink, so it
    /// happens at most once.
    pub async fn finish(mut self) -> Result<(), ClientError> {
        self.send(&Message::Close).await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Inbound half: packets from the service, one at a time.
pub struct TriangleStream<R> {
    reader: R,
    max_payload: usize,
}

impl<R: AsyncRead + Unpin> TriangleStream<R> {
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_payload: MAX_PAYLOAD,
        }
    }

    /// Read the next message. `Ok(None)` when the stream ends before any bytes
    /// of a new packet are read. Reads until a full header is buffered so short
    /// reads cannot desynchronize framing.
    pub async fn poll_message(&mut self) -> Result<Option<Message>, ClientError> {
        let mut header = [0u8; HEADER_BYTES];
        let mut read = 0usize;
        while read < header.len() {
            let n = self.reader.read(&mut header[read..]).await?;
            if n == 0 {
                if read == 0 {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("truncated frame header: read {read} of {HEADER_BYTES} bytes"),
                )
                .into());
            }
            read += n;
        }
        let total = frame_len(&header, self.max_payload)?.ok_or(WireError::Incomplete)?;
        let mut packet = vec![0u8; total];
        packet[..HEADER_BYTES].copy_from_slice(&header);
        self.reader.read_exact(&mut packet[HEADER_BYTES..]).await?;
        let (msg, _ts, _) = decode_message(&packet)?;
        Ok(Some(msg))
    }
}
