// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session wire schema for the tessellation stream.
//!
//! One long-lived duplex stream per session. The renderer sends `polygon`
//! messages followed by one `close`; the service answers each polygon with its
//! `triangle` fan (or one `error`), and finishes with its own `close`.
//! Messages travel inside CBOR `OpEnvelope`s framed by [`wire`].

pub use tess_geom::{Polygon, Triangle, ValidationError, Vertex};

use ciborium::value::{Integer, Value};
use serde::{Deserialize, Serialize};

pub mod wire;

/// Canonical OpEnvelope carried as the payload of a packet.
///
/// * `op` – operation name (see [`Message::op_name`]).
/// * `ts` – logical timestamp, monotonic per session and direction.
/// * `payload` – operation specific body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpEnvelope<P> {
    /// Operation name (e.g. "polygon", "triangle", "error", "close").
    pub op: String,
    /// Logical timestamp.
    pub ts: u64,
    /// Operation-specific body.
    pub payload: P,
}

/// Error code for a polygon with fewer than three vertices.
pub const E_INVALID_POLYGON: u32 = 1;
/// Error name paired with [`E_INVALID_POLYGON`].
pub const E_INVALID_POLYGON_NAME: &str = "E_INVALID_POLYGON";

/// Error payload sent by the service on the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    /// Numeric error code.
    pub code: u32,
    /// Stable identifier (e.g. "E_INVALID_POLYGON").
    pub name: String,
    /// Optional machine-readable details.
    pub details: Option<Value>,
    /// Human readable message.
    pub message: String,
}

/// Decoded details of an `E_INVALID_POLYGON` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPolygon {
    /// 0-based index of the offending polygon within its session.
    pub polygon: u64,
    /// Vertex count of the offending polygon.
    pub vertex_count: u64,
}

impl ErrorPayload {
    /// Error scoped to the `polygon`-th polygon of a session.
    pub fn invalid_polygon(err: ValidationError, polygon: u64) -> Self {
        let vertex_count = err.vertex_count() as u64;
        Self {
            code: E_INVALID_POLYGON,
            name: E_INVALID_POLYGON_NAME.into(),
            details: Some(Value::Map(vec![
                (
                    Value::Text("vertex_count".into()),
                    Value::Integer(vertex_count.into()),
                ),
                (Value::Text("polygon".into()), Value::Integer(polygon.into())),
            ])),
            message: err.to_string(),
        }
    }

    /// Parse the details of an `E_INVALID_POLYGON` error; `None` for other errors.
    pub fn as_invalid_polygon(&self) -> Option<InvalidPolygon> {
        if self.code != E_INVALID_POLYGON {
            return None;
        }
        let Some(Value::Map(entries)) = &self.details else {
            return None;
        };
        let field = |name: &str| {
            entries.iter().find_map(|(k, v)| match (k, v) {
                (Value::Text(k), Value::Integer(i)) if k == name => uint(*i),
                _ => None,
            })
        };
        Some(InvalidPolygon {
            polygon: field("polygon")?,
            vertex_count: field("vertex_count")?,
        })
    }
}

fn uint(i: Integer) -> Option<u64> {
    u64::try_from(i).ok()
}

/// Wire message kinds carried inside OpEnvelope payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Polygon to triangulate (op = "polygon", renderer → service).
    Polygon(Polygon),
    /// One triangle of a fan, in the polygon wire shape (op = "triangle",
    /// service → renderer). Receivers must check the vertex count.
    Triangle(Polygon),
    /// Error scoped to one polygon of the session (op = "error").
    Error(ErrorPayload),
    /// End of the sender's half of the stream (op = "close").
    Close,
}

impl Message {
    /// Canonical op string for this message variant.
    pub fn op_name(&self) -> &'static str {
        match self {
            Message::Polygon(_) => "polygon",
            Message::Triangle(_) => "triangle",
            Message::Error(_) => "error",
            Message::Close => "close",
        }
    }
}

impl From<Triangle> for Message {
    fn from(triangle: Triangle) -> Self {
        Message::Triangle(triangle.into())
    }
}
