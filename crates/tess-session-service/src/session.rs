// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-connection session state machine.
//!
//! `Open` → `Closing` → `Closed`. Each inbound polygon is fanned to
//! completion (or rejected) before the next event is looked at; a rejected
//! polygon does not end the session. The machine does no I/O: it hands back a
//! [`Reply`] the driver drains into the outbound half.

use tess_geom::{fan, Fan, Polygon, ValidationError};
use tess_session_proto::{ErrorPayload, Message};
use thiserror::Error;
use tracing::{debug, warn};

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting polygons.
    Open,
    /// Inbound end-of-stream seen; outbound close not yet handed out.
    Closing,
    /// Terminal.
    Closed,
}

/// Inbound stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A polygon arrived.
    DataReceived(Polygon),
    /// Peer closed its half cleanly.
    InputClosed,
    /// Inbound half failed (I/O error, bad framing, unexpected op).
    Aborted,
}

/// Event arrived after the session was already closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session already closed")]
pub struct SessionClosed;

/// Outbound work produced by one event. Iterate it to get the messages, in order.
#[derive(Debug)]
pub enum Reply {
    /// Triangles of the current polygon.
    Fan(Fan),
    /// The polygon at `polygon` was not triangulable.
    Rejected {
        /// Why.
        error: ValidationError,
        /// 0-based polygon index within the session.
        polygon: u64,
    },
    /// Outbound end-of-stream.
    Close,
    /// Nothing to send.
    Nothing,
}

impl Iterator for Reply {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        match self {
            Reply::Fan(fan) => fan.next().map(Message::from),
            Reply::Nothing => None,
            Reply::Rejected { .. } | Reply::Close => {
                match std::mem::replace(self, Reply::Nothing) {
                    Reply::Rejected { error, polygon } => Some(Message::Error(
                        ErrorPayload::invalid_polygon(error, polygon),
                    )),
                    Reply::Close => Some(Message::Close),
                    Reply::Fan(_) | Reply::Nothing => None,
                }
            }
        }
    }
}

/// Triangulator side of one stream.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    polygons: u64,
    rejected: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A freshly established session (`Open`).
    pub fn new() -> Self {
        Self {
            state: SessionState::Open,
            polygons: 0,
            rejected: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Polygons received so far.
    pub fn polygons(&self) -> u64 {
        self.polygons
    }

    /// Polygons rejected so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Advance the machine by one inbound event.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Reply, SessionClosed> {
        if self.state != SessionState::Open {
            return Err(SessionClosed);
        }
        match event {
            SessionEvent::DataReceived(polygon) => {
                let index = self.polygons;
                self.polygons += 1;
                let vertices = polygon.len();
                match fan(polygon) {
                    Ok(fan) => {
                        debug!(polygon = index, vertices, triangles = fan.len(), "fanning polygon");
                        Ok(Reply::Fan(fan))
                    }
                    Err(error) => {
                        self.rejected += 1;
                        warn!(polygon = index, %error, "rejecting polygon");
                        Ok(Reply::Rejected {
                            error,
                            polygon: index,
                        })
                    }
                }
            }
            SessionEvent::InputClosed => {
                self.state = SessionState::Closing;
                debug!(polygons = self.polygons, "input closed");
                self.state = SessionState::Closed;
                Ok(Reply::Close)
            }
            SessionEvent::Aborted => {
                self.state = SessionState::Closed;
                Ok(Reply::Nothing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tess_geom::{Triangle, Vertex};

    fn v(x: f64, y: f64) -> Vertex {
        Vertex::new(x, y, 0.0)
    }

    fn triangles(reply: Reply) -> Vec<Triangle> {
        reply
            .map(|msg| match msg {
                Message::Triangle(p) => Triangle::try_from(p).expect("three vertices"),
                other => panic!("expected triangle, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn polygons_fan_in_arrival_order() {
        let mut session = Session::new();
        let a = Polygon::unit_square();
        let b = Polygon::new(vec![v(5.0, 5.0), v(6.0, 5.0), v(5.0, 6.0)]);

        let first = triangles(session.handle(SessionEvent::DataReceived(a)).unwrap());
        let second = triangles(session.handle(SessionEvent::DataReceived(b)).unwrap());

        assert_eq!(
            first,
            vec![
                Triangle::new(v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0)),
                Triangle::new(v(0.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)),
            ]
        );
        assert_eq!(
            second,
            vec![Triangle::new(v(5.0, 5.0), v(6.0, 5.0), v(5.0, 6.0))]
        );
        assert_eq!(session.polygons(), 2);
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn rejection_yields_one_error_and_session_continues() {
        let mut session = Session::new();
        let short = Polygon::new(vec![v(0.0, 0.0), v(1.0, 0.0)]);
        let out: Vec<Message> = session
            .handle(SessionEvent::DataReceived(short))
            .unwrap()
            .collect();
        assert_eq!(out.len(), 1);
        let Message::Error(payload) = &out[0] else {
            panic!("expected error, got {out:?}");
        };
        let details = payload.as_invalid_polygon().expect("details");
        assert_eq!((details.polygon, details.vertex_count), (0, 2));

        let next = session
            .handle(SessionEvent::DataReceived(Polygon::unit_square()))
            .unwrap();
        assert_eq!(triangles(next).len(), 2);
        assert_eq!(session.rejected(), 1);
        assert_eq!(session.polygons(), 2);
    }

    #[test]
    fn input_closed_emits_close_then_refuses_events() {
        let mut session = Session::new();
        let out: Vec<Message> = session.handle(SessionEvent::InputClosed).unwrap().collect();
        assert_eq!(out, vec![Message::Close]);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(
            session
                .handle(SessionEvent::DataReceived(Polygon::unit_square()))
                .unwrap_err(),
            SessionClosed
        );
    }

    #[test]
    fn abort_closes_without_output() {
        let mut session = Session::new();
        let out: Vec<Message> = session.handle(SessionEvent::Aborted).unwrap().collect();
        assert!(out.is_empty());
        assert_eq!(session.state(), SessionState::Closed);
    }
}
