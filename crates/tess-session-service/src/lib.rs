// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Triangle-fan tessellation service.
//!
//! [`session`] holds the transport-free state machine; [`server`] runs it over
//! TCP, one task per connection.

pub mod server;
pub mod session;

pub use server::{handle_client, serve, ServerConfig, SessionSummary};
pub use session::{Reply, Session, SessionClosed, SessionEvent, SessionState};
