// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Geometry primitives for the tessellation service.
//!
//! This crate provides:
//! - `Vertex`, `Polygon` and `Triangle` value types (serde-friendly, the same
//!   shape the session wire uses).
//! - `fan`, a lazy triangle-fan decomposition anchored at vertex 0.
//! - Human-readable triangle formatting used by renderers.
//!
//! No geometric validation happens here beyond the vertex-count check the fan
//! needs; winding order and convexity are the caller's business.

pub mod fan;
pub mod polygon;
pub mod render;
pub mod vertex;

pub use fan::{fan, Fan, ValidationError};
pub use polygon::{NotATriangle, Polygon, Triangle};
pub use render::format_triangle;
pub use vertex::Vertex;
