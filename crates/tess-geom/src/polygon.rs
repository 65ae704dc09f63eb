// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Polygon container and the three-vertex `Triangle` it degenerates to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Vertex;

/// Ordered sequence of vertices. Order defines the winding and the fan pivot.
///
/// Any length is representable; only polygons with at least three vertices
/// can be triangulated (see [`crate::fan`]).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(rename = "vertex", default)]
    vertices: Vec<Vertex>,
}

impl Polygon {
    /// Wraps an ordered vertex list.
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned unit square in the z = 0 plane, counter-clockwise from the origin.
    pub fn unit_square() -> Self {
        Self::new(vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(1.0, 1.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ])
    }

    /// Borrow the vertices in order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// `true` when the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Consume the polygon and return its vertex list.
    pub fn into_vertices(self) -> Vec<Vertex> {
        self.vertices
    }
}

impl From<Vec<Vertex>> for Polygon {
    fn from(vertices: Vec<Vertex>) -> Self {
        Self::new(vertices)
    }
}

impl FromIterator<Vertex> for Polygon {
    fn from_iter<I: IntoIterator<Item = Vertex>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Inbound triangle-shaped message did not carry exactly three vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("polygon is not a triangle: expected 3 vertices, got {vertex_count}")]
pub struct NotATriangle {
    /// Vertex count of the rejected polygon.
    pub vertex_count: usize,
}

/// Polygon constrained to exactly three vertices.
///
/// Travels on the wire in the `Polygon` shape; use `TryFrom<Polygon>` on the
/// receiving side to enforce the vertex count.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Triangle {
    vertices: [Vertex; 3],
}

impl Triangle {
    /// Builds a triangle from its corners in order.
    pub const fn new(a: Vertex, b: Vertex, c: Vertex) -> Self {
        Self { vertices: [a, b, c] }
    }

    /// Corners in order.
    pub const fn vertices(&self) -> &[Vertex; 3] {
        &self.vertices
    }

    /// First corner; the pivot when produced by a fan.
    pub const fn a(&self) -> Vertex {
        self.vertices[0]
    }

    /// Second corner.
    pub const fn b(&self) -> Vertex {
        self.vertices[1]
    }

    /// Third corner.
    pub const fn c(&self) -> Vertex {
        self.vertices[2]
    }
}

impl From<Triangle> for Polygon {
    fn from(triangle: Triangle) -> Self {
        Self::new(triangle.vertices.to_vec())
    }
}

impl TryFrom<Polygon> for Triangle {
    type Error = NotATriangle;

    fn try_from(polygon: Polygon) -> Result<Self, Self::Error> {
        match <[Vertex; 3]>::try_from(polygon.into_vertices()) {
            Ok(vertices) => Ok(Self { vertices }),
            Err(rest) => Err(NotATriangle {
                vertex_count: rest.len(),
            }),
        }
    }
}
