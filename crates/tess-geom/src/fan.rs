// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Triangle-fan decomposition anchored at vertex 0.
//!
//! For `v[0..N]` with `N >= 3` the fan is
//! `(v0, v1, v2), (v0, v2, v3), …, (v0, v[N-2], v[N-1])`: exactly `N - 2`
//! triangles in increasing index order. Degenerate or collinear triangles are
//! emitted as-is.

use std::iter::FusedIterator;

use thiserror::Error;

use crate::{Polygon, Triangle, Vertex};

/// Polygon has too few vertices to triangulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Zero vertices.
    #[error("polygon has no vertices")]
    NoVertices,
    /// Exactly one vertex.
    #[error("polygon only has one vertex")]
    OneVertex,
    /// Exactly two vertices.
    #[error("polygon only has two vertices")]
    TwoVertices,
}

impl ValidationError {
    /// Vertex count of the rejected polygon.
    pub const fn vertex_count(self) -> usize {
        match self {
            Self::NoVertices => 0,
            Self::OneVertex => 1,
            Self::TwoVertices => 2,
        }
    }

    /// Error for a polygon of `count` vertices, or `None` when it is triangulable.
    pub const fn for_vertex_count(count: usize) -> Option<Self> {
        match count {
            0 => Some(Self::NoVertices),
            1 => Some(Self::OneVertex),
            2 => Some(Self::TwoVertices),
            _ => None,
        }
    }
}

/// Lazy fan over an owned polygon. Yields `(pivot, previous, current)`.
///
/// Each triangle is produced as soon as its vertex pair is reached, so callers
/// can stream triangles out without materializing the whole fan.
#[derive(Debug, Clone)]
pub struct Fan {
    pivot: Vertex,
    previous: Vertex,
    rest: std::vec::IntoIter<Vertex>,
}

impl Iterator for Fan {
    type Item = Triangle;

    fn next(&mut self) -> Option<Triangle> {
        let current = self.rest.next()?;
        let triangle = Triangle::new(self.pivot, self.previous, current);
        self.previous = current;
        Some(triangle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rest.size_hint()
    }
}

impl ExactSizeIterator for Fan {}

impl FusedIterator for Fan {}

/// Start a fan over `polygon`.
///
/// Fails without producing anything when the polygon has fewer than three
/// vertices.
pub fn fan(polygon: Polygon) -> Result<Fan, ValidationError> {
    let mut rest = polygon.into_vertices().into_iter();
    let Some(pivot) = rest.next() else {
        return Err(ValidationError::NoVertices);
    };
    let Some(previous) = rest.next() else {
        return Err(ValidationError::OneVertex);
    };
    if rest.len() == 0 {
        return Err(ValidationError::TwoVertices);
    }
    Ok(Fan {
        pivot,
        previous,
        rest,
    })
}
