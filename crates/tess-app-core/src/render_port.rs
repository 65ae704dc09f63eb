// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Port trait for whatever displays triangles coming off a session.

use tess_geom::Triangle;

/// Sink for rendered triangles.
///
/// Implementations must not reorder or mutate the vertices they are handed;
/// rendering the same triangle twice must produce the same output.
pub trait RenderPort {
    /// Render one triangle, in the order received.
    fn render(&mut self, triangle: &Triangle);
}

impl<R: RenderPort + ?Sized> RenderPort for &mut R {
    fn render(&mut self, triangle: &Triangle) {
        (**self).render(triangle);
    }
}

/// Collects triangles in receipt order; handy for embedding and tests.
impl RenderPort for Vec<Triangle> {
    fn render(&mut self, triangle: &Triangle) {
        self.push(*triangle);
    }
}
