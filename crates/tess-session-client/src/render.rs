// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Line-oriented text renderer.

use std::io::Write;

use tess_geom::{format_triangle, Triangle};
use tracing::warn;

use crate::RenderPort;

/// Writes one formatted triangle per line.
///
/// Write failures are logged and counted; they do not end the session.
pub struct TextRenderer<W> {
    out: W,
    failed_writes: u64,
}

impl<W: Write> TextRenderer<W> {
    /// Render into `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            failed_writes: 0,
        }
    }

    /// Number of triangles that could not be written.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    /// Flush and return the writer.
    pub fn into_inner(mut self) -> W {
        if let Err(err) = self.out.flush() {
            warn!(?err, "flush failed");
        }
        self.out
    }
}

impl<W: Write> RenderPort for TextRenderer<W> {
    fn render(&mut self, triangle: &Triangle) {
        if let Err(err) = writeln!(self.out, "{}", format_triangle(triangle)) {
            self.failed_writes += 1;
            warn!(?err, "failed to write triangle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tess_geom::Vertex;

    #[test]
    fn one_line_per_triangle_same_bytes_each_time() {
        let tri = Triangle::new(
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 1.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        );
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render(&tri);
        renderer.render(&tri);
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        let line = "(+0.00, +0.00, +0.00) -> (+1.00, +1.00, +0.00) -> (+0.00, +1.00, +0.00)";
        assert_eq!(text, format!("{line}\n{line}\n"));
    }
}
