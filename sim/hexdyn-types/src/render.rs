//! Mapping between simulation space and render space.
//!
//! The simulated world is the cube `[0, edge]³`. Renderers draw in
//! normalized coordinates `[-1, 1]³`.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned world cube mapped onto `[-1, 1]³`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderFrame {
    /// Edge length of the simulated world cube.
    pub world_edge: f64,
}

impl Default for RenderFrame {
    fn default() -> Self {
        Self { world_edge: 128.0 }
    }
}

impl RenderFrame {
    /// Create a frame for a world cube of the given edge length.
    #[must_use]
    pub const fn new(world_edge: f64) -> Self {
        Self { world_edge }
    }

    /// World point to render space.
    #[must_use]
    pub fn to_render(&self, p: &Point3<f64>) -> Point3<f64> {
        p.map(|c| c * 2.0 / self.world_edge - 1.0)
    }

    /// Render-space point back to world space.
    #[must_use]
    pub fn from_render(&self, p: &Point3<f64>) -> Point3<f64> {
        p.map(|c| (c + 1.0) * self.world_edge * 0.5)
    }

    /// World point to a single-precision render vertex.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_render_f32(&self, p: &Point3<f64>) -> [f32; 3] {
        let r = self.to_render(p);
        [r.x as f32, r.y as f32, r.z as f32]
    }
}
