//! Body-frame geometry and mass properties of the hexahedron.
//!
//! The box is centered on its center of mass. Corners are numbered by the
//! sign bits of their coordinates, `i = x + 2y + 4z` with `1` meaning `+`:
//!
//! ```text
//!        6 ──────── 7
//!       /|         /|
//!      4 ──────── 5 |        z
//!      | 2 ───────|─ 3       |  y
//!      |/         |/         | /
//!      0 ──────── 1          |/___ x
//! ```

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

use crate::{Result, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of corners of the hexahedron.
pub const VERTEX_COUNT: usize = 8;

/// Triangle list for the hexahedron, two triangles per face, wound
/// counter-clockwise when seen from outside.
pub const MESH_INDICES: [u32; 36] = [
    0, 2, 1, 1, 2, 3, // bottom (-Z)
    4, 5, 6, 5, 7, 6, // top (+Z)
    0, 1, 5, 0, 5, 4, // front (-Y)
    2, 6, 7, 2, 7, 3, // back (+Y)
    0, 4, 6, 0, 6, 2, // left (-X)
    1, 3, 7, 1, 7, 5, // right (+X)
];

/// RGB color, one per vertex.
pub type Color = [f32; 3];

/// Immutable geometry and mass properties of a uniform-density box.
///
/// Built once when the body is created. The inertia tensor is stored in the
/// body frame only; world-frame tensors are always derived from the current
/// orientation through [`BoxGeometry::inverse_inertia_world`].
///
/// # Example
///
/// ```
/// use hexdyn_types::BoxGeometry;
/// use nalgebra::Vector3;
///
/// // A 1 x 1 x 1 cube of mass 12
/// let cube = BoxGeometry::new(12.0, Vector3::new(0.5, 0.5, 0.5)).unwrap();
/// assert_eq!(cube.vertices().len(), 8);
/// assert!((cube.inertia_body()[(0, 0)] - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoxGeometry {
    mass: f64,
    half_extents: Vector3<f64>,
    vertices: [Vector3<f64>; VERTEX_COUNT],
    colors: [Color; VERTEX_COUNT],
    inertia_body: Matrix3<f64>,
    inverse_inertia_body: Matrix3<f64>,
}

impl BoxGeometry {
    /// Default vertex color (a matte orange).
    pub const DEFAULT_COLOR: Color = [0.85, 0.45, 0.2];

    /// Build the box from its mass and half-extents along the body axes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidMassProperties`] if the mass or any
    /// half-extent is not positive and finite.
    pub fn new(mass: f64, half_extents: Vector3<f64>) -> Result<Self> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimError::invalid_mass(format!(
                "mass must be positive and finite, got {mass}"
            )));
        }
        if half_extents.iter().any(|e| !e.is_finite() || *e <= 0.0) {
            return Err(SimError::invalid_mass(format!(
                "half-extents must be positive and finite, got {half_extents:?}"
            )));
        }

        let vertices = std::array::from_fn(|i| {
            let sign = |bit: usize| if i & bit == 0 { -1.0 } else { 1.0 };
            Vector3::new(
                sign(1) * half_extents.x,
                sign(2) * half_extents.y,
                sign(4) * half_extents.z,
            )
        });

        // Principal moments use the two full extents perpendicular to each axis.
        let full = half_extents * 2.0;
        let (w2, l2, h2) = (full.x * full.x, full.y * full.y, full.z * full.z);
        let moments = Vector3::new(l2 + h2, w2 + h2, w2 + l2) * (mass / 12.0);

        Ok(Self {
            mass,
            half_extents,
            vertices,
            colors: [Self::DEFAULT_COLOR; VERTEX_COUNT],
            inertia_body: Matrix3::from_diagonal(&moments),
            inverse_inertia_body: Matrix3::from_diagonal(&moments.map(f64::recip)),
        })
    }

    /// Build a cube with the given mass and half edge length.
    ///
    /// # Errors
    ///
    /// Same as [`BoxGeometry::new`].
    pub fn cube(mass: f64, half_edge: f64) -> Result<Self> {
        Self::new(mass, Vector3::repeat(half_edge))
    }

    /// Paint every vertex with one color.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.colors = [color; VERTEX_COUNT];
        self
    }

    /// Assign an individual color to each vertex.
    #[must_use]
    pub fn with_vertex_colors(mut self, colors: [Color; VERTEX_COUNT]) -> Self {
        self.colors = colors;
        self
    }

    /// Total mass.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Inverse of the total mass.
    #[must_use]
    pub fn inverse_mass(&self) -> f64 {
        self.mass.recip()
    }

    /// Half-extents along the body axes.
    #[must_use]
    pub fn half_extents(&self) -> &Vector3<f64> {
        &self.half_extents
    }

    /// Corner offsets from the center of mass, in the body frame.
    #[must_use]
    pub fn vertices(&self) -> &[Vector3<f64>; VERTEX_COUNT] {
        &self.vertices
    }

    /// Triangle index list for rendering.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &MESH_INDICES
    }

    /// Per-vertex colors for rendering.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Inertia tensor about the center of mass, body frame.
    #[must_use]
    pub fn inertia_body(&self) -> &Matrix3<f64> {
        &self.inertia_body
    }

    /// Inverse inertia tensor, body frame.
    #[must_use]
    pub fn inverse_inertia_body(&self) -> &Matrix3<f64> {
        &self.inverse_inertia_body
    }

    /// Inverse inertia tensor in world frame: `R · I_body⁻¹ · Rᵗ`.
    #[must_use]
    pub fn inverse_inertia_world(&self, rotation: &UnitQuaternion<f64>) -> Matrix3<f64> {
        let r = rotation.to_rotation_matrix();
        r.matrix() * self.inverse_inertia_body * r.matrix().transpose()
    }

    /// Inertia tensor in world frame: `R · I_body · Rᵗ`.
    #[must_use]
    pub fn inertia_world(&self, rotation: &UnitQuaternion<f64>) -> Matrix3<f64> {
        let r = rotation.to_rotation_matrix();
        r.matrix() * self.inertia_body * r.matrix().transpose()
    }

    /// World position of one corner.
    #[must_use]
    pub fn world_vertex(
        &self,
        index: usize,
        position: &Point3<f64>,
        rotation: &UnitQuaternion<f64>,
    ) -> Option<Point3<f64>> {
        self.vertices.get(index).map(|v| position + rotation * v)
    }

    /// World positions of all corners.
    #[must_use]
    pub fn world_vertices(
        &self,
        position: &Point3<f64>,
        rotation: &UnitQuaternion<f64>,
    ) -> [Point3<f64>; VERTEX_COUNT] {
        self.vertices.map(|v| position + rotation * v)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vertex_layout() {
        let geom = BoxGeometry::new(1.0, Vector3::new(1.0, 2.0, 3.0)).unwrap();
        let v = geom.vertices();

        assert_eq!(v[0], Vector3::new(-1.0, -2.0, -3.0));
        assert_eq!(v[3], Vector3::new(1.0, 2.0, -3.0));
        assert_eq!(v[6], Vector3::new(-1.0, 2.0, 3.0));
        assert_eq!(v[7], Vector3::new(1.0, 2.0, 3.0));

        let centroid: Vector3<f64> = v.iter().sum::<Vector3<f64>>() / 8.0;
        assert_relative_eq!(centroid, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_box_inertia() {
        // Full extents 2 x 4 x 6, mass 12 => m/12 = 1
        let geom = BoxGeometry::new(12.0, Vector3::new(1.0, 2.0, 3.0)).unwrap();
        let i = geom.inertia_body();

        assert_relative_eq!(i[(0, 0)], 16.0 + 36.0, epsilon = 1e-12);
        assert_relative_eq!(i[(1, 1)], 4.0 + 36.0, epsilon = 1e-12);
        assert_relative_eq!(i[(2, 2)], 4.0 + 16.0, epsilon = 1e-12);
        assert_eq!(i[(0, 1)], 0.0);

        let product = i * geom.inverse_inertia_body();
        assert_relative_eq!(product, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_world_inverse_inertia_follows_rotation() {
        let geom = BoxGeometry::new(12.0, Vector3::new(1.0, 2.0, 3.0)).unwrap();
        let rotation = UnitQuaternion::from_euler_angles(0.3, -0.7, 1.1);

        let inv_world = geom.inverse_inertia_world(&rotation);
        let world = geom.inertia_world(&rotation);
        assert_relative_eq!(world * inv_world, Matrix3::identity(), epsilon = 1e-10);

        // 90 degrees about Z swaps the X and Y principal moments
        let quarter = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let swapped = geom.inertia_world(&quarter);
        assert_relative_eq!(swapped[(0, 0)], geom.inertia_body()[(1, 1)], epsilon = 1e-10);
        assert_relative_eq!(swapped[(1, 1)], geom.inertia_body()[(0, 0)], epsilon = 1e-10);
    }

    #[test]
    fn test_faces_wound_outward() {
        let geom = BoxGeometry::new(1.0, Vector3::new(1.0, 0.5, 0.25)).unwrap();
        let v = geom.vertices();

        for tri in geom.indices().chunks(3) {
            let (a, b, c) = (v[tri[0] as usize], v[tri[1] as usize], v[tri[2] as usize]);
            let normal = (b - a).cross(&(c - a));
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(&centroid) > 0.0, "triangle {tri:?} faces inward");
        }
    }

    #[test]
    fn test_world_vertices() {
        let geom = BoxGeometry::cube(1.0, 0.5).unwrap();
        let position = Point3::new(10.0, 0.0, 0.0);
        let rotation = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);

        let world = geom.world_vertices(&position, &rotation);
        // (+0.5, -0.5, -0.5) rotated 90 degrees about Z is (+0.5, +0.5, -0.5)
        assert_relative_eq!(world[1], Point3::new(10.5, 0.5, -0.5), epsilon = 1e-12);
        assert_eq!(geom.world_vertex(1, &position, &rotation), Some(world[1]));
        assert!(geom.world_vertex(8, &position, &rotation).is_none());
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(BoxGeometry::new(0.0, Vector3::repeat(1.0)).is_err());
        assert!(BoxGeometry::new(-1.0, Vector3::repeat(1.0)).is_err());
        assert!(BoxGeometry::new(f64::NAN, Vector3::repeat(1.0)).is_err());
        assert!(BoxGeometry::new(1.0, Vector3::new(1.0, 0.0, 1.0)).is_err());
        assert!(BoxGeometry::new(1.0, Vector3::new(1.0, 1.0, f64::INFINITY)).is_err());
    }

    #[test]
    fn test_colors() {
        let geom = BoxGeometry::cube(1.0, 1.0).unwrap();
        assert_eq!(geom.colors().len(), VERTEX_COUNT);
        assert_eq!(geom.colors()[0], BoxGeometry::DEFAULT_COLOR);

        let red = geom.with_color([1.0, 0.0, 0.0]);
        assert!(red.colors().iter().all(|c| *c == [1.0, 0.0, 0.0]));
    }
}
