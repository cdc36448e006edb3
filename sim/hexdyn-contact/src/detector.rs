//! Discrete collision detection by sign change over one step.
//!
//! Both tests compare a signed distance at the current state against the
//! same distance at the tentative next state. A contact is reported only
//! when the sign flips, i.e. the feature crossed the obstacle during this
//! step. Grazing or already-penetrating configurations are not contacts.
//!
//! Degenerate geometry (parallel edges, vanishing denominators) is treated
//! as "no contact" rather than an error.

use hexdyn_types::{BoxGeometry, CollisionConfig, Contact, Edge, Plane, Point3, State};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Lengths and denominators below this are treated as degenerate.
pub const DEGENERACY_EPSILON: f64 = 1e-12;

/// Runs the configured collision tests between two states of the body.
///
/// # Example
///
/// ```
/// use hexdyn_contact::CollisionDetector;
/// use hexdyn_types::{BoxGeometry, CollisionConfig, CollisionMode, State};
/// use nalgebra::{Point3, UnitQuaternion};
///
/// let geometry = BoxGeometry::cube(1.0, 0.5).unwrap();
/// let detector = CollisionDetector::new(CollisionConfig {
///     mode: CollisionMode::VertexFace,
///     ..CollisionConfig::default()
/// });
///
/// // Bottom face moves from z = 0.05 to z = -0.05: four corners cross
/// let current = State::at_rest(Point3::new(0.0, 0.0, 0.55), UnitQuaternion::identity());
/// let next = State::at_rest(Point3::new(0.0, 0.0, 0.45), UnitQuaternion::identity());
///
/// let contacts = detector.detect(&geometry, &current, &next);
/// assert_eq!(contacts.len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionDetector {
    config: CollisionConfig,
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}

impl CollisionDetector {
    /// Create a detector for the given scene.
    #[must_use]
    pub fn new(config: CollisionConfig) -> Self {
        Self { config }
    }

    /// The scene this detector tests against.
    #[must_use]
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Find all contacts between `current` and the tentative `next` state.
    ///
    /// Contact offsets are measured from the center of mass of `current`.
    /// An empty list means no contact.
    #[must_use]
    pub fn detect(&self, geometry: &BoxGeometry, current: &State, next: &State) -> Vec<Contact> {
        let mode = self.config.mode;
        if !mode.edge_edge() && !mode.vertex_face() {
            return Vec::new();
        }

        let current_vertices = world_vertices(geometry, current);
        let next_vertices = world_vertices(geometry, next);
        let mut contacts = Vec::new();

        if mode.edge_edge() {
            let [a, b] = self.config.edge_vertices;
            if let (Some(&ca), Some(&cb), Some(&na), Some(&nb)) = (
                current_vertices.get(a),
                current_vertices.get(b),
                next_vertices.get(a),
                next_vertices.get(b),
            ) {
                let current_edge = Edge::from_points(ca, cb);
                let next_edge = Edge::from_points(na, nb);
                contacts.extend(edge_edge_test(
                    &current_edge,
                    &next_edge,
                    &self.config.reference_edge,
                    &current.position,
                ));
            }
        }

        if mode.vertex_face() {
            contacts.extend(vertex_face_test(
                &current_vertices,
                &next_vertices,
                &self.config.ground,
                &current.position,
            ));
        }

        contacts
    }
}

/// World positions of the body's corners at `state`.
#[cfg(not(feature = "parallel"))]
fn world_vertices(geometry: &BoxGeometry, state: &State) -> Vec<Point3<f64>> {
    geometry
        .world_vertices(&state.position, &state.rotation())
        .to_vec()
}

/// World positions of the body's corners at `state`.
#[cfg(feature = "parallel")]
fn world_vertices(geometry: &BoxGeometry, state: &State) -> Vec<Point3<f64>> {
    let rotation = state.rotation();
    geometry
        .vertices()
        .par_iter()
        .map(|v| state.position + rotation * v)
        .collect()
}

/// Whether two signed distances lie on different sides (sign bits differ).
#[must_use]
pub fn crosses(before: f64, after: f64) -> bool {
    before.is_sign_negative() != after.is_sign_negative()
}

/// Edge-edge test between the moving body edge and a fixed reference edge.
///
/// `current` and `next` are the same body edge at the current and tentative
/// states. The common normal is `n = normalize(e × f)` where `e` is the
/// current body edge direction and `f` the reference direction. The
/// closest-approach parameters are
///
/// ```text
/// s =  (r · û) / (e · û),   û = normalize(f × n)
/// t = -(r · ŵ) / (f · ŵ),   ŵ = normalize(e × n)
/// r = reference.point - current.point
/// ```
///
/// A contact requires `s, t ∈ [0, 1]` and a sign change of the distance
/// along `n` between the reference point and the body edge from `current`
/// to `next`. The contact point is `current.point + s·e`, reported relative
/// to `center_of_mass`.
#[must_use]
pub fn edge_edge_test(
    current: &Edge,
    next: &Edge,
    reference: &Edge,
    center_of_mass: &Point3<f64>,
) -> Option<Contact> {
    let e = current.direction;
    let f = reference.direction;

    let n = e.cross(&f).try_normalize(DEGENERACY_EPSILON)?;
    let u = f.cross(&n).try_normalize(DEGENERACY_EPSILON)?;
    let w = e.cross(&n).try_normalize(DEGENERACY_EPSILON)?;

    let r = reference.point - current.point;
    let s = ratio(r.dot(&u), e.dot(&u))?;
    let t = -ratio(r.dot(&w), f.dot(&w))?;

    if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&t) {
        return None;
    }

    let before = (reference.point - current.point).dot(&n);
    let after = (reference.point - next.point).dot(&n);
    if !crosses(before, after) {
        return None;
    }

    Some(Contact::new(current.point_at(s) - center_of_mass, n))
}

/// Vertex-face test of every body vertex against a static plane.
///
/// One contact is reported per vertex whose signed distance to `plane`
/// changes sign between `current` and `next`. The offset is the current
/// vertex position relative to `center_of_mass`; the normal is the plane
/// normal.
#[must_use]
pub fn vertex_face_test(
    current: &[Point3<f64>],
    next: &[Point3<f64>],
    plane: &Plane,
    center_of_mass: &Point3<f64>,
) -> Vec<Contact> {
    current
        .iter()
        .zip(next)
        .filter(|(c, n)| crosses(plane.signed_distance(c), plane.signed_distance(n)))
        .map(|(c, _)| Contact::new(c - center_of_mass, plane.normal.into_inner()))
        .collect()
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator.abs() < DEGENERACY_EPSILON {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hexdyn_types::{CollisionMode, UnitQuaternion, Vector3};

    /// Reference edge along X through the origin, from x = -1 to x = 1.
    fn reference_x() -> Edge {
        Edge::from_points(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0))
    }

    /// Body edge along Y at height `z`, from y = -1 to y = 1.
    fn body_edge_y(z: f64) -> Edge {
        Edge::from_points(Point3::new(0.0, -1.0, z), Point3::new(0.0, 1.0, z))
    }

    #[test]
    fn test_crosses() {
        assert!(crosses(1.0, -1.0));
        assert!(crosses(-0.5, 0.5));
        assert!(!crosses(1.0, 2.0));
        assert!(!crosses(-1.0, -2.0));
        assert!(!crosses(0.0, 1.0));
    }

    #[test]
    fn test_edge_edge_crossing() {
        let com = Point3::new(0.0, 0.0, 1.0);
        let contact = edge_edge_test(&body_edge_y(0.1), &body_edge_y(-0.1), &reference_x(), &com)
            .expect("edges cross during the step");

        // n = normalize((0,2,0) x (2,0,0)) = (0,0,-1); closest point is the middle
        assert_relative_eq!(contact.normal, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
        assert_relative_eq!(contact.offset, Vector3::new(0.0, 0.0, -0.9), epsilon = 1e-12);
    }

    #[test]
    fn test_edge_edge_parameters_off_center() {
        // Body edge from y = -3 to y = 1 and reference from x = -0.5 to x = 1.5:
        // closest points at s = 0.75 along the body edge and t = 0.25 along the reference
        let current = Edge::from_points(Point3::new(0.0, -3.0, 0.2), Point3::new(0.0, 1.0, 0.2));
        let next = Edge::from_points(Point3::new(0.0, -3.0, -0.2), Point3::new(0.0, 1.0, -0.2));
        let reference = Edge::from_points(Point3::new(-0.5, 0.0, 0.0), Point3::new(1.5, 0.0, 0.0));

        let contact = edge_edge_test(&current, &next, &reference, &Point3::origin()).unwrap();
        assert_relative_eq!(contact.offset, Vector3::new(0.0, 0.0, 0.2), epsilon = 1e-12);
    }

    #[test]
    fn test_edge_edge_no_sign_change() {
        // Body edge moves down but stays above the reference edge
        let contact = edge_edge_test(
            &body_edge_y(0.3),
            &body_edge_y(0.1),
            &reference_x(),
            &Point3::origin(),
        );
        assert!(contact.is_none());
    }

    #[test]
    fn test_edge_edge_outside_segment() {
        // The infinite lines still cross, but the closest point on the
        // reference segment would be at t = -1
        let reference = Edge::from_points(Point3::new(2.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0));
        let contact = edge_edge_test(&body_edge_y(0.1), &body_edge_y(-0.1), &reference, &Point3::origin());
        assert!(contact.is_none());

        // And past the end of the body edge: s = 4
        let short = Edge::from_points(Point3::new(0.0, -4.0, 0.1), Point3::new(0.0, -3.0, 0.1));
        let short_next = Edge::from_points(Point3::new(0.0, -4.0, -0.1), Point3::new(0.0, -3.0, -0.1));
        assert!(edge_edge_test(&short, &short_next, &reference_x(), &Point3::origin()).is_none());
    }

    #[test]
    fn test_edge_edge_parallel_is_degenerate() {
        let current = Edge::from_points(Point3::new(-1.0, 0.0, 0.1), Point3::new(1.0, 0.0, 0.1));
        let next = Edge::from_points(Point3::new(-1.0, 0.0, -0.1), Point3::new(1.0, 0.0, -0.1));
        assert!(edge_edge_test(&current, &next, &reference_x(), &Point3::origin()).is_none());

        let collapsed = Edge::new(Point3::new(0.0, 0.0, 0.1), Vector3::zeros());
        assert!(edge_edge_test(&collapsed, &collapsed, &reference_x(), &Point3::origin()).is_none());
    }

    #[test]
    fn test_vertex_face_reports_only_crossing_vertices() {
        let ground = Plane::ground(0.0);
        let current = [
            Point3::new(0.0, 0.0, 0.05),
            Point3::new(1.0, 0.0, 0.5),
            Point3::new(2.0, 0.0, -0.5),
        ];
        let next = [
            Point3::new(0.0, 0.0, -0.05),
            Point3::new(1.0, 0.0, 0.4),
            Point3::new(2.0, 0.0, -0.6),
        ];
        let com = Point3::new(0.0, 0.0, 1.0);

        let contacts = vertex_face_test(&current, &next, &ground, &com);
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].offset, Vector3::new(0.0, 0.0, -0.95), epsilon = 1e-12);
        assert_eq!(contacts[0].normal, Vector3::z());
    }

    #[test]
    fn test_vertex_face_no_contact() {
        let ground = Plane::ground(0.0);
        let current = [Point3::new(0.0, 0.0, 1.0)];
        let next = [Point3::new(0.0, 0.0, 0.5)];
        assert!(vertex_face_test(&current, &next, &ground, &Point3::origin()).is_empty());
    }

    #[test]
    fn test_detector_single_corner() {
        // Cube balanced on a corner: only vertex 0 points straight down
        let geometry = BoxGeometry::cube(1.0, 0.5).unwrap();
        let corner = Vector3::new(-1.0, -1.0, -1.0);
        let rotation = UnitQuaternion::rotation_between(&corner, &-Vector3::z()).unwrap();
        let half_diagonal = 0.5 * 3.0_f64.sqrt();

        let current = State::at_rest(Point3::new(0.0, 0.0, half_diagonal + 0.01), rotation);
        let next = State::at_rest(Point3::new(0.0, 0.0, half_diagonal - 0.01), rotation);

        let detector = CollisionDetector::new(CollisionConfig {
            mode: CollisionMode::VertexFace,
            ..CollisionConfig::default()
        });
        let contacts = detector.detect(&geometry, &current, &next);

        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(
            contacts[0].offset,
            Vector3::new(0.0, 0.0, -half_diagonal),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_detector_edge_edge_uses_configured_vertices() {
        // Vertices 2 and 3 of a unit cube form the edge y = +0.5, z = -0.5
        let geometry = BoxGeometry::cube(1.0, 0.5).unwrap();
        let reference = Edge::from_points(Point3::new(0.0, -1.0, 0.0), Point3::new(0.0, 2.0, 0.0));
        let detector = CollisionDetector::new(CollisionConfig {
            mode: CollisionMode::EdgeEdge,
            reference_edge: reference,
            ground: Plane::ground(-10.0),
            ..CollisionConfig::default()
        });

        // Edge passes from z = 0.05 to z = -0.05 over the reference edge
        let current = State::at_rest(Point3::new(0.0, 0.0, 0.55), UnitQuaternion::identity());
        let next = State::at_rest(Point3::new(0.0, 0.0, 0.45), UnitQuaternion::identity());

        let contacts = detector.detect(&geometry, &current, &next);
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].offset, Vector3::new(0.0, 0.5, -0.5), epsilon = 1e-12);
        assert_relative_eq!(contacts[0].normal.norm(), 1.0, epsilon = 1e-12);

        // Ground is far below, so merging both tests adds nothing
        let both = CollisionDetector::new(CollisionConfig {
            mode: CollisionMode::Both,
            ..*detector.config()
        });
        assert_eq!(both.detect(&geometry, &current, &next), contacts);
    }

    #[test]
    fn test_detector_disabled() {
        let geometry = BoxGeometry::cube(1.0, 0.5).unwrap();
        let detector = CollisionDetector::new(CollisionConfig {
            mode: CollisionMode::Disabled,
            ..CollisionConfig::default()
        });
        let current = State::at_rest(Point3::new(0.0, 0.0, 0.55), UnitQuaternion::identity());
        let next = State::at_rest(Point3::new(0.0, 0.0, -5.0), UnitQuaternion::identity());
        assert!(detector.detect(&geometry, &current, &next).is_empty());
    }
}
