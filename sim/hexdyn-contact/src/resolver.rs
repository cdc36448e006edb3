//! Instantaneous impulse response for detected contacts.
//!
//! For a contact with offset `r` and unit normal `n`:
//!
//! ```text
//! v_in = (v + ω × r) · n
//! k    = 1/m + (r × n) · I_world⁻¹ (r × n)
//! j    = -(1 + e) · v_in / k
//!
//! ΔP = j · n
//! ΔL = r × (j · n)
//! ```
//!
//! Contacts of one step that share a normal are resolved together as one
//! impulse applied at their mean offset `r̄`, then shared equally among them.
//! For a single contact the normal velocity of the contact point after the
//! response is exactly `-e · v_in`. For a face or edge landing without spin,
//! `r̄` removes the approach velocity of every contact in the group at once,
//! so each leaves at `-e · v_in` too. Groups with different normals are
//! computed from the same pre-contact velocities and summed.

use hexdyn_types::{BoxGeometry, Contact, Matrix3, State, StateDerivative, Vector3};
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Impulse applied at one contact.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactImpulse {
    /// The contact this impulse resolves.
    pub contact: Contact,
    /// Normal component of the contact point velocity before the response.
    pub normal_velocity: f64,
    /// Tangential component of the contact point velocity. Not acted on.
    pub tangential_velocity: Vector3<f64>,
    /// Signed impulse magnitude along the contact normal. This contact's
    /// share of the impulse of its normal group.
    pub magnitude: f64,
}

impl ContactImpulse {
    /// Linear impulse `j · n`.
    #[must_use]
    pub fn linear(&self) -> Vector3<f64> {
        self.contact.normal * self.magnitude
    }

    /// Angular impulse `r × (j · n)`.
    #[must_use]
    pub fn angular(&self) -> Vector3<f64> {
        self.contact.offset.cross(&self.linear())
    }

    /// Whether the contact point was moving against the normal.
    #[must_use]
    pub fn is_approaching(&self) -> bool {
        self.normal_velocity < 0.0
    }
}

/// Outcome of resolving a set of contacts.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Resolution {
    /// Pre-step pose with updated momenta.
    pub state: State,
    /// Total change in linear momentum.
    pub linear_impulse: Vector3<f64>,
    /// Total change in angular momentum.
    pub angular_impulse: Vector3<f64>,
    /// Per-contact breakdown. Skipped contacts are absent.
    pub impulses: Vec<ContactImpulse>,
}

impl Resolution {
    /// A resolution that changes nothing.
    #[must_use]
    pub fn unchanged(state: State) -> Self {
        Self {
            state,
            linear_impulse: Vector3::zeros(),
            angular_impulse: Vector3::zeros(),
            impulses: Vec::new(),
        }
    }

    /// Number of contacts that received an impulse.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.impulses.len()
    }
}

/// Frictionless impulse resolver with a single restitution coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseResolver {
    restitution: f64,
}

impl Default for ImpulseResolver {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl ImpulseResolver {
    /// Create a resolver. Restitution is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(restitution: f64) -> Self {
        let clamped = restitution.clamp(0.0, 1.0);
        if !(0.0..=1.0).contains(&restitution) {
            debug!(requested = restitution, used = clamped, "Clamped restitution");
        }
        Self {
            restitution: clamped,
        }
    }

    /// Coefficient of restitution.
    #[must_use]
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Impulse for a single contact given the body's velocities.
    ///
    /// Returns `None` when the effective mass along the normal is not a
    /// finite positive number.
    #[must_use]
    pub fn impulse(
        &self,
        contact: &Contact,
        velocity: &Vector3<f64>,
        angular_velocity: &Vector3<f64>,
        inverse_mass: f64,
        inverse_inertia: &Matrix3<f64>,
    ) -> Option<ContactImpulse> {
        let r = contact.offset;
        let n = contact.normal;

        let point_velocity = velocity + angular_velocity.cross(&r);
        let normal_velocity = point_velocity.dot(&n);
        let tangential_velocity = point_velocity - n * normal_velocity;

        let rn = r.cross(&n);
        let k = inverse_mass + rn.dot(&(inverse_inertia * rn));
        if !k.is_finite() || k <= 0.0 {
            return None;
        }

        let magnitude = -(1.0 + self.restitution) * normal_velocity / k;
        if !magnitude.is_finite() {
            return None;
        }

        Some(ContactImpulse {
            contact: *contact,
            normal_velocity,
            tangential_velocity,
            magnitude,
        })
    }

    /// Resolve all `contacts` against `state`.
    ///
    /// Velocities come from `derivative`, the derivative evaluated at
    /// `state`. The returned state keeps the pose of `state` and carries the
    /// summed group impulses in its momenta.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn resolve(
        &self,
        state: &State,
        derivative: &StateDerivative,
        geometry: &BoxGeometry,
        contacts: &[Contact],
    ) -> Resolution {
        if contacts.is_empty() {
            return Resolution::unchanged(*state);
        }

        let inverse_inertia = geometry.inverse_inertia_world(&state.rotation());
        let velocity = derivative.velocity;
        let angular_velocity = inverse_inertia * state.angular_momentum;

        let mut linear_impulse = Vector3::zeros();
        let mut angular_impulse = Vector3::zeros();
        let mut impulses = Vec::with_capacity(contacts.len());

        for group in group_by_normal(contacts) {
            let count = group.len() as f64;
            let mean_offset = group.iter().map(|c| c.offset).sum::<Vector3<f64>>() / count;
            let combined = Contact::new(mean_offset, group[0].normal);

            let Some(total) = self.impulse(
                &combined,
                &velocity,
                &angular_velocity,
                geometry.inverse_mass(),
                &inverse_inertia,
            ) else {
                warn!(
                    contacts = group.len(),
                    offset = ?combined.offset,
                    normal = ?combined.normal,
                    "Skipping contacts with degenerate effective mass"
                );
                continue;
            };

            linear_impulse += total.linear();
            angular_impulse += total.angular();

            let share = total.magnitude / count;
            for contact in group {
                let point_velocity = velocity + angular_velocity.cross(&contact.offset);
                let normal_velocity = point_velocity.dot(&contact.normal);
                impulses.push(ContactImpulse {
                    contact: *contact,
                    normal_velocity,
                    tangential_velocity: point_velocity - contact.normal * normal_velocity,
                    magnitude: share,
                });
            }
        }

        debug!(
            contacts = contacts.len(),
            resolved = impulses.len(),
            linear = ?linear_impulse,
            angular = ?angular_impulse,
            "Resolved contacts"
        );

        Resolution {
            state: state.with_momenta(
                state.linear_momentum + linear_impulse,
                state.angular_momentum + angular_impulse,
            ),
            linear_impulse,
            angular_impulse,
            impulses,
        }
    }
}

/// Normals closer than this (in `1 - cos θ`) belong to one group.
const NORMAL_GROUP_TOLERANCE: f64 = 1e-9;

/// Split contacts into groups sharing a normal, keeping detection order.
fn group_by_normal(contacts: &[Contact]) -> Vec<Vec<&Contact>> {
    let mut groups: Vec<Vec<&Contact>> = Vec::new();
    for contact in contacts {
        match groups
            .iter_mut()
            .find(|g| g[0].normal.dot(&contact.normal) >= 1.0 - NORMAL_GROUP_TOLERANCE)
        {
            Some(group) => group.push(contact),
            None => groups.push(vec![contact]),
        }
    }
    groups
}
