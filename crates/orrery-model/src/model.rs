//! Model definition — static description of a gravitating system.

use crate::{Body, ModelError, Result, State};
use orrery_math::Vec3;

/// Static model: the bodies, their masses, and the gravitational constant.
///
/// Masses are constant through an integration; the state Jacobian still
/// tracks derivatives with respect to them.
#[derive(Debug, Clone)]
pub struct Model {
    /// Bodies, in packed-state order.
    pub bodies: Vec<Body>,
    /// Gravitational constant in whatever unit system the caller chose.
    /// The integrator only ever multiplies by it.
    pub g: f64,
}

impl Model {
    /// Number of bodies.
    pub fn n(&self) -> usize {
        self.bodies.len()
    }

    /// Size of the packed state vector (3 position + 3 velocity + 1 mass
    /// per body).
    pub fn packed_len(&self) -> usize {
        7 * self.bodies.len()
    }

    /// Mass of body `i`.
    #[inline]
    pub fn mass(&self, i: usize) -> f64 {
        self.bodies[i].mass
    }

    /// Create a state at the given Cartesian positions and velocities.
    ///
    /// The state Jacobian starts at the identity and `jac_init` (the
    /// user-coordinate change of basis) is the identity as well; callers
    /// with hierarchical coordinates substitute their own `jac_init`.
    pub fn state_from_cartesian(&self, x: &[Vec3], v: &[Vec3]) -> Result<State> {
        if x.len() != self.n() || v.len() != self.n() {
            return Err(ModelError::BodyCountMismatch {
                got: x.len().min(v.len()),
                expected: self.n(),
            });
        }
        Ok(State::new(self, x, v))
    }
}

/// Builder for constructing models.
pub struct ModelBuilder {
    bodies: Vec<Body>,
    g: f64,
}

impl ModelBuilder {
    /// Start building a new model with G = 1 (natural units).
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            g: 1.0,
        }
    }

    /// Set the gravitational constant.
    pub fn gravitational_constant(mut self, g: f64) -> Self {
        self.g = g;
        self
    }

    /// Add a named point mass.
    pub fn add_body(mut self, name: &str, mass: f64) -> Self {
        self.bodies.push(Body::new(name, mass));
        self
    }

    /// Build the model, validating body count and masses.
    pub fn build(self) -> Result<Model> {
        if self.bodies.len() < 2 {
            return Err(ModelError::TooFewBodies(self.bodies.len()));
        }
        if !(self.g > 0.0) {
            return Err(ModelError::NonPositiveG(self.g));
        }
        for body in &self.bodies {
            if body.mass < 0.0 {
                return Err(ModelError::NegativeMass {
                    name: body.name.clone(),
                    mass: body.mass,
                });
            }
        }
        Ok(Model {
            bodies: self.bodies,
            g: self.g,
        })
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_two_bodies() {
        let model = ModelBuilder::new()
            .add_body("star", 1.0)
            .add_body("planet", 1e-3)
            .build()
            .unwrap();
        assert_eq!(model.n(), 2);
        assert_eq!(model.packed_len(), 14);
        assert_eq!(model.bodies[0].name, "star");
    }

    #[test]
    fn test_builder_rejects_single_body() {
        let err = ModelBuilder::new().add_body("lonely", 1.0).build();
        assert!(matches!(err, Err(ModelError::TooFewBodies(1))));
    }

    #[test]
    fn test_builder_rejects_negative_mass() {
        let err = ModelBuilder::new()
            .add_body("a", 1.0)
            .add_body("b", -0.5)
            .build();
        assert!(matches!(err, Err(ModelError::NegativeMass { .. })));
    }
}
