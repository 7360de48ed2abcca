//! Integration state — mutable per-step data.
//!
//! Packed ordering: body `i` owns rows/columns `7i..7i+7` of the state
//! Jacobian, as 3 position, 3 velocity, 1 mass. Every accumulator that is
//! mutated across steps carries a compensated-summation residual of the
//! same shape; the exact value of an accumulator is `value + residual`.

use crate::Model;
use orrery_math::{DMat, DVec, Vec3};

/// Row/column of position component `k` of body `i` in packed coordinates.
#[inline]
pub fn pos_index(i: usize, k: usize) -> usize {
    7 * i + k
}

/// Row/column of velocity component `k` of body `i` in packed coordinates.
#[inline]
pub fn vel_index(i: usize, k: usize) -> usize {
    7 * i + 3 + k
}

/// Row/column of the mass of body `i` in packed coordinates.
#[inline]
pub fn mass_index(i: usize) -> usize {
    7 * i + 6
}

/// Mutable simulation state.
///
/// Built once from initial conditions and mutated in place by every step.
/// Observers must not inspect it mid-step.
#[derive(Debug, Clone)]
pub struct State {
    /// Positions in an inertial frame.
    pub x: Vec<Vec3>,
    /// Velocities.
    pub v: Vec<Vec3>,
    /// Position round-off residuals.
    pub xerr: Vec<Vec3>,
    /// Velocity round-off residuals.
    pub verr: Vec<Vec3>,
    /// Current time.
    pub t: f64,
    /// Time round-off residual.
    pub t_err: f64,
    /// Accumulated Jacobian of the packed state with respect to its value
    /// at the start of the integration. Identity at construction.
    pub jac_step: DMat,
    /// Round-off residuals of `jac_step`.
    pub jac_err: DMat,
    /// Change of basis from user coordinates; opaque to the integrator.
    pub jac_init: DMat,
    /// Derivative of the packed state with respect to the size of the most
    /// recent step. Zeroed at step entry, filled by the step.
    pub dqdt: DVec,
    /// Round-off residuals of `dqdt`.
    pub dqdt_err: DVec,
    /// Per-body acceleration scratch; contents undefined between
    /// operations.
    pub a: Vec<Vec3>,
}

impl State {
    /// Create a state at the given Cartesian coordinates with an identity
    /// Jacobian. Prefer [`Model::state_from_cartesian`], which validates
    /// lengths.
    pub fn new(model: &Model, x: &[Vec3], v: &[Vec3]) -> Self {
        let n = model.n();
        let p = model.packed_len();
        Self {
            x: x.to_vec(),
            v: v.to_vec(),
            xerr: vec![Vec3::zeros(); n],
            verr: vec![Vec3::zeros(); n],
            t: 0.0,
            t_err: 0.0,
            jac_step: DMat::identity(p, p),
            jac_err: DMat::zeros(p, p),
            jac_init: DMat::identity(p, p),
            dqdt: DVec::zeros(p),
            dqdt_err: DVec::zeros(p),
            a: vec![Vec3::zeros(); n],
        }
    }

    /// Number of bodies.
    pub fn n(&self) -> usize {
        self.x.len()
    }

    /// Pack (x, v, m) into a single flat vector, the coordinate layout of
    /// `jac_step` rows and columns.
    pub fn pack(&self, model: &Model) -> DVec {
        let mut q = DVec::zeros(7 * self.n());
        for i in 0..self.n() {
            for k in 0..3 {
                q[pos_index(i, k)] = self.x[i][k];
                q[vel_index(i, k)] = self.v[i][k];
            }
            q[mass_index(i)] = model.mass(i);
        }
        q
    }

    /// Jacobian of the current packed state with respect to the caller's
    /// original coordinates: `jac_step` composed with the change of
    /// basis recorded at construction.
    pub fn jacobian_in_user_coordinates(&self) -> DMat {
        &self.jac_step * &self.jac_init
    }

    /// Reset the Jacobian, time-derivative, and residual accumulators to
    /// their start-of-integration values, keeping x and v.
    pub fn reset_gradients(&mut self) {
        let p = self.jac_step.nrows();
        self.jac_step = DMat::identity(p, p);
        self.jac_err = DMat::zeros(p, p);
        self.dqdt.fill(0.0);
        self.dqdt_err.fill(0.0);
        for i in 0..self.n() {
            self.xerr[i] = Vec3::zeros();
            self.verr[i] = Vec3::zeros();
        }
        self.t_err = 0.0;
    }
}
