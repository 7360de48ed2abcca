//! orrery — differentiable symplectic N-body integration.
//!
//! This is the umbrella crate: it owns the `Solver` trait and the
//! fixed-step driver, and re-exports the core types from the sub-crates.
//!
//! ```
//! use orrery::{Ah18, Integrator, ModelBuilder, PairMatrix};
//! use orrery::math::Vec3;
//!
//! let model = ModelBuilder::new()
//!     .add_body("star", 1.0)
//!     .add_body("planet", 1e-3)
//!     .build()
//!     .unwrap();
//! let x = vec![Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)];
//! let v = vec![Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0)];
//! let mut state = model.state_from_cartesian(&x, &v).unwrap();
//! let pair = PairMatrix::all_kepler(2);
//!
//! let driver = Integrator::new(0.05, 0.0, 5.0).unwrap();
//! driver.integrate(&Ah18, &model, &mut state, &pair);
//! assert!(orrery::monitor::all_finite(&state));
//! ```

pub mod monitor;

pub use orrery_math as math;
pub use orrery_model::{Body, Model, ModelBuilder, ModelError, PairMatrix, State};
pub use orrery_kepler as kepler;
pub use orrery_step::Derivatives;

use orrery_math::comp_sum;

/// Pluggable step scheme.
///
/// Implementations advance the state by one step of size `h`; the
/// gradient variants additionally propagate the global Jacobian, and
/// `step_with_derivatives` also maintains the derivative of the state
/// with respect to the step size.
pub trait Solver {
    /// Advance positions and velocities only.
    fn step(&self, model: &Model, state: &mut State, h: f64, pair: &PairMatrix);

    /// Advance and propagate the state Jacobian.
    fn step_with_jacobian(
        &self,
        model: &Model,
        state: &mut State,
        d: &mut Derivatives,
        h: f64,
        pair: &PairMatrix,
    );

    /// Advance, propagate the Jacobian, and maintain d(state)/dh.
    ///
    /// There is deliberately no cheaper d/dt-only variant: the
    /// Jacobian-propagating step owns the authoritative d/dt semantics,
    /// so callers that only need `State::dqdt` use this and ignore the
    /// Jacobian.
    fn step_with_derivatives(
        &self,
        model: &Model,
        state: &mut State,
        d: &mut Derivatives,
        h: f64,
        pair: &PairMatrix,
    );
}

/// The fourth-order time-reversible AH18 operator split.
pub struct Ah18;

impl Solver for Ah18 {
    fn step(&self, model: &Model, state: &mut State, h: f64, pair: &PairMatrix) {
        orrery_step::step(model, state, h, pair);
    }

    fn step_with_jacobian(
        &self,
        model: &Model,
        state: &mut State,
        d: &mut Derivatives,
        h: f64,
        pair: &PairMatrix,
    ) {
        orrery_step::step_with_jacobian(model, state, d, h, pair);
    }

    fn step_with_derivatives(
        &self,
        model: &Model,
        state: &mut State,
        d: &mut Derivatives,
        h: f64,
        pair: &PairMatrix,
    ) {
        orrery_step::step_with_derivatives(model, state, d, h, pair);
    }
}

/// Fixed-step integration driver.
///
/// Runs ⌊(tmax − t0)/h⌋ full steps and one final partial step covering
/// the remainder, folding step sizes into the state clock with
/// compensated summation so the clock does not drift against the steps.
#[derive(Debug, Clone, Copy)]
pub struct Integrator {
    pub h: f64,
    pub t0: f64,
    pub tmax: f64,
}

impl Integrator {
    /// Validate and build a driver.
    pub fn new(h: f64, t0: f64, tmax: f64) -> Result<Self, ModelError> {
        if h == 0.0 || !h.is_finite() {
            return Err(ModelError::BadStep(h));
        }
        if (tmax - t0) / h <= 0.0 {
            return Err(ModelError::EmptySpan { t0, tmax, h });
        }
        Ok(Self { h, t0, tmax })
    }

    /// Number of full steps in the span.
    pub fn nsteps(&self) -> usize {
        ((self.tmax - self.t0) / self.h).floor() as usize
    }

    /// Size of the final partial step (zero if the span divides evenly).
    pub fn remainder(&self) -> f64 {
        self.tmax - (self.t0 + self.nsteps() as f64 * self.h)
    }

    /// Integrate without gradients.
    pub fn integrate<S: Solver>(
        &self,
        solver: &S,
        model: &Model,
        state: &mut State,
        pair: &PairMatrix,
    ) {
        self.run(state, |state, h| solver.step(model, state, h, pair));
    }

    /// Integrate, propagating the state Jacobian through every step.
    pub fn integrate_with_jacobian<S: Solver>(
        &self,
        solver: &S,
        model: &Model,
        state: &mut State,
        d: &mut Derivatives,
        pair: &PairMatrix,
    ) {
        self.run(state, |state, h| {
            solver.step_with_jacobian(model, state, d, h, pair)
        });
    }

    fn run(&self, state: &mut State, mut one: impl FnMut(&mut State, f64)) {
        state.t = self.t0;
        state.t_err = 0.0;
        for _ in 0..self.nsteps() {
            one(state, self.h);
            comp_sum(&mut state.t, &mut state.t_err, self.h);
        }
        let rem = self.remainder();
        if rem != 0.0 {
            one(state, rem);
            comp_sum(&mut state.t, &mut state.t_err, rem);
        }
    }
}
