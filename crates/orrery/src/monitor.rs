//! Conservation and finiteness monitoring.
//!
//! The integrator never checks its own outputs on the hot path; callers
//! watch for blow-up and numerical drift through these observers between
//! steps.

use orrery_math::Vec3;
use orrery_model::{Model, State};

/// Whether positions, velocities, and the state Jacobian are all finite.
///
/// A NaN or infinity anywhere means a step diverged (typically a
/// collision-grade close encounter); the state is unrecoverable.
pub fn all_finite(state: &State) -> bool {
    state.x.iter().all(|x| x.iter().all(|c| c.is_finite()))
        && state.v.iter().all(|v| v.iter().all(|c| c.is_finite()))
        && state.jac_step.iter().all(|c| c.is_finite())
}

/// Total kinetic energy: Σ ½ mᵢ vᵢ².
pub fn kinetic_energy(model: &Model, state: &State) -> f64 {
    let mut ke = 0.0;
    for i in 0..state.n() {
        ke += 0.5 * model.mass(i) * state.v[i].norm_squared();
    }
    ke
}

/// Total gravitational potential energy: −Σ_{i<j} G mᵢ mⱼ / rᵢⱼ.
pub fn potential_energy(model: &Model, state: &State) -> f64 {
    let n = state.n();
    let mut pe = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let r = (state.x[i] - state.x[j]).norm();
            pe -= model.g * model.mass(i) * model.mass(j) / r;
        }
    }
    pe
}

/// Total mechanical energy.
pub fn total_energy(model: &Model, state: &State) -> f64 {
    kinetic_energy(model, state) + potential_energy(model, state)
}

/// Total linear momentum: Σ mᵢ vᵢ.
pub fn total_momentum(model: &Model, state: &State) -> Vec3 {
    let mut p = Vec3::zeros();
    for i in 0..state.n() {
        p += model.mass(i) * state.v[i];
    }
    p
}

/// Total angular momentum about the origin: Σ rᵢ × mᵢvᵢ.
pub fn total_angular_momentum(model: &Model, state: &State) -> Vec3 {
    let mut l = Vec3::zeros();
    for i in 0..state.n() {
        l += state.x[i].cross(&(model.mass(i) * state.v[i]));
    }
    l
}

/// Baseline conserved quantities, captured at the start of a run.
#[derive(Debug, Clone)]
pub struct ConservationBaseline {
    pub energy: f64,
    pub momentum: Vec3,
    pub angular_momentum: Vec3,
}

impl ConservationBaseline {
    pub fn new(model: &Model, state: &State) -> Self {
        Self {
            energy: total_energy(model, state),
            momentum: total_momentum(model, state),
            angular_momentum: total_angular_momentum(model, state),
        }
    }
}

/// Drift of the conserved quantities against a baseline.
#[derive(Debug, Clone)]
pub struct ConservationReport {
    /// Relative energy error |E − E₀| / |E₀|.
    pub energy_error: f64,
    /// Absolute momentum drift.
    pub momentum_error: Vec3,
    /// Absolute angular momentum drift.
    pub angular_momentum_error: Vec3,
}

impl ConservationReport {
    pub fn check(baseline: &ConservationBaseline, model: &Model, state: &State) -> Self {
        let energy = total_energy(model, state);
        let energy_error = if baseline.energy.abs() > 1e-12 {
            (energy - baseline.energy).abs() / baseline.energy.abs()
        } else {
            (energy - baseline.energy).abs()
        };
        Self {
            energy_error,
            momentum_error: total_momentum(model, state) - baseline.momentum,
            angular_momentum_error: total_angular_momentum(model, state)
                - baseline.angular_momentum,
        }
    }

    /// Whether any drift exceeds its tolerance.
    pub fn is_violated(&self, energy_tol: f64, momentum_tol: f64, ang_momentum_tol: f64) -> bool {
        self.energy_error > energy_tol
            || self.momentum_error.norm() > momentum_tol
            || self.angular_momentum_error.norm() > ang_momentum_tol
    }
}
