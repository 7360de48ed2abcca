//! AH18 symplectic step operators with analytic gradients.
//!
//! One step composes, symmetrically in time:
//!
//! ```text
//! Drift(h/2) · Kick(h/6) · [KeplerDrift_ij(h/2), i<j ascending]
//!            · Φc(h) · Φα(h, α=2)
//!            · [KeplerDrift_ij(h/2), reversed order]
//!            · Kick(h/6) · Drift(h/2)
//! ```
//!
//! The reversed pair ordering in the second half makes the composition
//! time-reversible; every operator folds its local Jacobian into the
//! global one with compensated accumulation, so the propagated Jacobian
//! shares the integrator's round-off behavior.

pub mod ah18;
pub mod derivatives;
pub mod drift;
pub mod kepler_drift;
pub mod kick;
pub mod phi;

pub use ah18::{step, step_with_derivatives, step_with_jacobian};
pub use derivatives::Derivatives;
