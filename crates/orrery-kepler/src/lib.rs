//! Universal-variable two-body kernel.
//!
//! Advances relative Keplerian motion by one step in all conic regimes
//! (elliptic, parabolic, hyperbolic) through one analytic form, and
//! differentiates the advance in closed form with respect to the initial
//! relative state, the reduced mass, and the step size.
//!
//! The kernel solves for the universal anomaly `s` (equivalently
//! γ = √|β|·s) with a Newton iteration seeded from a cubic initializer,
//! then assembles the drift-compensated Gauss f and g increments. The
//! Jacobian differentiates through the converged anomaly via the implicit
//! Kepler constraint, entirely in the jointly smooth (s, β) variables so
//! that the near-parabolic regime never divides a cancelling numerator by
//! β.

pub mod gfuncs;
pub mod jacobian;
pub mod solve;

pub use gfuncs::GFns;
pub use solve::KeplerAdvance;
