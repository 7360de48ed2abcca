//! Error types for orrery-model.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("a gravitating system needs at least two bodies, got {0}")]
    TooFewBodies(usize),

    #[error("body {name:?} has negative mass {mass}")]
    NegativeMass { name: String, mass: f64 },

    #[error("gravitational constant must be positive, got {0}")]
    NonPositiveG(f64),

    #[error("pair matrix entry ({0}, {1}) is not symmetric")]
    AsymmetricPair(usize, usize),

    #[error("pair matrix is {rows}x{cols}, expected {n}x{n}")]
    PairShape { rows: usize, cols: usize, n: usize },

    #[error("state has {got} bodies, model has {expected}")]
    BodyCountMismatch { got: usize, expected: usize },

    #[error("integration span [{t0}, {tmax}] is empty or inverted for step {h}")]
    EmptySpan { t0: f64, tmax: f64, h: f64 },

    #[error("step size must be nonzero and finite, got {0}")]
    BadStep(f64),
}

pub type Result<T> = std::result::Result<T, ModelError>;
