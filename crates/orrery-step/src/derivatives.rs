//! Per-step gradient scratch, allocated once per integration run.

use orrery_math::{DMat, DVec, Mat6x8, Vec6};

/// Caller-owned scratch for the gradient-propagating step variants.
///
/// Nothing here survives a step with defined contents; the step zeroes
/// what it reads. Keeping the buffers out of `State` lets the cheap
/// no-gradient step run without touching any of this memory.
#[derive(Debug, Clone)]
pub struct Derivatives {
    /// Fast-kick local Jacobian, identity omitted (7n×7n).
    pub jac_kick: DMat,
    /// Φ-corrector local Jacobian, identity omitted (7n×7n).
    pub jac_phi: DMat,
    /// One pair's Kepler-drift local Jacobian, identity included (14×14).
    pub jac_ij: DMat,
    /// Full-size matrix-multiply scratch (7n×7n).
    pub jac_copy: DMat,
    /// The 14 pair rows of the global Jacobian, copied out (14×7n).
    pub jac_tmp1: DMat,
    /// Product scratch for the pair fold (14×7n).
    pub jac_tmp2: DMat,
    /// Residual companions of the copied pair rows (14×7n).
    pub jac_err1: DMat,
    /// Two-body increment Jacobian (6×8).
    pub jac_kepler: Mat6x8,
    /// Two-body mass derivative ∂Δ/∂k − Δ/k.
    pub jac_mass: Vec6,
    /// Fast-kick ∂/∂(substep) (7n).
    pub dqdt_kick: DVec,
    /// Φ-corrector ∂/∂h (7n).
    pub dqdt_phi: DVec,
    /// One pair's ∂/∂(substep) (14).
    pub dqdt_ij: DVec,
    /// Pair d/dt gather scratch (14).
    pub dqdt_tmp1: DVec,
    /// Pair d/dt increment scratch (14).
    pub tmp14: DVec,
    /// Full-size vector scratch (7n).
    pub tmp7n: DVec,
    /// ∂a_{k,i}/∂(position p | mass) of body l, dense (3n × 4n);
    /// row 3i+k, column 4l+p with p = 3 the mass slot.
    pub dadq: DMat,
    /// Per-pair contraction Σ_k rij_k·(∂a_i − ∂a_j)_k (4 × n).
    pub dotdadq: DMat,
}

impl Derivatives {
    /// Allocate scratch for `n` bodies.
    pub fn new(n: usize) -> Self {
        let p = 7 * n;
        Self {
            jac_kick: DMat::zeros(p, p),
            jac_phi: DMat::zeros(p, p),
            jac_ij: DMat::zeros(14, 14),
            jac_copy: DMat::zeros(p, p),
            jac_tmp1: DMat::zeros(14, p),
            jac_tmp2: DMat::zeros(14, p),
            jac_err1: DMat::zeros(14, p),
            jac_kepler: Mat6x8::zeros(),
            jac_mass: Vec6::zeros(),
            dqdt_kick: DVec::zeros(p),
            dqdt_phi: DVec::zeros(p),
            dqdt_ij: DVec::zeros(14),
            dqdt_tmp1: DVec::zeros(14),
            tmp14: DVec::zeros(14),
            tmp7n: DVec::zeros(p),
            dadq: DMat::zeros(3 * n, 4 * n),
            dotdadq: DMat::zeros(4, n),
        }
    }
}
