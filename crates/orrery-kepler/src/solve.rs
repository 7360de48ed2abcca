//! Universal Kepler solver for the drift-compensated two-body advance.
//!
//! Solves r₀·G1 + η·G2 + k·G3 = h for the universal anomaly and returns
//! the increment Δ(x, v) of the Kepler-minus-drift operator:
//!
//! - `drift_first`: the advance is evaluated at the backward-drifted
//!   separation X = x₀ − h·v₀, and Δx = (f−1)·X + (g−h)·v₀.
//! - otherwise: the advance runs first and the compensating drift uses
//!   the post-advance velocity, Δx = (f−1−h·ḟ)·x₀ + (g−h·ġ)·v₀.
//!
//! Both shapes keep every coefficient proportional to k, so a massless
//! pair (k = 0) is an exact no-op, and substitute the Kepler equation
//! into g−h = −k·G3 so the increment never subtracts two large numbers.

use crate::GFns;
use orrery_math::{Vec3, Vec6};

/// Newton iteration cap. Termination normally happens much earlier, on a
/// bitwise fixed point; hitting the cap fails open with the last iterate.
const NEWTON_MAX_ITER: usize = 20;

/// One converged two-body advance, with the intermediates the analytic
/// Jacobian reuses.
#[derive(Debug, Clone)]
pub struct KeplerAdvance {
    /// Increment (Δx, Δv) of the Kepler-minus-drift operator.
    pub delxv: Vec6,
    /// Whether the compensating drift ran before the advance.
    pub drift_first: bool,
    /// Original relative position.
    pub x0: Vec3,
    /// Separation the solver actually used (x₀, or x₀ − h·v₀).
    pub xd: Vec3,
    /// Relative velocity.
    pub v0: Vec3,
    /// Reduced mass G·(mᵢ+mⱼ); zero marks a degenerate (no-op) advance.
    pub k: f64,
    /// Step size.
    pub h: f64,
    pub r0: f64,
    pub eta: f64,
    pub beta: f64,
    pub zeta: f64,
    /// Converged universal anomaly.
    pub s: f64,
    /// γ = √|β|·s.
    pub gamma: f64,
    /// Radius at the end of the advance.
    pub r: f64,
    /// G-functions at the converged anomaly.
    pub gf: GFns,
    /// Newton iterations consumed.
    pub iters: usize,
    /// Whether the iteration reached a fixed point before the cap.
    pub converged: bool,
}

impl KeplerAdvance {
    /// Solve the universal Kepler equation and assemble the increment.
    pub fn solve(x0: Vec3, v0: Vec3, k: f64, h: f64, drift_first: bool) -> Self {
        if k == 0.0 {
            return Self::degenerate(x0, v0, h, drift_first);
        }

        let xd = if drift_first { x0 - h * v0 } else { x0 };
        let r0 = xd.norm();
        let r0inv = 1.0 / r0;
        let v2 = v0.norm_squared();
        let beta = 2.0 * k * r0inv - v2;
        let eta = xd.dot(&v0);
        let zeta = k - r0 * beta;

        let mut s = initial_guess(r0, eta, zeta, h);
        let mut s_prev = f64::INFINITY;
        let mut gf = GFns::eval(s, beta);
        let mut r = r0 * gf.g0 + eta * gf.g1 + k * gf.g2;
        let mut iters = 0;
        let mut converged = false;
        while iters < NEWTON_MAX_ITER {
            iters += 1;
            let resid = r0 * gf.g1 + eta * gf.g2 + k * gf.g3 - h;
            let s_next = s - resid / r;
            if !s_next.is_finite() {
                break;
            }
            // Fixed point at working precision, guarding against a
            // two-cycle between adjacent representable values.
            if s_next == s || s_next == s_prev {
                converged = true;
                s = s_next;
                gf = GFns::eval(s, beta);
                r = r0 * gf.g0 + eta * gf.g1 + k * gf.g2;
                break;
            }
            s_prev = s;
            s = s_next;
            gf = GFns::eval(s, beta);
            r = r0 * gf.g0 + eta * gf.g1 + k * gf.g2;
        }

        let rinv = 1.0 / r;
        let sqb = beta.abs().sqrt();
        let gamma = sqb * s;

        // Gauss f and g coefficients of the drift-compensated increment.
        let (cx, cv) = if drift_first {
            (-k * gf.g2 * r0inv, -k * gf.g3)
        } else {
            (
                -k * r0inv * (gf.g2 - h * gf.g1 * rinv),
                -k * (gf.g3 - h * gf.g2 * rinv),
            )
        };
        let fdot = -k * gf.g1 * rinv * r0inv;
        let gdm1 = -k * gf.g2 * rinv;

        let dx = cx * xd + cv * v0;
        let dv = fdot * xd + gdm1 * v0;
        let delxv = Vec6::new(dx[0], dx[1], dx[2], dv[0], dv[1], dv[2]);

        Self {
            delxv,
            drift_first,
            x0,
            xd,
            v0,
            k,
            h,
            r0,
            eta,
            beta,
            zeta,
            s,
            gamma,
            r,
            gf,
            iters,
            converged,
        }
    }

    /// k = 0: the relative motion is inertial and already covered by the
    /// global drift, so the increment is exactly zero.
    fn degenerate(x0: Vec3, v0: Vec3, h: f64, drift_first: bool) -> Self {
        Self {
            delxv: Vec6::zeros(),
            drift_first,
            x0,
            xd: x0,
            v0,
            k: 0.0,
            h,
            r0: x0.norm(),
            eta: 0.0,
            beta: 0.0,
            zeta: 0.0,
            s: 0.0,
            gamma: 0.0,
            r: x0.norm(),
            gf: GFns::default(),
            iters: 0,
            converged: true,
        }
    }

    /// Δx part of the increment.
    pub fn dx(&self) -> Vec3 {
        Vec3::new(self.delxv[0], self.delxv[1], self.delxv[2])
    }

    /// Δv part of the increment.
    pub fn dv(&self) -> Vec3 {
        Vec3::new(self.delxv[3], self.delxv[4], self.delxv[5])
    }
}

/// Initial anomaly guess.
///
/// Truncating the Kepler equation at third order (and folding the cubic
/// term of G1 into ζ) gives ζs³ + 3ηs² + 6r₀s − 6h = 0, whose real root
/// seeds Newton. Degenerate leading coefficients fall back to the stable
/// quadratic root and then to the linear estimate h/r₀.
fn initial_guess(r0: f64, eta: f64, zeta: f64, h: f64) -> f64 {
    if zeta != 0.0 {
        cubic_real_root(3.0 * eta / zeta, 6.0 * r0 / zeta, -6.0 * h / zeta)
    } else if eta != 0.0 {
        // ηs² + 2r₀s − 2h = 0, rationalized so the √ never cancels.
        let disc = r0 * r0 + 2.0 * eta * h;
        if disc > 0.0 {
            2.0 * h / (r0 + disc.sqrt())
        } else {
            h / r0
        }
    } else {
        h / r0
    }
}

/// Real root of s³ + a₂s² + a₁s + a₀ (Cardano / trigonometric forms).
fn cubic_real_root(a2: f64, a1: f64, a0: f64) -> f64 {
    let q = (a2 * a2 - 3.0 * a1) / 9.0;
    let r = (2.0 * a2 * a2 * a2 - 9.0 * a2 * a1 + 27.0 * a0) / 54.0;
    let r2 = r * r;
    let q3 = q * q * q;
    if r2 < q3 {
        // Three real roots; the principal one serves as the seed.
        let theta = (r / q3.sqrt()).acos();
        -2.0 * q.sqrt() * (theta / 3.0).cos() - a2 / 3.0
    } else {
        let a = -r.signum() * (r.abs() + (r2 - q3).sqrt()).cbrt();
        let b = if a != 0.0 { q / a } else { 0.0 };
        a + b - a2 / 3.0
    }
}
