//! G-functions of the universal Kepler formulation and their β-partials.
//!
//! With s the universal anomaly and β = 2k/r₀ − v₀² the energy parameter,
//! the G-functions are the entire series
//!
//! ```text
//! Gn(s, β) = sⁿ · Σ_{j≥0} (−β s²)ʲ / (n + 2j)!
//! ```
//!
//! which reduce to trigonometric forms for β > 0 (G1 = sin γ/√β, ...) and
//! hyperbolic forms for β < 0, with γ = √|β|·s. Above |γ| = 0.5 the
//! closed half-angle forms are exact and cheap; below it the subtractive
//! combinations (G3 and the β-partials) lose precision, so they switch to
//! power series evaluated to convergence. The β = 0 parabolic limit falls
//! in the series branch and terminates after the leading term, so neither
//! regime needs a special case.
//!
//! The auxiliaries are the combinations the analytic step Jacobian
//! consumes:
//!
//! ```text
//! H1 = ∂G1/∂β = (s·G0 − G1)/(2β)      H5 = s·G0 − G1
//! H2 = ∂G2/∂β = (s·G1 − 2G2)/(2β)     H6 = s·G1 − 2G2
//! H3 = ∂G3/∂β = (s·G2 − 3G3)/(2β)     H7 = s·G2 − 3G3
//! H4 = ∂G0/∂β = −s·G1/2               H8 = s − G1 = β·G3
//! ```

/// Switch point between the series and half-angle evaluations, in |γ|.
const GAMMA_SERIES_CUTOFF: f64 = 0.5;

/// G-functions and auxiliaries at one (s, β) point.
#[derive(Debug, Clone, Copy, Default)]
pub struct GFns {
    pub g0: f64,
    pub g1: f64,
    pub g2: f64,
    pub g3: f64,
    /// ∂G1/∂β at fixed s.
    pub h1: f64,
    /// ∂G2/∂β at fixed s.
    pub h2: f64,
    /// ∂G3/∂β at fixed s.
    pub h3: f64,
    /// ∂G0/∂β at fixed s.
    pub h4: f64,
    /// s·G0 − G1.
    pub h5: f64,
    /// s·G1 − 2·G2.
    pub h6: f64,
    /// s·G2 − 3·G3.
    pub h7: f64,
    /// s − G1 (= β·G3).
    pub h8: f64,
}

impl GFns {
    /// Evaluate at universal anomaly `s` and energy parameter `beta`.
    pub fn eval(s: f64, beta: f64) -> Self {
        let sqb = beta.abs().sqrt();
        let gamma = sqb * s;
        if gamma.abs() < GAMMA_SERIES_CUTOFF {
            Self::eval_series(s, beta)
        } else {
            Self::eval_closed(s, beta, sqb, gamma)
        }
    }

    /// Half-angle closed forms; exact for any γ, subtractive below the
    /// cutoff.
    fn eval_closed(s: f64, beta: f64, sqb: f64, gamma: f64) -> Self {
        let sb = if beta < 0.0 { -1.0 } else { 1.0 };
        let xh = 0.5 * gamma;
        // sin/cos for bound pairs, sinh/cosh for unbound ones.
        let (sx, cx) = if sb > 0.0 {
            xh.sin_cos()
        } else {
            (xh.sinh(), xh.cosh())
        };

        let g0 = cx * cx - sb * sx * sx;
        let g1 = 2.0 * sx * cx / sqb;
        // 1 − cos γ = 2 sin²(γ/2); the half-angle square is exact.
        let g2 = 2.0 * sx * sx * sb / beta;
        let g3 = (s - g1) / beta;

        let h5 = s * g0 - g1;
        let h6 = s * g1 - 2.0 * g2;
        let h7 = s * g2 - 3.0 * g3;
        let h8 = s - g1;
        let twob = 2.0 * beta;
        Self {
            g0,
            g1,
            g2,
            g3,
            h1: h5 / twob,
            h2: h6 / twob,
            h3: h7 / twob,
            h4: -0.5 * s * g1,
            h5,
            h6,
            h7,
            h8,
        }
    }

    /// Convergence-checked power series in z = β·s²; covers the small-γ
    /// and parabolic regimes.
    fn eval_series(s: f64, beta: f64) -> Self {
        let eps = f64::EPSILON;
        let s2 = s * s;
        let z = beta * s2;

        // G1..G3: term_{j+1} = term_j · (−z)/((n+2j+1)(n+2j+2)).
        let mut g1 = s;
        let mut t1 = s;
        let mut g2 = 0.5 * s2;
        let mut t2 = g2;
        let mut g3 = s2 * s / 6.0;
        let mut t3 = g3;
        let mut j = 0.0;
        loop {
            t1 *= -z / ((2.0 * j + 2.0) * (2.0 * j + 3.0));
            g1 += t1;
            t2 *= -z / ((2.0 * j + 3.0) * (2.0 * j + 4.0));
            g2 += t2;
            t3 *= -z / ((2.0 * j + 4.0) * (2.0 * j + 5.0));
            g3 += t3;
            j += 1.0;
            if t1.abs() <= eps * g1.abs() && t2.abs() <= eps * g2.abs() && t3.abs() <= eps * g3.abs()
            {
                break;
            }
            if j > 40.0 {
                break;
            }
        }
        let g0 = 1.0 - beta * g2;

        // Hn = −s^(n+2) Σ_{i≥0} (i+1)(−z)^i/(2i+n+2)! for n = 1, 2, 3:
        // term ratio (−z)(i+2)/((i+1)(2i+n+3)(2i+n+4)).
        let s3 = s2 * s;
        let mut h1 = -s3 / 6.0;
        let mut u1 = h1;
        let mut h2 = -s2 * s2 / 24.0;
        let mut u2 = h2;
        let mut h3 = -s3 * s2 / 120.0;
        let mut u3 = h3;
        let mut i = 0.0;
        loop {
            let grow = -z * (i + 2.0) / (i + 1.0);
            u1 *= grow / ((2.0 * i + 4.0) * (2.0 * i + 5.0));
            h1 += u1;
            u2 *= grow / ((2.0 * i + 5.0) * (2.0 * i + 6.0));
            h2 += u2;
            u3 *= grow / ((2.0 * i + 6.0) * (2.0 * i + 7.0));
            h3 += u3;
            i += 1.0;
            if u1.abs() <= eps * h1.abs() && u2.abs() <= eps * h2.abs() && u3.abs() <= eps * h3.abs()
            {
                break;
            }
            if i > 40.0 {
                break;
            }
        }

        Self {
            g0,
            g1,
            g2,
            g3,
            h1,
            h2,
            h3,
            h4: -0.5 * s * g1,
            h5: 2.0 * beta * h1,
            h6: 2.0 * beta * h2,
            h7: 2.0 * beta * h3,
            h8: beta * g3,
        }
    }
}
