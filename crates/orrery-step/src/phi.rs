//! Fourth-order Φ correctors.
//!
//! Two operators share one pattern: accumulate per-body accelerations
//! over a pair class, then apply pairwise h³-scale impulses built from
//! the acceleration differences.
//!
//! - `phic` covers the flagged (fast-kick) pairs. It also applies the
//!   2h/3 midpoint kick that completes the h/6 + 2h/3 + h/6 Simpson
//!   splitting of the kick for those pairs (the outer h/6 kicks run in
//!   the orchestrator), and the gradient corrector with
//!   fac2 = 3·(aᵢⱼ·rᵢⱼ).
//! - `phialpha` covers the Kepler pairs with
//!   fac2 = α·G(mᵢ+mⱼ)/r + 3·(aᵢⱼ·rᵢⱼ). At α = 2 the extra term cancels
//!   the isolated two-body part of the correction, which the Kepler
//!   solver already integrates exactly, leaving only cross-coupling.
//!
//! Both correctors read positions and masses only, so their local
//! Jacobians commute and accumulate into the one `jac_phi` delta, folded
//! into the global Jacobian once.

use crate::Derivatives;
use orrery_math::{comp_sum_vec3, Vec3};
use orrery_model::state::{mass_index, pos_index, vel_index};
use orrery_model::{Model, PairMatrix, State};

/// Which pair class an operator covers.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PairClass {
    Kick,
    Kepler,
}

impl PairClass {
    #[inline]
    fn selects(self, pair: &PairMatrix, i: usize, j: usize) -> bool {
        match self {
            PairClass::Kick => pair.is_kick(i, j),
            PairClass::Kepler => !pair.is_kick(i, j),
        }
    }
}

/// Φc corrector (flagged pairs), no gradients.
pub fn phic(model: &Model, state: &mut State, h: f64, pair: &PairMatrix) {
    accumulate_accelerations(model, state, PairClass::Kick, pair);
    midpoint_kick(model, state, h, pair);
    corrector(model, state, h, 0.0, PairClass::Kick, pair);
}

/// Φα corrector (Kepler pairs), no gradients.
pub fn phialpha(model: &Model, state: &mut State, h: f64, alpha: f64, pair: &PairMatrix) {
    accumulate_accelerations(model, state, PairClass::Kepler, pair);
    corrector(model, state, h, alpha, PairClass::Kepler, pair);
}

/// Φc with gradients, accumulating into `d.jac_phi` / `d.dqdt_phi`
/// (zeroed by the orchestrator, not here, so Φα can share the fold).
pub fn phic_grad(model: &Model, state: &mut State, d: &mut Derivatives, h: f64, pair: &PairMatrix) {
    accumulate_accelerations_grad(model, state, d, PairClass::Kick, pair);
    midpoint_kick_grad(model, state, d, h, pair);
    corrector_grad(model, state, d, h, 0.0, PairClass::Kick, pair);
}

/// Φα with gradients, accumulating into `d.jac_phi` / `d.dqdt_phi`.
pub fn phialpha_grad(
    model: &Model,
    state: &mut State,
    d: &mut Derivatives,
    h: f64,
    alpha: f64,
    pair: &PairMatrix,
) {
    accumulate_accelerations_grad(model, state, d, PairClass::Kepler, pair);
    corrector_grad(model, state, d, h, alpha, PairClass::Kepler, pair);
}

/// Newtonian accelerations over one pair class into `state.a`.
fn accumulate_accelerations(model: &Model, state: &mut State, class: PairClass, pair: &PairMatrix) {
    let n = state.n();
    for i in 0..n {
        state.a[i] = Vec3::zeros();
    }
    for i in 0..n - 1 {
        for j in (i + 1)..n {
            if !class.selects(pair, i, j) {
                continue;
            }
            let rij = state.x[i] - state.x[j];
            let r2 = rij.norm_squared();
            let r3inv = 1.0 / (r2 * r2.sqrt());
            state.a[i] -= model.g * model.mass(j) * r3inv * rij;
            state.a[j] += model.g * model.mass(i) * r3inv * rij;
        }
    }
}

/// Accelerations plus the dense tensor of their position and mass
/// partials, `d.dadq[(3i+k, 4l+p)] = ∂a_{k,i}/∂q_{p,l}` (p = 3 is mass).
fn accumulate_accelerations_grad(
    model: &Model,
    state: &mut State,
    d: &mut Derivatives,
    class: PairClass,
    pair: &PairMatrix,
) {
    accumulate_accelerations(model, state, class, pair);
    let n = state.n();
    let g = model.g;
    d.dadq.fill(0.0);
    for i in 0..n - 1 {
        for j in (i + 1)..n {
            if !class.selects(pair, i, j) {
                continue;
            }
            let rij = state.x[i] - state.x[j];
            let r2 = rij.norm_squared();
            let r3inv = 1.0 / (r2 * r2.sqrt());
            let r5inv = r3inv / r2;
            let (mi, mj) = (model.mass(i), model.mass(j));
            for k in 0..3 {
                for p in 0..3 {
                    let dkp = if k == p { r3inv } else { 0.0 };
                    let block = dkp - 3.0 * rij[k] * rij[p] * r5inv;
                    d.dadq[(3 * i + k, 4 * i + p)] -= g * mj * block;
                    d.dadq[(3 * i + k, 4 * j + p)] += g * mj * block;
                    d.dadq[(3 * j + k, 4 * i + p)] += g * mi * block;
                    d.dadq[(3 * j + k, 4 * j + p)] -= g * mi * block;
                }
                d.dadq[(3 * i + k, 4 * j + 3)] -= g * rij[k] * r3inv;
                d.dadq[(3 * j + k, 4 * i + 3)] += g * rij[k] * r3inv;
            }
        }
    }
}

/// The 2h/3 midpoint kick over flagged pairs.
fn midpoint_kick(model: &Model, state: &mut State, h: f64, pair: &PairMatrix) {
    crate::kick::kick(model, state, 2.0 * h / 3.0, pair);
}

/// Midpoint kick with its Jacobian and ∂/∂h folded into the Φ deltas.
fn midpoint_kick_grad(
    model: &Model,
    state: &mut State,
    d: &mut Derivatives,
    h: f64,
    pair: &PairMatrix,
) {
    let hk = 2.0 * h / 3.0;
    let n = state.n();
    let g = model.g;
    for i in 0..n - 1 {
        for j in (i + 1)..n {
            if !pair.is_kick(i, j) {
                continue;
            }
            let rij = state.x[i] - state.x[j];
            let r2 = rij.norm_squared();
            let r3inv = 1.0 / (r2 * r2.sqrt());
            let r5inv = r3inv / r2;
            let (mi, mj) = (model.mass(i), model.mass(j));
            for k in 0..3 {
                for p in 0..3 {
                    let dkp = if k == p { r3inv } else { 0.0 };
                    let block = dkp - 3.0 * rij[k] * rij[p] * r5inv;
                    let fi = -hk * g * mj * block;
                    let fj = hk * g * mi * block;
                    d.jac_phi[(vel_index(i, k), pos_index(i, p))] += fi;
                    d.jac_phi[(vel_index(i, k), pos_index(j, p))] -= fi;
                    d.jac_phi[(vel_index(j, k), pos_index(i, p))] += fj;
                    d.jac_phi[(vel_index(j, k), pos_index(j, p))] -= fj;
                }
                d.jac_phi[(vel_index(i, k), mass_index(j))] -= hk * g * rij[k] * r3inv;
                d.jac_phi[(vel_index(j, k), mass_index(i))] += hk * g * rij[k] * r3inv;
                // The kick is linear in h: ∂/∂h is the impulse over h.
                d.dqdt_phi[vel_index(i, k)] -= hk / h * g * mj * rij[k] * r3inv;
                d.dqdt_phi[vel_index(j, k)] += hk / h * g * mi * rij[k] * r3inv;
            }
            let fac = hk * g * r3inv;
            comp_sum_vec3(&mut state.v[i], &mut state.verr[i], -fac * mj * rij);
            comp_sum_vec3(&mut state.v[j], &mut state.verr[j], fac * mi * rij);
        }
    }
}

/// The h³ gradient-corrector impulses over one pair class.
///
/// `aterm` is 0 for Φc and α for Φα.
fn corrector(
    model: &Model,
    state: &mut State,
    h: f64,
    aterm: f64,
    class: PairClass,
    pair: &PairMatrix,
) {
    let n = state.n();
    let coeff = h * h * h * model.g / 36.0;
    for i in 0..n - 1 {
        for j in (i + 1)..n {
            if !class.selects(pair, i, j) {
                continue;
            }
            let (mi, mj) = (model.mass(i), model.mass(j));
            let rij = state.x[i] - state.x[j];
            let aij = state.a[i] - state.a[j];
            let r2 = rij.norm_squared();
            let r = r2.sqrt();
            let fac1 = coeff / (r2 * r2 * r);
            let fac2 = 3.0 * aij.dot(&rij) + aterm * model.g * (mi + mj) / r;
            let f = fac1 * (fac2 * rij - r2 * aij);
            comp_sum_vec3(&mut state.v[i], &mut state.verr[i], mj * f);
            comp_sum_vec3(&mut state.v[j], &mut state.verr[j], -mi * f);
        }
    }
}

/// Corrector impulses with the full Jacobian families: diagonal mass,
/// diagonal position, the δr dot-product terms, and the two
/// acceleration-derivative families that loop over every body through
/// `dadq` and its `dotdadq` contraction.
fn corrector_grad(
    model: &Model,
    state: &mut State,
    d: &mut Derivatives,
    h: f64,
    aterm: f64,
    class: PairClass,
    pair: &PairMatrix,
) {
    let n = state.n();
    let g = model.g;
    let coeff = h * h * h * g / 36.0;
    for i in 0..n - 1 {
        for j in (i + 1)..n {
            if !class.selects(pair, i, j) {
                continue;
            }
            let (mi, mj) = (model.mass(i), model.mass(j));
            let rij = state.x[i] - state.x[j];
            let aij = state.a[i] - state.a[j];
            let r2 = rij.norm_squared();
            let r = r2.sqrt();
            let r5inv = 1.0 / (r2 * r2 * r);
            let fac1 = coeff * r5inv;
            let sdot = aij.dot(&rij);
            let fac2 = 3.0 * sdot + aterm * g * (mi + mj) / r;

            // dotdadq[(p, l)] = Σ_k rij_k · ∂(aᵢ − aⱼ)_k/∂q_{p,l}.
            for l in 0..n {
                for p in 0..4 {
                    let mut dot = 0.0;
                    for k in 0..3 {
                        dot += rij[k]
                            * (d.dadq[(3 * i + k, 4 * l + p)] - d.dadq[(3 * j + k, 4 * l + p)]);
                    }
                    d.dotdadq[(p, l)] = dot;
                }
            }

            for k in 0..3 {
                let fk = fac1 * (fac2 * rij[k] - r2 * aij[k]);
                let row_i = vel_index(i, k);
                let row_j = vel_index(j, k);
                d.jac_phi[(row_i, mass_index(j))] += fk;
                d.jac_phi[(row_j, mass_index(i))] -= fk;
                // The impulse scales as h³, so ∂/∂h = 3·impulse/h.
                d.dqdt_phi[row_i] += 3.0 / h * mj * fk;
                d.dqdt_phi[row_j] -= 3.0 / h * mi * fk;

                for l in 0..n {
                    let sgn = (l == i) as i32 as f64 - (l == j) as i32 as f64;
                    for p in 0..3 {
                        let drij_k = if k == p { sgn } else { 0.0 };
                        let dr2 = 2.0 * rij[p] * sgn;
                        let dfac1 = -5.0 * fac1 * rij[p] * sgn / r2;
                        let daij_k =
                            d.dadq[(3 * i + k, 4 * l + p)] - d.dadq[(3 * j + k, 4 * l + p)];
                        let dsdot = d.dotdadq[(p, l)] + aij[p] * sgn;
                        let dfac2 =
                            3.0 * dsdot - aterm * g * (mi + mj) * rij[p] * sgn / (r2 * r);
                        let df = dfac1 * (fac2 * rij[k] - r2 * aij[k])
                            + fac1
                                * (drij_k * fac2 + rij[k] * dfac2
                                    - dr2 * aij[k]
                                    - r2 * daij_k);
                        d.jac_phi[(row_i, pos_index(l, p))] += mj * df;
                        d.jac_phi[(row_j, pos_index(l, p))] -= mi * df;
                    }
                    // Mass slot: only the acceleration difference and the
                    // α-term see it (plus the explicit factors above).
                    let daij_k = d.dadq[(3 * i + k, 4 * l + 3)] - d.dadq[(3 * j + k, 4 * l + 3)];
                    let dmij = ((l == i) as i32 + (l == j) as i32) as f64;
                    let dfac2 = 3.0 * d.dotdadq[(3, l)] + aterm * g * dmij / r;
                    let df = fac1 * (rij[k] * dfac2 - r2 * daij_k);
                    d.jac_phi[(row_i, mass_index(l))] += mj * df;
                    d.jac_phi[(row_j, mass_index(l))] -= mi * df;
                }
            }

            let f = fac1 * (fac2 * rij - r2 * aij);
            comp_sum_vec3(&mut state.v[i], &mut state.verr[i], mj * f);
            comp_sum_vec3(&mut state.v[j], &mut state.verr[j], -mi * f);
        }
    }
}
