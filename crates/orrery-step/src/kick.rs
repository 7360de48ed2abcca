//! Fast kick: pairwise 1/r³ impulses for flagged pairs.

use crate::Derivatives;
use orrery_math::comp_sum_vec3;
use orrery_model::state::{mass_index, pos_index, vel_index};
use orrery_model::{Model, PairMatrix, State};

/// Apply the fast kick over flagged pairs: vᵢ −= hk·G·mⱼ·rᵢⱼ/r³ and the
/// mirrored impulse on j, compensated.
pub fn kick(model: &Model, state: &mut State, hk: f64, pair: &PairMatrix) {
    let n = state.n();
    for i in 0..n - 1 {
        for j in (i + 1)..n {
            if !pair.is_kick(i, j) {
                continue;
            }
            let rij = state.x[i] - state.x[j];
            let r2 = rij.norm_squared();
            let r3inv = 1.0 / (r2 * r2.sqrt());
            let fac = hk * model.g * r3inv;
            comp_sum_vec3(
                &mut state.v[i],
                &mut state.verr[i],
                -fac * model.mass(j) * rij,
            );
            comp_sum_vec3(
                &mut state.v[j],
                &mut state.verr[j],
                fac * model.mass(i) * rij,
            );
        }
    }
}

/// Fast kick with gradients.
///
/// Zeroes and fills `d.jac_kick` (identity omitted; only velocity rows
/// are populated) and `d.dqdt_kick` (the impulse per unit substep, i.e.
/// the derivative with respect to `hk`; the orchestrator rescales it to
/// the full step).
pub fn kick_grad(
    model: &Model,
    state: &mut State,
    d: &mut Derivatives,
    hk: f64,
    pair: &PairMatrix,
) {
    d.jac_kick.fill(0.0);
    d.dqdt_kick.fill(0.0);
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

            // d(rij/r³)/dx: the 1/r³ diagonal and the −3 r⊗r/r⁵ dyad.
            for k in 0..3 {
                for p in 0..3 {
                    let dkp = if k == p { r3inv } else { 0.0 };
                    let block = dkp - 3.0 * rij[k] * rij[p] * r5inv;
                    let fi = -hk * g * mj * block;
                    let fj = hk * g * mi * block;
                    d.jac_kick[(vel_index(i, k), pos_index(i, p))] += fi;
                    d.jac_kick[(vel_index(i, k), pos_index(j, p))] -= fi;
                    d.jac_kick[(vel_index(j, k), pos_index(i, p))] += fj;
                    d.jac_kick[(vel_index(j, k), pos_index(j, p))] -= fj;
                }
                // Cross-mass columns: the impulse scales with the other
                // body's mass.
                d.jac_kick[(vel_index(i, k), mass_index(j))] -= hk * g * rij[k] * r3inv;
                d.jac_kick[(vel_index(j, k), mass_index(i))] += hk * g * rij[k] * r3inv;
                d.dqdt_kick[vel_index(i, k)] -= g * mj * rij[k] * r3inv;
                d.dqdt_kick[vel_index(j, k)] += g * mi * rij[k] * r3inv;
            }

            let fac = hk * g * r3inv;
            comp_sum_vec3(&mut state.v[i], &mut state.verr[i], -fac * mj * rij);
            comp_sum_vec3(&mut state.v[j], &mut state.verr[j], fac * mi * rij);
        }
    }
}
