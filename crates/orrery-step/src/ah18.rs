//! The AH18 step: symmetric composition and gradient accumulation.

use crate::{drift, kepler_drift, kick, phi, Derivatives};
use orrery_math::{comp_sum, comp_sum_mat, DMat, DVec};
use orrery_model::state::{pos_index, vel_index};
use orrery_model::{Model, PairMatrix, State};

/// Advance one AH18 step; positions, velocities, and their compensated
/// companions only.
pub fn step(model: &Model, state: &mut State, h: f64, pair: &PairMatrix) {
    let h2 = 0.5 * h;
    let h6 = h / 6.0;
    let n = state.n();

    drift::drift(state, h2);
    kick::kick(model, state, h6, pair);
    for i in 0..n - 1 {
        for j in (i + 1)..n {
            if !pair.is_kick(i, j) {
                kepler_drift::kepler_drift(model, state, i, j, h2, true);
            }
        }
    }
    phi::phic(model, state, h, pair);
    phi::phialpha(model, state, h, 2.0, pair);
    // Reversed pair ordering: this is what makes the composition
    // time-symmetric.
    for i in (0..n - 1).rev() {
        for j in ((i + 1)..n).rev() {
            if !pair.is_kick(i, j) {
                kepler_drift::kepler_drift(model, state, i, j, h2, false);
            }
        }
    }
    kick::kick(model, state, h6, pair);
    drift::drift(state, h2);
}

/// Advance one AH18 step, propagating the global Jacobian.
pub fn step_with_jacobian(
    model: &Model,
    state: &mut State,
    d: &mut Derivatives,
    h: f64,
    pair: &PairMatrix,
) {
    step_grad(model, state, d, h, pair, false);
}

/// Advance one AH18 step, propagating the global Jacobian and the
/// derivative of the state with respect to the step size.
pub fn step_with_derivatives(
    model: &Model,
    state: &mut State,
    d: &mut Derivatives,
    h: f64,
    pair: &PairMatrix,
) {
    step_grad(model, state, d, h, pair, true);
}

fn step_grad(
    model: &Model,
    state: &mut State,
    d: &mut Derivatives,
    h: f64,
    pair: &PairMatrix,
    with_dqdt: bool,
) {
    let h2 = 0.5 * h;
    let h6 = h / 6.0;
    let n = state.n();

    if with_dqdt {
        state.dqdt.fill(0.0);
        state.dqdt_err.fill(0.0);
    }

    drift::drift_grad(state, h2);
    if with_dqdt {
        drift_dqdt(state, h2);
    }

    kick::kick_grad(model, state, d, h6, pair);
    if with_dqdt {
        operator_dqdt(state, &d.jac_kick, &d.dqdt_kick, 1.0 / 6.0, &mut d.tmp7n);
    }
    fold_delta(state, &d.jac_kick, &mut d.jac_copy);

    for i in 0..n - 1 {
        for j in (i + 1)..n {
            if !pair.is_kick(i, j) {
                kepler_drift::kepler_drift_grad(model, state, d, i, j, h2, true);
                if with_dqdt {
                    pair_dqdt(state, d, i, j, 0.5);
                }
                fold_pair(state, d, i, j);
            }
        }
    }

    d.jac_phi.fill(0.0);
    d.dqdt_phi.fill(0.0);
    phi::phic_grad(model, state, d, h, pair);
    phi::phialpha_grad(model, state, d, h, 2.0, pair);
    if with_dqdt {
        // dqdt_phi is already per unit of the full step.
        operator_dqdt(state, &d.jac_phi, &d.dqdt_phi, 1.0, &mut d.tmp7n);
    }
    fold_delta(state, &d.jac_phi, &mut d.jac_copy);

    for i in (0..n - 1).rev() {
        for j in ((i + 1)..n).rev() {
            if !pair.is_kick(i, j) {
                kepler_drift::kepler_drift_grad(model, state, d, i, j, h2, false);
                if with_dqdt {
                    pair_dqdt(state, d, i, j, 0.5);
                }
                fold_pair(state, d, i, j);
            }
        }
    }

    kick::kick_grad(model, state, d, h6, pair);
    if with_dqdt {
        operator_dqdt(state, &d.jac_kick, &d.dqdt_kick, 1.0 / 6.0, &mut d.tmp7n);
    }
    fold_delta(state, &d.jac_kick, &mut d.jac_copy);

    drift::drift_grad(state, h2);
    if with_dqdt {
        drift_dqdt(state, h2);
    }
}

/// Drift contribution to ∂/∂h: the substep is h/2, so
/// dqdt[pos] += ½·v + (h/2)·dqdt[vel].
fn drift_dqdt(state: &mut State, h2: f64) {
    for i in 0..state.n() {
        for k in 0..3 {
            let add = 0.5 * state.v[i][k] + h2 * state.dqdt[vel_index(i, k)];
            let row = pos_index(i, k);
            comp_sum(&mut state.dqdt[row], &mut state.dqdt_err[row], add);
        }
    }
}

/// Propagate ∂/∂h through one global operator:
/// dqdt ← dqdt + delta·dqdt + scale·local.
fn operator_dqdt(state: &mut State, delta: &DMat, local: &DVec, scale: f64, tmp: &mut DVec) {
    delta.mul_to(&state.dqdt, tmp);
    for r in 0..tmp.len() {
        comp_sum(
            &mut state.dqdt[r],
            &mut state.dqdt_err[r],
            tmp[r] + scale * local[r],
        );
    }
}

/// Propagate ∂/∂h through one pair operator: the i- and j-blocks gain
/// (jac_ij − I)·previous + scale·dqdt_ij.
fn pair_dqdt(state: &mut State, d: &mut Derivatives, i: usize, j: usize, scale: f64) {
    for a in 0..7 {
        d.dqdt_tmp1[a] = state.dqdt[7 * i + a];
        d.dqdt_tmp1[7 + a] = state.dqdt[7 * j + a];
    }
    for r in 0..14 {
        let mut acc = scale * d.dqdt_ij[r];
        for c in 0..14 {
            let w = d.jac_ij[(r, c)] - if r == c { 1.0 } else { 0.0 };
            acc += w * d.dqdt_tmp1[c];
        }
        d.tmp14[r] = acc;
    }
    for a in 0..7 {
        comp_sum(
            &mut state.dqdt[7 * i + a],
            &mut state.dqdt_err[7 * i + a],
            d.tmp14[a],
        );
        comp_sum(
            &mut state.dqdt[7 * j + a],
            &mut state.dqdt_err[7 * j + a],
            d.tmp14[7 + a],
        );
    }
}

/// Fold a full-size local delta (identity omitted) into the global
/// Jacobian: jac_step ← (I + delta)·jac_step, as a multiply into scratch
/// followed by a compensated matrix add.
fn fold_delta(state: &mut State, delta: &DMat, copy: &mut DMat) {
    delta.mul_to(&state.jac_step, copy);
    comp_sum_mat(&mut state.jac_step, &mut state.jac_err, copy);
}

/// Fold one pair's 14×14 local Jacobian into the 14 affected rows of the
/// global one: copy out rows and residuals, multiply by (jac_ij − I),
/// compensated-add, copy back.
fn fold_pair(state: &mut State, d: &mut Derivatives, i: usize, j: usize) {
    let cols = state.jac_step.ncols();
    for c in 0..cols {
        for a in 0..7 {
            d.jac_tmp1[(a, c)] = state.jac_step[(7 * i + a, c)];
            d.jac_tmp1[(7 + a, c)] = state.jac_step[(7 * j + a, c)];
            d.jac_err1[(a, c)] = state.jac_err[(7 * i + a, c)];
            d.jac_err1[(7 + a, c)] = state.jac_err[(7 * j + a, c)];
        }
    }
    for c in 0..cols {
        for r in 0..14 {
            let mut acc = 0.0;
            for m in 0..14 {
                let w = d.jac_ij[(r, m)] - if r == m { 1.0 } else { 0.0 };
                acc += w * d.jac_tmp1[(m, c)];
            }
            d.jac_tmp2[(r, c)] = acc;
        }
    }
    for c in 0..cols {
        for a in 0..14 {
            comp_sum(
                &mut d.jac_tmp1[(a, c)],
                &mut d.jac_err1[(a, c)],
                d.jac_tmp2[(a, c)],
            );
        }
        for a in 0..7 {
            state.jac_step[(7 * i + a, c)] = d.jac_tmp1[(a, c)];
            state.jac_step[(7 * j + a, c)] = d.jac_tmp1[(7 + a, c)];
            state.jac_err[(7 * i + a, c)] = d.jac_err1[(a, c)];
            state.jac_err[(7 * j + a, c)] = d.jac_err1[(7 + a, c)];
        }
    }
}
