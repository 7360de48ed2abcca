//! Kepler-drift pair operator.
//!
//! Converts the relative two-body increment Δ(x, v) into absolute updates
//! on bodies i and j with the mass-weighted split μᵢ = mᵢ/M, μⱼ = mⱼ/M,
//! and builds the 14×14 local Jacobian over the pair's packed coordinates
//! (body i in slots 0..6, body j in 7..13; 3 position, 3 velocity, 1
//! mass each).
//!
//! The mass columns never touch the raw k-column of the increment
//! Jacobian: the μ weighting nearly cancels it, so they are assembled
//! from the separately returned `jac_mass = ∂Δ/∂k − Δ/k`, for which the
//! cancellation has been done analytically.

use crate::Derivatives;
use orrery_math::comp_sum_vec3;
use orrery_model::{Model, State};
use orrery_kepler::KeplerAdvance;

/// Advance pair (i, j) by the Kepler-minus-drift operator, no gradients.
pub fn kepler_drift(
    model: &Model,
    state: &mut State,
    i: usize,
    j: usize,
    h: f64,
    drift_first: bool,
) {
    let k = model.g * (model.mass(i) + model.mass(j));
    if k == 0.0 {
        return;
    }
    let x0 = state.x[i] - state.x[j];
    let v0 = state.v[i] - state.v[j];
    let adv = KeplerAdvance::solve(x0, v0, k, h, drift_first);
    apply(model, state, i, j, &adv);
}

/// Advance pair (i, j) and fill `d.jac_kepler`, `d.jac_mass`,
/// `d.jac_ij`, and `d.dqdt_ij`.
pub fn kepler_drift_grad(
    model: &Model,
    state: &mut State,
    d: &mut Derivatives,
    i: usize,
    j: usize,
    h: f64,
    drift_first: bool,
) {
    let k = model.g * (model.mass(i) + model.mass(j));
    if k == 0.0 {
        // Identity operator: make the local Jacobian reflect that.
        d.jac_ij.fill(0.0);
        d.jac_ij.fill_diagonal(1.0);
        d.dqdt_ij.fill(0.0);
        return;
    }
    let x0 = state.x[i] - state.x[j];
    let v0 = state.v[i] - state.v[j];
    let adv = KeplerAdvance::solve(x0, v0, k, h, drift_first);
    let (jk, jm) = adv.jacobian();
    d.jac_kepler = jk;
    d.jac_mass = jm;

    let (mi, mj) = (model.mass(i), model.mass(j));
    let mtot = mi + mj;
    let (mu_i, mu_j) = (mi / mtot, mj / mtot);

    d.jac_ij.fill(0.0);
    d.jac_ij.fill_diagonal(1.0);
    // State blocks: the relative increment enters body i with weight μⱼ
    // and body j with weight −μᵢ; the relative coordinates differentiate
    // with +1 on body i's slots and −1 on body j's.
    for a in 0..6 {
        for b in 0..3 {
            let jx = jk[(a, b)];
            let jv = jk[(a, 3 + b)];
            d.jac_ij[(a, b)] += mu_j * jx;
            d.jac_ij[(a, 3 + b)] += mu_j * jv;
            d.jac_ij[(a, 7 + b)] -= mu_j * jx;
            d.jac_ij[(a, 10 + b)] -= mu_j * jv;
            d.jac_ij[(7 + a, b)] -= mu_i * jx;
            d.jac_ij[(7 + a, 3 + b)] -= mu_i * jv;
            d.jac_ij[(7 + a, 7 + b)] += mu_i * jx;
            d.jac_ij[(7 + a, 10 + b)] += mu_i * jv;
        }
    }
    // Mass columns 6 (mᵢ) and 13 (mⱼ), from jac_mass and the increment.
    let gmj = model.g * mu_j;
    let gmi = model.g * mu_i;
    for a in 0..6 {
        d.jac_ij[(a, 6)] += gmj * jm[a];
        d.jac_ij[(a, 13)] += adv.delxv[a] / mtot + gmj * jm[a];
        d.jac_ij[(7 + a, 6)] -= adv.delxv[a] / mtot + gmi * jm[a];
        d.jac_ij[(7 + a, 13)] -= gmi * jm[a];
    }
    // ∂/∂(substep) from the h-column.
    for a in 0..6 {
        d.dqdt_ij[a] = mu_j * jk[(a, 7)];
        d.dqdt_ij[7 + a] = -mu_i * jk[(a, 7)];
    }
    d.dqdt_ij[6] = 0.0;
    d.dqdt_ij[13] = 0.0;

    apply(model, state, i, j, &adv);
}

/// Fold the relative increment into the absolute states, compensated.
fn apply(model: &Model, state: &mut State, i: usize, j: usize, adv: &KeplerAdvance) {
    let mtot = model.mass(i) + model.mass(j);
    let mu_i = model.mass(i) / mtot;
    let mu_j = model.mass(j) / mtot;
    let dx = adv.dx();
    let dv = adv.dv();
    comp_sum_vec3(&mut state.x[i], &mut state.xerr[i], mu_j * dx);
    comp_sum_vec3(&mut state.x[j], &mut state.xerr[j], -mu_i * dx);
    comp_sum_vec3(&mut state.v[i], &mut state.verr[i], mu_j * dv);
    comp_sum_vec3(&mut state.v[j], &mut state.verr[j], -mu_i * dv);
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_math::Vec3;
    use orrery_model::ModelBuilder;

    fn setup() -> (Model, State) {
        let model = ModelBuilder::new()
            .add_body("a", 1.0)
            .add_body("b", 0.4)
            .build()
            .unwrap();
        let x = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.1, -0.05)];
        let v = vec![Vec3::new(0.0, -0.2, 0.0), Vec3::new(0.05, 0.9, 0.1)];
        let state = model.state_from_cartesian(&x, &v).unwrap();
        (model, state)
    }

    #[test]
    fn test_center_of_mass_fixed() {
        let (model, mut state) = setup();
        let com_before = model.mass(0) * state.x[0] + model.mass(1) * state.x[1];
        let mom_before = model.mass(0) * state.v[0] + model.mass(1) * state.v[1];
        kepler_drift(&model, &mut state, 0, 1, 0.1, true);
        let com_after = model.mass(0) * state.x[0] + model.mass(1) * state.x[1];
        let mom_after = model.mass(0) * state.v[0] + model.mass(1) * state.v[1];
        assert!((com_after - com_before).norm() < 1e-15);
        assert!((mom_after - mom_before).norm() < 1e-15);
    }

    /// The 14×14 local Jacobian against finite differences of the
    /// applied operator, including the mass columns.
    #[test]
    fn test_jac_ij_matches_finite_difference() {
        let (model, state) = setup();
        let h = 0.12;
        for &drift_first in &[true, false] {
            let mut d = Derivatives::new(2);
            let mut s_grad = state.clone();
            kepler_drift_grad(&model, &mut s_grad, &mut d, 0, 1, h, drift_first);

            let eps = 1e-7;
            let run = |dm: [f64; 2], dx: [Vec3; 2], dv: [Vec3; 2]| -> Vec<f64> {
                let mut m2 = model.clone();
                m2.bodies[0].mass += dm[0];
                m2.bodies[1].mass += dm[1];
                let mut s2 = state.clone();
                for b in 0..2 {
                    s2.x[b] += dx[b];
                    s2.v[b] += dv[b];
                }
                kepler_drift(&m2, &mut s2, 0, 1, h, drift_first);
                let mut out = Vec::with_capacity(14);
                for b in 0..2 {
                    for k in 0..3 {
                        out.push(s2.x[b][k]);
                    }
                    for k in 0..3 {
                        out.push(s2.v[b][k]);
                    }
                    out.push(m2.bodies[b].mass);
                }
                out
            };
            let zero = [Vec3::zeros(), Vec3::zeros()];
            for col in 0..14 {
                let body = col / 7;
                let slot = col % 7;
                let mut dm = [0.0, 0.0];
                let mut dx = zero;
                let mut dv = zero;
                match slot {
                    0..=2 => dx[body][slot] = eps,
                    3..=5 => dv[body][slot - 3] = eps,
                    _ => dm[body] = eps,
                }
                let plus = run(dm, dx, dv);
                let mut dmn = [0.0, 0.0];
                let mut dxn = zero;
                let mut dvn = zero;
                match slot {
                    0..=2 => dxn[body][slot] = -eps,
                    3..=5 => dvn[body][slot - 3] = -eps,
                    _ => dmn[body] = -eps,
                }
                let minus = run(dmn, dxn, dvn);
                for row in 0..14 {
                    let fd = (plus[row] - minus[row]) / (2.0 * eps);
                    let an = d.jac_ij[(row, col)];
                    assert!(
                        (an - fd).abs() < 5e-6 * (1.0 + fd.abs()),
                        "row {row} col {col} drift_first {drift_first}: {an} vs {fd}"
                    );
                }
            }
        }
    }

    /// dqdt_ij equals the finite difference of the operator over its
    /// substep.
    #[test]
    fn test_dqdt_ij_matches_finite_difference() {
        let (model, state) = setup();
        let h = 0.12;
        let mut d = Derivatives::new(2);
        let mut s_grad = state.clone();
        kepler_drift_grad(&model, &mut s_grad, &mut d, 0, 1, h, true);

        let eps = 1e-7;
        let mut sp = state.clone();
        kepler_drift(&model, &mut sp, 0, 1, h + eps, true);
        let mut sm = state.clone();
        kepler_drift(&model, &mut sm, 0, 1, h - eps, true);
        for b in 0..2 {
            for k in 0..3 {
                let fdx = (sp.x[b][k] - sm.x[b][k]) / (2.0 * eps);
                let fdv = (sp.v[b][k] - sm.v[b][k]) / (2.0 * eps);
                assert!((d.dqdt_ij[7 * b + k] - fdx).abs() < 1e-6 * (1.0 + fdx.abs()));
                assert!((d.dqdt_ij[7 * b + 3 + k] - fdv).abs() < 1e-6 * (1.0 + fdv.abs()));
            }
        }
    }

    #[test]
    fn test_massless_pair_is_identity() {
        let model = ModelBuilder::new()
            .add_body("a", 0.0)
            .add_body("b", 0.0)
            .build()
            .unwrap();
        let x = vec![Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)];
        let v = vec![Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0)];
        let mut state = model.state_from_cartesian(&x, &v).unwrap();
        let mut d = Derivatives::new(2);
        kepler_drift_grad(&model, &mut state, &mut d, 0, 1, 0.1, true);
        assert_eq!(state.x[1][0], 1.0);
        assert_eq!(state.v[1][1], 1.0);
        assert_eq!(d.jac_ij, orrery_math::DMat::identity(14, 14));
    }
}
