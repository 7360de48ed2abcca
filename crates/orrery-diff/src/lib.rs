//! Finite-difference reference derivatives.
//!
//! Central differences through the no-gradient step, used to validate
//! the analytic Jacobian and time-derivative propagation. Slow (two step
//! evaluations per packed input) and noisy (O(eps²) truncation), which
//! is exactly what makes them an independent check.

use orrery_math::{DMat, DVec, Vec3};
use orrery_model::{Model, PairMatrix, State};
use orrery_step::step;

/// One perturbed step: returns the packed (x, v, m) state after a single
/// AH18 step from a perturbed copy of `(model, state)`.
fn perturbed_step(
    model: &Model,
    state: &State,
    h: f64,
    pair: &PairMatrix,
    input: usize,
    delta: f64,
) -> DVec {
    let mut m2 = model.clone();
    let mut s2 = state.clone();
    let body = input / 7;
    match input % 7 {
        p @ 0..=2 => s2.x[body][p] += delta,
        p @ 3..=5 => s2.v[body][p - 3] += delta,
        _ => m2.bodies[body].mass += delta,
    }
    step(&m2, &mut s2, h, pair);
    s2.pack(&m2)
}

/// Central-difference Jacobian of one step with respect to every packed
/// input (positions, velocities, masses).
pub fn finite_diff_step_jacobian(
    model: &Model,
    state: &State,
    h: f64,
    pair: &PairMatrix,
    eps: f64,
) -> DMat {
    let p = model.packed_len();
    let mut jac = DMat::zeros(p, p);
    for col in 0..p {
        let plus = perturbed_step(model, state, h, pair, col, eps);
        let minus = perturbed_step(model, state, h, pair, col, -eps);
        let inv_2eps = 1.0 / (2.0 * eps);
        jac.set_column(col, &((plus - minus) * inv_2eps));
    }
    jac
}

/// Central-difference derivative of one step with respect to the step
/// size.
pub fn finite_diff_step_dqdt(
    model: &Model,
    state: &State,
    h: f64,
    pair: &PairMatrix,
    eps: f64,
) -> DVec {
    let mut sp = state.clone();
    step(model, &mut sp, h + eps, pair);
    let mut sm = state.clone();
    step(model, &mut sm, h - eps, pair);
    (sp.pack(model) - sm.pack(model)) / (2.0 * eps)
}

/// A deterministic hierarchical three-body setup shared by tests and
/// benches: tight inner pair plus a distant perturber.
pub fn three_body_fixture() -> (Model, State, PairMatrix) {
    let model = orrery_model::ModelBuilder::new()
        .add_body("primary", 1.0)
        .add_body("inner", 3e-4)
        .add_body("outer", 1e-3)
        .build()
        .unwrap();
    let x = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.2, 0.0, 0.01),
        Vec3::new(2.5, 0.3, -0.05),
    ];
    let v = vec![
        Vec3::new(0.0, -0.002, 0.0),
        Vec3::new(0.05, 2.23, 0.0),
        Vec3::new(-0.02, 0.63, 0.004),
    ];
    let state = model.state_from_cartesian(&x, &v).unwrap();
    let pair = PairMatrix::all_kepler(3);
    (model, state, pair)
}
