//! Integration tests for the AH18 integrator.

use orrery::math::{DVec, Vec3};
use orrery::monitor::{all_finite, total_energy, total_momentum, ConservationBaseline};
use orrery::{Ah18, Derivatives, Integrator, Model, ModelBuilder, PairMatrix, State};
use orrery_diff::three_body_fixture;
use orrery_step::{step, step_with_jacobian};

fn two_body() -> (Model, State) {
    let model = ModelBuilder::new()
        .add_body("star", 1.0)
        .add_body("planet", 1e-3)
        .build()
        .unwrap();
    let x = vec![Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)];
    let v = vec![Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0)];
    let state = model.state_from_cartesian(&x, &v).unwrap();
    (model, state)
}

fn hierarchical_three_body() -> (Model, State) {
    let (model, state, _) = three_body_fixture();
    (model, state)
}

/// Orbital period of the two-body relative orbit.
fn relative_period(model: &Model, state: &State) -> f64 {
    let k = model.g * (model.mass(0) + model.mass(1));
    let r0 = (state.x[1] - state.x[0]).norm();
    let v2 = (state.v[1] - state.v[0]).norm_squared();
    let beta = 2.0 * k / r0 - v2;
    2.0 * std::f64::consts::PI * k / beta.powf(1.5)
}

/// Seeded scenario: the relative orbit closes after one period and the
/// state Jacobian of the symplectic map has unit determinant.
#[test]
fn test_two_body_orbit_closes_after_one_period() {
    let (model, mut state) = two_body();
    let period = relative_period(&model, &state);
    let pair = PairMatrix::all_kepler(2);
    let mut d = Derivatives::new(2);

    let x_rel0 = state.x[1] - state.x[0];
    let v_rel0 = state.v[1] - state.v[0];

    let driver = Integrator::new(0.05, 0.0, period).unwrap();
    driver.integrate_with_jacobian(&Ah18, &model, &mut state, &mut d, &pair);

    let x_rel = state.x[1] - state.x[0];
    let v_rel = state.v[1] - state.v[0];
    assert!(
        (x_rel - x_rel0).norm() < 1e-10,
        "relative orbit failed to close: {:e}",
        (x_rel - x_rel0).norm()
    );
    assert!((v_rel - v_rel0).norm() < 1e-10);

    let det = state.jac_step.clone().determinant();
    assert!(
        (det - 1.0).abs() < 1e-10,
        "Jacobian determinant drifted: {det}"
    );
    assert!(all_finite(&state));
}

/// Stepping forward then backward returns state and Jacobian.
#[test]
fn test_time_reversibility() {
    let (model, state0) = hierarchical_three_body();
    let mut pair = PairMatrix::all_kepler(3);
    pair.set_kick(1, 2, true);
    let h = 0.02;

    let mut state = state0.clone();
    let mut d = Derivatives::new(3);
    for _ in 0..10 {
        step_with_jacobian(&model, &mut state, &mut d, h, &pair);
    }
    for _ in 0..10 {
        step_with_jacobian(&model, &mut state, &mut d, -h, &pair);
    }

    for i in 0..3 {
        assert!(
            (state.x[i] - state0.x[i]).norm() < 1e-12,
            "body {i} position did not return"
        );
        assert!((state.v[i] - state0.v[i]).norm() < 1e-12);
    }
    // The Jacobian of the round trip is the identity.
    let p = model.packed_len();
    for r in 0..p {
        for c in 0..p {
            let expect = if r == c { 1.0 } else { 0.0 };
            assert!(
                (state.jac_step[(r, c)] - expect).abs() < 1e-8,
                "round-trip jac[({r},{c})] = {}",
                state.jac_step[(r, c)]
            );
        }
    }
}

/// The accumulated Jacobian over several steps against a central finite
/// difference of the multi-step map.
#[test]
fn test_multistep_jacobian_matches_finite_difference() {
    let (model, state0) = hierarchical_three_body();
    let mut pair = PairMatrix::all_kepler(3);
    pair.set_kick(1, 2, true);
    let h = 0.02;
    let nstep = 3;

    let mut state = state0.clone();
    let mut d = Derivatives::new(3);
    for _ in 0..nstep {
        step_with_jacobian(&model, &mut state, &mut d, h, &pair);
    }

    let run = |input: usize, delta: f64| -> DVec {
        let mut m2 = model.clone();
        let mut s2 = state0.clone();
        let body = input / 7;
        match input % 7 {
            p @ 0..=2 => s2.x[body][p] += delta,
            p @ 3..=5 => s2.v[body][p - 3] += delta,
            _ => m2.bodies[body].mass += delta,
        }
        for _ in 0..nstep {
            step(&m2, &mut s2, h, &pair);
        }
        s2.pack(&m2)
    };

    let eps = 1e-6;
    for col in 0..21 {
        let fd = (run(col, eps) - run(col, -eps)) / (2.0 * eps);
        for row in 0..21 {
            let a = state.jac_step[(row, col)];
            assert!(
                (a - fd[row]).abs() < 1e-5 * (1.0 + fd[row].abs()),
                "jac[({row},{col})] after {nstep} steps: analytic {a} vs fd {}",
                fd[row]
            );
        }
    }
}

/// With every pair flagged, the step reduces to the Simpson-weighted
/// gradient leapfrog; verified against an independently coded reference.
#[test]
fn test_all_kick_matches_reference_composition() {
    let (model, state0) = hierarchical_three_body();
    let pair = PairMatrix::all_kick(3);
    let h = 0.004;

    let mut state = state0.clone();
    step(&model, &mut state, h, &pair);

    // Reference: Drift(h/2) K(h/6) [K(2h/3) + h³ gradient] K(h/6)
    // Drift(h/2), in plain arithmetic.
    let accel = |x: &[Vec3]| -> Vec<Vec3> {
        let n = x.len();
        let mut a = vec![Vec3::zeros(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                let rij = x[i] - x[j];
                let r2 = rij.norm_squared();
                let r3inv = 1.0 / (r2 * r2.sqrt());
                a[i] -= model.g * model.mass(j) * r3inv * rij;
                a[j] += model.g * model.mass(i) * r3inv * rij;
            }
        }
        a
    };
    let mut x: Vec<Vec3> = state0.x.clone();
    let mut v: Vec<Vec3> = state0.v.clone();
    for i in 0..3 {
        x[i] += 0.5 * h * v[i];
    }
    let a = accel(&x);
    for i in 0..3 {
        v[i] += h / 6.0 * a[i];
        v[i] += 2.0 * h / 3.0 * a[i];
    }
    let coeff = h * h * h * model.g / 36.0;
    for i in 0..3 {
        for j in (i + 1)..3 {
            let rij = x[i] - x[j];
            let aij = a[i] - a[j];
            let r2 = rij.norm_squared();
            let r = r2.sqrt();
            let f = coeff / (r2 * r2 * r) * (3.0 * aij.dot(&rij) * rij - r2 * aij);
            v[i] += model.mass(j) * f;
            v[j] -= model.mass(i) * f;
        }
    }
    for i in 0..3 {
        v[i] += h / 6.0 * a[i];
        x[i] += 0.5 * h * v[i];
    }

    for i in 0..3 {
        assert!(
            (state.x[i] - x[i]).norm() < 1e-14,
            "body {i} position differs from reference"
        );
        assert!((state.v[i] - v[i]).norm() < 1e-14);
    }
}

/// A pure two-body system on the Kepler path is integrated exactly up to
/// round-off: energy drift over many steps stays at machine level.
#[test]
fn test_two_body_energy_exact_on_kepler_path() {
    let (model, mut state) = two_body();
    let pair = PairMatrix::all_kepler(2);
    let e0 = total_energy(&model, &state);
    for _ in 0..10_000 {
        step(&model, &mut state, 0.05, &pair);
    }
    let e1 = total_energy(&model, &state);
    assert!(
        ((e1 - e0) / e0).abs() < 1e-12,
        "energy drifted: {:e}",
        ((e1 - e0) / e0).abs()
    );
}

/// On the kick path the error is bounded and oscillatory, not secular.
#[test]
fn test_two_body_energy_bounded_on_kick_path() {
    let (model, mut state) = two_body();
    let pair = PairMatrix::all_kick(2);
    let e0 = total_energy(&model, &state);
    let nstep = 4000;
    let mut max_first = 0.0_f64;
    let mut max_second = 0.0_f64;
    for step_idx in 0..nstep {
        step(&model, &mut state, 0.005, &pair);
        if step_idx % 10 == 0 {
            let err = ((total_energy(&model, &state) - e0) / e0).abs();
            if step_idx < nstep / 2 {
                max_first = max_first.max(err);
            } else {
                max_second = max_second.max(err);
            }
        }
    }
    assert!(max_first.max(max_second) < 1e-8, "energy error too large");
    // Oscillatory, not secular: the late-time error stays comparable to
    // the early-time error.
    assert!(
        max_second < 3.0 * max_first.max(1e-14),
        "secular energy drift: first half {max_first:e}, second half {max_second:e}"
    );
}

/// Swapping the tight pair between the Kepler and kick treatments
/// changes the trajectory at the splitting's own order: the difference
/// shrinks ~16x when the step is halved.
#[test]
fn test_pair_flip_agreement_is_fourth_order() {
    let (model, state0) = hierarchical_three_body();
    let tmax = 1.2;

    let run = |h: f64, inner_kick: bool| -> State {
        let mut pair = PairMatrix::all_kepler(3);
        pair.set_kick(0, 1, inner_kick);
        let mut state = state0.clone();
        let driver = Integrator::new(h, 0.0, tmax).unwrap();
        driver.integrate(&Ah18, &model, &mut state, &pair);
        state
    };
    let diff = |h: f64| -> f64 {
        let a = run(h, false);
        let b = run(h, true);
        let mut m = 0.0_f64;
        for i in 0..3 {
            m = m.max((a.x[i] - b.x[i]).norm());
        }
        m
    };

    let d1 = diff(0.01);
    let d2 = diff(0.005);
    assert!(d1 > 0.0 && d2 > 0.0);
    assert!(
        d1 / d2 > 5.0,
        "pair-flip difference not fourth order: {d1:e} vs {d2:e}"
    );
}

/// The driver lands exactly on tmax through the final partial step, with
/// the clock compensated.
#[test]
fn test_driver_partial_step_timing() {
    let (model, mut state) = two_body();
    let pair = PairMatrix::all_kepler(2);
    let driver = Integrator::new(0.07, 0.0, 1.0).unwrap();
    assert_eq!(driver.nsteps(), 14);
    driver.integrate(&Ah18, &model, &mut state, &pair);
    assert!(((state.t + state.t_err) - 1.0).abs() < 1e-14);
}

/// Momentum is conserved to compensated round-off across a long mixed
/// integration.
#[test]
fn test_momentum_conservation() {
    let (model, mut state) = hierarchical_three_body();
    let mut pair = PairMatrix::all_kepler(3);
    pair.set_kick(1, 2, true);
    let baseline = ConservationBaseline::new(&model, &state);
    for _ in 0..2000 {
        step(&model, &mut state, 0.01, &pair);
    }
    let p = total_momentum(&model, &state);
    assert!((p - baseline.momentum).norm() < 1e-13);
}
