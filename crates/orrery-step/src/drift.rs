//! Linear drift with Jacobian propagation.

use orrery_math::comp_sum;
use orrery_model::state::{pos_index, vel_index};
use orrery_model::State;

/// Drift every body: x ← x + h·v, folded through compensated summation.
pub fn drift(state: &mut State, h: f64) {
    for i in 0..state.n() {
        let dv = h * state.v[i];
        orrery_math::comp_sum_vec3(&mut state.x[i], &mut state.xerr[i], dv);
    }
}

/// Drift positions and propagate the global Jacobian.
///
/// The drift's local Jacobian is [I, hI; 0, I] per body, so the fold is
/// row arithmetic instead of a matrix multiply: every position row gains
/// h times its velocity row, column by column, compensated. Velocity and
/// mass rows are untouched.
pub fn drift_grad(state: &mut State, h: f64) {
    drift(state, h);
    let n = state.n();
    let cols = state.jac_step.ncols();
    for c in 0..cols {
        for i in 0..n {
            for k in 0..3 {
                let add = h * state.jac_step[(vel_index(i, k), c)];
                comp_sum(
                    &mut state.jac_step[(pos_index(i, k), c)],
                    &mut state.jac_err[(pos_index(i, k), c)],
                    add,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_math::{DMat, Vec3};
    use orrery_model::ModelBuilder;

    #[test]
    fn test_drift_moves_positions_only() {
        let model = ModelBuilder::new()
            .add_body("a", 1.0)
            .add_body("b", 2.0)
            .build()
            .unwrap();
        let x = vec![Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)];
        let v = vec![Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
        let mut state = model.state_from_cartesian(&x, &v).unwrap();
        drift(&mut state, 0.1);
        assert_eq!(state.x[0][0], 0.05);
        assert_eq!(state.x[1][1], 0.1);
        assert_eq!(state.v[0][0], 0.5);
    }

    #[test]
    fn test_drift_grad_jacobian_block() {
        let model = ModelBuilder::new()
            .add_body("a", 1.0)
            .add_body("b", 2.0)
            .build()
            .unwrap();
        let x = vec![Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)];
        let v = vec![Vec3::zeros(), Vec3::zeros()];
        let mut state = model.state_from_cartesian(&x, &v).unwrap();
        let h = 0.25;
        drift_grad(&mut state, h);
        // Expected: identity plus h on each (pos, vel) pair.
        let mut expect = DMat::identity(14, 14);
        for i in 0..2 {
            for k in 0..3 {
                expect[(pos_index(i, k), vel_index(i, k))] = h;
            }
        }
        assert_eq!(state.jac_step, expect);
    }
}
