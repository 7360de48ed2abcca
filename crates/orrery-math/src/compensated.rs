//! Kahan–Babuška compensated summation.
//!
//! Every state accumulator in the integrator (positions, velocities, the
//! global Jacobian, time, d/dt vectors) carries a running error companion.
//! Folding an update through `comp_sum` keeps `value + error` equal to the
//! mathematically exact sum to one ulp, so round-off behaves as a random
//! walk instead of a secular drift over long integrations.

use crate::{DMat, Vec3};

/// Two-term compensated add: fold `addend` into `(sum, err)`.
///
/// Postcondition: the new `sum + err` equals the exact old
/// `sum + err + addend` up to one ulp of the result.
#[inline(always)]
pub fn comp_sum(sum: &mut f64, err: &mut f64, addend: f64) {
    *err += addend;
    let tmp = *sum + *err;
    *err += *sum - tmp;
    *sum = tmp;
}

/// Component-wise compensated add over a `Vec3` accumulator.
#[inline(always)]
pub fn comp_sum_vec3(sum: &mut Vec3, err: &mut Vec3, addend: Vec3) {
    for k in 0..3 {
        comp_sum(&mut sum[k], &mut err[k], addend[k]);
    }
}

/// Element-wise compensated add over a matrix accumulator.
///
/// `sum`, `err`, and `addend` must share a shape.
pub fn comp_sum_mat(sum: &mut DMat, err: &mut DMat, addend: &DMat) {
    let (nr, nc) = sum.shape();
    for c in 0..nc {
        for r in 0..nr {
            comp_sum(&mut sum[(r, c)], &mut err[(r, c)], addend[(r, c)]);
        }
    }
}
