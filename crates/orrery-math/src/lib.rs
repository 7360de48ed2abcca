//! Math primitives for the orrery N-body engine.
//!
//! Thin alias layer over nalgebra plus the compensated-summation
//! primitives used by every long-running accumulator in the integrator.

pub mod compensated;

pub use compensated::{comp_sum, comp_sum_mat, comp_sum_vec3};

/// 3D vector alias.
pub type Vec3 = nalgebra::Vector3<f64>;
/// 3x3 matrix alias.
pub type Mat3 = nalgebra::Matrix3<f64>;
/// Dynamic vector.
pub type DVec = nalgebra::DVector<f64>;
/// Dynamic matrix.
pub type DMat = nalgebra::DMatrix<f64>;
/// 6-vector (one relative position + velocity increment).
pub type Vec6 = nalgebra::Vector6<f64>;
/// 6x8 matrix (two-body increment Jacobian: d(dx,dv)/d(x0,v0,k,h)).
pub type Mat6x8 = nalgebra::SMatrix<f64, 6, 8>;

/// Number of spatial dimensions.
pub const NDIM: usize = 3;
