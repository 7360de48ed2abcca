//! Model and state types for the orrery N-body engine.
//!
//! `Model` is the static description of a gravitating system (named
//! bodies, masses, gravitational constant). `State` is the mutable
//! integration state: positions, velocities, time, the accumulated
//! state Jacobian, the time derivative, and the compensated-summation
//! residuals that ride along with each accumulator.

pub mod body;
pub mod error;
pub mod model;
pub mod pair;
pub mod state;

pub use body::Body;
pub use error::{ModelError, Result};
pub use model::{Model, ModelBuilder};
pub use pair::PairMatrix;
pub use state::State;
