//! Pair selection table.
//!
//! For every unordered body pair the integrator takes exactly one of two
//! code paths: `true` treats the pair with the fast 1/r^3 kick (plus the
//! Φc corrector), `false` solves the pair's Keplerian motion explicitly
//! (plus the Φα corrector). The table is symmetric; the diagonal is
//! never consulted.

use crate::{ModelError, Result};

/// Symmetric boolean pair-selection matrix.
#[derive(Debug, Clone)]
pub struct PairMatrix {
    n: usize,
    flags: Vec<bool>,
}

impl PairMatrix {
    /// All pairs handled by the Kepler-drift path (the usual choice for
    /// well-separated planetary systems).
    pub fn all_kepler(n: usize) -> Self {
        Self {
            n,
            flags: vec![false; n * n],
        }
    }

    /// All pairs handled by the fast-kick path; the integrator reduces to
    /// the Simpson-weighted gradient leapfrog.
    pub fn all_kick(n: usize) -> Self {
        Self {
            n,
            flags: vec![true; n * n],
        }
    }

    /// Build from a raw row-major table, validating shape and symmetry.
    pub fn from_rows(n: usize, rows: &[Vec<bool>]) -> Result<Self> {
        if rows.len() != n || rows.iter().any(|r| r.len() != n) {
            return Err(ModelError::PairShape {
                rows: rows.len(),
                cols: rows.first().map_or(0, |r| r.len()),
                n,
            });
        }
        for i in 0..n {
            for j in (i + 1)..n {
                if rows[i][j] != rows[j][i] {
                    return Err(ModelError::AsymmetricPair(i, j));
                }
            }
        }
        let mut flags = vec![false; n * n];
        for i in 0..n {
            for j in 0..n {
                flags[i * n + j] = rows[i][j];
            }
        }
        Ok(Self { n, flags })
    }

    /// Number of bodies.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Whether pair (i, j) takes the fast-kick path.
    #[inline]
    pub fn is_kick(&self, i: usize, j: usize) -> bool {
        self.flags[i * self.n + j]
    }

    /// Flag pair (i, j) (and its mirror) for the fast-kick path.
    pub fn set_kick(&mut self, i: usize, j: usize, kick: bool) {
        self.flags[i * self.n + j] = kick;
        self.flags[j * self.n + i] = kick;
    }
}
