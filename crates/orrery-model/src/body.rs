//! Body description — a named point mass.

/// A point mass in the gravitating system.
#[derive(Debug, Clone)]
pub struct Body {
    /// Human-readable name ("Sun", "b", ...).
    pub name: String,
    /// Mass in caller units (must be consistent with the model's G).
    pub mass: f64,
}

impl Body {
    /// Create a new body.
    pub fn new(name: &str, mass: f64) -> Self {
        Self {
            name: name.to_string(),
            mass,
        }
    }
}
