use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Direction of a physics object in (pseudorapidity, azimuth) space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Pseudorapidity
    pub eta: f64,

    /// Azimuthal angle, reduced to a single period
    pub phi: f64,
}

impl Position {
    #[must_use]
    pub fn new(eta: f64, phi: f64) -> Self {
        Self { eta, phi }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.eta.is_finite() && self.phi.is_finite()
    }

    /// Angular separation to another position
    #[must_use]
    pub fn delta_r(&self, other: &Position) -> f64 {
        delta_r(self, other)
    }
}

/// Shortest azimuthal distance between two angles.
///
/// Both angles must already lie in the same period; the result is in `[0, pi]`.
///
/// # Examples
///
/// ```
/// use tau_matcher::core::position::delta_phi;
///
/// assert!((delta_phi(0.1, -0.1) - 0.2).abs() < 1e-12);
/// assert!((delta_phi(3.0, -3.0) - (2.0 * std::f64::consts::PI - 6.0)).abs() < 1e-12);
/// ```
#[must_use]
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let dphi = (phi1 - phi2).abs();
    if dphi <= PI {
        dphi
    } else {
        2.0 * PI - dphi
    }
}

/// Angular separation: `sqrt(deta^2 + dphi^2)` with wrapped azimuth
#[must_use]
pub fn delta_r(a: &Position, b: &Position) -> f64 {
    (a.eta - b.eta).hypot(delta_phi(a.phi, b.phi))
}
