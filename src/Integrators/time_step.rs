use serde::{Deserialize, Serialize};
use std::fmt;

/// Time stepping strategy, chosen once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Scheme {
    Explicit,
    #[default]
    Imex,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Explicit => write!(f, "explicit Euler"),
            Scheme::Imex => write!(f, "IMEX"),
        }
    }
}

/// denominator of the theoretical forward Euler bound for the 2D five-point stencil
pub const THEORETICAL_EXPLICIT_DENOMINATOR: f64 = 4.0;

/// Empirical constants of the step size heuristics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityConstants {
    /// c in Δt = Δx²/(c·σ·max(D1,D2))
    pub explicit_denominator: f64,
    /// c in Δt = Δx/(c·σ)
    pub imex_factor: f64,
}

impl Default for StabilityConstants {
    fn default() -> Self {
        Self {
            explicit_denominator: 5.0,
            imex_factor: 10.0,
        }
    }
}

/// Δx²/(c·σ·d_max)
pub fn explicit_time_step(dx: f64, sigma: f64, d_max: f64, denominator: f64) -> f64 {
    dx * dx / (denominator * sigma * d_max)
}

/// Δx/(c·σ)
pub fn imex_time_step(dx: f64, sigma: f64, factor: f64) -> f64 {
    dx / (factor * sigma)
}

/// Largest stable forward Euler step, Δx²/(4·σ·d_max)
pub fn explicit_stability_limit(dx: f64, sigma: f64, d_max: f64) -> f64 {
    explicit_time_step(dx, sigma, d_max, THEORETICAL_EXPLICIT_DENOMINATOR)
}

/// round(t_final/Δt)
pub fn number_of_steps(t_final: f64, dt: f64) -> usize {
    (t_final / dt).round() as usize
}

pub fn derive_time_step(
    scheme: Scheme,
    dx: f64,
    sigma: f64,
    d_max: f64,
    constants: &StabilityConstants,
) -> f64 {
    match scheme {
        Scheme::Explicit => explicit_time_step(dx, sigma, d_max, constants.explicit_denominator),
        Scheme::Imex => imex_time_step(dx, sigma, constants.imex_factor),
    }
}
