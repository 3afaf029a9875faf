//! # Time Integrators Module
//!
//! Two stepping strategies for
//!
//! ```text
//! ∂u/∂t = σ·D1·Δu + f(u,v)
//! ∂v/∂t = σ·D2·Δv + g(u,v)
//! ```
//!
//! on the periodic grid, both driving the same Laplacian and reaction evaluator.
//!
//! ### Explicit (forward Euler)
//! ```text
//! u(n+1) = u(n) + Δt·(σ·D1·A·u(n) + f(u(n), v(n)))
//! v(n+1) = v(n) + Δt·(σ·D2·A·v(n) + g(u(n), v(n)))
//! ```
//! stable only for Δt ≤ Δx²/(4·σ·max(D1,D2)); the step is derived as Δx²/(c·σ·max(D1,D2))
//! with the empirical c = 5.
//!
//! ### IMEX (implicit diffusion, explicit reaction)
//! ```text
//! u* = (I - Δt·σ·D1·A)⁻¹·u(n)         v* = (I - Δt·σ·D2·A)⁻¹·v(n)
//! u(n+1) = u* + Δt·f(u*, v*)          v(n+1) = v* + Δt·g(u*, v*)
//! ```
//! The reaction half-step consumes the post-diffusion fields. The diffusion half-step is
//! unconditionally stable, the step is derived from the heuristic Δx/(10·σ).
//!
//! ## Run loop
//! [`rd_solver::ReactionDiffusionSolver`] builds the operator once, derives Δt and the number of
//! steps `round(t_final/Δt)`, and emits `(t, u, v)` to an [`rd_solver::Observer`] at t = 0 and
//! every time the elapsed time crosses a multiple of the output interval. A step that leaves
//! non-finite values in either field aborts the run.
pub mod rd_solver;
pub mod steppers;
pub mod time_step;

#[allow(non_snake_case)]
mod integrators_tests;

use crate::LinearSolvers::SolverError;
use crate::Operators::OperatorError;
use crate::Reactions::ReactionError;
use crate::settings::SettingsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The two chemical species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Species {
    U,
    V,
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::U => write!(f, "U"),
            Species::V => write!(f, "V"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IntegratorError {
    #[error(transparent)]
    Operator(#[from] OperatorError),
    #[error(transparent)]
    Reaction(#[from] ReactionError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("setting up the implicit system for {species} failed (coefficient dt*sigma*D = {coefficient}): {source}")]
    SystemSetup {
        species: Species,
        coefficient: f64,
        #[source]
        source: SolverError,
    },
    #[error("linear solve for {species} failed at step {step} (coefficient dt*sigma*D = {coefficient}): {source}")]
    LinearSolve {
        species: Species,
        step: usize,
        coefficient: f64,
        #[source]
        source: SolverError,
    },
    #[error("field {species} became non-finite at step {step} (t = {time})")]
    NonFiniteState {
        species: Species,
        step: usize,
        time: f64,
    },
    #[error("invalid run: {0}")]
    InvalidRun(String),
    #[error("observer failed at t = {time}: {message}")]
    Observer { time: f64, message: String },
}
