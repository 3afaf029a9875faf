//! # Linear Solvers Module
//!
//! Solution of the shifted diffusion systems `(I - Δt·σ·D·A)·x = b` that appear in every
//! implicit sub-step. `A` is the periodic Laplacian: symmetric, negative semi-definite,
//! so for `Δt·σ·D ≥ 0` the system matrix is symmetric positive definite.
//!
//! ## Backends
//! - **`ConjugateGradient`**: iterative, matrix-free apart from the CSR product,
//!   tolerance and iteration cap configurable
//! - **`SparseCholesky`**: direct, factorises the system once and then only does
//!   forward/backward substitution
//!
//! Both implement [`sparse_solvers::LinearSolve`] and are wrapped into the
//! [`sparse_solvers::SolverBackend`] enum (static dispatch).
//!
//! ## Typical use
//! ```rust, ignore
//! let mut diffusion = ImplicitDiffusion::new(&laplacian, dt * sigma * d1, SolverKind::ConjugateGradient, &SolverConfig::default())?;
//! let u_star = diffusion.solve(&u)?;
//! ```
pub mod sparse_solvers;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("solver used before the system matrix was set")]
    NotFactorized,
    #[error("right-hand side of length {found} does not fit system of dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("conjugate gradient did not converge in {iterations} iterations, relative residual {residual:e}")]
    NotConverged { iterations: usize, residual: f64 },
    #[error("conjugate gradient broke down at iteration {iteration}: system is not positive definite")]
    Breakdown { iteration: usize },
    #[error("Cholesky factorisation failed: {0}")]
    Factorization(String),
    #[error("system coefficient {0} is not a finite non-negative number")]
    InvalidCoefficient(f64),
}
