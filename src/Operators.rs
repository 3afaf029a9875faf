//! # Spatial Operators Module
//!
//! Discretisation of the doubly-periodic square `[-1,1]×[-1,1]` and the sparse five-point
//! Laplacian acting on fields flattened row-major into vectors of length `m²`.
//!
//! ## Construction
//!
//! ```text
//! T  = tridiag(1, -4, 1)                 (m×m, one grid axis)
//! S  = tridiag(1,  0, 1)                 (m×m, the other axis)
//! A0 = I ⊗ T + S ⊗ I                     (m²×m²)
//! A  = (A0 + W_axis + W_row) / Δx²
//! ```
//!
//! `W_axis` couples the first and the last grid row (diagonals at offsets `±(m²-m)`),
//! `W_row` closes every row-block on itself (entries `(i·m, i·m+m-1)` and the mirror one).
//! After the wrap-around terms every row of `A` sums to zero and `A` is symmetric.
//!
//! ## Main structures
//! - [`Grid`]: grid size, spacing convention, coordinates and index helpers
//! - [`PeriodicLaplacian`]: the assembled CSR operator together with its grid
//!
//! ```rust, ignore
//! use RDTuring::Operators::periodic_laplacian::PeriodicLaplacian;
//! let lap = PeriodicLaplacian::new(150)?;
//! let au = lap.apply(&u)?;
//! ```
pub mod grid;
pub mod periodic_laplacian;

use thiserror::Error;

/// errors of grid and operator construction
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OperatorError {
    #[error("grid size must be at least 2, got {0}")]
    InvalidGridSize(usize),
    #[error("vector of length {found} does not fit operator of dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("field of shape {rows}x{cols} does not fit a {m}x{m} grid")]
    ShapeMismatch { rows: usize, cols: usize, m: usize },
}
