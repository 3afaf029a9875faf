use super::OperatorError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Length of the domain side, the grid covers [-1, 1]
pub const DOMAIN_LENGTH: f64 = 2.0;

/// How the mesh spacing is derived from the number of grid points per axis.
///
/// `Periodic` is Δx = 2/m: m points tile the periodic side of length 2 exactly.
/// `Legacy` is Δx = 2/(m+1), the value historically used to scale the stencil.
/// Whichever is chosen is applied everywhere: stencil scaling, coordinates, stability bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpacingConvention {
    #[default]
    Periodic,
    Legacy,
}

impl SpacingConvention {
    pub fn spacing(&self, m: usize) -> f64 {
        match self {
            SpacingConvention::Periodic => DOMAIN_LENGTH / m as f64,
            SpacingConvention::Legacy => DOMAIN_LENGTH / (m as f64 + 1.0),
        }
    }
}

/// m×m periodic lattice over [-1,1]×[-1,1], fields are stored row-major
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    m: usize,
    convention: SpacingConvention,
}

impl Grid {
    pub fn new(m: usize) -> Result<Self, OperatorError> {
        Self::with_convention(m, SpacingConvention::default())
    }

    pub fn with_convention(m: usize, convention: SpacingConvention) -> Result<Self, OperatorError> {
        if m < 2 {
            return Err(OperatorError::InvalidGridSize(m));
        }
        Ok(Self { m, convention })
    }
    /// points per axis
    pub fn m(&self) -> usize {
        self.m
    }
    /// number of unknowns per species, m²
    pub fn len(&self) -> usize {
        self.m * self.m
    }

    pub fn convention(&self) -> SpacingConvention {
        self.convention
    }
    /// Δx
    pub fn dx(&self) -> f64 {
        self.convention.spacing(self.m)
    }

    /// Flat index of the grid node in row `row` and column `col`
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.m + col
    }

    /// Coordinates -1 + i·Δx, i = 0..m, shared by both axes
    pub fn axis(&self) -> DVector<f64> {
        let dx = self.dx();
        DVector::from_fn(self.m, |i, _| -1.0 + i as f64 * dx)
    }

    /// Flattens an m×m field row-major into a state vector
    pub fn flatten(&self, field: &DMatrix<f64>) -> Result<DVector<f64>, OperatorError> {
        if field.nrows() != self.m || field.ncols() != self.m {
            return Err(OperatorError::ShapeMismatch {
                rows: field.nrows(),
                cols: field.ncols(),
                m: self.m,
            });
        }
        let m = self.m;
        Ok(DVector::from_iterator(
            self.len(),
            (0..m).flat_map(|row| (0..m).map(move |col| field[(row, col)])),
        ))
    }

    /// Inverse of [`Grid::flatten`]
    pub fn reshape(&self, state: &DVector<f64>) -> Result<DMatrix<f64>, OperatorError> {
        if state.len() != self.len() {
            return Err(OperatorError::DimensionMismatch {
                expected: self.len(),
                found: state.len(),
            });
        }
        Ok(DMatrix::from_row_slice(self.m, self.m, state.as_slice()))
    }
}
