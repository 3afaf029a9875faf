use super::OperatorError;
use super::grid::{Grid, SpacingConvention};
use log::debug;
use nalgebra::DVector;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// diagonal of the one-axis operator; holds the whole -4 of the five-point stencil
pub const STENCIL_CENTER: f64 = -4.0;
/// weight of every neighbour coupling
pub const STENCIL_NEIGHBOUR: f64 = 1.0;

/// T = tridiag(1, -4, 1), m×m
pub fn second_difference_1d(m: usize) -> CooMatrix<f64> {
    let mut t = CooMatrix::new(m, m);
    for i in 0..m {
        t.push(i, i, STENCIL_CENTER);
        if i + 1 < m {
            t.push(i, i + 1, STENCIL_NEIGHBOUR);
            t.push(i + 1, i, STENCIL_NEIGHBOUR);
        }
    }
    t
}

/// S = tridiag(1, 0, 1), m×m
pub fn coupling_1d(m: usize) -> CooMatrix<f64> {
    let mut s = CooMatrix::new(m, m);
    for i in 0..m.saturating_sub(1) {
        s.push(i, i + 1, STENCIL_NEIGHBOUR);
        s.push(i + 1, i, STENCIL_NEIGHBOUR);
    }
    s
}

pub fn identity_1d(m: usize) -> CooMatrix<f64> {
    let mut id = CooMatrix::new(m, m);
    for i in 0..m {
        id.push(i, i, 1.0);
    }
    id
}

/// Sparse Kronecker product a ⊗ b
pub fn kron(a: &CooMatrix<f64>, b: &CooMatrix<f64>) -> CooMatrix<f64> {
    let (br, bc) = (b.nrows(), b.ncols());
    let mut out = CooMatrix::new(a.nrows() * br, a.ncols() * bc);
    for (i, j, &va) in a.triplet_iter() {
        for (k, l, &vb) in b.triplet_iter() {
            out.push(i * br + k, j * bc + l, va * vb);
        }
    }
    out
}

/// Couples the first and the last grid row: two diagonals at offsets ±(m²-m)
pub fn axis_wrap(m: usize) -> CooMatrix<f64> {
    let n = m * m;
    let offset = n - m;
    let mut w = CooMatrix::new(n, n);
    for i in 0..(n - offset) {
        w.push(i, i + offset, STENCIL_NEIGHBOUR);
        w.push(i + offset, i, STENCIL_NEIGHBOUR);
    }
    w
}

/// Closes every row-block of length m on itself: entries (i·m, i·m+m-1) and (i·m+m-1, i·m)
pub fn row_wrap(m: usize) -> CooMatrix<f64> {
    let n = m * m;
    let mut w = CooMatrix::new(n, n);
    for block in 0..m {
        let first = block * m;
        let last = first + m - 1;
        w.push(first, last, STENCIL_NEIGHBOUR);
        w.push(last, first, STENCIL_NEIGHBOUR);
    }
    w
}

/// Assembles the periodic five-point Laplacian of an m×m grid, scaled by 1/Δx².
///
/// All parts are pushed into one COO matrix; the conversion to CSR sums the coinciding
/// entries (for m = 2 the wrap-around couplings land on the band ones).
pub fn build_periodic_laplacian(grid: &Grid) -> CsrMatrix<f64> {
    let m = grid.m();
    let n = grid.len();
    let interior_a = kron(&identity_1d(m), &second_difference_1d(m));
    let interior_b = kron(&coupling_1d(m), &identity_1d(m));
    let wrap_axis = axis_wrap(m);
    let wrap_rows = row_wrap(m);

    let mut assembled = CooMatrix::new(n, n);
    for part in [&interior_a, &interior_b, &wrap_axis, &wrap_rows] {
        for (i, j, &v) in part.triplet_iter() {
            assembled.push(i, j, v);
        }
    }
    let mut laplacian = CsrMatrix::from(&assembled);
    let inv_dx2 = 1.0 / (grid.dx() * grid.dx());
    for value in laplacian.values_mut() {
        *value *= inv_dx2;
    }
    debug!(
        "periodic Laplacian assembled: m = {}, n = {}, nnz = {}, dx = {}",
        m,
        n,
        laplacian.nnz(),
        grid.dx()
    );
    laplacian
}

fn check_operand(a: &CsrMatrix<f64>, x: &DVector<f64>) -> Result<(), OperatorError> {
    if x.len() != a.ncols() {
        return Err(OperatorError::DimensionMismatch {
            expected: a.ncols(),
            found: x.len(),
        });
    }
    Ok(())
}

/// y = A·x into an existing buffer
pub fn sparse_matvec_into(
    a: &CsrMatrix<f64>,
    x: &DVector<f64>,
    y: &mut DVector<f64>,
) -> Result<(), OperatorError> {
    check_operand(a, x)?;
    if y.len() != a.nrows() {
        return Err(OperatorError::DimensionMismatch {
            expected: a.nrows(),
            found: y.len(),
        });
    }
    spmm_csr_dense(0.0, &mut *y, 1.0, Op::NoOp(a), Op::NoOp(x));
    Ok(())
}

pub fn sparse_matvec(a: &CsrMatrix<f64>, x: &DVector<f64>) -> Result<DVector<f64>, OperatorError> {
    check_operand(a, x)?;
    Ok(a * x)
}

/// The discrete periodic Laplacian of one grid. Built once per run, read-only afterwards.
#[derive(Debug, Clone)]
pub struct PeriodicLaplacian {
    grid: Grid,
    matrix: CsrMatrix<f64>,
}

impl PeriodicLaplacian {
    /// Laplacian of an m×m grid with the default spacing convention
    pub fn new(m: usize) -> Result<Self, OperatorError> {
        Ok(Self::from_grid(Grid::new(m)?))
    }

    pub fn with_convention(m: usize, convention: SpacingConvention) -> Result<Self, OperatorError> {
        Ok(Self::from_grid(Grid::with_convention(m, convention)?))
    }

    pub fn from_grid(grid: Grid) -> Self {
        let matrix = build_periodic_laplacian(&grid);
        Self { grid, matrix }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn matrix(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }

    pub fn dim(&self) -> usize {
        self.grid.len()
    }

    pub fn apply(&self, x: &DVector<f64>) -> Result<DVector<f64>, OperatorError> {
        sparse_matvec(&self.matrix, x)
    }

    pub fn apply_into(&self, x: &DVector<f64>, y: &mut DVector<f64>) -> Result<(), OperatorError> {
        sparse_matvec_into(&self.matrix, x, y)
    }
}
