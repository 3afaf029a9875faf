use super::SolverError;
use crate::Operators::OperatorError;
use crate::Operators::periodic_laplacian::sparse_matvec_into;
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CscMatrix, CsrMatrix};
use serde::{Deserialize, Serialize};

/// Which backend solves the implicit diffusion systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SolverKind {
    #[default]
    ConjugateGradient,
    SparseCholesky,
}

/// Parameters of the iterative backend; the direct one ignores them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// relative residual ‖b - Sx‖/‖b‖ at which iterations stop
    pub tolerance: f64,
    /// None means 10·n
    pub max_iterations: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: None,
        }
    }
}

/// S = I - c·A
pub fn shifted_system(a: &CsrMatrix<f64>, coefficient: f64) -> Result<CsrMatrix<f64>, SolverError> {
    if !coefficient.is_finite() || coefficient < 0.0 {
        return Err(SolverError::InvalidCoefficient(coefficient));
    }
    if a.nrows() != a.ncols() {
        return Err(SolverError::DimensionMismatch {
            expected: a.nrows(),
            found: a.ncols(),
        });
    }
    let scaled = a * coefficient;
    Ok(&CsrMatrix::identity(a.nrows()) - &scaled)
}

fn check_rhs(dim: usize, rhs: &DVector<f64>) -> Result<(), SolverError> {
    if rhs.len() != dim {
        return Err(SolverError::DimensionMismatch {
            expected: dim,
            found: rhs.len(),
        });
    }
    Ok(())
}

#[enum_dispatch]
pub trait LinearSolve {
    /// Takes ownership of the system matrix and does all the work that does not depend on the
    /// right-hand side
    fn set_system(&mut self, system: CsrMatrix<f64>) -> Result<(), SolverError>;
    fn solve(&self, rhs: &DVector<f64>) -> Result<DVector<f64>, SolverError>;
    fn dim(&self) -> Option<usize>;
}

/// Conjugate gradient for symmetric positive definite systems
pub struct ConjugateGradient {
    system: Option<CsrMatrix<f64>>,
    tolerance: f64,
    max_iterations: Option<usize>,
}

impl ConjugateGradient {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            system: None,
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
        }
    }
}

impl LinearSolve for ConjugateGradient {
    fn set_system(&mut self, system: CsrMatrix<f64>) -> Result<(), SolverError> {
        self.system = Some(system);
        Ok(())
    }

    fn solve(&self, rhs: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        let s = self.system.as_ref().ok_or(SolverError::NotFactorized)?;
        let n = s.nrows();
        check_rhs(n, rhs)?;
        let b_norm = rhs.norm();
        if b_norm == 0.0 {
            return Ok(DVector::zeros(n));
        }
        let max_iterations = self.max_iterations.unwrap_or(10 * n);
        let to_solver_error = |_: OperatorError| SolverError::DimensionMismatch {
            expected: n,
            found: rhs.len(),
        };

        // the systems are close to identity, b itself is a good first guess
        let mut x = rhs.clone();
        let mut sp = DVector::zeros(n);
        sparse_matvec_into(s, &x, &mut sp).map_err(to_solver_error)?;
        let mut r = rhs - &sp;
        let mut p = r.clone();
        let mut rs_old = r.dot(&r);

        for iteration in 0..max_iterations {
            if rs_old.sqrt() <= self.tolerance * b_norm {
                debug!("CG converged in {} iterations", iteration);
                return Ok(x);
            }
            sparse_matvec_into(s, &p, &mut sp).map_err(to_solver_error)?;
            let curvature = p.dot(&sp);
            if curvature <= 0.0 {
                return Err(SolverError::Breakdown { iteration });
            }
            let alpha = rs_old / curvature;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &sp, 1.0);
            let rs_new = r.dot(&r);
            p.axpy(1.0, &r, rs_new / rs_old);
            rs_old = rs_new;
        }
        let residual = rs_old.sqrt() / b_norm;
        if residual <= self.tolerance {
            return Ok(x);
        }
        Err(SolverError::NotConverged {
            iterations: max_iterations,
            residual,
        })
    }

    fn dim(&self) -> Option<usize> {
        self.system.as_ref().map(|s| s.nrows())
    }
}

/// Sparse Cholesky factorisation S = L·Lᵀ, computed once in `set_system`
pub struct SparseCholesky {
    factor: Option<CscCholesky<f64>>,
    dim: usize,
}

impl SparseCholesky {
    pub fn new() -> Self {
        Self {
            factor: None,
            dim: 0,
        }
    }
}

impl Default for SparseCholesky {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSolve for SparseCholesky {
    fn set_system(&mut self, system: CsrMatrix<f64>) -> Result<(), SolverError> {
        let csc = CscMatrix::from(&system);
        let factor =
            CscCholesky::factor(&csc).map_err(|e| SolverError::Factorization(format!("{:?}", e)))?;
        info!(
            "Cholesky factor of {}x{} system: nnz(L) = {}",
            system.nrows(),
            system.ncols(),
            factor.l().nnz()
        );
        self.dim = system.nrows();
        self.factor = Some(factor);
        Ok(())
    }

    fn solve(&self, rhs: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        let factor = self.factor.as_ref().ok_or(SolverError::NotFactorized)?;
        check_rhs(self.dim, rhs)?;
        let b = DMatrix::from_column_slice(self.dim, 1, rhs.as_slice());
        let x = factor.solve(&b);
        Ok(DVector::from_column_slice(x.as_slice()))
    }

    fn dim(&self) -> Option<usize> {
        self.factor.as_ref().map(|_| self.dim)
    }
}

#[enum_dispatch(LinearSolve)]
pub enum SolverBackend {
    ConjugateGradient(ConjugateGradient),
    SparseCholesky(SparseCholesky),
}

pub fn create_backend(kind: SolverKind, config: &SolverConfig) -> SolverBackend {
    match kind {
        SolverKind::ConjugateGradient => SolverBackend::from(ConjugateGradient::new(config)),
        SolverKind::SparseCholesky => SolverBackend::from(SparseCholesky::new()),
    }
}

/// Implicit diffusion sub-step of one species: x ↦ (I - c·A)⁻¹·x with c = Δt·σ·D.
/// The system is assembled and handed to the backend once; every call of `solve` reuses it.
pub struct ImplicitDiffusion {
    coefficient: f64,
    backend: SolverBackend,
}

impl ImplicitDiffusion {
    pub fn new(
        laplacian: &CsrMatrix<f64>,
        coefficient: f64,
        kind: SolverKind,
        config: &SolverConfig,
    ) -> Result<Self, SolverError> {
        let system = shifted_system(laplacian, coefficient)?;
        let mut backend = create_backend(kind, config);
        backend.set_system(system)?;
        Ok(Self {
            coefficient,
            backend,
        })
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn solve(&self, rhs: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        self.backend.solve(rhs)
    }
}

/// Solves (I - Δt·σ·D·A)·x = b in one shot: assemble, factorise/prepare, solve
pub fn solve_shifted_system(
    laplacian: &CsrMatrix<f64>,
    dt: f64,
    sigma: f64,
    diffusivity: f64,
    rhs: &DVector<f64>,
    kind: SolverKind,
    config: &SolverConfig,
) -> Result<DVector<f64>, SolverError> {
    ImplicitDiffusion::new(laplacian, dt * sigma * diffusivity, kind, config)?.solve(rhs)
}
