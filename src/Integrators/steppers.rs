use super::time_step::Scheme;
use super::{IntegratorError, Species};
use crate::LinearSolvers::sparse_solvers::{ImplicitDiffusion, SolverConfig, SolverKind};
use crate::Operators::OperatorError;
use crate::Operators::grid::Grid;
use crate::Operators::periodic_laplacian::PeriodicLaplacian;
use crate::Reactions::reaction_terms::ReactionTerms;
use crate::Utils::initial_fields::FieldGenerator;
use nalgebra::{DMatrix, DVector};

/// Concentrations of both species at time `t`, flattened row-major
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub u: DVector<f64>,
    pub v: DVector<f64>,
    pub t: f64,
    pub step: usize,
}

impl FieldState {
    pub fn new(u: DVector<f64>, v: DVector<f64>) -> Result<Self, OperatorError> {
        if u.len() != v.len() {
            return Err(OperatorError::DimensionMismatch {
                expected: u.len(),
                found: v.len(),
            });
        }
        Ok(Self {
            u,
            v,
            t: 0.0,
            step: 0,
        })
    }

    /// From two m×m arrays supplied by the caller
    pub fn from_fields(
        grid: &Grid,
        u: &DMatrix<f64>,
        v: &DMatrix<f64>,
    ) -> Result<Self, OperatorError> {
        Self::new(grid.flatten(u)?, grid.flatten(v)?)
    }

    pub fn from_generators(
        grid: &Grid,
        u_generator: &mut dyn FieldGenerator,
        v_generator: &mut dyn FieldGenerator,
    ) -> Self {
        Self {
            u: u_generator.generate(grid),
            v: v_generator.generate(grid),
            t: 0.0,
            step: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.u.len()
    }

    /// sums of u and v over the grid
    pub fn total_mass(&self) -> (f64, f64) {
        (self.u.sum(), self.v.sum())
    }

    /// First species holding a NaN or an infinity
    pub fn first_non_finite(&self) -> Option<Species> {
        if !self.u.iter().all(|x| x.is_finite()) {
            return Some(Species::U);
        }
        if !self.v.iter().all(|x| x.is_finite()) {
            return Some(Species::V);
        }
        None
    }
}

/// One step u(n), v(n) → u(n+1), v(n+1) of fixed length. The stepper does not touch
/// `state.t` and `state.step`, the run loop does.
pub trait TimeStepper {
    fn scheme(&self) -> Scheme;
    fn dt(&self) -> f64;
    /// `step` is the index of the step being taken, used for diagnostics
    fn advance(&mut self, state: &mut FieldState, step: usize) -> Result<(), IntegratorError>;
}

/// Forward Euler on the whole right-hand side
pub struct ExplicitEuler<'a> {
    laplacian: &'a PeriodicLaplacian,
    reactions: ReactionTerms,
    dt: f64,
    lap_u: DVector<f64>,
    lap_v: DVector<f64>,
}

impl<'a> ExplicitEuler<'a> {
    pub fn new(laplacian: &'a PeriodicLaplacian, reactions: ReactionTerms, dt: f64) -> Self {
        let n = laplacian.dim();
        Self {
            laplacian,
            reactions,
            dt,
            lap_u: DVector::zeros(n),
            lap_v: DVector::zeros(n),
        }
    }
}

impl TimeStepper for ExplicitEuler<'_> {
    fn scheme(&self) -> Scheme {
        Scheme::Explicit
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn advance(&mut self, state: &mut FieldState, _step: usize) -> Result<(), IntegratorError> {
        // everything on the right-hand side is taken at the old time level
        let (fu, gv) = self.reactions.evaluate(&state.u, &state.v)?;
        self.laplacian.apply_into(&state.u, &mut self.lap_u)?;
        self.laplacian.apply_into(&state.v, &mut self.lap_v)?;
        let p = *self.reactions.params();
        state.u.axpy(self.dt * p.sigma * p.d1, &self.lap_u, 1.0);
        state.u.axpy(self.dt, &fu, 1.0);
        state.v.axpy(self.dt * p.sigma * p.d2, &self.lap_v, 1.0);
        state.v.axpy(self.dt, &gv, 1.0);
        Ok(())
    }
}

/// Implicit diffusion half-step followed by an explicit reaction half-step on the diffused fields
pub struct ImexSplitting {
    reactions: ReactionTerms,
    dt: f64,
    u_diffusion: ImplicitDiffusion,
    v_diffusion: ImplicitDiffusion,
}

impl ImexSplitting {
    pub fn new(
        laplacian: &PeriodicLaplacian,
        reactions: ReactionTerms,
        dt: f64,
        kind: SolverKind,
        config: &SolverConfig,
    ) -> Result<Self, IntegratorError> {
        let p = *reactions.params();
        let u_coefficient = dt * p.sigma * p.d1;
        let v_coefficient = dt * p.sigma * p.d2;
        let u_diffusion = ImplicitDiffusion::new(laplacian.matrix(), u_coefficient, kind, config)
            .map_err(|source| IntegratorError::SystemSetup {
                species: Species::U,
                coefficient: u_coefficient,
                source,
            })?;
        let v_diffusion = ImplicitDiffusion::new(laplacian.matrix(), v_coefficient, kind, config)
            .map_err(|source| IntegratorError::SystemSetup {
                species: Species::V,
                coefficient: v_coefficient,
                source,
            })?;
        Ok(Self {
            reactions,
            dt,
            u_diffusion,
            v_diffusion,
        })
    }

    fn diffuse(
        diffusion: &ImplicitDiffusion,
        field: &DVector<f64>,
        species: Species,
        step: usize,
    ) -> Result<DVector<f64>, IntegratorError> {
        diffusion
            .solve(field)
            .map_err(|source| IntegratorError::LinearSolve {
                species,
                step,
                coefficient: diffusion.coefficient(),
                source,
            })
    }
}

impl TimeStepper for ImexSplitting {
    fn scheme(&self) -> Scheme {
        Scheme::Imex
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn advance(&mut self, state: &mut FieldState, step: usize) -> Result<(), IntegratorError> {
        let mut u_star = Self::diffuse(&self.u_diffusion, &state.u, Species::U, step)?;
        let mut v_star = Self::diffuse(&self.v_diffusion, &state.v, Species::V, step)?;
        let (fu, gv) = self.reactions.evaluate(&u_star, &v_star)?;
        u_star.axpy(self.dt, &fu, 1.0);
        v_star.axpy(self.dt, &gv, 1.0);
        state.u = u_star;
        state.v = v_star;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reactions::reaction_terms::ReactionParams;
    use approx::assert_relative_eq;

    fn bump(grid: &Grid) -> DVector<f64> {
        let axis = grid.axis();
        let m = grid.m();
        DVector::from_fn(grid.len(), |k, _| {
            let (x, y) = (axis[k % m], axis[k / m]);
            (-8.0 * (x * x + y * y)).exp()
        })
    }

    #[test]
    fn test_field_state_length_check() {
        assert!(FieldState::new(DVector::zeros(4), DVector::zeros(5)).is_err());
        let state = FieldState::new(DVector::zeros(4), DVector::zeros(4)).unwrap();
        assert_eq!(state.len(), 4);
        assert_eq!(state.t, 0.0);
        assert_eq!(state.first_non_finite(), None);
    }

    #[test]
    fn test_first_non_finite() {
        let mut state = FieldState::new(DVector::zeros(3), DVector::zeros(3)).unwrap();
        state.v[1] = f64::INFINITY;
        assert_eq!(state.first_non_finite(), Some(Species::V));
        state.u[0] = f64::NAN;
        assert_eq!(state.first_non_finite(), Some(Species::U));
    }

    #[test]
    fn test_explicit_step_matches_formula() {
        let lap = PeriodicLaplacian::new(6).unwrap();
        let grid = *lap.grid();
        let params = ReactionParams::reference();
        let u0 = bump(&grid);
        let v0 = u0.map(|x| 0.5 - x);
        let mut state = FieldState::new(u0.clone(), v0.clone()).unwrap();
        let dt = 1e-3;
        let mut stepper = ExplicitEuler::new(&lap, ReactionTerms::new(params), dt);
        stepper.advance(&mut state, 1).unwrap();

        let au = lap.apply(&u0).unwrap();
        let av = lap.apply(&v0).unwrap();
        let terms = ReactionTerms::new(params);
        let (fu, gv) = terms.evaluate(&u0, &v0).unwrap();
        for k in 0..grid.len() {
            let u_expected = u0[k] + dt * (params.sigma * params.d1 * au[k] + fu[k]);
            let v_expected = v0[k] + dt * (params.sigma * params.d2 * av[k] + gv[k]);
            assert_relative_eq!(state.u[k], u_expected, epsilon = 1e-14);
            assert_relative_eq!(state.v[k], v_expected, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_imex_reaction_uses_diffused_fields() {
        let lap = PeriodicLaplacian::new(8).unwrap();
        let grid = *lap.grid();
        let params = ReactionParams {
            sigma: 0.05,
            ..ReactionParams::reference()
        };
        let dt = 0.1;
        let u0 = bump(&grid);
        let v0 = u0.map(|x| 0.2 * x - 0.1);
        let mut state = FieldState::new(u0.clone(), v0.clone()).unwrap();
        let config = SolverConfig::default();
        let mut stepper = ImexSplitting::new(
            &lap,
            ReactionTerms::new(params),
            dt,
            SolverKind::SparseCholesky,
            &config,
        )
        .unwrap();
        stepper.advance(&mut state, 1).unwrap();

        let u_star = ImplicitDiffusion::new(
            lap.matrix(),
            dt * params.sigma * params.d1,
            SolverKind::ConjugateGradient,
            &config,
        )
        .unwrap()
        .solve(&u0)
        .unwrap();
        let v_star = ImplicitDiffusion::new(
            lap.matrix(),
            dt * params.sigma * params.d2,
            SolverKind::ConjugateGradient,
            &config,
        )
        .unwrap()
        .solve(&v0)
        .unwrap();
        let terms = ReactionTerms::new(params);
        let (fu, gv) = terms.evaluate(&u_star, &v_star).unwrap();
        for k in 0..grid.len() {
            assert_relative_eq!(state.u[k], u_star[k] + dt * fu[k], epsilon = 1e-8);
            assert_relative_eq!(state.v[k], v_star[k] + dt * gv[k], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_imex_pure_diffusion_keeps_constant_field() {
        let lap = PeriodicLaplacian::new(5).unwrap();
        let params = ReactionParams::pure_diffusion(1.0, 1.0, 2.0);
        let mut stepper = ImexSplitting::new(
            &lap,
            ReactionTerms::diffusion_only(params),
            0.5,
            SolverKind::ConjugateGradient,
            &SolverConfig::default(),
        )
        .unwrap();
        let mut state =
            FieldState::new(DVector::from_element(25, 1.25), DVector::from_element(25, -0.5))
                .unwrap();
        for step in 1..=10 {
            stepper.advance(&mut state, step).unwrap();
        }
        for k in 0..25 {
            assert_relative_eq!(state.u[k], 1.25, epsilon = 1e-10);
            assert_relative_eq!(state.v[k], -0.5, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_imex_setup_reports_species() {
        let lap = PeriodicLaplacian::new(4).unwrap();
        let params = ReactionParams {
            d2: -1.0,
            ..ReactionParams::reference()
        };
        let result = ImexSplitting::new(
            &lap,
            ReactionTerms::new(params),
            0.1,
            SolverKind::ConjugateGradient,
            &SolverConfig::default(),
        );
        assert!(matches!(
            result,
            Err(IntegratorError::SystemSetup {
                species: Species::V,
                ..
            })
        ));
    }
}
