#[cfg(test)]
mod tests {
    use crate::Integrators::IntegratorError;
    use crate::Integrators::rd_solver::{
        NullObserver, Observer, ObserverSet, ReactionDiffusionSolver, simulate,
    };
    use crate::Integrators::steppers::FieldState;
    use crate::Integrators::time_step::{Scheme, explicit_stability_limit};
    use crate::Integrators::Species;
    use crate::LinearSolvers::SolverError;
    use crate::LinearSolvers::sparse_solvers::{SolverConfig, SolverKind};
    use crate::Reactions::reaction_terms::{ReactionModel, ReactionParams};
    use crate::Utils::initial_fields::{ConstantField, GaussianField};
    use crate::settings::SimulationSettings;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn pure_diffusion_settings(m: usize) -> SimulationSettings {
        SimulationSettings {
            scheme: Scheme::Explicit,
            ..SimulationSettings::diffusion_only(m, 1.0, 1.0, 1.0)
        }
    }

    fn random_state(solver: &ReactionDiffusionSolver, seed: u64) -> FieldState {
        let mut u_gen = GaussianField::reference(seed);
        let mut v_gen = GaussianField::reference(seed + 1);
        FieldState::from_generators(solver.grid(), &mut u_gen, &mut v_gen)
    }

    struct FailingObserver {
        calls: usize,
    }

    impl Observer for FailingObserver {
        fn on_snapshot(
            &mut self,
            _time: f64,
            _u: &DVector<f64>,
            _v: &DVector<f64>,
        ) -> Result<(), String> {
            self.calls += 1;
            if self.calls > 1 {
                return Err("disk full".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn test_pure_diffusion_conserves_sum_explicit() {
        let m = 4;
        let dx = 2.0 / m as f64;
        let dt = explicit_stability_limit(dx, 1.0, 1.0);
        let settings = SimulationSettings {
            time_step: Some(dt),
            t_final: 200.0 * dt,
            ..pure_diffusion_settings(m)
        };
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        assert_eq!(solver.num_steps(), 200);
        let mut state = random_state(&solver, 7);
        let (u0, v0) = state.total_mass();

        let mut sums: Vec<(f64, f64)> = Vec::new();
        let mut record = |_t: f64, u: &DVector<f64>, v: &DVector<f64>| sums.push((u.sum(), v.sum()));
        let summary = solver.run(&mut state, &mut record).unwrap();

        assert!(!sums.is_empty());
        for (su, sv) in sums {
            assert_relative_eq!(su, u0, epsilon = 1e-10);
            assert_relative_eq!(sv, v0, epsilon = 1e-10);
        }
        assert_relative_eq!(summary.mass_u, u0, epsilon = 1e-10);
        assert_relative_eq!(summary.mass_v, v0, epsilon = 1e-10);
        assert_eq!(summary.steps, 200);
    }

    #[test]
    fn test_pure_diffusion_conserves_sum_imex() {
        let settings = SimulationSettings {
            scheme: Scheme::Imex,
            solver: SolverKind::SparseCholesky,
            time_step: Some(0.05),
            ..pure_diffusion_settings(6)
        };
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        let mut state = random_state(&solver, 11);
        let (u0, v0) = state.total_mass();
        let summary = solver.run(&mut state, &mut NullObserver).unwrap();
        assert_relative_eq!(summary.mass_u, u0, epsilon = 1e-9);
        assert_relative_eq!(summary.mass_v, v0, epsilon = 1e-9);
        // diffusion flattens the field towards its mean
        let mean = u0 / 36.0;
        let spread = state.u.iter().map(|x| (x - mean).abs()).fold(0.0, f64::max);
        assert!(spread < 0.5);
    }

    #[test]
    fn test_zeroed_constants_feed_v_into_u() {
        // with the coupled model f = v remains, so ΣU gains Δt·ΣV per explicit step
        let dt = 0.01;
        let settings = SimulationSettings {
            reaction_model: ReactionModel::Coupled,
            params: ReactionParams::pure_diffusion(1.0, 1.0, 1.0),
            time_step: Some(dt),
            t_final: 10.0 * dt,
            ..pure_diffusion_settings(4)
        };
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        assert_eq!(solver.num_steps(), 10);
        let mut state = random_state(&solver, 21);
        let (u0, v0) = state.total_mass();
        let summary = solver.run(&mut state, &mut NullObserver).unwrap();
        assert_relative_eq!(summary.mass_v, v0, epsilon = 1e-10);
        assert_relative_eq!(summary.mass_u, u0 + 10.0 * dt * v0, epsilon = 1e-10);
    }

    #[test]
    fn test_reference_imex_run_stays_finite() {
        let settings = SimulationSettings::imex_reference();
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        assert_eq!(solver.grid().len(), 150 * 150);
        assert_eq!(solver.num_steps(), 47);
        let mut state = random_state(&solver, 2024);

        let mut times: Vec<f64> = Vec::new();
        let mut all_finite = true;
        let mut check = |t: f64, u: &DVector<f64>, v: &DVector<f64>| {
            times.push(t);
            all_finite &= u.iter().chain(v.iter()).all(|x| x.is_finite());
        };
        let summary = solver.run(&mut state, &mut check).unwrap();

        assert!(all_finite);
        // 47 steps of dt = 0.6349 end at t = 29.84, the checkpoint at 30 is not reached
        assert_eq!(summary.snapshots, 6);
        assert_eq!(times.len(), 6);
        assert_eq!(times[0], 0.0);
        assert_relative_eq!(summary.final_time, 47.0 * solver.dt(), epsilon = 1e-12);
        assert!(state.first_non_finite().is_none());
    }

    #[test]
    fn test_output_cadence() {
        let settings = SimulationSettings {
            time_step: Some(0.1),
            ..pure_diffusion_settings(4)
        };
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        let mut state = FieldState::from_generators(
            solver.grid(),
            &mut ConstantField::new(1.0),
            &mut ConstantField::new(2.0),
        );
        let mut times: Vec<f64> = Vec::new();
        let mut record = |t: f64, _u: &DVector<f64>, _v: &DVector<f64>| times.push(t);
        let summary = solver.run(&mut state, &mut record).unwrap();

        let expected = [0.0, 0.3, 0.5, 0.8, 1.0];
        assert_eq!(times.len(), expected.len());
        for (t, e) in times.iter().zip(expected.iter()) {
            assert_relative_eq!(*t, *e, epsilon = 1e-12);
        }
        assert_eq!(summary.snapshots, 5);
        assert_eq!(state.step, 10);
    }

    #[test]
    fn test_step_longer_than_interval_emits_once() {
        let settings = SimulationSettings {
            time_step: Some(0.5),
            output_interval: 0.2,
            ..pure_diffusion_settings(4)
        };
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        let mut state = random_state(&solver, 3);
        let mut times: Vec<f64> = Vec::new();
        let mut record = |t: f64, _u: &DVector<f64>, _v: &DVector<f64>| times.push(t);
        solver.run(&mut state, &mut record).unwrap();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_second_run_continues_in_time() {
        let settings = SimulationSettings {
            time_step: Some(0.1),
            ..pure_diffusion_settings(4)
        };
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        let mut state = random_state(&solver, 5);
        solver.run(&mut state, &mut NullObserver).unwrap();
        let summary = solver.run(&mut state, &mut NullObserver).unwrap();
        assert_relative_eq!(summary.final_time, 2.0, epsilon = 1e-12);
        assert_eq!(state.step, 20);
    }

    #[test]
    fn test_unstable_explicit_step_is_reported() {
        let m = 8;
        let dx = 2.0 / m as f64;
        let dt = 100.0 * explicit_stability_limit(dx, 1.0, 1.0);
        let settings = SimulationSettings {
            time_step: Some(dt),
            t_final: 1000.0 * dt,
            output_interval: 1.0e6,
            ..pure_diffusion_settings(m)
        };
        let probe = ReactionDiffusionSolver::new(settings.clone()).unwrap();
        let mut state = random_state(&probe, 9);
        match simulate(settings, &mut state, &mut NullObserver) {
            Err(IntegratorError::NonFiniteState { step, .. }) => {
                assert!(step > 0 && step <= 1000);
            }
            other => panic!("expected NonFiniteState, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let settings = SimulationSettings {
            grid_size: 1,
            ..SimulationSettings::default()
        };
        assert!(matches!(
            ReactionDiffusionSolver::new(settings),
            Err(IntegratorError::Settings(_))
        ));

        let solver = ReactionDiffusionSolver::new(pure_diffusion_settings(4)).unwrap();
        let mut short = FieldState::new(DVector::zeros(9), DVector::zeros(9)).unwrap();
        assert!(matches!(
            solver.run(&mut short, &mut NullObserver),
            Err(IntegratorError::InvalidRun(_))
        ));

        let mut poisoned = FieldState::new(DVector::zeros(16), DVector::zeros(16)).unwrap();
        poisoned.u[3] = f64::NAN;
        assert!(matches!(
            solver.run(&mut poisoned, &mut NullObserver),
            Err(IntegratorError::NonFiniteState { step: 0, .. })
        ));
    }

    #[test]
    fn test_observer_error_aborts_run() {
        let settings = SimulationSettings {
            time_step: Some(0.1),
            ..pure_diffusion_settings(4)
        };
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        let mut state = random_state(&solver, 1);
        let mut observer = FailingObserver { calls: 0 };
        let result = solver.run(&mut state, &mut observer);
        assert!(matches!(result, Err(IntegratorError::Observer { .. })));
        assert_eq!(observer.calls, 2);
        // the failing snapshot was the first checkpoint crossing
        assert_eq!(state.step, 3);
    }

    #[test]
    fn test_observer_set_fans_out() {
        let settings = SimulationSettings {
            time_step: Some(0.1),
            ..pure_diffusion_settings(4)
        };
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        let mut state = random_state(&solver, 4);
        let mut first = 0usize;
        let mut second: Vec<f64> = Vec::new();
        let mut count = |_t: f64, _u: &DVector<f64>, _v: &DVector<f64>| first += 1;
        let mut keep = |_t: f64, u: &DVector<f64>, _v: &DVector<f64>| second.push(u[0]);
        let mut set = ObserverSet::new().with(&mut count).with(&mut keep);
        assert_eq!(set.len(), 2);
        solver.run(&mut state, &mut set).unwrap();
        drop(set);
        assert_eq!(first, 5);
        assert_eq!(second.len(), 5);
    }

    #[test]
    fn test_factored_g_with_zero_beta_fails_setup() {
        use crate::Reactions::reaction_terms::GForm;
        let settings = SimulationSettings {
            g_form: GForm::Factored,
            reaction_model: ReactionModel::Coupled,
            time_step: Some(0.1),
            ..pure_diffusion_settings(4)
        };
        assert!(matches!(
            ReactionDiffusionSolver::new(settings),
            Err(IntegratorError::Reaction(_))
        ));
    }

    #[test]
    fn test_linear_solve_failure_reaches_caller() {
        let settings = SimulationSettings {
            grid_size: 12,
            time_step: Some(1.0),
            t_final: 5.0,
            solver: SolverKind::ConjugateGradient,
            solver_config: SolverConfig {
                tolerance: 1e-14,
                max_iterations: Some(1),
            },
            ..SimulationSettings::imex_reference()
        };
        let solver = ReactionDiffusionSolver::new(settings).unwrap();
        let mut state = random_state(&solver, 12);
        match solver.run(&mut state, &mut NullObserver) {
            Err(IntegratorError::LinearSolve {
                species,
                step,
                coefficient,
                source,
            }) => {
                assert_eq!(species, Species::U);
                assert_eq!(step, 1);
                assert_relative_eq!(coefficient, 1.0 * 0.0021 * 0.5, epsilon = 1e-15);
                assert!(matches!(source, SolverError::NotConverged { iterations: 1, .. }));
            }
            other => panic!("expected LinearSolve, got {:?}", other),
        }
        // the failed step left the state untouched
        assert_eq!(state.step, 0);
        assert_eq!(state.t, 0.0);
    }
}
