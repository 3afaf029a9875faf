use super::steppers::{ExplicitEuler, FieldState, ImexSplitting, TimeStepper};
use super::time_step::{Scheme, explicit_stability_limit, number_of_steps};
use super::IntegratorError;
use crate::Operators::grid::Grid;
use crate::Operators::periodic_laplacian::PeriodicLaplacian;
use crate::Reactions::reaction_terms::ReactionTerms;
use crate::settings::SimulationSettings;
use log::{debug, info, warn};
use nalgebra::DVector;
use serde::Serialize;
use std::time::Instant;

/// relative slack when comparing elapsed time against output checkpoints
const CHECKPOINT_TOLERANCE: f64 = 1e-9;

/// Receiver of `(t, u, v)` snapshots. An `Err` aborts the run.
pub trait Observer {
    fn on_snapshot(&mut self, time: f64, u: &DVector<f64>, v: &DVector<f64>)
    -> Result<(), String>;
}

impl<F> Observer for F
where
    F: FnMut(f64, &DVector<f64>, &DVector<f64>),
{
    fn on_snapshot(
        &mut self,
        time: f64,
        u: &DVector<f64>,
        v: &DVector<f64>,
    ) -> Result<(), String> {
        self(time, u, v);
        Ok(())
    }
}

/// Discards every snapshot
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_snapshot(&mut self, _: f64, _: &DVector<f64>, _: &DVector<f64>) -> Result<(), String> {
        Ok(())
    }
}

/// Fans one snapshot out to several observers, in insertion order
#[derive(Default)]
pub struct ObserverSet<'a> {
    observers: Vec<&'a mut dyn Observer>,
}

impl<'a> ObserverSet<'a> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn with(mut self, observer: &'a mut dyn Observer) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn push(&mut self, observer: &'a mut dyn Observer) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Observer for ObserverSet<'_> {
    fn on_snapshot(
        &mut self,
        time: f64,
        u: &DVector<f64>,
        v: &DVector<f64>,
    ) -> Result<(), String> {
        for observer in self.observers.iter_mut() {
            observer.on_snapshot(time, u, v)?;
        }
        Ok(())
    }
}

/// What a finished run reports back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub scheme: Scheme,
    pub dt: f64,
    pub steps: usize,
    pub final_time: f64,
    /// snapshots handed to the observer, the t = 0 one included
    pub snapshots: usize,
    pub mass_u: f64,
    pub mass_v: f64,
}

/// Owns the assembled operator and the derived step; runs any number of initial states
pub struct ReactionDiffusionSolver {
    settings: SimulationSettings,
    laplacian: PeriodicLaplacian,
    reactions: ReactionTerms,
    dt: f64,
    num_steps: usize,
}

impl ReactionDiffusionSolver {
    pub fn new(settings: SimulationSettings) -> Result<Self, IntegratorError> {
        settings.validate()?;
        let grid = Grid::with_convention(settings.grid_size, settings.spacing)?;
        let laplacian = PeriodicLaplacian::from_grid(grid);
        let reactions =
            ReactionTerms::with_model(settings.params, settings.g_form, settings.reaction_model)?;
        let dt = settings.resolved_time_step();
        let num_steps = number_of_steps(settings.t_final, dt);

        if settings.scheme == Scheme::Explicit {
            let limit = explicit_stability_limit(
                grid.dx(),
                settings.params.sigma,
                settings.params.max_diffusivity(),
            );
            if dt > limit {
                warn!(
                    "explicit step dt = {:.6e} exceeds the stability limit {:.6e}, the run may blow up",
                    dt, limit
                );
            }
        }
        info!(
            "{} run on {}x{} grid: dx = {:.6e}, dt = {:.6e}, {} steps to t = {}",
            settings.scheme,
            grid.m(),
            grid.m(),
            grid.dx(),
            dt,
            num_steps,
            settings.t_final
        );
        Ok(Self {
            settings,
            laplacian,
            reactions,
            dt,
            num_steps,
        })
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn grid(&self) -> &Grid {
        self.laplacian.grid()
    }

    pub fn laplacian(&self) -> &PeriodicLaplacian {
        &self.laplacian
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    /// Advances `state` by `num_steps` steps, emitting snapshots to `observer`.
    /// On error `state` holds the last values reached.
    pub fn run(
        &self,
        state: &mut FieldState,
        observer: &mut dyn Observer,
    ) -> Result<RunSummary, IntegratorError> {
        if state.len() != self.grid().len() {
            return Err(IntegratorError::InvalidRun(format!(
                "state holds {} points, grid has {}",
                state.len(),
                self.grid().len()
            )));
        }
        if let Some(species) = state.first_non_finite() {
            return Err(IntegratorError::NonFiniteState {
                species,
                step: state.step,
                time: state.t,
            });
        }
        match self.settings.scheme {
            Scheme::Explicit => {
                let mut stepper = ExplicitEuler::new(&self.laplacian, self.reactions, self.dt);
                self.drive(&mut stepper, state, observer)
            }
            Scheme::Imex => {
                let mut stepper = ImexSplitting::new(
                    &self.laplacian,
                    self.reactions,
                    self.dt,
                    self.settings.solver,
                    &self.settings.solver_config,
                )?;
                self.drive(&mut stepper, state, observer)
            }
        }
    }

    fn drive<S: TimeStepper>(
        &self,
        stepper: &mut S,
        state: &mut FieldState,
        observer: &mut dyn Observer,
    ) -> Result<RunSummary, IntegratorError> {
        let start = Instant::now();
        let interval = self.settings.output_interval;
        let t0 = state.t;
        let first_step = state.step;
        let mut snapshots = 0;

        emit(observer, state)?;
        snapshots += 1;
        // index of the next checkpoint t0 + k·interval
        let mut next_checkpoint = 1usize;

        for k in 1..=self.num_steps {
            let step = first_step + k;
            stepper.advance(state, step)?;
            state.step = step;
            state.t = t0 + k as f64 * stepper.dt();

            if let Some(species) = state.first_non_finite() {
                return Err(IntegratorError::NonFiniteState {
                    species,
                    step,
                    time: state.t,
                });
            }

            let elapsed = state.t - t0;
            let slack = CHECKPOINT_TOLERANCE * interval.max(elapsed);
            if elapsed + slack >= next_checkpoint as f64 * interval {
                emit(observer, state)?;
                snapshots += 1;
                // a step longer than the interval crosses several checkpoints at once
                next_checkpoint = ((elapsed + slack) / interval).floor() as usize + 1;
                debug!("snapshot {} at t = {:.4}", snapshots, state.t);
            }
        }

        let (mass_u, mass_v) = state.total_mass();
        info!(
            "{} run finished: {} steps, t = {:.4}, {} snapshots, {:.3} s",
            stepper.scheme(),
            self.num_steps,
            state.t,
            snapshots,
            start.elapsed().as_secs_f64()
        );
        Ok(RunSummary {
            scheme: stepper.scheme(),
            dt: stepper.dt(),
            steps: self.num_steps,
            final_time: state.t,
            snapshots,
            mass_u,
            mass_v,
        })
    }
}

fn emit(observer: &mut dyn Observer, state: &FieldState) -> Result<(), IntegratorError> {
    observer
        .on_snapshot(state.t, &state.u, &state.v)
        .map_err(|message| IntegratorError::Observer {
            time: state.t,
            message,
        })
}

/// Builds the solver and runs it once; the usual entry point
pub fn simulate(
    settings: SimulationSettings,
    state: &mut FieldState,
    observer: &mut dyn Observer,
) -> Result<RunSummary, IntegratorError> {
    ReactionDiffusionSolver::new(settings)?.run(state, observer)
}
