use crate::Integrators::IntegratorError;
use crate::Integrators::rd_solver::{ObserverSet, ReactionDiffusionSolver, RunSummary};
use crate::Integrators::steppers::FieldState;
use crate::Integrators::time_step::Scheme;
use crate::LinearSolvers::sparse_solvers::SolverKind;
use crate::Utils::initial_fields::{FunctionField, GaussianField};
use crate::Utils::snapshots::{FieldStatistics, JsonSnapshotWriter, LoggingObserver, SnapshotRecorder};
use crate::settings::SimulationSettings;
use log::{error, info};
use std::path::Path;

pub const SETTINGS_FILE: &str = "rd_settings.json";
pub const SNAPSHOT_DIR: &str = "rd_snapshots";

/// Runs `settings` from seeded Gaussian noise, logging and recording every checkpoint
pub fn run_with_noise(
    settings: SimulationSettings,
    seed: u64,
    snapshot_dir: Option<&str>,
) -> Result<(RunSummary, SnapshotRecorder), IntegratorError> {
    settings.pretty_print();
    let solver = ReactionDiffusionSolver::new(settings)?;
    let mut state = FieldState::from_generators(
        solver.grid(),
        &mut GaussianField::reference(seed),
        &mut GaussianField::reference(seed.wrapping_add(1)),
    );
    let mut recorder = SnapshotRecorder::new(solver.grid());
    let mut logging = LoggingObserver;
    let mut writer = match snapshot_dir {
        Some(dir) => Some(
            JsonSnapshotWriter::new(dir, "rd", solver.grid()).map_err(|message| {
                IntegratorError::Observer {
                    time: state.t,
                    message,
                }
            })?,
        ),
        None => None,
    };
    let summary = {
        let mut observers = ObserverSet::new().with(&mut recorder).with(&mut logging);
        if let Some(writer) = writer.as_mut() {
            observers.push(writer);
        }
        solver.run(&mut state, &mut observers)?
    };
    if let Some(writer) = writer {
        info!("{} snapshot files written", writer.written().len());
    }
    Ok((summary, recorder))
}

fn report(result: Result<(RunSummary, SnapshotRecorder), IntegratorError>) {
    match result {
        Ok((summary, recorder)) => {
            println!("{:#?}", summary);
            if let Some(last) = recorder.last() {
                let (su, sv) = last.statistics();
                println!("final U: {:?}", su);
                println!("final V: {:?}", sv);
            }
        }
        Err(e) => error!("run failed: {}", e),
    }
}

pub fn rd_examples(task: usize) {
    match task {
        0 => {
            // explicit Euler on the reference parameters, snapshot every 50 time units
            let settings = SimulationSettings::explicit_reference();
            report(run_with_noise(settings, 0, None));
        }
        1 => {
            // IMEX on the reference parameters, snapshots saved as JSON
            let settings = SimulationSettings::imex_reference();
            report(run_with_noise(settings, 0, Some(SNAPSHOT_DIR)));
        }
        2 => {
            // pure diffusion of a Gaussian bump: both schemes should agree closely
            let base = SimulationSettings {
                t_final: 0.05,
                output_interval: 0.01,
                time_step: Some(1e-5),
                ..SimulationSettings::diffusion_only(40, 1.0, 1.0, 1.0)
            };
            let mut finals = Vec::new();
            for (scheme, solver) in [
                (Scheme::Explicit, SolverKind::ConjugateGradient),
                (Scheme::Imex, SolverKind::SparseCholesky),
            ] {
                let settings = SimulationSettings {
                    scheme,
                    solver,
                    ..base.clone()
                };
                let run = ReactionDiffusionSolver::new(settings).and_then(|rd| {
                    let mut bump = FunctionField::new(|x, y| (-20.0 * (x * x + y * y)).exp());
                    let mut flat = FunctionField::new(|_, _| 0.0);
                    let mut state = FieldState::from_generators(rd.grid(), &mut bump, &mut flat);
                    let mut observer = LoggingObserver;
                    rd.run(&mut state, &mut observer).map(|summary| (summary, state))
                });
                match run {
                    Ok((summary, state)) => {
                        info!("{}: {:?}", scheme, FieldStatistics::of(&state.u));
                        println!("{:#?}", summary);
                        finals.push(state.u);
                    }
                    Err(e) => error!("{} run failed: {}", scheme, e),
                }
            }
            if let [explicit, imex] = finals.as_slice() {
                println!("max |U_explicit - U_imex| = {:.3e}", (explicit - imex).amax());
            }
        }
        3 => {
            // settings from a JSON file, created with the IMEX reference if missing
            let path = Path::new(SETTINGS_FILE);
            if !path.exists() {
                if let Err(e) = SimulationSettings::default().save_to_file(path) {
                    error!("cannot write {}: {}", SETTINGS_FILE, e);
                    return;
                }
                info!("default settings written to {}", SETTINGS_FILE);
            }
            match SimulationSettings::load_from_file(path) {
                Ok(settings) => report(run_with_noise(settings, 0, None)),
                Err(e) => error!("cannot load {}: {}", SETTINGS_FILE, e),
            }
        }
        _ => println!("no example with number {}", task),
    }
}
