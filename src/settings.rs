//! # Settings Module
//!
//! ## Purpose
//! Everything a run needs apart from the initial fields: grid, reaction parameters, scheme,
//! final time, output cadence, step size heuristics and linear solver options. The settings are
//! plain serde structures, stored as JSON.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "grid_size": 150,
//!   "spacing": "Periodic",
//!   "params": { "sigma": 0.0021, "d1": 0.5, "d2": 1.0, "tau1": 3.5, "tau2": 0.0,
//!               "alpha": 0.899, "beta": -0.91, "gamma": -0.899 },
//!   "scheme": "Imex",
//!   "t_final": 30.0,
//!   "output_interval": 5.0,
//!   "stability": { "explicit_denominator": 5.0, "imex_factor": 10.0 },
//!   "time_step": null,
//!   "solver": "ConjugateGradient",
//!   "solver_config": { "tolerance": 1e-10, "max_iterations": null },
//!   "g_form": "Polynomial",
//!   "reaction_model": "Coupled"
//! }
//! ```
//! Missing keys take the values of [`SimulationSettings::default`] (the IMEX reference run).
use crate::Integrators::time_step::{Scheme, StabilityConstants, derive_time_step};
use crate::LinearSolvers::sparse_solvers::{SolverConfig, SolverKind};
use crate::Operators::grid::SpacingConvention;
use crate::Reactions::reaction_terms::{GForm, ReactionModel, ReactionParams};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// grid size of the reference driver
pub const REFERENCE_GRID_SIZE: usize = 150;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// m, points per axis
    pub grid_size: usize,
    pub spacing: SpacingConvention,
    pub params: ReactionParams,
    pub scheme: Scheme,
    pub t_final: f64,
    /// simulated time between two emitted snapshots
    pub output_interval: f64,
    pub stability: StabilityConstants,
    /// fixed Δt; None derives it from `stability`
    pub time_step: Option<f64>,
    pub solver: SolverKind,
    pub solver_config: SolverConfig,
    pub g_form: GForm,
    /// `DiffusionOnly` switches f and g off
    pub reaction_model: ReactionModel,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self::imex_reference()
    }
}

impl SimulationSettings {
    /// IMEX reference run: m = 150, t_final = 30, snapshot every 5 time units
    pub fn imex_reference() -> Self {
        Self {
            grid_size: REFERENCE_GRID_SIZE,
            spacing: SpacingConvention::Periodic,
            params: ReactionParams::reference(),
            scheme: Scheme::Imex,
            t_final: 30.0,
            output_interval: 5.0,
            stability: StabilityConstants::default(),
            time_step: None,
            solver: SolverKind::ConjugateGradient,
            solver_config: SolverConfig::default(),
            g_form: GForm::Polynomial,
            reaction_model: ReactionModel::Coupled,
        }
    }

    /// Explicit reference run: m = 150, snapshot every 50 time units
    pub fn explicit_reference() -> Self {
        Self {
            scheme: Scheme::Explicit,
            t_final: 150.0,
            output_interval: 50.0,
            ..Self::imex_reference()
        }
    }

    /// Reaction-free run on an m×m grid, D1 and D2 scaled by σ; snapshots every 0.25
    pub fn diffusion_only(grid_size: usize, sigma: f64, d1: f64, d2: f64) -> Self {
        Self {
            grid_size,
            params: ReactionParams::pure_diffusion(sigma, d1, d2),
            reaction_model: ReactionModel::DiffusionOnly,
            t_final: 1.0,
            output_interval: 0.25,
            ..Self::imex_reference()
        }
    }

    /// Δx of the configured grid and spacing convention
    pub fn dx(&self) -> f64 {
        self.spacing.spacing(self.grid_size)
    }

    /// Fixed step if given, otherwise the heuristic of the chosen scheme
    pub fn resolved_time_step(&self) -> f64 {
        match self.time_step {
            Some(dt) => dt,
            None => derive_time_step(
                self.scheme,
                self.dx(),
                self.params.sigma,
                self.params.max_diffusivity(),
                &self.stability,
            ),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.grid_size < 2 {
            return Err(SettingsError::Invalid(format!(
                "grid_size must be at least 2, got {}",
                self.grid_size
            )));
        }
        self.params
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;
        if !(self.t_final.is_finite() && self.t_final > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "t_final must be positive, got {}",
                self.t_final
            )));
        }
        if !(self.output_interval.is_finite() && self.output_interval > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "output_interval must be positive, got {}",
                self.output_interval
            )));
        }
        let constants = [
            ("explicit_denominator", self.stability.explicit_denominator),
            ("imex_factor", self.stability.imex_factor),
        ];
        for (name, value) in constants {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(self.solver_config.tolerance.is_finite() && self.solver_config.tolerance > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "solver tolerance must be positive, got {}",
                self.solver_config.tolerance
            )));
        }
        let dt = self.resolved_time_step();
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "time step {} is not a positive number; with sigma*max(D) = 0 set time_step explicitly",
                dt
            )));
        }
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path.as_ref())?;
        let settings: SimulationSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        info!("settings loaded from {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn pretty_print(&self) {
        use prettytable::{Table, row};

        println!("\n=== REACTION-DIFFUSION RUN ===");
        let mut table = Table::new();
        table.add_row(row!["Parameter", "Value"]);
        table.add_row(row!["Grid size (m)", self.grid_size]);
        table.add_row(row!["Spacing", format!("{:?}", self.spacing)]);
        table.add_row(row!["dx", format!("{:.6}", self.dx())]);
        table.add_row(row!["Scheme", self.scheme]);
        table.add_row(row!["dt", format!("{:.6e}", self.resolved_time_step())]);
        table.add_row(row!["t_final", self.t_final]);
        table.add_row(row!["Output interval", self.output_interval]);
        table.add_row(row!["Solver", format!("{:?}", self.solver)]);
        table.add_row(row!["g form", format!("{:?}", self.g_form)]);
        table.add_row(row!["Reactions", format!("{:?}", self.reaction_model)]);
        table.printstd();

        let p = &self.params;
        let mut coefficients = Table::new();
        coefficients.add_row(row!["sigma", "D1", "D2", "tau1", "tau2", "alpha", "beta", "gamma"]);
        coefficients.add_row(row![p.sigma, p.d1, p.d2, p.tau1, p.tau2, p.alpha, p.beta, p.gamma]);
        coefficients.printstd();
    }
}
