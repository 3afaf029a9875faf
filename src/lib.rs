//! Two-species reaction-diffusion (Turing pattern) integrator on a periodic square grid.
#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Integrators;
#[allow(non_snake_case)]
pub mod LinearSolvers;
#[allow(non_snake_case)]
pub mod Operators;
#[allow(non_snake_case)]
pub mod Reactions;
#[allow(non_snake_case)]
pub mod Utils;
pub mod cli;
pub mod settings;
