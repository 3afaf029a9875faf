/// Reference reaction-diffusion scenarios: explicit and IMEX runs of the Turing pattern
/// parameter set, a pure diffusion comparison of both schemes and a run configured from a
/// JSON settings file. Select a scenario with `rd_examples(task)`.
pub mod rd_examples;
