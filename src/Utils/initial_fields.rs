//! Initial conditions for U and V.
//!
//! A [`FieldGenerator`] fills one flattened m×m field for a given [`Grid`]. The random generator
//! is seeded explicitly so every run, and every test, can be reproduced.
use crate::Operators::grid::Grid;
use nalgebra::DVector;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64Mcg;

/// noise amplitude of the reference runs
pub const REFERENCE_NOISE_SCALE: f64 = 0.5;

pub trait FieldGenerator {
    /// Row-major field of length m², entry k at column k % m and row k / m
    fn generate(&mut self, grid: &Grid) -> DVector<f64>;
}

/// Independent normal noise, `scale`·N(0,1) per grid point
pub struct GaussianField {
    rng: Pcg64Mcg,
    scale: f64,
}

impl GaussianField {
    pub fn new(seed: u64, scale: f64) -> Self {
        Self {
            rng: Pcg64Mcg::seed_from_u64(seed),
            scale,
        }
    }

    pub fn reference(seed: u64) -> Self {
        Self::new(seed, REFERENCE_NOISE_SCALE)
    }
}

impl FieldGenerator for GaussianField {
    fn generate(&mut self, grid: &Grid) -> DVector<f64> {
        let scale = self.scale;
        let rng = &mut self.rng;
        DVector::from_fn(grid.len(), |_, _| {
            let z: f64 = rng.sample(StandardNormal);
            scale * z
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantField {
    value: f64,
}

impl ConstantField {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl FieldGenerator for ConstantField {
    fn generate(&mut self, grid: &Grid) -> DVector<f64> {
        DVector::from_element(grid.len(), self.value)
    }
}

/// Field given as a function of the coordinates (x, y) in [-1, 1)²
pub struct FunctionField<F>
where
    F: FnMut(f64, f64) -> f64,
{
    function: F,
}

impl<F> FunctionField<F>
where
    F: FnMut(f64, f64) -> f64,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> FieldGenerator for FunctionField<F>
where
    F: FnMut(f64, f64) -> f64,
{
    fn generate(&mut self, grid: &Grid) -> DVector<f64> {
        let axis = grid.axis();
        let m = grid.m();
        let function = &mut self.function;
        DVector::from_fn(grid.len(), |k, _| function(axis[k % m], axis[k / m]))
    }
}
