//! # Reaction Terms Module
//!
//! Pointwise nonlinear source terms of the two-species model
//!
//! ```text
//! f(u,v) = α·u·(1 - τ1·v²) + v·(1 - τ2·u)
//! g(u,v) = β·v + α·τ1·u·v² + u·(γ + τ2·v)
//! ```
//!
//! `g` is also known in the factored form `β·v·(1 + (α·τ1/β)·u·v) + u·(γ + τ2·v)`, which is
//! algebraically the same but undefined for β = 0. The polynomial form is the canonical one,
//! the factored form is kept selectable through [`reaction_terms::GForm`].
//!
//! Both functions vanish at u = v = 0 for every parameter set.
pub mod reaction_terms;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReactionError {
    #[error("u and v have different lengths: {u} and {v}")]
    DimensionMismatch { u: usize, v: usize },
    #[error("factored form of g divides by beta, which is zero")]
    SingularFactoredForm,
    #[error("parameter {name} = {value} is not valid: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}
