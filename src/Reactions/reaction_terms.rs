use super::ReactionError;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Coefficients of one simulation run: diffusion scale σ, diffusivities D1, D2
/// and the reaction constants τ1, τ2, α, β, γ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionParams {
    pub sigma: f64,
    pub d1: f64,
    pub d2: f64,
    pub tau1: f64,
    pub tau2: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for ReactionParams {
    fn default() -> Self {
        Self::reference()
    }
}

impl ReactionParams {
    /// Parameter set of the reference driver (spotted Turing pattern)
    pub fn reference() -> Self {
        Self {
            sigma: 0.0021,
            d1: 0.5,
            d2: 1.0,
            tau1: 3.5,
            tau2: 0.0,
            alpha: 0.899,
            beta: -0.91,
            gamma: -0.899,
        }
    }

    /// Diffusion coefficients with τ1, τ2, α, β, γ set to zero. The reaction does not vanish:
    /// f keeps its v·(1 - τ2·u) term and reduces to f = v. Pair with
    /// [`ReactionModel::DiffusionOnly`] for a reaction-free run.
    pub fn pure_diffusion(sigma: f64, d1: f64, d2: f64) -> Self {
        Self {
            sigma,
            d1,
            d2,
            tau1: 0.0,
            tau2: 0.0,
            alpha: 0.0,
            beta: 0.0,
            gamma: 0.0,
        }
    }

    pub fn max_diffusivity(&self) -> f64 {
        self.d1.max(self.d2)
    }

    pub fn validate(&self) -> Result<(), ReactionError> {
        let all = [
            ("sigma", self.sigma),
            ("d1", self.d1),
            ("d2", self.d2),
            ("tau1", self.tau1),
            ("tau2", self.tau2),
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gamma", self.gamma),
        ];
        for (name, value) in all {
            if !value.is_finite() {
                return Err(ReactionError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
        }
        for (name, value) in [("sigma", self.sigma), ("d1", self.d1), ("d2", self.d2)] {
            if value < 0.0 {
                return Err(ReactionError::InvalidParameter {
                    name,
                    value,
                    reason: "must not be negative",
                });
            }
        }
        Ok(())
    }
}

/// Algebraic form used to evaluate g
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GForm {
    #[default]
    Polynomial,
    /// needs β ≠ 0
    Factored,
}

/// Which source terms drive the species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReactionModel {
    /// f and g of the two-species model
    #[default]
    Coupled,
    /// f = g = 0, the fields only diffuse
    DiffusionOnly,
}

/// α·u·(1 - τ1·v²) + v·(1 - τ2·u)
pub fn f_point(u: f64, v: f64, p: &ReactionParams) -> f64 {
    p.alpha * u * (1.0 - p.tau1 * v * v) + v * (1.0 - p.tau2 * u)
}

/// β·v + α·τ1·u·v² + u·(γ + τ2·v)
pub fn g_point(u: f64, v: f64, p: &ReactionParams) -> f64 {
    p.beta * v + p.alpha * p.tau1 * u * v * v + u * (p.gamma + p.tau2 * v)
}

/// β·v·(1 + (α·τ1/β)·u·v) + u·(γ + τ2·v)
pub fn g_factored_point(u: f64, v: f64, p: &ReactionParams) -> Result<f64, ReactionError> {
    if p.beta == 0.0 {
        return Err(ReactionError::SingularFactoredForm);
    }
    Ok(p.beta * v * (1.0 + (p.alpha * p.tau1 / p.beta) * u * v) + u * (p.gamma + p.tau2 * v))
}

fn check_lengths(u: &DVector<f64>, v: &DVector<f64>) -> Result<(), ReactionError> {
    if u.len() != v.len() {
        return Err(ReactionError::DimensionMismatch {
            u: u.len(),
            v: v.len(),
        });
    }
    Ok(())
}

/// f evaluated elementwise
pub fn f(u: &DVector<f64>, v: &DVector<f64>, p: &ReactionParams) -> Result<DVector<f64>, ReactionError> {
    check_lengths(u, v)?;
    Ok(u.zip_map(v, |ui, vi| f_point(ui, vi, p)))
}

/// g evaluated elementwise, polynomial form
pub fn g(u: &DVector<f64>, v: &DVector<f64>, p: &ReactionParams) -> Result<DVector<f64>, ReactionError> {
    check_lengths(u, v)?;
    Ok(u.zip_map(v, |ui, vi| g_point(ui, vi, p)))
}

/// g evaluated elementwise, factored form
pub fn g_factored(
    u: &DVector<f64>,
    v: &DVector<f64>,
    p: &ReactionParams,
) -> Result<DVector<f64>, ReactionError> {
    check_lengths(u, v)?;
    if p.beta == 0.0 {
        return Err(ReactionError::SingularFactoredForm);
    }
    let ratio = p.alpha * p.tau1 / p.beta;
    Ok(u.zip_map(v, |ui, vi| {
        p.beta * vi * (1.0 + ratio * ui * vi) + ui * (p.gamma + p.tau2 * vi)
    }))
}

/// Reaction evaluator bound to one parameter set and one form of g
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionTerms {
    params: ReactionParams,
    g_form: GForm,
    model: ReactionModel,
}

impl ReactionTerms {
    pub fn new(params: ReactionParams) -> Self {
        Self {
            params,
            g_form: GForm::Polynomial,
            model: ReactionModel::Coupled,
        }
    }

    /// Zero source terms; `params` still carries σ, D1 and D2 for the diffusion part
    pub fn diffusion_only(params: ReactionParams) -> Self {
        Self {
            params,
            g_form: GForm::Polynomial,
            model: ReactionModel::DiffusionOnly,
        }
    }

    /// The factored form is only checked for the coupled model, the other one never evaluates g
    pub fn with_model(
        params: ReactionParams,
        g_form: GForm,
        model: ReactionModel,
    ) -> Result<Self, ReactionError> {
        match model {
            ReactionModel::Coupled => Self::with_form(params, g_form),
            ReactionModel::DiffusionOnly => Ok(Self {
                g_form,
                ..Self::diffusion_only(params)
            }),
        }
    }

    /// Fails for the factored form with β = 0, so that the error shows up before the first step
    pub fn with_form(params: ReactionParams, g_form: GForm) -> Result<Self, ReactionError> {
        if g_form == GForm::Factored && params.beta == 0.0 {
            return Err(ReactionError::SingularFactoredForm);
        }
        Ok(Self {
            params,
            g_form,
            model: ReactionModel::Coupled,
        })
    }

    pub fn params(&self) -> &ReactionParams {
        &self.params
    }

    pub fn g_form(&self) -> GForm {
        self.g_form
    }

    pub fn model(&self) -> ReactionModel {
        self.model
    }

    pub fn f(&self, u: &DVector<f64>, v: &DVector<f64>) -> Result<DVector<f64>, ReactionError> {
        match self.model {
            ReactionModel::Coupled => f(u, v, &self.params),
            ReactionModel::DiffusionOnly => {
                check_lengths(u, v)?;
                Ok(DVector::zeros(u.len()))
            }
        }
    }

    pub fn g(&self, u: &DVector<f64>, v: &DVector<f64>) -> Result<DVector<f64>, ReactionError> {
        match (self.model, self.g_form) {
            (ReactionModel::DiffusionOnly, _) => {
                check_lengths(u, v)?;
                Ok(DVector::zeros(u.len()))
            }
            (ReactionModel::Coupled, GForm::Polynomial) => g(u, v, &self.params),
            (ReactionModel::Coupled, GForm::Factored) => g_factored(u, v, &self.params),
        }
    }

    /// (f(u,v), g(u,v))
    pub fn evaluate(
        &self,
        u: &DVector<f64>,
        v: &DVector<f64>,
    ) -> Result<(DVector<f64>, DVector<f64>), ReactionError> {
        Ok((self.f(u, v)?, self.g(u, v)?))
    }
}
