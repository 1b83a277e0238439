//! # Feature Contexts and Linear Predictors
//!
//! A `FeatureContext` is the per-call mapping from engineered feature name to
//! value. A `LinearPredictorSpec` is the bundle-side `{intercept, terms}` block.
//! Evaluating one against the other resolves every term by name, so a renamed
//! feature or coefficient surfaces as a `Schema` error at evaluation time.

use crate::error::RiskError;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ephemeral, per-evaluation mapping from feature name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureContext {
    values: BTreeMap<&'static str, f64>,
}

impl FeatureContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used when assembling a context in one expression.
    pub fn with(mut self, name: &'static str, value: f64) -> Self {
        self.values.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &'static str, value: f64) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Looks up a feature named by a bundle term.
    pub fn require(&self, name: &str) -> Result<f64, RiskError> {
        self.get(name)
            .ok_or_else(|| RiskError::schema(format!("feature context has no term '{name}'")))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One `{name, coefficient}` entry of a bundle's linear predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub name: String,
    pub coefficient: f64,
}

/// `intercept + Σ coefficient × feature`, as declared in a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPredictorSpec {
    pub intercept: f64,
    pub terms: Vec<Term>,
}

impl LinearPredictorSpec {
    /// Resolves every term against `ctx` and returns the linear predictor.
    ///
    /// The coefficients and the matched features are laid out in the bundle's
    /// canonical term order and combined with a single dot product.
    pub fn evaluate(&self, ctx: &FeatureContext) -> Result<f64, RiskError> {
        let features = self
            .terms
            .iter()
            .map(|term| ctx.require(&term.name))
            .collect::<Result<Vec<f64>, RiskError>>()?;
        let x = Array1::from(features);
        let beta: Array1<f64> = self.terms.iter().map(|term| term.coefficient).collect();
        Ok(self.intercept + x.dot(&beta))
    }
}
