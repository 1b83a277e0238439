#![deny(dead_code)]
#![deny(unused_imports)]

pub mod caide;
pub mod ckdpc;
pub mod clivd;
pub mod copd;
pub mod gdrs;
pub mod plcom2012;
pub mod score2;

use crate::error::RiskError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The calculators this crate ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Calculator {
    Ckdpc,
    Gdrs,
    Score2,
    Caide,
    Clivd,
    Plcom2012,
    Copd,
}

impl Calculator {
    pub const ALL: [Calculator; 7] = [
        Calculator::Ckdpc,
        Calculator::Gdrs,
        Calculator::Score2,
        Calculator::Caide,
        Calculator::Clivd,
        Calculator::Plcom2012,
        Calculator::Copd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Calculator::Ckdpc => "CKD-PC",
            Calculator::Gdrs => "GDRS",
            Calculator::Score2 => "SCORE2",
            Calculator::Caide => "CAIDE",
            Calculator::Clivd => "CLivD Modellab",
            Calculator::Plcom2012 => "PLCOm2012",
            Calculator::Copd => "COPD case-finding",
        }
    }
}

impl fmt::Display for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ========================================================================================
//                        Shared schema for point-score variables
// ========================================================================================

/// One entry of a variable's `categories` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub points: f64,
}

impl Category {
    /// The label when present, otherwise the code.
    pub fn label_or_code(&self) -> Option<&str> {
        self.label.as_deref().or(self.code.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub per: f64,
}

/// A named variable descriptor from a point-score bundle. Exactly which of the
/// optional fields a variable carries depends on how it is scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default)]
    pub points_per_unit: Option<f64>,
    #[serde(default)]
    pub scaling: Option<Scaling>,
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
    #[serde(default)]
    pub threshold: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub points_if_true: Option<f64>,
}

impl VariableSpec {
    pub fn points_per_unit(&self) -> Result<f64, RiskError> {
        self.points_per_unit
            .ok_or_else(|| self.missing("points_per_unit"))
    }

    /// The unit divisor from `scaling.per`, 1 when the variable is unscaled.
    pub fn per(&self) -> f64 {
        self.scaling.as_ref().map_or(1.0, |s| s.per)
    }

    pub fn points_if_true(&self) -> Result<f64, RiskError> {
        self.points_if_true.ok_or_else(|| self.missing("points_if_true"))
    }

    pub fn categories(&self) -> Result<&[Category], RiskError> {
        self.categories
            .as_deref()
            .ok_or_else(|| self.missing("categories"))
    }

    /// Points of the category whose code is exactly `code`.
    pub fn category_points(&self, code: &str) -> Result<f64, RiskError> {
        let categories = self.categories()?;
        categories
            .iter()
            .find(|c| c.code.as_deref() == Some(code))
            .map(|c| c.points)
            .ok_or_else(|| {
                let known: Vec<&str> = categories.iter().filter_map(|c| c.code.as_deref()).collect();
                RiskError::schema(format!(
                    "variable '{}' has no category {code:?}; bundle defines {known:?}",
                    self.name
                ))
            })
    }

    pub fn threshold(&self, key: &str) -> Result<f64, RiskError> {
        self.threshold
            .as_ref()
            .and_then(|t| t.get(key).copied())
            .ok_or_else(|| self.missing(&format!("threshold.{key}")))
    }

    fn missing(&self, field: &str) -> RiskError {
        RiskError::schema(format!("variable '{}' has no '{field}'", self.name))
    }
}

/// Finds a variable by name.
pub fn find_variable<'a>(
    variables: &'a [VariableSpec],
    name: &str,
) -> Result<&'a VariableSpec, RiskError> {
    variables
        .iter()
        .find(|v| v.name == name)
        .ok_or_else(|| RiskError::schema(format!("bundle has no variable '{name}'")))
}
