//! Case-finding score for undiagnosed COPD in primary care.
//!
//! A purely categorical linear score compared against a cut-off.

use crate::error::RiskError;
use crate::shared::files::{self, BundleSource};
use crate::types::categorical_codes;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_BUNDLE: &str = "copd_coeff_bundle_v1.json";

/// Cut-off used when neither the caller nor the bundle supplies one.
pub const DEFAULT_THRESHOLD: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CopdSmokingStatus {
    Never,
    Former,
    Current,
}

categorical_codes!(CopdSmokingStatus, "smoking status", {
    Never => "never",
    Former => "former",
    Current => "current",
});

/// Lower respiratory tract infections recorded in the last three years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LrtiCount {
    Zero,
    One,
    Two,
    ThreeOrMore,
}

categorical_codes!(LrtiCount, "LRTI count", {
    Zero => "0",
    One => "1",
    Two => "2",
    ThreeOrMore => "3+",
});

impl LrtiCount {
    pub fn from_count(count: u32) -> Self {
        match count {
            0 => LrtiCount::Zero,
            1 => LrtiCount::One,
            2 => LrtiCount::Two,
            _ => LrtiCount::ThreeOrMore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopdInputs {
    pub smoking_status: CopdSmokingStatus,
    pub asthma_history: bool,
    pub lrti_count_3y: LrtiCount,
    /// Salbutamol prescribed in the last three years.
    pub salbutamol_3y: bool,
    /// Overrides the bundle's default cut-off.
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopdCoefficients {
    pub smoking_status: BTreeMap<String, f64>,
    pub asthma_history: f64,
    pub lrti_count_3y: BTreeMap<String, f64>,
    pub salbutamol_3y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopdScoreModel {
    #[serde(default)]
    pub default_threshold: Option<f64>,
    pub coefficients: CopdCoefficients,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopdBundle {
    pub score_model: CopdScoreModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopdCaseFinding {
    pub score: f64,
    pub threshold: f64,
    /// `score >= threshold`: likely undiagnosed COPD.
    pub above_threshold: bool,
    pub recommendation: String,
}

impl fmt::Display for CopdCaseFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "COPD case-finding score: {:.2}, {}",
            self.score, self.recommendation
        )
    }
}

pub fn load_copd_bundle(filename: Option<&str>) -> Result<CopdBundle, RiskError> {
    load_copd_bundle_from(&BundleSource::Embedded, filename.unwrap_or(DEFAULT_BUNDLE))
}

pub fn load_copd_bundle_from(source: &BundleSource, filename: &str) -> Result<CopdBundle, RiskError> {
    files::load_typed(source, filename)
}

pub fn copd_casefinding_score(
    inputs: &CopdInputs,
    bundle: &CopdBundle,
) -> Result<CopdCaseFinding, RiskError> {
    let model = &bundle.score_model;
    let threshold = inputs
        .threshold
        .or(model.default_threshold)
        .unwrap_or(DEFAULT_THRESHOLD);
    if !threshold.is_finite() {
        return Err(RiskError::validation(format!(
            "threshold must be a finite number (got {threshold})"
        )));
    }

    let coeffs = &model.coefficients;
    let lookup = |table: &BTreeMap<String, f64>, name: &str, code: &str| {
        table.get(code).copied().ok_or_else(|| {
            RiskError::schema(format!("coefficients['{name}'] has no entry {code:?}"))
        })
    };

    let mut score = lookup(
        &coeffs.smoking_status,
        "smoking_status",
        inputs.smoking_status.code(),
    )?;
    if inputs.asthma_history {
        score += coeffs.asthma_history;
    }
    score += lookup(
        &coeffs.lrti_count_3y,
        "lrti_count_3y",
        inputs.lrti_count_3y.code(),
    )?;
    if inputs.salbutamol_3y {
        score += coeffs.salbutamol_3y;
    }

    let above_threshold = score >= threshold;
    let recommendation = if above_threshold {
        format!(
            "Score ≥ {threshold}: likely undiagnosed COPD — recommend confirmatory spirometry."
        )
    } else {
        format!("Score < {threshold}: below recommended cut-off for case-finding.")
    };
    debug!("COPD case-finding: score={score}, threshold={threshold}, flagged={above_threshold}");

    Ok(CopdCaseFinding {
        score,
        threshold,
        above_threshold,
        recommendation,
    })
}
