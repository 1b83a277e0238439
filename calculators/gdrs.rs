//! German Diabetes Risk Score with its clinical (HbA1c) extension.
//!
//! Stage one sums the original GDRS points; stage two re-weights that total
//! together with HbA1c. Both stages map points to a 5-year risk through
//! `1 - S0^exp((points - mean) / scale)`.

use super::{VariableSpec, find_variable};
use crate::error::RiskError;
use crate::link;
use crate::shared::files::{self, BundleSource};
use crate::types::{categorical_codes, require_finite};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUNDLE: &str = "gdrs_coeff_bundle_v1.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GdrsSmoking {
    Never,
    FormerLt20,
    FormerGe20,
    CurrentLt20,
    CurrentGe20,
}

categorical_codes!(GdrsSmoking, "smoking category", {
    Never => "never",
    FormerLt20 => "former_lt20",
    FormerGe20 => "former_ge20",
    CurrentLt20 => "current_lt20",
    CurrentGe20 => "current_ge20",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdrsInputs {
    pub age: f64,
    /// Metres; the score is defined on centimetres.
    pub height: f64,
    /// cm
    pub waist: f64,
    pub hypertension: bool,
    /// Hours per week.
    pub exercise: f64,
    pub smoking: GdrsSmoking,
    /// g/day
    pub wholegrains: f64,
    /// g/day (~mL)
    pub coffee: f64,
    /// g/day
    pub redmeat: f64,
    pub diabetes_one_parent: bool,
    pub diabetes_both_parents: bool,
    pub diabetes_sibling: bool,
    /// % (NGSP)
    pub hba1c: f64,
}

/// Parameters of `1 - S0^exp((points - mean) / scale)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsRiskModel {
    pub baseline_survival: f64,
    pub mean_points: f64,
    #[serde(default = "default_true")]
    pub scale_per_100_points: bool,
}

fn default_true() -> bool {
    true
}

impl PointsRiskModel {
    fn scale(&self) -> f64 {
        if self.scale_per_100_points { 100.0 } else { 1.0 }
    }

    fn risk(&self, points: f64) -> f64 {
        link::points_survival_risk(points, self.baseline_survival, self.mean_points, self.scale())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalPointsModel {
    pub variables: Vec<VariableSpec>,
    pub risk_model: PointsRiskModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalCoefficients {
    pub original_points: f64,
    pub hba1c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalPoints {
    #[serde(default)]
    pub intercept: f64,
    pub coefficients: ClinicalCoefficients,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalExtension {
    pub clinical_points: ClinicalPoints,
    pub risk_model: PointsRiskModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdrsBundle {
    pub original_points_model: OriginalPointsModel,
    pub clinical_extension: ClinicalExtension,
}

/// Both stages of the score. `clinical_risk_percent` is the reported result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GdrsRisk {
    pub original_points: f64,
    pub original_risk_percent: f64,
    pub clinical_points: f64,
    pub clinical_risk_percent: f64,
}

pub fn load_gdrs_bundle(filename: Option<&str>) -> Result<GdrsBundle, RiskError> {
    load_gdrs_bundle_from(&BundleSource::Embedded, filename.unwrap_or(DEFAULT_BUNDLE))
}

pub fn load_gdrs_bundle_from(source: &BundleSource, filename: &str) -> Result<GdrsBundle, RiskError> {
    files::load_typed(source, filename)
}

/// 5-year risk of type 2 diabetes from the clinical GDRS.
pub fn gdrs_risk(inputs: &GdrsInputs, bundle: &GdrsBundle) -> Result<GdrsRisk, RiskError> {
    let original_points = original_points(inputs, &bundle.original_points_model.variables)?;
    let original_risk = bundle.original_points_model.risk_model.risk(original_points);

    let hba1c = require_finite("hba1c", inputs.hba1c)?;
    let clinical = &bundle.clinical_extension.clinical_points;
    let clinical_points = clinical.coefficients.original_points * original_points
        + clinical.coefficients.hba1c * hba1c
        + clinical.intercept;
    let clinical_risk = bundle.clinical_extension.risk_model.risk(clinical_points);

    debug!(
        "GDRS: original points={original_points:.3} (risk {original_risk:.6}), clinical points={clinical_points:.3} (risk {clinical_risk:.6})"
    );

    Ok(GdrsRisk {
        original_points,
        original_risk_percent: original_risk * 100.0,
        clinical_points,
        clinical_risk_percent: clinical_risk * 100.0,
    })
}

fn original_points(inputs: &GdrsInputs, variables: &[VariableSpec]) -> Result<f64, RiskError> {
    let per_unit = |name: &str, value: f64| -> Result<f64, RiskError> {
        let value = require_finite(name, value)?;
        let var = find_variable(variables, name)?;
        Ok(var.points_per_unit()? * (value / var.per()))
    };
    let if_true = |name: &str, flag: bool| -> Result<f64, RiskError> {
        // The variable must exist even when the flag is false.
        let points = find_variable(variables, name)?.points_if_true()?;
        Ok(if flag { points } else { 0.0 })
    };

    // Both parents takes precedence; the two parental terms are never summed.
    let parents = if inputs.diabetes_both_parents {
        if_true("diabetes_both_parents", true)?
    } else {
        if_true("diabetes_one_parent", inputs.diabetes_one_parent)?
    };

    let points = per_unit("age", inputs.age)?
        + per_unit("height", inputs.height * 100.0)?
        + per_unit("waist", inputs.waist)?
        + if_true("hypertension", inputs.hypertension)?
        + per_unit("exercise", inputs.exercise)?
        + find_variable(variables, "smoking")?.category_points(inputs.smoking.code())?
        + per_unit("wholegrains", inputs.wholegrains)?
        + per_unit("coffee", inputs.coffee)?
        + per_unit("redmeat", inputs.redmeat)?
        + parents
        + if_true("diabetes_sibling", inputs.diabetes_sibling)?;
    Ok(points)
}
