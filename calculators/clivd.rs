//! CLivD Modellab: 15-year risk of incident severe liver disease.
//!
//! Alcohol (drinks/week) and GGT (U/L) are truncated to bundle maxima before
//! use. Alcohol additionally enters through a five-knot cubic spline basis.
//! The result is the linear predictor, its hazard ratio, and a four-level risk
//! group.

use crate::context::{FeatureContext, LinearPredictorSpec};
use crate::error::RiskError;
use crate::shared::files::{self, BundleSource};
use crate::types::{Sex, categorical_codes, indicator, require_finite};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_BUNDLE: &str = "clivd_coeff_bundle_v1.json";

/// Knots of the alcohol spline basis, drinks/week.
pub const ALCOHOL_KNOTS: [f64; 5] = [0.1, 1.0, 3.0, 9.0, 33.0];
const SPLINE_TERMS: [&str; 5] = [
    "alcohol_spline_s1",
    "alcohol_spline_s2",
    "alcohol_spline_s3",
    "alcohol_spline_s4",
    "alcohol_spline_s5",
];

const ALCOHOL_TRUNCATION_KEY: &str = "alcohol_drinks_per_week";
const GGT_TRUNCATION_KEY: &str = "ggt_ul";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClivdSmoking {
    Current,
    NeverOrPast,
}

categorical_codes!(ClivdSmoking, "smoking status", {
    Current => "current",
    NeverOrPast => "never_or_past",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClivdInputs {
    pub age: f64,
    pub sex: Sex,
    /// Waist-hip ratio.
    pub whr: f64,
    /// Drinks per week.
    pub alcohol: f64,
    /// Gamma-glutamyl transferase, U/L.
    pub ggt: f64,
    pub diabetes: bool,
    pub smoking: ClivdSmoking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskGroup {
    Minimal,
    Low,
    Intermediate,
    High,
}

impl RiskGroup {
    /// Fixed linear-predictor cut points of the 15-year risk groups.
    pub fn from_linear_predictor(lp: f64) -> Self {
        if lp < -0.258 {
            RiskGroup::Minimal
        } else if lp <= 2.066 {
            RiskGroup::Low
        } else if lp <= 2.784 {
            RiskGroup::Intermediate
        } else {
            RiskGroup::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskGroup::Minimal => "minimal",
            RiskGroup::Low => "low",
            RiskGroup::Intermediate => "intermediate",
            RiskGroup::High => "high",
        }
    }
}

impl fmt::Display for RiskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClivdScore {
    pub linear_predictor: f64,
    pub hazard_ratio: f64,
    pub risk_group_15y: RiskGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truncation {
    #[serde(default)]
    pub truncate_min: Option<f64>,
    pub truncate_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClivdHelpers {
    pub variable_truncation: BTreeMap<String, Truncation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClivdModel {
    pub linear_predictor: LinearPredictorSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClivdBundle {
    pub shared_transform_helpers: ClivdHelpers,
    pub model: ClivdModel,
}

impl ClivdBundle {
    /// Clamps `value` into `[truncate_min, truncate_max]` for the named variable;
    /// the lower bound defaults to 0.
    fn truncate(&self, key: &str, value: f64) -> Result<f64, RiskError> {
        let rule = self
            .shared_transform_helpers
            .variable_truncation
            .get(key)
            .ok_or_else(|| RiskError::schema(format!("bundle has no truncation rule for '{key}'")))?;
        Ok(value
            .min(rule.truncate_max)
            .max(rule.truncate_min.unwrap_or(0.0)))
    }
}

pub fn load_clivd_bundle(filename: Option<&str>) -> Result<ClivdBundle, RiskError> {
    load_clivd_bundle_from(&BundleSource::Embedded, filename.unwrap_or(DEFAULT_BUNDLE))
}

pub fn load_clivd_bundle_from(
    source: &BundleSource,
    filename: &str,
) -> Result<ClivdBundle, RiskError> {
    files::load_typed(source, filename)
}

pub fn clivd_risk(inputs: &ClivdInputs, bundle: &ClivdBundle) -> Result<ClivdScore, RiskError> {
    let ctx = build_context(inputs, bundle)?;
    let lp = bundle.model.linear_predictor.evaluate(&ctx)?;
    let score = ClivdScore {
        linear_predictor: lp,
        hazard_ratio: lp.exp(),
        risk_group_15y: RiskGroup::from_linear_predictor(lp),
    };
    debug!(
        "CLivD: lp={lp:.6}, hr={:.6}, group={}",
        score.hazard_ratio, score.risk_group_15y
    );
    Ok(score)
}

/// `max(x - knot, 0)^3` for each knot.
fn alcohol_spline_basis(alcohol: f64) -> [f64; 5] {
    ALCOHOL_KNOTS.map(|knot| (alcohol - knot).max(0.0).powi(3))
}

fn build_context(inputs: &ClivdInputs, bundle: &ClivdBundle) -> Result<FeatureContext, RiskError> {
    let alcohol = bundle.truncate(
        ALCOHOL_TRUNCATION_KEY,
        require_finite("alcohol", inputs.alcohol)?,
    )?;
    let ggt = bundle.truncate(GGT_TRUNCATION_KEY, require_finite("ggt", inputs.ggt)?)?;
    let female = inputs.sex.female_indicator();
    let smoking_current = indicator(inputs.smoking == ClivdSmoking::Current);

    let mut ctx = FeatureContext::new()
        .with("age", require_finite("age", inputs.age)?)
        .with("waist_hip_ratio_x10", require_finite("whr", inputs.whr)? * 10.0)
        .with("alcohol_linear", alcohol)
        .with("ggt", ggt)
        .with("female_indicator", female)
        .with("diabetes_yes", indicator(inputs.diabetes))
        .with("smoking_current", smoking_current)
        .with("interaction_female_x_ggt", ggt * female)
        .with("interaction_female_x_smoking", female * smoking_current);
    for (name, value) in SPLINE_TERMS.into_iter().zip(alcohol_spline_basis(alcohol)) {
        ctx.insert(name, value);
    }
    Ok(ctx)
}
