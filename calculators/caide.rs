//! CAIDE: 20-year dementia risk from a midlife point score.
//!
//! Points come from banded lookups (age, education), a categorical lookup
//! (sex), four binary indicators compared against bundle thresholds, and, for
//! the APOE-augmented variant, the genotype category. The total passes through
//! a logistic-on-points link whose intercept carries the follow-up offset.

use super::{Category, VariableSpec, find_variable};
use crate::error::RiskError;
use crate::link;
use crate::shared::files::{self, BundleSource};
use crate::types::{Sex, categorical_codes, require_finite};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUNDLE: &str = "caide_coeff_bundle_v1.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CaideModel {
    #[default]
    Basic,
    Apoe,
}

categorical_codes!(CaideModel, "CAIDE model", {
    Basic => "basic",
    Apoe => "apoe",
});

impl CaideModel {
    fn bundle_key(self) -> &'static str {
        match self {
            CaideModel::Basic => "model_1_basic",
            CaideModel::Apoe => "model_2_apoe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ApoeStatus {
    NonE4,
    E4,
}

categorical_codes!(ApoeStatus, "APOE status", {
    NonE4 => "non_e4",
    E4 => "e4",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaideInputs {
    pub age: u32,
    pub sex: Sex,
    /// Years of formal education.
    pub education_years: u32,
    /// Systolic blood pressure, mmHg.
    pub sbp_mmhg: f64,
    /// kg/m²
    pub bmi: f64,
    /// Total cholesterol, mmol/L.
    pub total_chol_mmol_l: f64,
    /// Active at least twice a week.
    pub physically_active: bool,
    /// Required when `model` is `apoe`.
    #[serde(default)]
    pub apoe_status: Option<ApoeStatus>,
    #[serde(default)]
    pub model: CaideModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticOnPoints {
    pub beta0: f64,
    #[serde(default)]
    pub beta1_followup20y: f64,
    pub beta2_per_point: f64,
}

impl LogisticOnPoints {
    /// Probability for a point total, `logistic(beta0 + beta1 + beta2 * points)`.
    pub fn probability(&self, points: f64) -> f64 {
        link::logistic(self.beta0 + self.beta1_followup20y + self.beta2_per_point * points)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaideModelSpec {
    pub variables: Vec<VariableSpec>,
    pub logistic_on_points: LogisticOnPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaideBundle {
    #[serde(default)]
    pub model_1_basic: Option<CaideModelSpec>,
    #[serde(default)]
    pub model_2_apoe: Option<CaideModelSpec>,
}

impl CaideBundle {
    pub fn model(&self, model: CaideModel) -> Result<&CaideModelSpec, RiskError> {
        let spec = match model {
            CaideModel::Basic => self.model_1_basic.as_ref(),
            CaideModel::Apoe => self.model_2_apoe.as_ref(),
        };
        spec.ok_or_else(|| {
            RiskError::schema(format!("model '{}' not found in bundle", model.bundle_key()))
        })
    }
}

pub fn load_caide_bundle(filename: Option<&str>) -> Result<CaideBundle, RiskError> {
    load_caide_bundle_from(&BundleSource::Embedded, filename.unwrap_or(DEFAULT_BUNDLE))
}

pub fn load_caide_bundle_from(
    source: &BundleSource,
    filename: &str,
) -> Result<CaideBundle, RiskError> {
    files::load_typed(source, filename)
}

/// 20-year dementia risk in percent.
pub fn caide_risk(inputs: &CaideInputs, bundle: &CaideBundle) -> Result<f64, RiskError> {
    let spec = bundle.model(inputs.model)?;
    let points = caide_points(inputs, bundle)?;
    let p = spec.logistic_on_points.probability(points);
    debug!("CAIDE {}: points={points}, risk={p:.6}", inputs.model);
    Ok(p * 100.0)
}

/// The CAIDE point total for the selected model variant.
pub fn caide_points(inputs: &CaideInputs, bundle: &CaideBundle) -> Result<f64, RiskError> {
    let spec = bundle.model(inputs.model)?;
    let vars = spec.variables.as_slice();

    let above = |name: &str, key: &str, value: f64| -> Result<f64, RiskError> {
        let value = require_finite(key, value)?;
        let var = find_variable(vars, name)?;
        Ok(if value > var.threshold(key)? {
            var.points_if_true()?
        } else {
            0.0
        })
    };

    let mut points = banded_points(find_variable(vars, "age")?, inputs.age, Band::from_code)?;
    points += banded_points(
        find_variable(vars, "education_years")?,
        inputs.education_years,
        Band::from_label,
    )?;
    points += find_variable(vars, "sex")?.category_points(inputs.sex.code())?;
    points += above("sbp_over_140", "sbp_mmHg", inputs.sbp_mmhg)?;
    points += above("bmi_over_30", "bmi", inputs.bmi)?;
    points += above("total_chol_over_6_5", "chol_mmol_per_L", inputs.total_chol_mmol_l)?;
    if !inputs.physically_active {
        points += find_variable(vars, "physically_inactive")?.points_if_true()?;
    }

    if inputs.model == CaideModel::Apoe {
        let apoe = inputs.apoe_status.ok_or_else(|| {
            RiskError::validation(
                "apoe_status must be provided when model is 'apoe' (use 'non_e4' or 'e4')",
            )
        })?;
        points += find_variable(vars, "apoe_status")?.category_points(apoe.code())?;
    }
    Ok(points)
}

/// A banded category boundary as written in a bundle code or label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Below(u32),
    Above(u32),
    AtLeast(u32),
    AtMost(u32),
    Between(u32, u32),
}

impl Band {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim().replace('–', "-");
        let number = |s: &str| s.trim().parse::<u32>().ok();
        if let Some(rest) = text.strip_prefix('<') {
            number(rest).map(Band::Below)
        } else if let Some(rest) = text.strip_prefix('>') {
            number(rest).map(Band::Above)
        } else if let Some(rest) = text.strip_prefix('≥') {
            number(rest).map(Band::AtLeast)
        } else if let Some(rest) = text.strip_prefix('≤') {
            number(rest).map(Band::AtMost)
        } else {
            let (lo, hi) = text.split_once('-')?;
            Some(Band::Between(number(lo)?, number(hi)?))
        }
    }

    fn from_code(category: &Category) -> Option<&str> {
        category.code.as_deref()
    }

    fn from_label(category: &Category) -> Option<&str> {
        category.label_or_code()
    }

    fn contains(self, value: u32) -> bool {
        match self {
            Band::Below(cut) => value < cut,
            Band::Above(cut) => value > cut,
            Band::AtLeast(cut) => value >= cut,
            Band::AtMost(cut) => value <= cut,
            Band::Between(lo, hi) => lo <= value && value <= hi,
        }
    }
}

/// Points of the band containing `value`. When bands overlap the last matching
/// one wins.
fn banded_points(
    var: &VariableSpec,
    value: u32,
    text_of: fn(&Category) -> Option<&str>,
) -> Result<f64, RiskError> {
    let mut chosen = None;
    for category in var.categories()? {
        let text = text_of(category).ok_or_else(|| {
            RiskError::schema(format!("variable '{}' has a category without a code", var.name))
        })?;
        let band = Band::parse(text).ok_or_else(|| {
            RiskError::schema(format!(
                "variable '{}' has an unparseable band {text:?}",
                var.name
            ))
        })?;
        if band.contains(value) {
            chosen = Some(category.points);
        }
    }
    chosen.ok_or_else(|| {
        RiskError::validation(format!(
            "{value} falls outside every band of '{}'",
            var.name
        ))
    })
}
