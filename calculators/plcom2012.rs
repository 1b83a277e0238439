//! PLCOm2012: 6-year probability of a lung cancer diagnosis in ever-smokers.

use crate::context::{FeatureContext, LinearPredictorSpec};
use crate::error::RiskError;
use crate::link;
use crate::shared::files::{self, BundleSource};
use crate::types::{categorical_codes, indicator, require_finite};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_BUNDLE: &str = "plcom2012_coeff_bundle_v1.json";

/// Center of the inverse-power smoking intensity transform. Authoritative:
/// bundles whose transform description disagrees are flagged and overridden.
pub const INTENSITY_CENTER: f64 = 0.4021541613;

/// Floor on cigarettes/day ÷ 10 so the inverse stays finite.
const INTENSITY_FLOOR: f64 = 1e-6;

const DEFAULT_CENTERS: [(&str, f64); 5] = [
    ("age_years_center", 62.0),
    ("education_level_center", 4.0),
    ("bmi_center", 27.0),
    ("smoking_duration_years_center", 27.0),
    ("quit_time_years_center", 10.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Race {
    White,
    Black,
    Hispanic,
    Asian,
    AmericanIndianAlaskaNative,
    NativeHawaiianPacificIslander,
}

categorical_codes!(Race, "race/ethnicity", {
    White => "white",
    Black => "black",
    Hispanic => "hispanic",
    Asian => "asian",
    AmericanIndianAlaskaNative => "american_indian_alaska_native",
    NativeHawaiianPacificIslander => "native_hawaiian_pacific_islander",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlcoSmokingStatus {
    Former,
    Current,
}

categorical_codes!(PlcoSmokingStatus, "smoking status", {
    Former => "former",
    Current => "current",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlcoInputs {
    pub age_years: f64,
    pub race: Race,
    /// Ordinal 1..=6, from less than high school to postgraduate.
    pub education_level: u8,
    /// kg/m²
    pub bmi: f64,
    pub copd: bool,
    pub personal_history_cancer: bool,
    pub family_history_lung_cancer: bool,
    pub smoking_status: PlcoSmokingStatus,
    pub smoking_intensity_cigs_per_day: f64,
    pub smoking_duration_years: f64,
    /// Years since quitting. Ignored (treated as 0) for current smokers.
    #[serde(default)]
    pub quit_time_years: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlcoRisk {
    /// Percent, [0, 100].
    pub risk_6y: f64,
    /// Probability, [0, 1].
    pub prob_6y: f64,
    pub linear_predictor: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntensityTransform {
    #[serde(default)]
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlcoHelpers {
    #[serde(default)]
    pub centering: BTreeMap<String, f64>,
    #[serde(default)]
    pub smoking_intensity_transform: Option<IntensityTransform>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlcoModel {
    pub linear_predictor: LinearPredictorSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlcoBundle {
    pub model: PlcoModel,
    #[serde(default)]
    pub shared_transform_helpers: PlcoHelpers,
}

impl PlcoBundle {
    fn center(&self, key: &str, default: f64) -> f64 {
        self.shared_transform_helpers
            .centering
            .get(key)
            .copied()
            .unwrap_or(default)
    }

    /// The constant stated at the end of the bundle's last transform step,
    /// when the bundle states one.
    pub fn stated_intensity_center(&self) -> Option<f64> {
        let steps = &self.shared_transform_helpers.smoking_intensity_transform.as_ref()?.steps;
        steps.last()?.split_whitespace().last()?.parse().ok()
    }
}

pub fn load_plcom2012_bundle(filename: Option<&str>) -> Result<PlcoBundle, RiskError> {
    load_plcom2012_bundle_from(&BundleSource::Embedded, filename.unwrap_or(DEFAULT_BUNDLE))
}

pub fn load_plcom2012_bundle_from(
    source: &BundleSource,
    filename: &str,
) -> Result<PlcoBundle, RiskError> {
    let bundle: PlcoBundle = files::load_typed(source, filename)?;
    if let Some(stated) = bundle.stated_intensity_center() {
        if (stated - INTENSITY_CENTER).abs() > 1e-9 {
            warn!(
                "PLCOm2012 bundle '{filename}' states an intensity center of {stated}; using {INTENSITY_CENTER}"
            );
        }
    }
    Ok(bundle)
}

pub fn plcom2012_risk_6y(inputs: &PlcoInputs, bundle: &PlcoBundle) -> Result<PlcoRisk, RiskError> {
    let ctx = build_context(inputs, bundle)?;
    let lp = bundle.model.linear_predictor.evaluate(&ctx)?;
    let prob = link::logistic(lp).clamp(0.0, 1.0);
    debug!("PLCOm2012: lp={lp:.6}, prob={prob:.6}");
    Ok(PlcoRisk {
        risk_6y: prob * 100.0,
        prob_6y: prob,
        linear_predictor: lp,
    })
}

/// `(cigarettes/day ÷ 10)^-1 - INTENSITY_CENTER`, with the ratio floored.
fn intensity_term(cigs_per_day: f64) -> f64 {
    let x = (cigs_per_day / 10.0).max(INTENSITY_FLOOR);
    x.recip() - INTENSITY_CENTER
}

fn build_context(inputs: &PlcoInputs, bundle: &PlcoBundle) -> Result<FeatureContext, RiskError> {
    if !(1..=6).contains(&inputs.education_level) {
        return Err(RiskError::validation(format!(
            "education_level must be between 1 and 6 (got {})",
            inputs.education_level
        )));
    }
    let [age_c, edu_c, bmi_c, dur_c, quit_c] =
        DEFAULT_CENTERS.map(|(key, default)| bundle.center(key, default));

    let current = inputs.smoking_status == PlcoSmokingStatus::Current;
    let quit_time = if current {
        0.0
    } else {
        require_finite("quit_time_years", inputs.quit_time_years.unwrap_or(0.0))?
    };
    let cigs = require_finite(
        "smoking_intensity_cigs_per_day",
        inputs.smoking_intensity_cigs_per_day,
    )?;

    let race = inputs.race;
    Ok(FeatureContext::new()
        .with("age_centered", require_finite("age_years", inputs.age_years)? - age_c)
        .with("education_centered", f64::from(inputs.education_level) - edu_c)
        .with("bmi_centered", require_finite("bmi", inputs.bmi)? - bmi_c)
        .with("copd_yes", indicator(inputs.copd))
        .with("personal_cancer_yes", indicator(inputs.personal_history_cancer))
        .with("family_lung_cancer_yes", indicator(inputs.family_history_lung_cancer))
        .with("smoking_current", indicator(current))
        .with("smoking_intensity_term", intensity_term(cigs))
        .with(
            "smoking_duration_centered",
            require_finite("smoking_duration_years", inputs.smoking_duration_years)? - dur_c,
        )
        .with("quit_time_centered", quit_time - quit_c)
        // White is the reference category.
        .with("race_black", indicator(race == Race::Black))
        .with("race_hispanic", indicator(race == Race::Hispanic))
        .with("race_asian", indicator(race == Race::Asian))
        .with("race_ai_an", indicator(race == Race::AmericanIndianAlaskaNative))
        .with("race_nh_pi", indicator(race == Race::NativeHawaiianPacificIslander)))
}
