//! SCORE2: 10-year risk of fatal and non-fatal cardiovascular disease in
//! apparently healthy people aged 40–69, stratified by sex and recalibrated to
//! one of four European risk regions.

use crate::context::FeatureContext;
use crate::error::RiskError;
use crate::link;
use crate::shared::files::{self, BundleSource};
use crate::types::{Sex, categorical_codes, indicator, require_finite};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_BUNDLE: &str = "score2_coeff_bundle_v1.json";

pub const MIN_AGE: f64 = 40.0;
pub const MAX_AGE: f64 = 69.0;

/// Coefficient names in the order they enter the linear predictor.
const BETA_NAMES: [&str; 11] = [
    "cage",
    "smoke",
    "csbp",
    "ctchol",
    "chdl",
    "cage*smoke",
    "cage*csbp",
    "cage*ctchol",
    "cage*chdl",
    "diab",
    "cage*diab",
];

/// Risk region of the country of residence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    #[default]
    Low,
    Moderate,
    High,
    VeryHigh,
}

categorical_codes!(Region, "SCORE2 risk region", {
    Low => "low",
    Moderate => "moderate",
    High => "high",
    VeryHigh => "very_high",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score2Inputs {
    pub age: f64,
    pub sex: Sex,
    pub smoker: bool,
    /// Systolic blood pressure, mmHg.
    pub sbp: f64,
    /// Total cholesterol, mmol/L.
    pub tchol: f64,
    /// HDL cholesterol, mmol/L.
    pub hdl: f64,
    #[serde(default)]
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score2Stratum {
    pub baseline_survival: f64,
    pub betas: BTreeMap<String, f64>,
    /// Recalibration constants `(a, b)`.
    pub region_params: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score2Bundle {
    pub by_region: BTreeMap<String, BTreeMap<String, Score2Stratum>>,
}

impl Score2Bundle {
    fn stratum(&self, region: Region, sex: Sex) -> Result<&Score2Stratum, RiskError> {
        self.by_region
            .get(region.code())
            .and_then(|by_sex| by_sex.get(sex.code()))
            .ok_or_else(|| {
                RiskError::schema(format!(
                    "bundle has no entry by_region['{}']['{}']",
                    region.code(),
                    sex.code()
                ))
            })
    }
}

pub fn load_score2_bundle(filename: Option<&str>) -> Result<Score2Bundle, RiskError> {
    load_score2_bundle_from(&BundleSource::Embedded, filename.unwrap_or(DEFAULT_BUNDLE))
}

pub fn load_score2_bundle_from(
    source: &BundleSource,
    filename: &str,
) -> Result<Score2Bundle, RiskError> {
    files::load_typed(source, filename)
}

/// 10-year CVD risk in percent after regional recalibration.
pub fn score2_risk(inputs: &Score2Inputs, bundle: &Score2Bundle) -> Result<f64, RiskError> {
    let age = require_finite("age", inputs.age)?;
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(RiskError::validation(format!(
            "SCORE2 is only validated for ages {MIN_AGE}–{MAX_AGE} (got {age})"
        )));
    }
    let stratum = bundle.stratum(inputs.region, inputs.sex)?;
    let ctx = build_context(inputs)?;

    let mut lp = 0.0;
    for name in BETA_NAMES {
        let beta = stratum
            .betas
            .get(name)
            .copied()
            .ok_or_else(|| RiskError::schema(format!("SCORE2 betas have no '{name}'")))?;
        lp += beta * ctx.require(name)?;
    }

    let p_base = link::survival_risk(stratum.baseline_survival, lp);
    let (a, b) = stratum.region_params;
    let p = link::cloglog_recalibrate(p_base, a, b);
    debug!(
        "SCORE2 {}/{}: lp={lp:.6}, base risk={p_base:.6}, recalibrated={p:.6}",
        inputs.region,
        inputs.sex
    );
    Ok(p * 100.0)
}

fn build_context(inputs: &Score2Inputs) -> Result<FeatureContext, RiskError> {
    let cage = (inputs.age - 60.0) / 5.0;
    let csbp = (require_finite("sbp", inputs.sbp)? - 120.0) / 20.0;
    let ctchol = require_finite("tchol", inputs.tchol)? - 6.0;
    let chdl = (require_finite("hdl", inputs.hdl)? - 1.3) / 0.5;
    let smoke = indicator(inputs.smoker);
    // SCORE2 targets people without diabetes.
    let diab = 0.0;

    Ok(FeatureContext::new()
        .with("cage", cage)
        .with("smoke", smoke)
        .with("csbp", csbp)
        .with("ctchol", ctchol)
        .with("chdl", chdl)
        .with("cage*smoke", cage * smoke)
        .with("cage*csbp", cage * csbp)
        .with("cage*ctchol", cage * ctchol)
        .with("cage*chdl", cage * chdl)
        .with("diab", diab)
        .with("cage*diab", cage * diab))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn inputs(age: f64) -> Score2Inputs {
        Score2Inputs {
            age,
            sex: Sex::Male,
            smoker: true,
            sbp: 140.0,
            tchol: 5.5,
            hdl: 1.3,
            region: Region::Low,
        }
    }

    #[test]
    fn reference_patient_has_zero_linear_predictor() {
        // At the centering values the base risk is exactly 1 - S0.
        let ctx = build_context(&Score2Inputs {
            age: 60.0,
            sex: Sex::Female,
            smoker: false,
            sbp: 120.0,
            tchol: 6.0,
            hdl: 1.3,
            region: Region::Low,
        })
        .unwrap();
        for name in BETA_NAMES {
            assert_abs_diff_eq!(ctx.require(name).unwrap(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn matches_hand_computed_value() {
        let bundle = load_score2_bundle(None).unwrap();
        // age 50 → cage = -2; sbp 140 → csbp = 1; tchol 5.5 → -0.5; hdl 1.3 → 0.
        let lp: f64 = 0.3742 * -2.0 + 0.6012 + 0.2777 - 0.1458 * 0.5 - 0.0755 * -2.0
            - 0.0255 * -2.0
            - 0.0281 * 1.0;
        let p_base = 1.0 - 0.9605_f64.powf(lp.exp());
        let x = (-(1.0 - p_base).ln()).ln();
        let expected = (1.0 - (-(-0.5699 + 0.7476 * x).exp()).exp()) * 100.0;
        assert_abs_diff_eq!(score2_risk(&inputs(50.0), &bundle).unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn age_window_is_inclusive() {
        let bundle = load_score2_bundle(None).unwrap();
        assert!(score2_risk(&inputs(40.0), &bundle).is_ok());
        assert!(score2_risk(&inputs(69.0), &bundle).is_ok());
        assert!(matches!(
            score2_risk(&inputs(39.0), &bundle),
            Err(RiskError::Validation(_))
        ));
        assert!(matches!(
            score2_risk(&inputs(70.0), &bundle),
            Err(RiskError::Validation(_))
        ));
    }

    #[test]
    fn higher_risk_regions_report_higher_risk() {
        let bundle = load_score2_bundle(None).unwrap();
        let mut previous = 0.0;
        for region in [Region::Low, Region::Moderate, Region::High, Region::VeryHigh] {
            let mut i = inputs(55.0);
            i.region = region;
            let risk = score2_risk(&i, &bundle).unwrap();
            assert!(risk > previous, "{region} should exceed {previous}");
            previous = risk;
        }
    }

    #[test]
    fn missing_beta_is_a_schema_error() {
        let mut bundle = load_score2_bundle(None).unwrap();
        bundle
            .by_region
            .get_mut("low")
            .unwrap()
            .get_mut("male")
            .unwrap()
            .betas
            .remove("cage*chdl");
        assert!(matches!(
            score2_risk(&inputs(50.0), &bundle),
            Err(RiskError::Schema(_))
        ));
    }

    #[test]
    fn missing_region_is_a_schema_error() {
        let mut bundle = load_score2_bundle(None).unwrap();
        bundle.by_region.remove("high");
        let mut i = inputs(50.0);
        i.region = Region::High;
        assert!(matches!(score2_risk(&i, &bundle), Err(RiskError::Schema(_))));
    }
}
